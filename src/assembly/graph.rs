//! De Bruijn graph arena
//! =====================
//!
//! Nodes are canonical k-mers stored in a contiguous arena and addressed by
//! `NodeId`. Edges are implicit: each node carries an 8-bit extension mask
//! (4 bases on the left of the canonical k-mer, 4 on the right). Every
//! extension bit has a mirrored bit on the neighbour, so the graph can be
//! walked on either strand.
//!
//! Deletion marks nodes and unlinks their neighbours; `compact` drops marked
//! nodes and renumbers the arena.

use ahash::AHashMap;
use rayon::prelude::*;

use crate::core::kmer::{complement_code, PackedKmer};

pub type NodeId = usize;

/// Side of a canonical k-mer an extension hangs off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Extension bitmask: bits 0-3 are right extensions (A, C, G, T), bits 4-7 left ones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Extensions(u8);

impl Extensions {
    #[inline]
    fn bit(side: Side, base: u8) -> u8 {
        match side {
            Side::Right => 1 << (base & 0b11),
            Side::Left => 1 << (4 + (base & 0b11)),
        }
    }

    #[inline]
    pub fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn has(self, side: Side, base: u8) -> bool {
        self.0 & Self::bit(side, base) != 0
    }

    #[inline]
    pub fn set(&mut self, side: Side, base: u8) {
        self.0 |= Self::bit(side, base);
    }

    #[inline]
    pub fn clear(&mut self, side: Side, base: u8) {
        self.0 &= !Self::bit(side, base);
    }

    #[inline]
    pub fn side_mask(self, side: Side) -> u8 {
        match side {
            Side::Right => self.0 & 0x0f,
            Side::Left => self.0 >> 4,
        }
    }

    #[inline]
    pub fn count(self, side: Side) -> usize {
        self.side_mask(side).count_ones() as usize
    }

    #[inline]
    pub fn total(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Bases present on `side`, in A, C, G, T order
    pub fn bases(self, side: Side) -> impl Iterator<Item = u8> {
        let mask = self.side_mask(side);
        (0u8..4).filter(move |b| mask & (1 << b) != 0)
    }
}

#[derive(Debug, Clone)]
pub struct DeBruijnNode {
    pub kmer: PackedKmer,
    pub extensions: Extensions,
    /// Occurrence count, saturating at `u16::MAX`
    pub coverage: u16,
    marked: bool,
}

impl DeBruijnNode {
    pub fn new(kmer: PackedKmer, count: u32) -> Self {
        Self {
            kmer,
            extensions: Extensions::default(),
            coverage: count.min(u16::MAX as u32) as u16,
            marked: false,
        }
    }

    #[inline]
    pub fn is_marked(&self) -> bool {
        self.marked
    }
}

/// A node together with the strand it is read on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrientedNode {
    pub id: NodeId,
    /// `true` when the canonical k-mer is read as is
    pub forward: bool,
}

impl OrientedNode {
    pub fn new(id: NodeId, forward: bool) -> Self {
        Self { id, forward }
    }

    pub fn flip(self) -> Self {
        Self {
            id: self.id,
            forward: !self.forward,
        }
    }
}

/// Neighbour reached through one extension bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    pub id: NodeId,
    /// The neighbour's canonical k-mer continues this node's canonical strand
    pub same_orientation: bool,
    /// Extension base on this node's side
    pub base: u8,
}

#[derive(Debug, Clone)]
pub struct DeBruijnGraph {
    k: usize,
    nodes: Vec<DeBruijnNode>,
    index: AHashMap<PackedKmer, NodeId>,
    live_nodes: usize,
}

impl DeBruijnGraph {
    /// Build an arena from canonical nodes. Links are not computed.
    pub(crate) fn from_nodes(k: usize, nodes: Vec<DeBruijnNode>) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(id, node)| (node.kmer, id))
            .collect::<AHashMap<_, _>>();
        let live_nodes = nodes.len();
        Self {
            k,
            nodes,
            index,
            live_nodes,
        }
    }

    /// Set every extension bit for which the (k-1)-overlapping neighbour exists.
    ///
    /// Runs in parallel over the arena; each worker only writes its own nodes.
    pub(crate) fn link_overlaps(&mut self) {
        let k = self.k;
        let index = &self.index;
        let masks: Vec<Extensions> = self
            .nodes
            .par_iter()
            .map(|node| {
                let mut extensions = Extensions::default();
                for base in 0u8..4 {
                    let right = node.kmer.extend_right(base, k).canonical(k).0;
                    if index.contains_key(&right) {
                        extensions.set(Side::Right, base);
                    }
                    let left = node.kmer.extend_left(base, k).canonical(k).0;
                    if index.contains_key(&left) {
                        extensions.set(Side::Left, base);
                    }
                }
                extensions
            })
            .collect();

        for (node, mask) in self.nodes.iter_mut().zip(masks) {
            node.extensions = mask;
        }
    }

    pub fn kmer_length(&self) -> usize {
        self.k
    }

    /// Number of live (unmarked) nodes
    pub fn node_count(&self) -> usize {
        self.live_nodes
    }

    /// Number of extension bits over live nodes; each undirected link counts once per end
    pub fn edge_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| !n.marked)
            .map(|n| n.extensions.total())
            .sum()
    }

    /// Arena size including marked nodes
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &DeBruijnNode {
        &self.nodes[id]
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        id < self.nodes.len() && !self.nodes[id].marked
    }

    /// Ids of live nodes in arena order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.marked)
            .map(|(id, _)| id)
    }

    pub fn live_node_ids(&self) -> Vec<NodeId> {
        self.node_ids().collect()
    }

    pub fn total_coverage(&self) -> u64 {
        self.nodes
            .iter()
            .filter(|n| !n.marked)
            .map(|n| n.coverage as u64)
            .sum()
    }

    /// Locate a k-mer on either strand. Returns the node and whether `kmer` reads it forward.
    pub fn find(&self, kmer: PackedKmer) -> Option<OrientedNode> {
        let (canonical, forward) = kmer.canonical(self.k);
        let id = *self.index.get(&canonical)?;
        if self.nodes[id].marked {
            return None;
        }
        Some(OrientedNode::new(id, forward))
    }

    pub fn node_sequence(&self, id: NodeId) -> String {
        self.nodes[id].kmer.to_sequence(self.k)
    }

    /// K-mer as read along the given orientation
    pub fn oriented_kmer(&self, node: OrientedNode) -> PackedKmer {
        let kmer = self.nodes[node.id].kmer;
        if node.forward {
            kmer
        } else {
            kmer.reverse_complement(self.k)
        }
    }

    fn neighbor_kmer(&self, kmer: PackedKmer, side: Side, base: u8) -> PackedKmer {
        match side {
            Side::Right => kmer.extend_right(base, self.k),
            Side::Left => kmer.extend_left(base, self.k),
        }
    }

    /// Live neighbours reachable through the extension bits on `side`
    pub fn neighbors(&self, id: NodeId, side: Side) -> Vec<Neighbor> {
        let node = &self.nodes[id];
        node.extensions
            .bases(side)
            .filter_map(|base| {
                let (canonical, forward) = self
                    .neighbor_kmer(node.kmer, side, base)
                    .canonical(self.k);
                let neighbor = *self.index.get(&canonical)?;
                if self.nodes[neighbor].marked {
                    return None;
                }
                Some(Neighbor {
                    id: neighbor,
                    same_orientation: forward,
                    base,
                })
            })
            .collect()
    }

    /// Nodes following `node` along its strand
    pub fn successors(&self, node: OrientedNode) -> Vec<OrientedNode> {
        let side = if node.forward { Side::Right } else { Side::Left };
        self.neighbors(node.id, side)
            .into_iter()
            .map(|n| OrientedNode::new(n.id, node.forward == n.same_orientation))
            .collect()
    }

    /// Nodes preceding `node` along its strand
    pub fn predecessors(&self, node: OrientedNode) -> Vec<OrientedNode> {
        self.successors(node.flip())
            .into_iter()
            .map(OrientedNode::flip)
            .collect()
    }

    pub fn out_degree(&self, node: OrientedNode) -> usize {
        let side = if node.forward { Side::Right } else { Side::Left };
        self.nodes[node.id].extensions.count(side)
    }

    pub fn in_degree(&self, node: OrientedNode) -> usize {
        self.out_degree(node.flip())
    }

    /// Extension on the neighbour that points back at a node with k-mer `kmer`
    fn back_reference(&self, kmer: PackedKmer, side: Side, same_orientation: bool) -> (Side, u8) {
        match (side, same_orientation) {
            (Side::Right, true) => (Side::Left, kmer.first_base(self.k)),
            (Side::Right, false) => (Side::Right, complement_code(kmer.first_base(self.k))),
            (Side::Left, true) => (Side::Right, kmer.last_base()),
            (Side::Left, false) => (Side::Left, complement_code(kmer.last_base())),
        }
    }

    /// Clear one extension of `id` together with its mirror on the neighbour.
    pub fn remove_extension(&mut self, id: NodeId, side: Side, base: u8) {
        let kmer = self.nodes[id].kmer;
        let (canonical, forward) = self.neighbor_kmer(kmer, side, base).canonical(self.k);
        self.nodes[id].extensions.clear(side, base);
        if let Some(&neighbor) = self.index.get(&canonical) {
            let (back_side, back_base) = self.back_reference(kmer, side, forward);
            self.nodes[neighbor].extensions.clear(back_side, back_base);
        }
    }

    /// Mark nodes as deleted and unlink them from their neighbours.
    ///
    /// Returns how many nodes were newly removed.
    pub fn remove_nodes(&mut self, ids: &[NodeId]) -> usize {
        let mut removed = 0;
        for &id in ids {
            if id >= self.nodes.len() || self.nodes[id].marked {
                continue;
            }
            for side in [Side::Left, Side::Right] {
                let bases: Vec<u8> = self.nodes[id].extensions.bases(side).collect();
                for base in bases {
                    self.remove_extension(id, side, base);
                }
            }
            self.nodes[id].marked = true;
            self.nodes[id].extensions = Extensions::default();
            removed += 1;
        }
        self.live_nodes -= removed;
        removed
    }

    /// Drop marked nodes from the arena. Node ids change.
    pub fn compact(&mut self) {
        self.nodes.retain(|n| !n.marked);
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(id, node)| (node.kmer, id))
            .collect();
        self.live_nodes = self.nodes.len();
    }

    /// Count extension bits without a live, mirrored counterpart
    pub fn symmetry_violations(&self) -> usize {
        self.nodes
            .par_iter()
            .filter(|node| !node.marked)
            .map(|node| {
                let mut violations = 0;
                for side in [Side::Left, Side::Right] {
                    for base in node.extensions.bases(side) {
                        let (canonical, forward) = self
                            .neighbor_kmer(node.kmer, side, base)
                            .canonical(self.k);
                        let mirrored = self.index.get(&canonical).is_some_and(|&neighbor| {
                            let (back_side, back_base) =
                                self.back_reference(node.kmer, side, forward);
                            !self.nodes[neighbor].marked
                                && self.nodes[neighbor].extensions.has(back_side, back_base)
                        });
                        if !mirrored {
                            violations += 1;
                        }
                    }
                }
                violations
            })
            .sum()
    }

    pub fn is_symmetric(&self) -> bool {
        self.symmetry_violations() == 0
    }
}
