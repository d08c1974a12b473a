//! Contig extraction from a simplified graph
//!
//! Every live node belongs to exactly one simple path. A path is grown in both
//! directions from its lowest unvisited node while the next node is the only
//! successor of the current one and has no other predecessor.

use ahash::AHashSet;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::assembly::graph::{DeBruijnGraph, NodeId, OrientedNode};
use crate::core::data_structures::{Contig, ContigType};
use crate::core::kmer::decode_base;

/// Turns a simplified graph into contigs
pub trait ContigBuilder: Send + Sync {
    fn build_contigs(&self, graph: &DeBruijnGraph) -> Vec<Contig>;
}

/// Removes graph nodes of whole simple paths whose mean coverage is too low
pub trait LowCoverageContigPurger: Send + Sync {
    /// Returns the number of nodes removed.
    fn remove_low_coverage_contigs(&self, graph: &mut DeBruijnGraph, threshold: f64) -> usize;
}

/// Oriented node walk behind one contig
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContigPath {
    pub nodes: Vec<OrientedNode>,
    pub circular: bool,
}

impl ContigPath {
    pub fn sequence(&self, graph: &DeBruijnGraph) -> String {
        let k = graph.kmer_length();
        let Some(first) = self.nodes.first() else {
            return String::new();
        };
        let mut sequence = graph.oriented_kmer(*first).to_sequence(k);
        sequence.reserve(self.nodes.len() - 1);
        for node in &self.nodes[1..] {
            sequence.push(decode_base(graph.oriented_kmer(*node).last_base()) as char);
        }
        sequence
    }

    pub fn average_coverage(&self, graph: &DeBruijnGraph) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        let total: u64 = self
            .nodes
            .iter()
            .map(|n| graph.node(n.id).coverage as u64)
            .sum();
        total as f64 / self.nodes.len() as f64
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimplePathContigBuilder;

impl SimplePathContigBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Successor of `node` when the link between them is unbranched on both ends
    fn next_unique(graph: &DeBruijnGraph, node: OrientedNode) -> Option<OrientedNode> {
        let successors = graph.successors(node);
        if successors.len() != 1 {
            return None;
        }
        let next = successors[0];
        if next.id == node.id || graph.in_degree(next) != 1 {
            return None;
        }
        Some(next)
    }

    /// All maximal simple paths, ordered by their lowest start node
    pub fn find_paths(&self, graph: &DeBruijnGraph) -> Vec<ContigPath> {
        let mut visited: AHashSet<NodeId> = AHashSet::with_capacity(graph.node_count());
        let mut paths = Vec::new();

        for id in graph.node_ids() {
            if !visited.insert(id) {
                continue;
            }
            let seed = OrientedNode::new(id, true);
            let mut nodes = vec![seed];
            let mut circular = false;

            let mut current = seed;
            while let Some(next) = Self::next_unique(graph, current) {
                if next.id == id {
                    circular = true;
                    break;
                }
                if !visited.insert(next.id) {
                    break;
                }
                nodes.push(next);
                current = next;
            }

            if !circular {
                let mut prefix = Vec::new();
                let mut current = seed.flip();
                while let Some(next) = Self::next_unique(graph, current) {
                    if !visited.insert(next.id) {
                        break;
                    }
                    prefix.push(next.flip());
                    current = next;
                }
                prefix.reverse();
                prefix.extend(nodes);
                nodes = prefix;
            }

            paths.push(ContigPath { nodes, circular });
        }

        debug!("Found {} simple paths", paths.len());
        paths
    }
}

impl ContigBuilder for SimplePathContigBuilder {
    fn build_contigs(&self, graph: &DeBruijnGraph) -> Vec<Contig> {
        let paths = self.find_paths(graph);
        let contigs: Vec<Contig> = paths
            .par_iter()
            .enumerate()
            .map(|(id, path)| {
                let contig_type = if path.circular {
                    ContigType::Circular
                } else {
                    ContigType::Linear
                };
                Contig::new(
                    id,
                    path.sequence(graph),
                    path.average_coverage(graph),
                    contig_type,
                )
            })
            .collect();

        info!(
            "Built {} contigs ({} circular)",
            contigs.len(),
            contigs
                .iter()
                .filter(|c| c.contig_type == ContigType::Circular)
                .count()
        );
        contigs
    }
}

impl LowCoverageContigPurger for SimplePathContigBuilder {
    fn remove_low_coverage_contigs(&self, graph: &mut DeBruijnGraph, threshold: f64) -> usize {
        let doomed: Vec<NodeId> = self
            .find_paths(graph)
            .into_iter()
            .filter(|path| path.average_coverage(graph) < threshold)
            .flat_map(|path| path.nodes.into_iter().map(|n| n.id))
            .collect();
        let removed = graph.remove_nodes(&doomed);
        info!(
            "Removed {} nodes of contigs with coverage below {:.2}",
            removed, threshold
        );
        removed
    }
}
