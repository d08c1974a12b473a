use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::info;

use crate::assembly::graph::{DeBruijnGraph, NodeId, OrientedNode};
use crate::assembly::simplification::{DeBruijnPath, GraphErrorPurger};

/// Collapses bubbles: alternate paths that leave one node and rejoin at another.
///
/// From every node with more than one outgoing link, each branch is followed
/// until it reaches a node with more than one incoming link. Branches ending on
/// the same node form a group; the path with the highest mean coverage survives
/// and the interior nodes of the others are removed. Equal coverage is settled
/// by the lowest canonical k-mer inside the path, which does not depend on the
/// side the bubble was discovered from.
#[derive(Debug, Clone)]
pub struct RedundantPathPurger {
    length_threshold: usize,
}

impl RedundantPathPurger {
    pub fn new(length_threshold: usize) -> Self {
        Self { length_threshold }
    }

    /// Paths from `start` through each branch to the first merge node.
    ///
    /// Paths reaching the length threshold, dead ends and loops are dropped.
    fn trace_alternate_paths(
        &self,
        graph: &DeBruijnGraph,
        start: OrientedNode,
    ) -> Vec<Vec<OrientedNode>> {
        let mut active: Vec<Vec<OrientedNode>> = graph
            .successors(start)
            .into_iter()
            .map(|next| vec![start, next])
            .collect();
        let mut finished = Vec::new();

        while !active.is_empty() {
            let mut extended = Vec::new();
            for path in active {
                if path.len() >= self.length_threshold {
                    continue;
                }
                let Some(&last) = path.last() else {
                    continue;
                };
                if graph.in_degree(last) > 1 {
                    finished.push(path);
                    continue;
                }
                for next in graph.successors(last) {
                    if path.iter().any(|n| n.id == next.id) {
                        continue;
                    }
                    let mut longer = path.clone();
                    longer.push(next);
                    extended.push(longer);
                }
            }
            active = extended;
        }

        finished
    }

    fn detect_from(&self, graph: &DeBruijnGraph, start: OrientedNode) -> Vec<DeBruijnPath> {
        let mut groups: BTreeMap<NodeId, Vec<DeBruijnPath>> = BTreeMap::new();
        for path in self.trace_alternate_paths(graph, start) {
            let Some(end) = path.last().map(|n| n.id) else {
                continue;
            };
            groups
                .entry(end)
                .or_default()
                .push(DeBruijnPath::new(path.iter().map(|n| n.id).collect()));
        }

        let mut errors = Vec::new();
        for paths in groups.into_values().filter(|g| g.len() > 1) {
            let Some(best) = paths
                .iter()
                .min_by(|a, b| compare_paths(graph, a, b))
                .cloned()
            else {
                continue;
            };
            for path in paths.iter().filter(|&p| *p != best) {
                let interior: Vec<NodeId> = path.nodes[1..path.len() - 1]
                    .iter()
                    .copied()
                    .filter(|&id| !best.contains(id))
                    .collect();
                if !interior.is_empty() {
                    errors.push(DeBruijnPath::new(interior));
                }
            }
        }
        errors
    }
}

/// Better path first: higher mean coverage, then lowest interior node, then node order
fn compare_paths(graph: &DeBruijnGraph, a: &DeBruijnPath, b: &DeBruijnPath) -> Ordering {
    // Cross-multiplied to compare means without rounding
    let lhs = a.total_coverage(graph) * b.len() as u64;
    let rhs = b.total_coverage(graph) * a.len() as u64;
    rhs.cmp(&lhs)
        .then_with(|| interior_min(a).cmp(&interior_min(b)))
        .then_with(|| a.nodes.cmp(&b.nodes))
}

fn interior_min(path: &DeBruijnPath) -> Option<NodeId> {
    if path.len() < 3 {
        return None;
    }
    path.nodes[1..path.len() - 1].iter().copied().min()
}

impl GraphErrorPurger for RedundantPathPurger {
    fn name(&self) -> &'static str {
        "RedundantPathsPurger"
    }

    fn length_threshold(&self) -> usize {
        self.length_threshold
    }

    fn set_length_threshold(&mut self, threshold: usize) {
        self.length_threshold = threshold;
    }

    fn detect_errors(&self, graph: &DeBruijnGraph) -> Vec<DeBruijnPath> {
        graph
            .live_node_ids()
            .into_par_iter()
            .flat_map_iter(|id| {
                [true, false]
                    .into_iter()
                    .map(move |forward| OrientedNode::new(id, forward))
                    .filter(|&start| graph.out_degree(start) > 1)
                    .flat_map(|start| self.detect_from(graph, start))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn purge(&self, graph: &mut DeBruijnGraph, max_rounds: usize) -> usize {
        let mut removed = 0;
        for _ in 0..max_rounds {
            let errors = self.detect_errors(graph);
            if errors.is_empty() {
                break;
            }
            let count = self.remove_errors(graph, &errors);
            if count == 0 {
                break;
            }
            removed += count;
        }
        info!(
            "Redundant path purge removed {} nodes, {} remain",
            removed,
            graph.node_count()
        );
        removed
    }
}
