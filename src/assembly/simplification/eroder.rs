use rayon::prelude::*;
use tracing::{debug, info};

use crate::assembly::graph::{DeBruijnGraph, NodeId, OrientedNode, Side};
use crate::assembly::simplification::{DeBruijnPath, GraphErrorPurger};

/// Removes tips: dead-end branches shorter than the length threshold.
///
/// A trace starts at a node without extensions on one side and walks away from
/// that side through unambiguous nodes. It stops before a node with several
/// incoming links, or after a node with several outgoing links. Traces that
/// reach the threshold are real sequence ends and are kept.
///
/// With an erosion threshold set, low-coverage dead-end nodes are peeled off
/// first, one layer at a time.
#[derive(Debug, Clone)]
pub struct Eroder {
    length_threshold: usize,
    erode_threshold: Option<u32>,
}

impl Eroder {
    pub fn new(length_threshold: usize) -> Self {
        Self {
            length_threshold,
            erode_threshold: None,
        }
    }

    pub fn with_erosion(mut self, erode_threshold: u32) -> Self {
        self.erode_threshold = Some(erode_threshold);
        self
    }

    pub fn erode_threshold(&self) -> Option<u32> {
        self.erode_threshold
    }

    /// Repeatedly remove dead-end nodes with coverage below the erosion threshold.
    pub fn erode(&self, graph: &mut DeBruijnGraph, max_rounds: usize) -> usize {
        let Some(threshold) = self.erode_threshold else {
            return 0;
        };
        let mut removed = 0;
        for _ in 0..max_rounds {
            let g = &*graph;
            let ends: Vec<NodeId> = g
                .live_node_ids()
                .into_par_iter()
                .filter(|&id| {
                    let node = g.node(id);
                    let dead_end = node.extensions.count(Side::Left) == 0
                        || node.extensions.count(Side::Right) == 0;
                    dead_end && (node.coverage as u32) < threshold
                })
                .collect();
            if ends.is_empty() {
                break;
            }
            removed += graph.remove_nodes(&ends);
        }
        if removed > 0 {
            info!("Eroded {} low-coverage end nodes (threshold {})", removed, threshold);
        }
        removed
    }

    fn detect_with_threshold(&self, graph: &DeBruijnGraph, threshold: usize) -> Vec<DeBruijnPath> {
        graph
            .live_node_ids()
            .into_par_iter()
            .filter_map(|id| {
                let extensions = graph.node(id).extensions;
                let left = extensions.count(Side::Left);
                let right = extensions.count(Side::Right);
                match (left, right) {
                    (0, 0) => Some(DeBruijnPath::new(vec![id])),
                    (0, _) => trace_dangling_link(graph, OrientedNode::new(id, true), threshold),
                    (_, 0) => trace_dangling_link(graph, OrientedNode::new(id, false), threshold),
                    _ => None,
                }
            })
            .collect()
    }

    fn purge_round(&self, graph: &mut DeBruijnGraph, threshold: usize) -> usize {
        let links = self.detect_with_threshold(graph, threshold);
        if links.is_empty() {
            return 0;
        }
        let removed = self.remove_errors(graph, &links);
        debug!(
            "Dangling links at threshold {}: {} links, {} nodes removed",
            threshold,
            links.len(),
            removed
        );
        removed
    }
}

/// Walk from a dead end. `None` when the link is at least `threshold` long.
fn trace_dangling_link(
    graph: &DeBruijnGraph,
    start: OrientedNode,
    threshold: usize,
) -> Option<DeBruijnPath> {
    let mut link: Vec<NodeId> = Vec::new();
    let mut current = start;

    loop {
        if link.contains(&current.id) {
            break;
        }
        let successors = graph.successors(current);
        if !successors.is_empty() && graph.in_degree(current) > 1 {
            break;
        }
        if link.len() >= threshold {
            return None;
        }
        link.push(current.id);
        if successors.len() != 1 {
            break;
        }
        current = successors[0];
    }

    Some(DeBruijnPath::new(link))
}

impl GraphErrorPurger for Eroder {
    fn name(&self) -> &'static str {
        "DanglingLinksPurger"
    }

    fn length_threshold(&self) -> usize {
        self.length_threshold
    }

    fn set_length_threshold(&mut self, threshold: usize) {
        self.length_threshold = threshold;
    }

    fn set_coverage_threshold(&mut self, threshold: Option<u32>) {
        self.erode_threshold = threshold;
    }

    fn detect_errors(&self, graph: &DeBruijnGraph) -> Vec<DeBruijnPath> {
        self.detect_with_threshold(graph, self.length_threshold)
    }

    /// Erosion, then one round per threshold from 1 up to the configured one,
    /// then rounds at the configured threshold until nothing changes.
    fn purge(&self, graph: &mut DeBruijnGraph, max_rounds: usize) -> usize {
        let mut removed = self.erode(graph, max_rounds);

        for threshold in 1..=self.length_threshold {
            removed += self.purge_round(graph, threshold);
        }
        for _ in 0..max_rounds {
            let count = self.purge_round(graph, self.length_threshold);
            if count == 0 {
                break;
            }
            removed += count;
        }

        info!(
            "Dangling link purge removed {} nodes, {} remain",
            removed,
            graph.node_count()
        );
        removed
    }
}
