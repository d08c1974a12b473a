//! Graph simplification
//! ====================
//!
//! Error purgers remove sequencing artefacts from a built graph:
//!
//! - [`Eroder`]: low-coverage ends and short dangling links (tips)
//! - [`RedundantPathPurger`]: alternate paths between the same two nodes (bubbles)
//!
//! Each purger is a [`GraphErrorPurger`] so the assembler can swap implementations.
//! Low-coverage contig purging needs contig paths and lives with the contig builder.

pub mod eroder;
pub mod redundant_paths;

pub use eroder::Eroder;
pub use redundant_paths::RedundantPathPurger;

use tracing::debug;

use crate::assembly::graph::{DeBruijnGraph, NodeId};

/// An ordered run of graph nodes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeBruijnPath {
    pub nodes: Vec<NodeId>,
}

impl DeBruijnPath {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    pub fn total_coverage(&self, graph: &DeBruijnGraph) -> u64 {
        self.nodes
            .iter()
            .map(|&id| graph.node(id).coverage as u64)
            .sum()
    }

    pub fn average_coverage(&self, graph: &DeBruijnGraph) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        self.total_coverage(graph) as f64 / self.nodes.len() as f64
    }
}

/// Detects and removes one class of graph errors
pub trait GraphErrorPurger: Send + Sync {
    fn name(&self) -> &'static str;

    /// Longest error (in nodes) this purger will consider
    fn length_threshold(&self) -> usize;

    fn set_length_threshold(&mut self, threshold: usize);

    /// Coverage-aware purgers override this; others ignore it. `None` disables the coverage pass.
    fn set_coverage_threshold(&mut self, _threshold: Option<u32>) {}

    fn detect_errors(&self, graph: &DeBruijnGraph) -> Vec<DeBruijnPath>;

    /// Delete the nodes of `errors`. Returns the number of nodes removed.
    fn remove_errors(&self, graph: &mut DeBruijnGraph, errors: &[DeBruijnPath]) -> usize {
        let mut ids: Vec<NodeId> = errors.iter().flat_map(|p| p.nodes.iter().copied()).collect();
        ids.sort_unstable();
        ids.dedup();
        graph.remove_nodes(&ids)
    }

    /// Detect and remove until nothing is found or `max_rounds` is hit.
    fn purge(&self, graph: &mut DeBruijnGraph, max_rounds: usize) -> usize {
        let mut removed = 0;
        for round in 1..=max_rounds {
            let errors = self.detect_errors(graph);
            if errors.is_empty() {
                break;
            }
            let count = self.remove_errors(graph, &errors);
            debug!(
                "{} round {}: {} errors, {} nodes removed",
                self.name(),
                round,
                errors.len(),
                count
            );
            if count == 0 {
                break;
            }
            removed += count;
        }
        removed
    }
}
