//! Scaffold graph and greedy path tracing
//!
//! Nodes are contigs, edges the surviving contig-pair distances. An edge
//! `A -> B` says that B follows A when A is read forward; the edge records
//! whether B must be reverse-complemented. Walking A reverse-complemented
//! follows incoming edges backwards.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scaffold::distance::ContigPairDistance;

/// A contig read forward or reverse-complemented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrientedContig {
    pub contig: usize,
    pub forward: bool,
}

impl OrientedContig {
    pub fn new(contig: usize, forward: bool) -> Self {
        Self { contig, forward }
    }

    pub fn flip(self) -> Self {
        Self {
            contig: self.contig,
            forward: !self.forward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaffoldEdge {
    /// The target is reverse-complemented relative to the source
    pub flipped: bool,
    pub distance: f64,
    pub standard_deviation: f64,
    pub weight: usize,
}

/// Oriented step out of a contig
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaffoldStep {
    pub next: OrientedContig,
    pub distance: f64,
    pub standard_deviation: f64,
    pub weight: usize,
}

pub struct ScaffoldGraph {
    graph: DiGraph<usize, ScaffoldEdge>,
    nodes: Vec<NodeIndex>,
}

impl ScaffoldGraph {
    pub fn new(contig_count: usize, distances: &[ContigPairDistance]) -> Self {
        let mut graph = DiGraph::with_capacity(contig_count, distances.len());
        let nodes: Vec<NodeIndex> = (0..contig_count).map(|c| graph.add_node(c)).collect();
        for distance in distances {
            let (Some(&from), Some(&to)) = (nodes.get(distance.from), nodes.get(distance.to)) else {
                continue;
            };
            graph.add_edge(
                from,
                to,
                ScaffoldEdge {
                    flipped: distance.reverse_complemented(),
                    distance: distance.gap(),
                    standard_deviation: distance.standard_deviation(),
                    weight: distance.estimate.weight,
                },
            );
        }
        Self { graph, nodes }
    }

    pub fn contig_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Contigs that can follow `node` along its orientation
    pub fn successors(&self, node: OrientedContig) -> Vec<ScaffoldStep> {
        let Some(&index) = self.nodes.get(node.contig) else {
            return Vec::new();
        };
        let mut steps = Vec::new();

        if node.forward {
            for edge in self.graph.edges_directed(index, Direction::Outgoing) {
                let data = edge.weight();
                steps.push(ScaffoldStep {
                    next: OrientedContig::new(self.graph[edge.target()], !data.flipped),
                    distance: data.distance,
                    standard_deviation: data.standard_deviation,
                    weight: data.weight,
                });
            }
        }

        // X+ -> A(f) read backwards is A(!f)' -> X-, so A in orientation `flipped` leads to X-
        for edge in self.graph.edges_directed(index, Direction::Incoming) {
            let data = edge.weight();
            if node.forward == data.flipped {
                steps.push(ScaffoldStep {
                    next: OrientedContig::new(self.graph[edge.source()], false),
                    distance: data.distance,
                    standard_deviation: data.standard_deviation,
                    weight: data.weight,
                });
            }
        }

        steps
    }
}

/// Oriented contig chain with the gap before each contig after the first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaffoldPath {
    pub contigs: Vec<OrientedContig>,
    pub gaps: Vec<f64>,
}

impl ScaffoldPath {
    pub fn start(node: OrientedContig) -> Self {
        Self {
            contigs: vec![node],
            gaps: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.contigs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contigs.is_empty()
    }

    pub fn contains_contig(&self, contig: usize) -> bool {
        self.contigs.iter().any(|c| c.contig == contig)
    }

    pub fn push(&mut self, node: OrientedContig, gap: f64) {
        self.contigs.push(node);
        self.gaps.push(gap);
    }

    /// The same chain read from the other strand
    pub fn reversed(&self) -> Self {
        Self {
            contigs: self.contigs.iter().rev().map(|c| c.flip()).collect(),
            gaps: self.gaps.iter().rev().copied().collect(),
        }
    }
}

/// Greedy walker over the scaffold graph
#[derive(Debug, Clone)]
pub struct TracePath {
    depth: usize,
}

impl TracePath {
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }

    /// Walk from every contig in both orientations; keep walks of two or more contigs.
    pub fn find_paths(&self, graph: &ScaffoldGraph) -> Vec<ScaffoldPath> {
        let paths: Vec<ScaffoldPath> = (0..graph.contig_count())
            .into_par_iter()
            .flat_map_iter(|contig| {
                [true, false]
                    .into_iter()
                    .map(move |forward| OrientedContig::new(contig, forward))
                    .map(|start| self.trace(graph, start))
                    .filter(|path| path.len() > 1)
                    .collect::<Vec<_>>()
            })
            .collect();
        debug!("Traced {} scaffold paths (depth {})", paths.len(), self.depth);
        paths
    }

    fn trace(&self, graph: &ScaffoldGraph, start: OrientedContig) -> ScaffoldPath {
        let mut path = ScaffoldPath::start(start);
        let mut current = start;

        for _ in 0..self.depth {
            let mut candidates: Vec<ScaffoldStep> = graph
                .successors(current)
                .into_iter()
                .filter(|step| !path.contains_contig(step.next.contig))
                .collect();
            candidates.sort_by(|a, b| {
                b.weight
                    .cmp(&a.weight)
                    .then_with(|| a.standard_deviation.total_cmp(&b.standard_deviation))
                    .then_with(|| a.next.cmp(&b.next))
            });

            let Some(best) = candidates.first().copied() else {
                break;
            };
            if let Some(runner_up) = candidates.get(1) {
                if runner_up.weight == best.weight
                    && runner_up.standard_deviation == best.standard_deviation
                {
                    break;
                }
            }

            path.push(best.next, best.distance);
            current = best.next;
        }

        path
    }
}
