//! De Bruijn graph assembly
//!
//! `graph` holds the node arena and oriented navigation, `graph_construction`
//! builds it in parallel, `simplification` removes sequencing artefacts,
//! `contig_builder` walks simple paths and `assembler` ties the pipeline together.

pub mod assembler;
pub mod contig_builder;
pub mod graph;
pub mod graph_construction;
pub mod simplification;

pub use assembler::{estimate_kmer_length, AssemblyResult, DeNovoAssembler};
pub use contig_builder::{ContigBuilder, LowCoverageContigPurger, SimplePathContigBuilder};
pub use graph::{DeBruijnGraph, DeBruijnNode, NodeId, OrientedNode};
pub use graph_construction::{BuildSummary, GraphBuilder};
pub use simplification::{Eroder, GraphErrorPurger, RedundantPathPurger};
