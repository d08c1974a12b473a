//! Read mapping and scaffolding
//!
//! Reads are mapped back onto contigs, mate pairs turned into distance edges
//! between contigs, and the resulting scaffold graph resolved into oriented,
//! gap-annotated contig chains.

pub mod builder;
pub mod clone_library;
pub mod distance;
pub mod mate_pair_mapper;
pub mod orientation_filter;
pub mod path_purger;
pub mod read_mapper;
pub mod trace_path;

pub use builder::{GraphScaffoldBuilder, ScaffoldBuilder, ScaffoldOutput};
pub use clone_library::{CloneLibrary, CloneLibraryInformation};
pub use distance::{ContigPairDistance, DistanceBundle, DistanceCalculator};
pub use mate_pair_mapper::{ContigMatePairs, MatePairMapper, ValidMatePair};
pub use orientation_filter::OrientationBasedMatePairFilter;
pub use path_purger::PathPurger;
pub use read_mapper::{ReadContigMapper, ReadMappings};
pub use trace_path::{OrientedContig, ScaffoldGraph, ScaffoldPath, TracePath};
