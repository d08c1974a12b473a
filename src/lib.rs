//! # DenovoForge - Parallel De Bruijn Graph Assembler
//!
//! Reconstructs contigs from short, unordered sequencing reads without a
//! reference, then orders and orients them into scaffolds using mate-pair
//! evidence. Graph construction, simplification, read mapping and distance
//! estimation all run on a rayon worker pool.

pub mod assembly;
pub mod core;
pub mod scaffold;
pub mod utils;

// Re-export commonly used types at crate level
pub use crate::assembly::{AssemblyResult, DeNovoAssembler};
pub use crate::core::data_structures::*;
pub use crate::scaffold::CloneLibrary;
pub use crate::utils::configuration::{AssemblerConfiguration, AssemblyError, ConfigurationManager};

/// Result type used throughout the crate
pub type Result<T> = anyhow::Result<T>;

/// Error type used throughout the crate
pub type Error = anyhow::Error;
