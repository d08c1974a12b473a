pub mod configuration;
pub mod logging;

pub use configuration::{
    validate_kmer_length, AssemblerConfiguration, AssemblyError, AssemblyParameters,
    BuildStrategy, ConfigurationManager, LibraryConfig, LoggingConfig, PerformanceConfig,
    ScaffoldParameters,
};
pub use logging::init_logging;
