use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::core::kmer::MAX_KMER_LENGTH;

/// Assembler configuration
///
/// Every threshold left as `None` is derived from the data at run time
/// (see `DeNovoAssembler`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfiguration {
    pub assembly: AssemblyParameters,
    pub scaffold: ScaffoldParameters,
    pub performance: PerformanceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyParameters {
    /// Odd k-mer length; estimated from read lengths when unset
    pub kmer_length: Option<usize>,
    /// Longest dangling link (in nodes) that is purged; defaults to k + 1
    pub dangle_threshold: Option<usize>,
    /// Longest alternate path (in nodes) considered a bubble; defaults to 3 * (k + 1)
    pub redundant_path_length_threshold: Option<usize>,
    pub erosion_enabled: bool,
    /// Dead-end nodes below this coverage are eroded; estimated when unset
    pub erosion_threshold: Option<u32>,
    pub low_coverage_contig_removal: bool,
    /// Contigs whose mean coverage falls below this are purged; estimated when unset
    pub contig_coverage_threshold: Option<f64>,
    pub build_strategy: BuildStrategy,
    /// Cap on fixed-point simplification rounds
    pub max_simplification_rounds: usize,
    /// Attach full-overlap read placements to the emitted contigs
    pub record_read_placements: bool,
}

impl Default for AssemblyParameters {
    fn default() -> Self {
        Self {
            kmer_length: None,
            dangle_threshold: None,
            redundant_path_length_threshold: None,
            erosion_enabled: false,
            erosion_threshold: None,
            low_coverage_contig_removal: false,
            contig_coverage_threshold: None,
            build_strategy: BuildStrategy::ThreadLocalMerge,
            max_simplification_rounds: 64,
            record_read_placements: true,
        }
    }
}

/// How concurrent k-mer insertion is organised during graph construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStrategy {
    /// Per-worker fragments merged by key
    ThreadLocalMerge,
    /// One concurrent index with per-shard locking
    SharedIndex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaffoldParameters {
    pub enabled: bool,
    /// Maximum number of hops of one scaffold walk
    pub depth: usize,
    /// Minimum supporting mate pairs for a scaffold edge
    pub redundancy: usize,
    /// Libraries added on top of the built-in clone library table
    pub libraries: Vec<LibraryConfig>,
}

impl Default for ScaffoldParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            depth: 10,
            redundancy: 2,
            libraries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    pub name: String,
    pub mean_length: f64,
    pub standard_deviation: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Worker threads; all cores when unset
    pub num_threads: Option<usize>,
}

impl PerformanceConfig {
    pub fn resolved_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. "info" or "denovo_forge=debug"
    pub level: String,
    /// "pretty" or "compact"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Custom error types for the assembler
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssemblyError {
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Validation error: {field} is invalid: {reason}")]
    ValidationError { field: String, reason: String },

    #[error("Invalid k-mer length {k}: {reason}")]
    InvalidKmerLength { k: usize, reason: String },

    #[error("Unknown clone library: {library}")]
    UnknownLibrary { library: String },

    #[error("Duplicate read id: {id}")]
    DuplicateReadId { id: String },
}

impl From<ConfigError> for AssemblyError {
    fn from(err: ConfigError) -> Self {
        AssemblyError::ConfigurationError {
            message: err.to_string(),
        }
    }
}

fn validation(field: &str, reason: &str) -> AssemblyError {
    AssemblyError::ValidationError {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Check a k-mer length against the packing and graph requirements.
pub fn validate_kmer_length(k: usize) -> Result<(), AssemblyError> {
    if k == 0 {
        return Err(AssemblyError::InvalidKmerLength {
            k,
            reason: "must be positive".to_string(),
        });
    }
    if k % 2 == 0 {
        return Err(AssemblyError::InvalidKmerLength {
            k,
            reason: "must be odd so that no k-mer is its own reverse complement".to_string(),
        });
    }
    if k > MAX_KMER_LENGTH {
        return Err(AssemblyError::InvalidKmerLength {
            k,
            reason: format!("must not exceed {MAX_KMER_LENGTH}"),
        });
    }
    Ok(())
}

impl AssemblerConfiguration {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), AssemblyError> {
        let assembly = &self.assembly;

        if let Some(k) = assembly.kmer_length {
            validate_kmer_length(k)?;
        }
        if assembly.dangle_threshold == Some(0) {
            return Err(validation("assembly.dangle_threshold", "must be positive"));
        }
        if let Some(threshold) = assembly.redundant_path_length_threshold {
            if threshold < 3 {
                return Err(validation(
                    "assembly.redundant_path_length_threshold",
                    "must span at least 3 nodes",
                ));
            }
        }
        if let Some(threshold) = assembly.contig_coverage_threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(validation(
                    "assembly.contig_coverage_threshold",
                    "must be a non-negative number",
                ));
            }
        }
        if assembly.max_simplification_rounds == 0 {
            return Err(validation(
                "assembly.max_simplification_rounds",
                "must be positive",
            ));
        }

        if self.scaffold.depth == 0 {
            return Err(validation("scaffold.depth", "must be at least 1"));
        }
        for library in &self.scaffold.libraries {
            if library.name.trim().is_empty() {
                return Err(validation("scaffold.libraries.name", "must not be empty"));
            }
            if !(library.mean_length >= 0.0) || !(library.standard_deviation >= 0.0) {
                return Err(validation(
                    "scaffold.libraries",
                    "mean length and standard deviation must be non-negative",
                ));
            }
        }

        if self.performance.num_threads == Some(0) {
            return Err(validation("performance.num_threads", "must be at least 1"));
        }

        Ok(())
    }
}

/// Configuration manager with validation and environment integration
pub struct ConfigurationManager {
    config: AssemblerConfiguration,
    config_path: Option<PathBuf>,
}

impl ConfigurationManager {
    pub const ENVIRONMENT_PREFIX: &'static str = "DENOVO";

    /// Create configuration manager with pure defaults (no file dependencies)
    pub fn new_with_defaults() -> Result<Self, AssemblyError> {
        Self::from_config(AssemblerConfiguration::default())
    }

    /// Wrap an in-memory configuration after validating it
    pub fn from_config(config: AssemblerConfiguration) -> Result<Self, AssemblyError> {
        config.validate()?;
        Ok(Self {
            config,
            config_path: None,
        })
    }

    /// Load configuration from specific file
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, AssemblyError> {
        let config_path = config_path.as_ref().to_path_buf();
        let config = Config::builder()
            .add_source(File::from(config_path.as_path()))
            .build()?
            .try_deserialize::<AssemblerConfiguration>()?;
        Self::finish_loading(config, config_path)
    }

    /// Load configuration from a file, then apply `DENOVO__SECTION__KEY` overrides
    pub fn from_file_with_env<P: AsRef<Path>>(config_path: P) -> Result<Self, AssemblyError> {
        let config_path = config_path.as_ref().to_path_buf();
        let config = Config::builder()
            .add_source(File::from(config_path.as_path()))
            .add_source(
                Environment::with_prefix(Self::ENVIRONMENT_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<AssemblerConfiguration>()?;
        Self::finish_loading(config, config_path)
    }

    fn finish_loading(
        config: AssemblerConfiguration,
        config_path: PathBuf,
    ) -> Result<Self, AssemblyError> {
        if let Err(e) = config.validate() {
            warn!("Rejected configuration {}: {}", config_path.display(), e);
            return Err(e);
        }
        info!("Loaded configuration from {}", config_path.display());
        Ok(Self {
            config,
            config_path: Some(config_path),
        })
    }

    pub fn config(&self) -> &AssemblerConfiguration {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn into_config(self) -> AssemblerConfiguration {
        self.config
    }
}
