use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::utils::configuration::{AssemblyError, LibraryConfig};

/// Insert-size statistics of one clone library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneLibraryInformation {
    pub name: String,
    pub mean_length: f64,
    pub standard_deviation: f64,
}

/// Lookup table from library name to insert statistics. Names are case-insensitive.
#[derive(Debug, Clone)]
pub struct CloneLibrary {
    libraries: AHashMap<String, CloneLibraryInformation>,
}

impl Default for CloneLibrary {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl CloneLibrary {
    pub fn empty() -> Self {
        Self {
            libraries: AHashMap::new(),
        }
    }

    /// Standard libraries: 0.5K, 2K, 10K and 50K
    pub fn with_defaults() -> Self {
        let mut library = Self::empty();
        for (name, mean, sd) in [
            ("0.5K", 500.0, 20.0),
            ("2K", 2000.0, 100.0),
            ("10K", 10000.0, 1000.0),
            ("50K", 65000.0, 13334.0),
        ] {
            library.insert(name, mean, sd);
        }
        library
    }

    /// Defaults plus the libraries of a configuration
    pub fn from_config(extra: &[LibraryConfig]) -> Result<Self, AssemblyError> {
        let mut library = Self::with_defaults();
        for entry in extra {
            library.add_library(&entry.name, entry.mean_length, entry.standard_deviation)?;
        }
        Ok(library)
    }

    fn insert(&mut self, name: &str, mean_length: f64, standard_deviation: f64) {
        self.libraries.insert(
            name.to_ascii_uppercase(),
            CloneLibraryInformation {
                name: name.to_string(),
                mean_length,
                standard_deviation,
            },
        );
    }

    /// Add or replace a library.
    pub fn add_library(
        &mut self,
        name: &str,
        mean_length: f64,
        standard_deviation: f64,
    ) -> Result<(), AssemblyError> {
        if name.trim().is_empty() {
            return Err(AssemblyError::ValidationError {
                field: "library.name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if !(mean_length >= 0.0) || !(standard_deviation >= 0.0) {
            return Err(AssemblyError::ValidationError {
                field: format!("library.{name}"),
                reason: "mean length and standard deviation must be non-negative".to_string(),
            });
        }
        self.insert(name, mean_length, standard_deviation);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CloneLibraryInformation> {
        self.libraries.get(&name.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}
