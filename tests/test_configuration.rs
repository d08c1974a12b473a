//! Configuration loading from files and the environment

use std::io::Write;

use denovo_forge::utils::{AssemblyError, BuildStrategy, ConfigurationManager};
use denovo_forge::{CloneLibrary, DeNovoAssembler, SequenceRead};
use tempfile::NamedTempFile;

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_toml_file() {
    let file = toml_file(
        r#"
[assembly]
kmer_length = 21
dangle_threshold = 4
build_strategy = "shared_index"

[scaffold]
enabled = true
depth = 6

[[scaffold.libraries]]
name = "5K"
mean_length = 5000.0
standard_deviation = 500.0

[performance]
num_threads = 2
"#,
    );

    let manager = ConfigurationManager::from_file(file.path()).unwrap();
    let config = manager.config();
    assert_eq!(manager.config_path(), Some(file.path()));
    assert_eq!(config.assembly.kmer_length, Some(21));
    assert_eq!(config.assembly.dangle_threshold, Some(4));
    assert_eq!(config.assembly.build_strategy, BuildStrategy::SharedIndex);
    assert_eq!(config.assembly.redundant_path_length_threshold, None);
    assert!(config.scaffold.enabled);
    assert_eq!(config.scaffold.depth, 6);
    assert_eq!(config.scaffold.redundancy, 2);
    assert_eq!(config.performance.num_threads, Some(2));

    let library = CloneLibrary::from_config(&config.scaffold.libraries).unwrap();
    assert_eq!(library.get("5k").unwrap().mean_length, 5000.0);
    assert!(library.get("2K").is_some());
}

#[test]
fn test_invalid_file_rejected() {
    let file = toml_file("[assembly]\nkmer_length = 22\n");
    let err = ConfigurationManager::from_file(file.path()).err().unwrap();
    assert!(matches!(err, AssemblyError::InvalidKmerLength { k: 22, .. }));
}

#[test]
fn test_malformed_file_is_configuration_error() {
    let file = toml_file("[assembly\nkmer_length = ");
    let err = ConfigurationManager::from_file(file.path()).err().unwrap();
    assert!(matches!(err, AssemblyError::ConfigurationError { .. }));
}

#[test]
fn test_environment_overrides_file() {
    let file = toml_file("[scaffold]\ndepth = 4\n");
    std::env::set_var("DENOVO__SCAFFOLD__DEPTH", "8");
    let manager = ConfigurationManager::from_file_with_env(file.path());
    std::env::remove_var("DENOVO__SCAFFOLD__DEPTH");

    assert_eq!(manager.unwrap().config().scaffold.depth, 8);
}

#[test]
fn test_loaded_configuration_drives_assembler() {
    let file = toml_file("[assembly]\nkmer_length = 5\n\n[performance]\nnum_threads = 1\n");
    let config = ConfigurationManager::from_file(file.path())
        .unwrap()
        .into_config();

    let reads = SequenceRead::from_sequences(&["ATGCC", "TCCTA", "CCTATC", "TGCCTCC", "CCTCCT"]);
    let result = DeNovoAssembler::new(config).unwrap().assemble(&reads).unwrap();
    assert_eq!(result.stats.kmer_length, 5);
    assert_eq!(result.contigs.len(), 1);
}
