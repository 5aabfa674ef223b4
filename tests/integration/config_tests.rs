use dupfind::config::{Config, ConfigError};
use dupfind::scanner::{HashAlgorithm, PerceptualAlgorithm};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();
    assert_eq!(config.hash_algorithm, HashAlgorithm::Blake3);
    assert_eq!(config.ignore_dirnames, vec![".git".to_string()]);
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
hash_algorithm = "id3-stripped"
perceptual_algorithm = "phash"
max_distance = 12
ignore_dirnames = [".git", ".hg", "node_modules"]
image_extensions = ["jpg", "png"]
"#,
    )
    .unwrap();

    let config = Config::load(Some(config_path.as_path())).unwrap();
    assert_eq!(config.hash_algorithm, HashAlgorithm::Id3Stripped);
    assert_eq!(config.perceptual_algorithm, PerceptualAlgorithm::Phash);
    assert_eq!(config.max_distance, 12);
    assert_eq!(config.ignore_dirnames.len(), 3);
    assert_eq!(config.image_extensions, vec!["jpg", "png"]);
    assert!(!config.include_symlinks);
}

#[test]
fn test_config_partial_toml_keeps_defaults() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("partial.toml");
    fs::write(&config_path, "include_symlinks = true\n").unwrap();

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract()
        .unwrap();
    assert!(config.include_symlinks);
    assert_eq!(config.max_distance, 99);
    assert_eq!(config.hash_algorithm, HashAlgorithm::Blake3);
}

#[test]
fn test_config_out_of_range_value() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "max_distance = 250\n").unwrap();

    let err = Config::load(Some(config_path.as_path())).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::OutOfRange {
            key: "max_distance",
            ..
        }
    ));
}

#[test]
fn test_config_invalid_type() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "hash_algorithm = \"md5\"\n").unwrap();

    let err = Config::load(Some(config_path.as_path())).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_config_env_overrides_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "perceptual_algorithm = \"ahash\"\n").unwrap();

    std::env::set_var("DUPFIND_TEST_PERCEPTUAL_ALGORITHM", "dhash");

    // A private prefix keeps this test from leaking into others that load config
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .merge(Env::prefixed("DUPFIND_TEST_").split("__"))
        .extract()
        .unwrap();
    assert_eq!(config.perceptual_algorithm, PerceptualAlgorithm::Dhash);

    std::env::remove_var("DUPFIND_TEST_PERCEPTUAL_ALGORITHM");
}

#[test]
fn test_config_figment_layers() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "max_distance = 4\n").unwrap();

    let config: Config = Config::figment(Some(config_path.as_path())).extract().unwrap();
    assert_eq!(config.max_distance, 4);
}
