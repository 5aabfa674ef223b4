//! Layered configuration.
//!
//! Settings are merged with `figment`, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A TOML file: the `--config` path, or `config.toml` in the platform
//!    config directory when it exists
//! 3. Environment variables prefixed `DUPFIND_` (e.g. `DUPFIND_MAX_DISTANCE=8`)
//!
//! Command-line flags are applied on top by [`crate::cli::RunPlan`].

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duplicates::similar::MAX_DISTANCE;
use crate::scanner::perceptual::DEFAULT_IMAGE_EXTENSIONS;
use crate::scanner::{HashAlgorithm, PerceptualAlgorithm, DEFAULT_IGNORE_DIRNAMES};

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "DUPFIND_";

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or has a wrong type.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// A value is outside its allowed range.
    #[error("Invalid value for {key}: {reason}")]
    OutOfRange {
        /// Configuration key
        key: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory names never descended into.
    pub ignore_dirnames: Vec<String>,
    /// Extensions treated as images in image mode.
    pub image_extensions: Vec<String>,
    /// Content hash for exact mode.
    pub hash_algorithm: HashAlgorithm,
    /// Fingerprint algorithm for image mode.
    pub perceptual_algorithm: PerceptualAlgorithm,
    /// Highest distance level reported in image mode.
    pub max_distance: u32,
    /// Yield symlinks to regular files.
    pub include_symlinks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignore_dirnames: DEFAULT_IGNORE_DIRNAMES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            image_extensions: DEFAULT_IMAGE_EXTENSIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            hash_algorithm: HashAlgorithm::default(),
            perceptual_algorithm: PerceptualAlgorithm::default(),
            max_distance: MAX_DISTANCE,
            include_symlinks: false,
        }
    }
}

impl Config {
    /// Load configuration from all layers.
    ///
    /// # Arguments
    ///
    /// * `path` - Explicit config file; must exist when given
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the explicit file is missing, a layer does not
    /// parse, or a value is out of range.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) if !p.is_file() => return Err(ConfigError::NotFound(p.to_path_buf())),
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path().filter(|p| p.is_file()),
        };

        if let Some(ref f) = file {
            log::debug!("Loading config from {}", f.display());
        }
        let config: Config = Self::figment(file.as_deref())
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// The merged providers: defaults, optional TOML file, environment.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// `config.toml` in the platform configuration directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "dupfind").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] for a bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_distance > MAX_DISTANCE {
            return Err(ConfigError::OutOfRange {
                key: "max_distance",
                reason: format!("{} exceeds {}", self.max_distance, MAX_DISTANCE),
            });
        }
        if self.image_extensions.is_empty() {
            return Err(ConfigError::OutOfRange {
                key: "image_extensions",
                reason: "list is empty".to_string(),
            });
        }
        Ok(())
    }
}
