use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::database::DatabaseConfig;
use crate::error::ConfigError;
use crate::hashing::HashingConfig;
use crate::rotation::RotationConfig;

/// Top-level rekey configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub database: DatabaseConfig,
  pub hashing: HashingConfig,
  pub rotation: RotationConfig,
}

impl Config {
  /// Parse and validate a JSON document.
  pub fn from_json(content: &str) -> Result<Self, ConfigError> {
    let config: Config = serde_json::from_str(content)?;
    config.hashing.validate()?;
    Ok(config)
  }

  /// Read, parse and validate a JSON config file.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_json(&content)
  }
}
