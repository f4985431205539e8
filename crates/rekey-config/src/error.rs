use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file {path}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("invalid hashing parameters: {message}")]
  InvalidHashing { message: String },
}
