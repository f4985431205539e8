use serde::{Deserialize, Serialize};

/// Where user records live.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
  /// SQLite connection URL. When unset the binary derives one from its data
  /// directory.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
  /// Upper bound on pooled connections.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_connections: Option<u32>,
}
