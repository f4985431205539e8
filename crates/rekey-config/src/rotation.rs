use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for a single rotation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
  /// Deadline applied to each step (store calls, hashing). `None` disables it.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub step_timeout_ms: Option<u64>,
}

impl RotationConfig {
  pub fn step_timeout(&self) -> Option<Duration> {
    self.step_timeout_ms.map(Duration::from_millis)
  }
}
