use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Argon2id cost parameters used when digesting new credentials.
///
/// Verification always uses the parameters encoded in the stored digest, so
/// changing these only affects credentials issued afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
  /// Memory cost in KiB.
  pub memory_kib: u32,
  /// Number of passes over memory.
  pub iterations: u32,
  /// Degree of parallelism (lanes).
  pub parallelism: u32,
}

impl HashingConfig {
  // Argon2 lower bound is 8 KiB per lane.
  const MIN_MEMORY_PER_LANE_KIB: u32 = 8;

  /// Check the parameters are within the ranges Argon2 accepts.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.parallelism == 0 {
      return Err(ConfigError::InvalidHashing {
        message: "parallelism must be at least 1".to_string(),
      });
    }
    if self.iterations == 0 {
      return Err(ConfigError::InvalidHashing {
        message: "iterations must be at least 1".to_string(),
      });
    }
    if self.memory_kib < Self::MIN_MEMORY_PER_LANE_KIB * self.parallelism {
      return Err(ConfigError::InvalidHashing {
        message: format!(
          "memory_kib must be at least {} for parallelism {}",
          Self::MIN_MEMORY_PER_LANE_KIB * self.parallelism,
          self.parallelism
        ),
      });
    }
    Ok(())
  }
}

impl Default for HashingConfig {
  /// OWASP's baseline Argon2id recommendation (19 MiB, 2 passes, 1 lane).
  fn default() -> Self {
    Self {
      memory_kib: 19 * 1024,
      iterations: 2,
      parallelism: 1,
    }
  }
}
