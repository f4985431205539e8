use thiserror::Error;

/// Failures of the hashing primitive.
///
/// Messages carry detail for operators; they are never shown to callers.
#[derive(Debug, Error)]
pub enum HashError {
  #[error("invalid hash parameters: {0}")]
  InvalidParams(String),

  #[error("failed to generate salt: {0}")]
  Salt(String),

  #[error("hashing failed: {0}")]
  Hashing(String),

  #[error("stored digest is malformed: {0}")]
  MalformedDigest(String),

  #[error("verification failed: {0}")]
  Verification(String),

  #[error("hashing task did not complete: {0}")]
  Join(String),
}

/// Failures while generating a new credential.
#[derive(Debug, Error)]
pub enum GenerateError {
  #[error("failed to get random bytes: {0}")]
  Entropy(String),
}
