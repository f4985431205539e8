use crate::error::GenerateError;
use crate::secret::SecretString;

/// Source of new opaque credentials.
pub trait CredentialGenerator: Send + Sync {
  fn generate(&self) -> Result<SecretString, GenerateError>;
}

/// Generates random (version 4) UUIDs in hyphenated form, 36 characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl CredentialGenerator for UuidGenerator {
  fn generate(&self) -> Result<SecretString, GenerateError> {
    let mut bytes = [0u8; 16];
    getrandom::fill(&mut bytes).map_err(|e| GenerateError::Entropy(e.to_string()))?;

    let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
    Ok(SecretString::new(uuid.hyphenated().to_string()))
  }
}
