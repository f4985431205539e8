use std::sync::Arc;

use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use rekey_config::HashingConfig;

use crate::error::HashError;
use crate::generator::{CredentialGenerator, UuidGenerator};
use crate::secret::SecretString;

/// One-way salted hashing of secrets.
///
/// Constant-time comparison is the implementation's responsibility.
#[async_trait]
pub trait SecretHasher: Send + Sync {
  /// Digest `plaintext` with a fresh random salt.
  async fn hash(&self, plaintext: &SecretString) -> Result<String, HashError>;

  /// Check `plaintext` against a digest produced by [`hash`](Self::hash).
  async fn verify(&self, plaintext: &SecretString, digest: &str) -> Result<bool, HashError>;

  /// Spend the same work as a real verification when there is no digest to
  /// check against, so a missing record is not observable through timing.
  async fn verify_decoy(&self, _plaintext: &SecretString) {}
}

/// Argon2id hasher producing PHC-formatted digests.
///
/// Hashing runs on the blocking thread pool so a slow digest never stalls
/// other steps on the async runtime.
#[derive(Clone)]
pub struct Argon2Hasher {
  params: Params,
  decoy_digest: Arc<str>,
}

impl Argon2Hasher {
  /// Build a hasher from configured cost parameters.
  ///
  /// Computes one digest up front for [`SecretHasher::verify_decoy`], so this
  /// costs as much as a single hash.
  pub fn new(config: &HashingConfig) -> Result<Self, HashError> {
    let params = Params::new(
      config.memory_kib,
      config.iterations,
      config.parallelism,
      None,
    )
    .map_err(|e| HashError::InvalidParams(e.to_string()))?;

    let decoy = UuidGenerator
      .generate()
      .map_err(|e| HashError::Salt(e.to_string()))?;
    let decoy_digest = hash_blocking(&params, &decoy)?;

    Ok(Self {
      params,
      decoy_digest: Arc::from(decoy_digest),
    })
  }
}

#[async_trait]
impl SecretHasher for Argon2Hasher {
  async fn hash(&self, plaintext: &SecretString) -> Result<String, HashError> {
    let params = self.params.clone();
    let plaintext = plaintext.clone();

    tokio::task::spawn_blocking(move || hash_blocking(&params, &plaintext))
      .await
      .map_err(|e| HashError::Join(e.to_string()))?
  }

  async fn verify(&self, plaintext: &SecretString, digest: &str) -> Result<bool, HashError> {
    let plaintext = plaintext.clone();
    let digest = digest.to_string();

    tokio::task::spawn_blocking(move || verify_blocking(&plaintext, &digest))
      .await
      .map_err(|e| HashError::Join(e.to_string()))?
  }

  async fn verify_decoy(&self, plaintext: &SecretString) {
    let plaintext = plaintext.clone();
    let digest = Arc::clone(&self.decoy_digest);

    let _ = tokio::task::spawn_blocking(move || verify_blocking(&plaintext, &digest)).await;
  }
}

fn hash_blocking(params: &Params, plaintext: &SecretString) -> Result<String, HashError> {
  // Salt from the OS cryptographic random source
  let mut salt_bytes = [0u8; 32];
  getrandom::fill(&mut salt_bytes).map_err(|e| HashError::Salt(e.to_string()))?;

  let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| HashError::Salt(e.to_string()))?;

  let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone());
  let hash = argon2
    .hash_password(plaintext.expose_secret().as_bytes(), &salt)
    .map_err(|e| HashError::Hashing(e.to_string()))?;

  Ok(hash.to_string())
}

fn verify_blocking(plaintext: &SecretString, digest: &str) -> Result<bool, HashError> {
  let parsed = PasswordHash::new(digest).map_err(|e| HashError::MalformedDigest(e.to_string()))?;

  // Algorithm, version and cost come from the digest itself.
  match Argon2::default().verify_password(plaintext.expose_secret().as_bytes(), &parsed) {
    Ok(()) => Ok(true),
    Err(password_hash::Error::Password) => Ok(false),
    Err(e) => Err(HashError::Verification(e.to_string())),
  }
}
