//! Zeroizing string for plaintext secrets.

use std::fmt;

use serde::{Deserialize, Deserializer};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A string that is zeroed on drop and never printed.
///
/// Used for reset tokens and issued API keys. There is no `Deref<Target=str>`:
/// reading the value requires an explicit [`expose_secret`](Self::expose_secret)
/// call so every exposure point is easy to find.
///
/// ```
/// use rekey_secret::SecretString;
///
/// let token = SecretString::new("reset-token".to_string());
/// assert_eq!(format!("{token:?}"), "SecretString([REDACTED])");
/// assert_eq!(token.expose_secret(), "reset-token");
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
  /// Take ownership of `s`; its buffer is zeroed when this value is dropped.
  pub fn new(s: String) -> Self {
    Self(s)
  }

  pub fn expose_secret(&self) -> &str {
    &self.0
  }

  /// Length in bytes.
  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

// Each copy owns its own buffer and zeroes it independently.
impl Clone for SecretString {
  fn clone(&self) -> Self {
    Self(self.0.clone())
  }
}

impl PartialEq for SecretString {
  fn eq(&self, other: &Self) -> bool {
    self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
  }
}

impl Eq for SecretString {}

impl From<String> for SecretString {
  fn from(s: String) -> Self {
    Self::new(s)
  }
}

impl fmt::Debug for SecretString {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("SecretString([REDACTED])")
  }
}

impl fmt::Display for SecretString {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("[REDACTED]")
  }
}

impl<'de> Deserialize<'de> for SecretString {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    String::deserialize(deserializer).map(Self::new)
  }
}
