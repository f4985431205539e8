//! The response returned to the caller.

use std::fmt;

use rekey_secret::SecretString;
use serde::{Serialize, Serializer};

use crate::error::messages;

/// A freshly issued API key.
///
/// Redacted in `Debug`. Serializing writes the plaintext, which is the one
/// place it is ever handed out.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(SecretString);

impl ApiKey {
  pub fn new(secret: SecretString) -> Self {
    Self(secret)
  }

  pub fn expose_secret(&self) -> &str {
    self.0.expose_secret()
  }
}

impl fmt::Debug for ApiKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("ApiKey([REDACTED])")
  }
}

impl Serialize for ApiKey {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.0.expose_secret())
  }
}

/// Outcome of a rotation run.
///
/// Either `success` with no errors and a key, or not `success` with at
/// least one error and no key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowResult {
  success: bool,
  errors: Vec<String>,
  apikey: Option<ApiKey>,
}

impl WorkflowResult {
  pub fn success(apikey: ApiKey) -> Self {
    Self {
      success: true,
      errors: Vec::new(),
      apikey: Some(apikey),
    }
  }

  pub fn failure(errors: Vec<String>) -> Self {
    let errors = if errors.is_empty() {
      vec![messages::INTERNAL.to_string()]
    } else {
      errors
    };

    Self {
      success: false,
      errors,
      apikey: None,
    }
  }

  pub fn is_success(&self) -> bool {
    self.success
  }

  pub fn errors(&self) -> &[String] {
    &self.errors
  }

  pub fn apikey(&self) -> Option<&ApiKey> {
    self.apikey.as_ref()
  }

  pub fn into_apikey(self) -> Option<ApiKey> {
    self.apikey
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_success_shape() {
    let result = WorkflowResult::success(ApiKey::new(SecretString::new("k-1".to_string())));
    assert_eq!(
      serde_json::to_value(&result).unwrap(),
      json!({ "success": true, "errors": [], "apikey": "k-1" })
    );
  }

  #[test]
  fn test_failure_shape() {
    let result = WorkflowResult::failure(vec![messages::EMAIL_REQUIRED.to_string()]);
    assert_eq!(
      serde_json::to_value(&result).unwrap(),
      json!({ "success": false, "errors": ["`email` is required"], "apikey": null })
    );
  }

  #[test]
  fn test_failure_always_has_a_message() {
    let result = WorkflowResult::failure(vec![]);
    assert!(!result.is_success());
    assert_eq!(result.errors(), [messages::INTERNAL]);
  }

  #[test]
  fn test_debug_redacts_key() {
    let result = WorkflowResult::success(ApiKey::new(SecretString::new("plaintext-key".to_string())));
    let debug = format!("{result:?}");
    assert!(!debug.contains("plaintext-key"));
    assert!(debug.contains("[REDACTED]"));
  }
}
