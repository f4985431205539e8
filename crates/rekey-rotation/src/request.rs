//! Incoming reset request.

use rekey_secret::SecretString;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use validator::validate_email;

use crate::error::{RotationError, messages};

/// A request field as it arrived on the wire.
#[derive(Debug, Clone)]
pub enum RequestField<T> {
  /// The key was absent.
  Missing,
  /// The key was present but its value is not a string, `null` included.
  Malformed,
  Present(T),
}

impl<T> RequestField<T> {
  pub fn is_missing(&self) -> bool {
    matches!(self, RequestField::Missing)
  }

  pub fn value(&self) -> Option<&T> {
    match self {
      RequestField::Present(value) => Some(value),
      _ => None,
    }
  }

  pub fn into_value(self) -> Option<T> {
    match self {
      RequestField::Present(value) => Some(value),
      _ => None,
    }
  }
}

impl<T> Default for RequestField<T> {
  fn default() -> Self {
    RequestField::Missing
  }
}

impl<'de, T: From<String>> Deserialize<'de> for RequestField<T> {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    match Value::deserialize(deserializer)? {
      Value::String(s) => Ok(RequestField::Present(T::from(s))),
      _ => Ok(RequestField::Malformed),
    }
  }
}

/// A request to rotate the API key of the user owning `email`.
///
/// Fields are decoded leniently: an absent key or a value of the wrong type
/// becomes a validation message rather than a decode failure. The token is
/// held as a [`SecretString`] from the moment it is decoded.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResetRequest {
  pub email: RequestField<String>,
  pub token: RequestField<SecretString>,
}

impl ResetRequest {
  pub fn new(email: impl Into<String>, token: impl Into<String>) -> Self {
    Self {
      email: RequestField::Present(email.into()),
      token: RequestField::Present(SecretString::new(token.into())),
    }
  }

  /// Decode a request body.
  ///
  /// Only a body that is not a JSON object fails here; field problems are
  /// reported by [`violations`](Self::violations).
  pub fn from_json(body: &str) -> Result<Self, RotationError> {
    let malformed = || RotationError::Validation {
      messages: vec![messages::REQUEST_MALFORMED.to_string()],
    };

    let value: Value = serde_json::from_str(body).map_err(|_| malformed())?;
    if !value.is_object() {
      return Err(malformed());
    }
    serde_json::from_value(value).map_err(|_| malformed())
  }

  /// Every validation failure, in field order.
  ///
  /// A token of the wrong type counts as present; it can never verify.
  pub fn violations(&self) -> Vec<&'static str> {
    let mut violations = Vec::new();

    match &self.email {
      RequestField::Missing => violations.push(messages::EMAIL_REQUIRED),
      RequestField::Malformed => violations.push(messages::EMAIL_INVALID),
      RequestField::Present(email) if !is_valid_email(email) => {
        violations.push(messages::EMAIL_INVALID)
      }
      RequestField::Present(_) => {}
    }

    if self.token.is_missing() {
      violations.push(messages::TOKEN_REQUIRED);
    }

    violations
  }
}

/// Syntactic address check. The domain needs at least one dot, so
/// single-label hosts such as `localhost` are rejected.
fn is_valid_email(email: &str) -> bool {
  validate_email(email)
    && email
      .rsplit_once('@')
      .is_some_and(|(_, domain)| domain.contains('.'))
}
