//! Rotation errors.

use std::fmt;

use rekey_graph::MissingInput;
use rekey_secret::{GenerateError, HashError};
use rekey_store::StoreError;
use thiserror::Error;

/// Messages that may appear in a response's `errors` list.
pub mod messages {
  pub const REQUEST_MALFORMED: &str = "request body must be a JSON object";
  pub const EMAIL_REQUIRED: &str = "`email` is required";
  pub const EMAIL_INVALID: &str = "`email` has an invalid format";
  pub const TOKEN_REQUIRED: &str = "`token` is required";
  /// Shared by the unknown-email and wrong-token cases.
  pub const CREDENTIALS_MISMATCH: &str =
    "either the reset token is invalid or the email address is incorrect";
  pub const LOOKUP_FAILED: &str = "exception during user lookup";
  pub const ISSUE_FAILED: &str = "exception during api key generation";
  pub const UPDATE_FAILED: &str = "exception during user update";
  pub const INTERNAL: &str = "internal error";
}

/// Coarse classification of a failed rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  ValidationError,
  NotFound,
  InternalError,
  PersistenceError,
}

impl ErrorKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ErrorKind::ValidationError => "validation_error",
      ErrorKind::NotFound => "not_found",
      ErrorKind::InternalError => "internal_error",
      ErrorKind::PersistenceError => "persistence_error",
    }
  }
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Why the presented reset credentials were rejected.
///
/// Only ever written to the operational log; callers see
/// [`messages::CREDENTIALS_MISMATCH`] either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchReason {
  /// No user with this email has an unexpired reset token.
  UnknownEmail,
  /// The token does not match the stored digest.
  TokenMismatch,
}

impl fmt::Display for MismatchReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MismatchReason::UnknownEmail => f.write_str("unknown email or expired token"),
      MismatchReason::TokenMismatch => f.write_str("token mismatch"),
    }
  }
}

/// Failure of a rotation step.
///
/// `Display` and `source` carry operator detail for logs. What a caller may
/// see is [`public_messages`](Self::public_messages).
#[derive(Debug, Error)]
pub enum RotationError {
  #[error("invalid reset request: {}", .messages.join("; "))]
  Validation { messages: Vec<String> },

  #[error("reset credentials rejected: {reason}")]
  Mismatch { reason: MismatchReason },

  #[error("user lookup failed: {0}")]
  Lookup(#[source] StoreError),

  #[error("reset token verification failed: {0}")]
  Verify(#[source] HashError),

  #[error("credential generation failed: {0}")]
  Generate(#[source] GenerateError),

  #[error("credential hashing failed: {0}")]
  Hash(#[source] HashError),

  #[error("credential update failed: {0}")]
  Persist(#[source] StoreError),

  #[error(transparent)]
  MissingInput(#[from] MissingInput),
}

impl RotationError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      RotationError::Validation { .. } => ErrorKind::ValidationError,
      RotationError::Mismatch { .. } => ErrorKind::NotFound,
      RotationError::Persist(_) => ErrorKind::PersistenceError,
      RotationError::Lookup(_)
      | RotationError::Verify(_)
      | RotationError::Generate(_)
      | RotationError::Hash(_)
      | RotationError::MissingInput(_) => ErrorKind::InternalError,
    }
  }

  /// Messages safe to return to the caller, in order.
  pub fn public_messages(&self) -> Vec<String> {
    match self {
      RotationError::Validation { messages } => messages.clone(),
      // A broken digest must look exactly like a wrong token.
      RotationError::Mismatch { .. } | RotationError::Verify(_) => {
        vec![messages::CREDENTIALS_MISMATCH.to_string()]
      }
      RotationError::Lookup(_) => vec![messages::LOOKUP_FAILED.to_string()],
      RotationError::Generate(_) | RotationError::Hash(_) => {
        vec![messages::ISSUE_FAILED.to_string()]
      }
      RotationError::Persist(_) => vec![messages::UPDATE_FAILED.to_string()],
      RotationError::MissingInput(_) => vec![messages::INTERNAL.to_string()],
    }
  }
}
