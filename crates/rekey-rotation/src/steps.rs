//! The four rotation steps and the values they pass along.

use std::sync::Arc;

use chrono::Utc;
use rekey_graph::{MissingInput, StepInputs};
use rekey_secret::{CredentialGenerator, SecretHasher, SecretString};
use rekey_store::{UserId, UserStore};
use tracing::debug;

use crate::error::{MismatchReason, RotationError};
use crate::request::{RequestField, ResetRequest};

pub(crate) const VALIDATE: &str = "validate";
pub(crate) const LOOKUP: &str = "lookup";
pub(crate) const ISSUE: &str = "issue";
pub(crate) const PERSIST: &str = "persist";

/// A newly generated credential and the digest that will be stored for it.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
  pub plaintext: SecretString,
  pub digest: String,
}

#[derive(Debug, Clone)]
pub(crate) enum StepOutput {
  /// `token` is `None` when it arrived with a non-string value.
  Validated {
    email: String,
    token: Option<SecretString>,
  },
  User(UserId),
  Credential(IssuedCredential),
  Persisted,
}

impl StepOutput {
  fn validated(&self) -> Option<(&str, Option<&SecretString>)> {
    match self {
      StepOutput::Validated { email, token } => Some((email.as_str(), token.as_ref())),
      _ => None,
    }
  }

  fn user(&self) -> Option<UserId> {
    match self {
      StepOutput::User(id) => Some(*id),
      _ => None,
    }
  }

  fn credential(&self) -> Option<&IssuedCredential> {
    match self {
      StepOutput::Credential(credential) => Some(credential),
      _ => None,
    }
  }

  pub(crate) fn into_credential(self) -> Option<IssuedCredential> {
    match self {
      StepOutput::Credential(credential) => Some(credential),
      _ => None,
    }
  }
}

fn missing(step: &str) -> RotationError {
  RotationError::MissingInput(MissingInput(step.to_string()))
}

/// Check field presence and email format, reporting every violation.
pub(crate) async fn validate(request: ResetRequest) -> Result<StepOutput, RotationError> {
  let violations = request.violations();
  if !violations.is_empty() {
    return Err(RotationError::Validation {
      messages: violations.into_iter().map(String::from).collect(),
    });
  }

  let ResetRequest { email, token } = request;
  match email {
    RequestField::Present(email) => Ok(StepOutput::Validated {
      email,
      token: token.into_value(),
    }),
    _ => Err(missing(VALIDATE)),
  }
}

/// Resolve the user with an unexpired reset token and check the presented
/// token against its digest.
///
/// An unknown email or a token of the wrong type still pays for one
/// verification so that every rejection path costs about the same.
pub(crate) async fn lookup(
  store: Arc<dyn UserStore>,
  hasher: Arc<dyn SecretHasher>,
  inputs: StepInputs<StepOutput>,
) -> Result<StepOutput, RotationError> {
  let (email, token) = inputs
    .get(VALIDATE)
    .and_then(StepOutput::validated)
    .ok_or_else(|| missing(VALIDATE))?;

  let record = store
    .find_unexpired(email, Utc::now())
    .await
    .map_err(RotationError::Lookup)?;

  let blank = SecretString::new(String::new());
  let presented = token.unwrap_or(&blank);

  let Some(record) = record else {
    hasher.verify_decoy(presented).await;
    return Err(RotationError::Mismatch {
      reason: MismatchReason::UnknownEmail,
    });
  };

  let Some(token) = token else {
    hasher.verify_decoy(presented).await;
    return Err(RotationError::Mismatch {
      reason: MismatchReason::TokenMismatch,
    });
  };

  let matched = hasher
    .verify(token, &record.reset_token_digest)
    .await
    .map_err(RotationError::Verify)?;

  if !matched {
    return Err(RotationError::Mismatch {
      reason: MismatchReason::TokenMismatch,
    });
  }

  debug!(user_id = %record.id, "reset_token_verified");
  Ok(StepOutput::User(record.id))
}

/// Generate a new credential and digest it.
pub(crate) async fn issue(
  generator: Arc<dyn CredentialGenerator>,
  hasher: Arc<dyn SecretHasher>,
) -> Result<StepOutput, RotationError> {
  let plaintext = generator.generate().map_err(RotationError::Generate)?;
  let digest = hasher.hash(&plaintext).await.map_err(RotationError::Hash)?;

  Ok(StepOutput::Credential(IssuedCredential { plaintext, digest }))
}

/// Replace the user's stored credential digest.
pub(crate) async fn persist(
  store: Arc<dyn UserStore>,
  inputs: StepInputs<StepOutput>,
) -> Result<StepOutput, RotationError> {
  let user_id = inputs
    .get(LOOKUP)
    .and_then(StepOutput::user)
    .ok_or_else(|| missing(LOOKUP))?;
  let digest = inputs
    .get(ISSUE)
    .and_then(StepOutput::credential)
    .map(|credential| credential.digest.clone())
    .ok_or_else(|| missing(ISSUE))?;

  store
    .update_credential_digest(&user_id, &digest)
    .await
    .map_err(RotationError::Persist)?;

  debug!(user_id = %user_id, "credential_digest_stored");
  Ok(StepOutput::Persisted)
}
