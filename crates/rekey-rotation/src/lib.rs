//! Rekey Rotation
//!
//! Rotates a user's API key after checking a reset token that was delivered
//! out-of-band.
//!
//! # Architecture
//!
//! ```text
//! RotationWorkflow::run(ResetRequest) -> WorkflowResult
//!
//! validate ──► lookup ──► issue ──► persist
//!                 └──────────────────▲
//! ```
//!
//! - `validate` checks the request fields and collects every violation.
//! - `lookup` finds the user with an unexpired reset token and verifies the
//!   presented token against its digest.
//! - `issue` generates a new API key and digests it.
//! - `persist` stores the digest for the looked-up user.
//!
//! The steps run on a [`rekey_graph::TaskGraph`]. The response is assembled
//! once from the step outputs or the first failure; the plaintext key is
//! exposed only through the serialized [`WorkflowResult`].
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use rekey_rotation::{ResetRequest, RotationWorkflow};
//! use rekey_secret::{Argon2Hasher, UuidGenerator};
//!
//! let workflow = RotationWorkflow::new(
//!   Arc::new(store),
//!   Arc::new(Argon2Hasher::new(&config.hashing)?),
//!   Arc::new(UuidGenerator),
//! );
//!
//! let result = workflow.run(ResetRequest::new("a@x.com", "token")).await;
//! println!("{}", serde_json::to_string(&result)?);
//! ```

mod error;
mod request;
mod result;
mod steps;
mod workflow;

pub use error::{ErrorKind, MismatchReason, RotationError, messages};
pub use request::{RequestField, ResetRequest};
pub use result::{ApiKey, WorkflowResult};
pub use steps::IssuedCredential;
pub use workflow::RotationWorkflow;
