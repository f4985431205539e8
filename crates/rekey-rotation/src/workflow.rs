//! Rotation workflow assembly and outcome reporting.

use std::sync::Arc;
use std::time::Duration;

use rekey_graph::{GraphError, GraphOutputs, Step, TaskGraph};
use rekey_secret::{CredentialGenerator, SecretHasher};
use rekey_store::UserStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::{ErrorKind, RotationError, messages};
use crate::request::ResetRequest;
use crate::result::{ApiKey, WorkflowResult};
use crate::steps::{self, ISSUE, LOOKUP, PERSIST, StepOutput, VALIDATE};

/// Rotates a user's API key given their email and a valid reset token.
///
/// Holds the store, hasher and generator capabilities; each call to
/// [`run`](Self::run) builds and executes a fresh step graph.
#[derive(Clone)]
pub struct RotationWorkflow {
  store: Arc<dyn UserStore>,
  hasher: Arc<dyn SecretHasher>,
  generator: Arc<dyn CredentialGenerator>,
  step_timeout: Option<Duration>,
}

impl RotationWorkflow {
  pub fn new(
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn SecretHasher>,
    generator: Arc<dyn CredentialGenerator>,
  ) -> Self {
    Self {
      store,
      hasher,
      generator,
      step_timeout: None,
    }
  }

  /// Bound each step's run time. `None` leaves steps unbounded.
  pub fn with_step_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.step_timeout = timeout;
    self
  }

  /// Run one rotation to completion.
  pub async fn run(&self, request: ResetRequest) -> WorkflowResult {
    self.run_with_cancel(request, CancellationToken::new()).await
  }

  /// Run one rotation, giving up early if `cancel` fires.
  ///
  /// A cancelled run reports an internal error. If the persist step had
  /// already committed, the stored digest belongs to a key nobody received;
  /// the user has to request another reset.
  #[instrument(name = "rotation", skip_all)]
  pub async fn run_with_cancel(
    &self,
    request: ResetRequest,
    cancel: CancellationToken,
  ) -> WorkflowResult {
    match self.graph(request).run(cancel).await {
      Ok(outputs) => completed(outputs),
      Err(e) => failed(e),
    }
  }

  fn graph(&self, request: ResetRequest) -> TaskGraph<StepOutput, RotationError> {
    let store = self.store.clone();
    let hasher = self.hasher.clone();
    let lookup = Step::new(LOOKUP, move |inputs| steps::lookup(store, hasher, inputs))
      .depends_on([VALIDATE]);

    let generator = self.generator.clone();
    let hasher = self.hasher.clone();
    let issue = Step::new(ISSUE, move |_| steps::issue(generator, hasher)).depends_on([LOOKUP]);

    let store = self.store.clone();
    let persist =
      Step::new(PERSIST, move |inputs| steps::persist(store, inputs)).depends_on([LOOKUP, ISSUE]);

    TaskGraph::new()
      .step(self.bounded(Step::new(VALIDATE, move |_| steps::validate(request))))
      .step(self.bounded(lookup))
      .step(self.bounded(issue))
      .step(self.bounded(persist))
  }

  fn bounded(
    &self,
    step: Step<StepOutput, RotationError>,
  ) -> Step<StepOutput, RotationError> {
    match self.step_timeout {
      Some(timeout) => step.with_timeout(timeout),
      None => step,
    }
  }
}

fn completed(mut outputs: GraphOutputs<StepOutput>) -> WorkflowResult {
  let credential = outputs.take(ISSUE).and_then(StepOutput::into_credential);

  match credential {
    Some(credential) => {
      info!(run_id = %outputs.run_id, "rotation_completed");
      WorkflowResult::success(ApiKey::new(credential.plaintext))
    }
    None => {
      error!(run_id = %outputs.run_id, "rotation_missing_credential");
      WorkflowResult::failure(vec![messages::INTERNAL.to_string()])
    }
  }
}

fn failed(e: GraphError<RotationError>) -> WorkflowResult {
  match e {
    GraphError::StepFailed { step, source } => {
      let kind = source.kind();
      match (&source, kind) {
        (RotationError::Mismatch { reason }, _) => {
          warn!(step = %step, kind = %kind, reason = %reason, "rotation_rejected");
        }
        (_, ErrorKind::ValidationError) => {
          info!(step = %step, kind = %kind, "rotation_rejected");
        }
        _ => {
          error!(step = %step, kind = %kind, error = %source, "rotation_failed");
        }
      }
      WorkflowResult::failure(source.public_messages())
    }
    other => {
      error!(
        step = other.step().unwrap_or_default(),
        kind = %ErrorKind::InternalError,
        error = %other,
        "rotation_failed"
      );
      WorkflowResult::failure(vec![messages::INTERNAL.to_string()])
    }
  }
}
