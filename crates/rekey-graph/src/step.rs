//! Step definitions and the inputs handed to them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::error::MissingInput;

/// The future a step's action produces.
pub type StepFuture<T, E> = BoxFuture<'static, Result<T, E>>;

type StepAction<T, E> = Box<dyn FnOnce(StepInputs<T>) -> StepFuture<T, E> + Send>;

/// A named unit of work with declared dependencies.
pub struct Step<T, E> {
  pub(crate) name: String,
  pub(crate) dependencies: Vec<String>,
  pub(crate) timeout: Option<Duration>,
  pub(crate) action: StepAction<T, E>,
}

impl<T, E> Step<T, E> {
  /// Create a step with no dependencies.
  pub fn new<F, Fut>(name: impl Into<String>, action: F) -> Self
  where
    F: FnOnce(StepInputs<T>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
  {
    Self {
      name: name.into(),
      dependencies: Vec::new(),
      timeout: None,
      action: Box::new(move |inputs| Box::pin(action(inputs))),
    }
  }

  /// Declare steps that must complete successfully before this one starts.
  pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self
      .dependencies
      .extend(dependencies.into_iter().map(Into::into));
    self
  }

  /// Fail the step with [`GraphError::Timeout`](crate::GraphError::Timeout)
  /// if it runs longer than `timeout`.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn dependencies(&self) -> &[String] {
    &self.dependencies
  }

  pub fn timeout(&self) -> Option<Duration> {
    self.timeout
  }
}

impl<T, E> std::fmt::Debug for Step<T, E> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Step")
      .field("name", &self.name)
      .field("dependencies", &self.dependencies)
      .field("timeout", &self.timeout)
      .finish_non_exhaustive()
  }
}

/// Outputs of a step's dependencies, keyed by dependency name.
///
/// Holds exactly the declared dependencies, all of which completed
/// successfully before the step started.
#[derive(Debug)]
pub struct StepInputs<T> {
  outputs: HashMap<String, Arc<T>>,
}

impl<T> StepInputs<T> {
  pub(crate) fn new(outputs: HashMap<String, Arc<T>>) -> Self {
    Self { outputs }
  }

  /// Output of the named dependency.
  pub fn get(&self, step: &str) -> Option<&T> {
    self.outputs.get(step).map(Arc::as_ref)
  }

  /// Output of the named dependency, or [`MissingInput`] if the step did not
  /// declare it.
  pub fn require(&self, step: &str) -> Result<&T, MissingInput> {
    self.get(step).ok_or_else(|| MissingInput(step.to_string()))
  }

  /// Shared handle to the named dependency's output.
  pub fn shared(&self, step: &str) -> Option<Arc<T>> {
    self.outputs.get(step).cloned()
  }

  pub fn len(&self) -> usize {
    self.outputs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.outputs.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
    self
      .outputs
      .iter()
      .map(|(name, output)| (name.as_str(), output.as_ref()))
  }
}
