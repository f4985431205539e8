//! Executor errors.

use thiserror::Error;

/// Errors that can occur while validating or running a task graph.
///
/// Configuration errors (`DuplicateStep`, `UnknownDependency`,
/// `CyclicDependency`) are raised before any step runs.
#[derive(Debug, Error)]
pub enum GraphError<E>
where
  E: std::error::Error + 'static,
{
  /// Two steps were registered under the same name.
  #[error("duplicate step '{step}'")]
  DuplicateStep { step: String },

  /// A step names a dependency that is not part of the graph.
  #[error("step '{step}' depends on unknown step '{dependency}'")]
  UnknownDependency { step: String, dependency: String },

  /// The dependency relation contains a cycle.
  #[error("cyclic dependency among steps: {}", .steps.join(", "))]
  CyclicDependency { steps: Vec<String> },

  /// A step returned an error.
  #[error("step '{step}' failed: {source}")]
  StepFailed {
    step: String,
    #[source]
    source: E,
  },

  /// A step exceeded its deadline.
  #[error("step '{step}' timed out after {timeout_ms}ms")]
  Timeout { step: String, timeout_ms: u128 },

  /// The run was cancelled by the caller.
  #[error("graph run cancelled")]
  Cancelled,

  /// A step's task panicked or was aborted.
  #[error("step '{step}' panicked: {message}")]
  Panicked { step: String, message: String },
}

impl<E> GraphError<E>
where
  E: std::error::Error + 'static,
{
  /// Name of the step that produced this error, if any.
  pub fn step(&self) -> Option<&str> {
    match self {
      GraphError::DuplicateStep { step }
      | GraphError::UnknownDependency { step, .. }
      | GraphError::StepFailed { step, .. }
      | GraphError::Timeout { step, .. }
      | GraphError::Panicked { step, .. } => Some(step),
      GraphError::CyclicDependency { .. } | GraphError::Cancelled => None,
    }
  }

  /// Whether the graph was rejected before any step ran.
  pub fn is_configuration(&self) -> bool {
    matches!(
      self,
      GraphError::DuplicateStep { .. }
        | GraphError::UnknownDependency { .. }
        | GraphError::CyclicDependency { .. }
    )
  }
}

/// A step asked for an input that is not among its declared dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no input from step '{0}'")]
pub struct MissingInput(pub String);
