//! Graph run results.

use std::collections::HashMap;
use std::sync::Arc;

/// Outputs of a successful graph run.
#[derive(Debug)]
pub struct GraphOutputs<T> {
  /// Unique run ID, also attached to the run's log events.
  pub run_id: String,
  outputs: HashMap<String, Arc<T>>,
}

impl<T> GraphOutputs<T> {
  pub(crate) fn new(run_id: String, outputs: HashMap<String, Arc<T>>) -> Self {
    Self { run_id, outputs }
  }

  /// Output of the named step.
  pub fn get(&self, step: &str) -> Option<&T> {
    self.outputs.get(step).map(Arc::as_ref)
  }

  /// Remove and return the named step's output.
  ///
  /// Yields the value itself when nothing else still holds it (the normal
  /// case once a run has finished), otherwise a clone.
  pub fn take(&mut self, step: &str) -> Option<T>
  where
    T: Clone,
  {
    let output = self.outputs.remove(step)?;
    Some(Arc::try_unwrap(output).unwrap_or_else(|shared| (*shared).clone()))
  }

  pub fn len(&self) -> usize {
    self.outputs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.outputs.is_empty()
  }

  pub fn contains(&self, step: &str) -> bool {
    self.outputs.contains_key(step)
  }
}
