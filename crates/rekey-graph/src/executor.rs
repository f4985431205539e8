//! Task graph executor.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::GraphError;
use crate::graph::{Graph, GraphIssue};
use crate::result::GraphOutputs;
use crate::step::{Step, StepInputs};

/// A set of named steps and the dependency edges between them.
///
/// Every step's output type is `T` and error type is `E`; workflows with
/// heterogeneous steps use an enum for `T`.
pub struct TaskGraph<T, E> {
  steps: Vec<Step<T, E>>,
}

impl<T, E> Default for TaskGraph<T, E> {
  fn default() -> Self {
    Self { steps: Vec::new() }
  }
}

impl<T, E> TaskGraph<T, E>
where
  T: Send + Sync + 'static,
  E: std::error::Error + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a step (builder style).
  pub fn step(mut self, step: Step<T, E>) -> Self {
    self.steps.push(step);
    self
  }

  /// Add a step.
  pub fn add_step(&mut self, step: Step<T, E>) {
    self.steps.push(step);
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  /// Check for duplicate names, unknown dependencies and cycles without
  /// running anything.
  pub fn validate(&self) -> Result<(), GraphError<E>> {
    self.plan().map(|_| ())
  }

  fn plan(&self) -> Result<Graph, GraphError<E>> {
    Graph::new(
      self
        .steps
        .iter()
        .map(|step| (step.name.as_str(), step.dependencies.as_slice())),
    )
    .map_err(|issue| match issue {
      GraphIssue::Duplicate(step) => GraphError::DuplicateStep { step },
      GraphIssue::UnknownDependency { step, dependency } => {
        GraphError::UnknownDependency { step, dependency }
      }
      GraphIssue::Cycle(steps) => GraphError::CyclicDependency { steps },
    })
  }

  /// Run every step in dependency order.
  ///
  /// Returns the outputs of all steps, or the first error encountered. After
  /// a failure no further step is started; steps already running on
  /// independent branches finish and their outputs are dropped.
  #[instrument(name = "graph_run", skip(self, cancel), fields(steps = self.steps.len()))]
  pub async fn run(self, cancel: CancellationToken) -> Result<GraphOutputs<T>, GraphError<E>> {
    let graph = self.plan().inspect_err(|e| {
      error!(error = %e, "graph_rejected");
    })?;

    let run_id = uuid::Uuid::new_v4().to_string();
    info!(run_id = %run_id, steps = graph.len(), "graph_started");

    let steps = self
      .steps
      .into_iter()
      .map(|step| (step.name.clone(), step))
      .collect();

    let result = run_loop(steps, &graph, &run_id, &cancel).await;

    match &result {
      Ok(_) => {
        info!(run_id = %run_id, "graph_completed");
      }
      Err(e) => {
        error!(run_id = %run_id, error = %e, "graph_failed");
      }
    }

    result.map(|outputs| GraphOutputs::new(run_id, outputs))
  }
}

/// Drive the readiness queue until every step has finished or one failed.
async fn run_loop<T, E>(
  mut steps: HashMap<String, Step<T, E>>,
  graph: &Graph,
  run_id: &str,
  cancel: &CancellationToken,
) -> Result<HashMap<String, Arc<T>>, GraphError<E>>
where
  T: Send + Sync + 'static,
  E: std::error::Error + Send + Sync + 'static,
{
  let mut pending = graph.pending_counts();
  let mut ready: VecDeque<String> = graph.entry_points().map(str::to_string).collect();
  let mut completed: HashMap<String, Arc<T>> = HashMap::with_capacity(graph.len());
  let mut in_flight = FuturesUnordered::new();
  let mut abort_handles: Vec<AbortHandle> = Vec::with_capacity(graph.len());
  let mut failure: Option<GraphError<E>> = None;

  loop {
    if cancel.is_cancelled() {
      warn!(run_id = %run_id, "graph_cancelled");
      abort_all(&abort_handles);
      return Err(failure.unwrap_or(GraphError::Cancelled));
    }

    // Nothing new starts once a step has failed.
    if failure.is_none() {
      while let Some(name) = ready.pop_front() {
        let Some(step) = steps.remove(&name) else {
          continue;
        };

        let inputs: HashMap<String, Arc<T>> = graph
          .upstream(&name)
          .iter()
          .filter_map(|dep| completed.get(dep).map(|out| (dep.clone(), Arc::clone(out))))
          .collect();

        info!(
          run_id = %run_id,
          step = %name,
          inputs = inputs.len(),
          "step_started"
        );

        let handle = tokio::spawn(execute_step(step, StepInputs::new(inputs)));
        abort_handles.push(handle.abort_handle());
        in_flight.push(async move { (name, handle.await) });
      }
    }

    if in_flight.is_empty() {
      break;
    }

    let (name, joined) = tokio::select! {
      biased;
      _ = cancel.cancelled() => {
        warn!(
          run_id = %run_id,
          in_flight = in_flight.len(),
          "graph_cancelled"
        );
        abort_all(&abort_handles);
        return Err(failure.unwrap_or(GraphError::Cancelled));
      }
      Some(outcome) = in_flight.next() => outcome,
      else => break,
    };

    match joined {
      Ok(Ok(output)) => {
        if failure.is_some() {
          debug!(run_id = %run_id, step = %name, "step_output_discarded");
          continue;
        }

        info!(run_id = %run_id, step = %name, "step_completed");

        for next in graph.downstream(&name) {
          if let Some(count) = pending.get_mut(next.as_str()) {
            *count -= 1;
            if *count == 0 {
              ready.push_back(next.clone());
            }
          }
        }
        completed.insert(name, Arc::new(output));
      }
      Ok(Err(e)) => {
        error!(run_id = %run_id, step = %name, error = %e, "step_failed");
        failure.get_or_insert(e);
      }
      Err(join_error) => {
        let e = GraphError::Panicked {
          step: name,
          message: join_error.to_string(),
        };
        error!(run_id = %run_id, error = %e, "step_failed");
        failure.get_or_insert(e);
      }
    }
  }

  if let Some(e) = failure {
    return Err(e);
  }

  // Every step has run unless the plan was inconsistent.
  if completed.len() != graph.len() {
    let mut stuck: Vec<String> = steps.into_keys().collect();
    stuck.sort();
    return Err(GraphError::CyclicDependency { steps: stuck });
  }

  Ok(completed)
}

/// Run a single step, applying its deadline if it has one.
async fn execute_step<T, E>(step: Step<T, E>, inputs: StepInputs<T>) -> Result<T, GraphError<E>>
where
  E: std::error::Error + 'static,
{
  let Step {
    name,
    timeout,
    action,
    ..
  } = step;

  let future = action(inputs);

  match timeout {
    Some(limit) => match tokio::time::timeout(limit, future).await {
      Ok(result) => result.map_err(|source| GraphError::StepFailed { step: name, source }),
      Err(_) => Err(GraphError::Timeout {
        step: name,
        timeout_ms: limit.as_millis(),
      }),
    },
    None => future
      .await
      .map_err(|source| GraphError::StepFailed { step: name, source }),
  }
}

fn abort_all(handles: &[AbortHandle]) {
  for handle in handles {
    handle.abort();
  }
}
