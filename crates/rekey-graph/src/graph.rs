use std::collections::{HashMap, HashSet, VecDeque};

/// Dependency structure of a task graph, used for validation and scheduling.
///
/// Step order follows registration order so that scheduling and log output
/// are deterministic for a given graph.
#[derive(Debug, Clone)]
pub(crate) struct Graph {
  /// Registration order of step names.
  order: Vec<String>,
  /// Adjacency list: step -> steps that depend on it.
  downstream: HashMap<String, Vec<String>>,
  /// Reverse adjacency: step -> steps it depends on.
  upstream: HashMap<String, Vec<String>>,
}

/// Structural problems found while building a [`Graph`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GraphIssue {
  Duplicate(String),
  UnknownDependency { step: String, dependency: String },
  Cycle(Vec<String>),
}

impl Graph {
  /// Build the graph from `(step, dependencies)` pairs and check it is a DAG.
  pub(crate) fn new<'a, I>(steps: I) -> Result<Self, GraphIssue>
  where
    I: IntoIterator<Item = (&'a str, &'a [String])>,
  {
    let steps: Vec<(&str, &[String])> = steps.into_iter().collect();

    let mut order = Vec::with_capacity(steps.len());
    let mut seen = HashSet::with_capacity(steps.len());
    for (name, _) in &steps {
      if !seen.insert(*name) {
        return Err(GraphIssue::Duplicate(name.to_string()));
      }
      order.push(name.to_string());
    }

    let mut downstream: HashMap<String, Vec<String>> = HashMap::new();
    let mut upstream: HashMap<String, Vec<String>> = HashMap::new();

    // Initialize all steps
    for name in &order {
      downstream.entry(name.clone()).or_default();
      upstream.entry(name.clone()).or_default();
    }

    for (name, dependencies) in &steps {
      for dependency in dependencies.iter() {
        if !seen.contains(dependency.as_str()) {
          return Err(GraphIssue::UnknownDependency {
            step: name.to_string(),
            dependency: dependency.clone(),
          });
        }
        // Repeated declarations of the same edge count once.
        let deps = upstream.entry(name.to_string()).or_default();
        if deps.contains(dependency) {
          continue;
        }
        deps.push(dependency.clone());
        downstream
          .entry(dependency.clone())
          .or_default()
          .push(name.to_string());
      }
    }

    let graph = Self {
      order,
      downstream,
      upstream,
    };
    graph.check_acyclic()?;
    Ok(graph)
  }

  /// Kahn's algorithm; whatever cannot be ordered sits on or behind a cycle.
  fn check_acyclic(&self) -> Result<(), GraphIssue> {
    let mut pending = self.pending_counts();
    let mut queue: VecDeque<&str> = self.entry_points().collect();
    let mut visited = 0;

    while let Some(name) = queue.pop_front() {
      visited += 1;
      for next in self.downstream(name) {
        if let Some(count) = pending.get_mut(next.as_str()) {
          *count -= 1;
          if *count == 0 {
            queue.push_back(next.as_str());
          }
        }
      }
    }

    if visited == self.order.len() {
      return Ok(());
    }

    let stuck = self
      .order
      .iter()
      .filter(|name| pending.get(name.as_str()).is_some_and(|count| *count > 0))
      .cloned()
      .collect();
    Err(GraphIssue::Cycle(stuck))
  }

  /// Steps with no dependencies, in registration order.
  pub(crate) fn entry_points(&self) -> impl Iterator<Item = &str> {
    self
      .order
      .iter()
      .filter(|name| self.upstream(name).is_empty())
      .map(String::as_str)
  }

  /// Steps that depend on `name`.
  pub(crate) fn downstream(&self, name: &str) -> &[String] {
    self
      .downstream
      .get(name)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Steps that `name` depends on.
  pub(crate) fn upstream(&self, name: &str) -> &[String] {
    self
      .upstream
      .get(name)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Number of unfinished dependencies per step, before anything has run.
  pub(crate) fn pending_counts(&self) -> HashMap<&str, usize> {
    self
      .order
      .iter()
      .map(|name| (name.as_str(), self.upstream(name).len()))
      .collect()
  }

  pub(crate) fn len(&self) -> usize {
    self.order.len()
  }
}
