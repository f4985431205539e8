//! Rekey Graph
//!
//! A small executor for acyclic graphs of named async steps. Each step
//! declares the steps it depends on and receives their outputs once they have
//! all completed successfully.
//!
//! # Architecture
//!
//! ```text
//! TaskGraph
//! ├── step(Step) - register a named step and its dependencies
//! ├── validate() - duplicate / unknown dependency / cycle checks
//! └── run(cancel) -> GraphOutputs
//!
//! run
//! └── readiness queue seeded with zero-dependency steps; every completion
//!     releases the dependents whose last prerequisite it was
//! ```
//!
//! Independent steps run concurrently on the tokio runtime. The first failure
//! stops scheduling: nothing downstream of it starts, in-flight steps on other
//! branches finish and their outputs are discarded.
//!
//! # Usage
//!
//! ```ignore
//! use rekey_graph::{Step, TaskGraph};
//! use tokio_util::sync::CancellationToken;
//!
//! let graph = TaskGraph::new()
//!   .step(Step::new("fetch", |_| async { Ok::<_, MyError>(1) }))
//!   .step(
//!     Step::new("double", |inputs| async move { Ok(*inputs.require("fetch")? * 2) })
//!       .depends_on(["fetch"]),
//!   );
//!
//! let outputs = graph.run(CancellationToken::new()).await?;
//! assert_eq!(outputs.get("double"), Some(&2));
//! ```

mod error;
mod executor;
mod graph;
mod result;
mod step;

pub use error::{GraphError, MissingInput};
pub use executor::TaskGraph;
pub use result::GraphOutputs;
pub use step::{Step, StepFuture, StepInputs};
