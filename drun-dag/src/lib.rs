//! Graph construction and the resulting task structures.
//!
//! A graph is a set of [`Task`](struct.Task.html)s linked by dependency
//! edges. Every task carries a deferred body; when all of a task's inputs
//! have produced their results, the body can run, receiving those results
//! positionally. Graphs are built by registering tasks on a [`Graph`]
//! handle and wiring them with the two composition operators:
//!
//! - [`Graph::chain`] makes every task on the right depend on every task on
//!   the left (serial composition);
//! - [`Graph::bundle`] collects tasks into a transient [`Group`] so a whole
//!   set can be chained at once (parallel composition).
//!
//! The handle is clonable and thread-safe, so a running task body may
//! register additional tasks; the graph's condition variable is signaled on
//! every registration for the benefit of an active scheduler.
//!
//! # Example
//!
//! Building a diamond: one producer fanning out to two transforms which fan
//! back into a consumer. Execution lives in the companion crate `drun-exec`.
//!
//! ```
//! use drun_dag::Graph;
//! use serde_json::json;
//!
//! let graph = Graph::new(std::io::sink());
//! let source = graph.create_task(|_| Ok(json!(42)));
//! let half = graph.create_task(|x| Ok(json!(x[0].as_i64().unwrap_or(0) / 2)));
//! let double = graph.create_task(|x| Ok(json!(x[0].as_i64().unwrap_or(0) * 2)));
//! let sum = graph.create_task(|x| {
//!     Ok(json!(x[0].as_i64().unwrap_or(0) + x[1].as_i64().unwrap_or(0)))
//! });
//! let fan = graph.bundle(half, double);
//! graph.chain(source, fan.clone());
//! graph.chain(fan, sum);
//! ```

#![deny(missing_docs)]

#[macro_use]
extern crate log;

mod command;
mod error;
mod graph;
mod group;
mod outcome;
mod task;

pub use command::value_to_string;
pub use error::RunError;
pub use graph::{Graph, GraphCore, GraphState};
pub use group::{Group, Operand};
pub use outcome::Outcome;
pub use task::{Task, TaskBody, TaskId, TaskOpts, TaskRef, TaskState, WorkerId};

pub use serde_json::Value;
