//! Graph analysis and parallel execution.
//!
//! This crate turns a graph built with `drun-dag` into results: the
//! [`analyze`] pass validates acyclicity and elides checkpointed subgraphs,
//! and the [`execute`] pass runs every remaining task on its own worker
//! thread, coordinated by the graph's mutex and condition variable. The
//! [`run_graph`] entry point wires the two together behind a single call
//! that evaluates a builder closure and hands back its return expression
//! with every task leaf substituted by the task's result.
//!
//! # Example
//!
//! ```
//! use drun_exec::run_graph;
//! use serde_json::json;
//!
//! let result = run_graph(|g| {
//!     let a = g.create_task(|_| Ok(json!("foo")));
//!     let b = g.create_task(|x| Ok(json!(format!("{}bar", x[0].as_str().unwrap_or("")))));
//!     g.chain(a, b);
//!     b
//! })
//! .unwrap();
//! assert_eq!(result, json!("foobar"));
//! ```

#![deny(missing_docs)]

#[macro_use]
extern crate log;

mod analyzer;
mod scheduler;

pub use analyzer::analyze;
pub use scheduler::execute;

use std::io;
use std::io::Write;

use drun_dag::{Graph, Outcome, RunError, Value};

/// Evaluate `builder`, analyze and execute the resulting graph, and return
/// the builder's value with every task leaf replaced by its result.
///
/// The run log goes to stderr; use [`run_graph_with_log`] to capture it.
pub fn run_graph<B, R>(builder: B) -> Result<Value, RunError>
where
    B: FnOnce(&Graph) -> R,
    R: Into<Outcome>,
{
    run_graph_with_log(io::stderr(), builder)
}

/// Like [`run_graph`], writing the run log to `log`.
///
/// The builder is evaluated exactly once. An empty graph resolves the
/// builder's value right away without analysis or execution. Otherwise the
/// analyzer runs first (so cycle and checkpoint errors surface before any
/// body starts) and the scheduler then drives the graph to quiescence. The
/// first failure of the run is returned as-is; on failure no partial results
/// are surfaced.
///
/// Nested use is first class: a task body may call `run_graph` again (the
/// inner graph is fully independent) or register more tasks on its own graph
/// through a captured handle.
pub fn run_graph_with_log<W, B, R>(log: W, builder: B) -> Result<Value, RunError>
where
    W: Write + Send + 'static,
    B: FnOnce(&Graph) -> R,
    R: Into<Outcome>,
{
    let graph = Graph::new(log);
    let outcome = builder(&graph).into();
    let registered = graph.task_count();
    if registered == 0 {
        graph.core().log_line(format_args!("DR: No task in the graph"));
        return Ok(graph.resolve(outcome));
    }
    graph
        .core()
        .log_line(format_args!("DR: execute graph with {} tasks", registered));
    analyze(&graph)?;
    execute(&graph)?;
    Ok(graph.resolve(outcome))
}
