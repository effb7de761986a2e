//! drun — an in-process build/execution engine for DAGs of tasks.
//!
//! A builder closure registers tasks and wires their dependencies with two
//! composition operators (`chain` for serial, `bundle` for parallel); the
//! engine then checks the graph for cycles, elides every subgraph whose
//! terminal task has a checkpoint on disk, and runs the rest with one worker
//! thread per ready task. Results flow from producers to consumers as plain
//! in-memory values, and a task can also shell out to a subprocess whose
//! stdout becomes its result.
//!
//! The first failure of a run aborts it: no new tasks are dispatched, the
//! outstanding workers drain, and `run_graph` returns that failure alone.
//!
//! # Quickstart
//!
//! The classic diamond, `(42 / 2) + (42 * 2)`:
//!
//! ```
//! use drun::run_graph;
//! use serde_json::json;
//!
//! let result = run_graph(|g| {
//!     let source = g.create_task(|_| Ok(json!(42)));
//!     let half = g.create_task(|x| Ok(json!(x[0].as_i64().unwrap_or(0) / 2)));
//!     let double = g.create_task(|x| Ok(json!(x[0].as_i64().unwrap_or(0) * 2)));
//!     let sum = g.create_task(|x| {
//!         Ok(json!(x[0].as_i64().unwrap_or(0) + x[1].as_i64().unwrap_or(0)))
//!     });
//!     let fan = g.bundle(half, double);
//!     g.chain(source, fan.clone());
//!     g.chain(fan, sum);
//!     sum
//! })
//! .unwrap();
//! assert_eq!(result, json!(105));
//! ```
//!
//! Subprocess tasks compose the same way:
//!
//! ```
//! use drun::run_graph;
//! use serde_json::json;
//!
//! let result = run_graph(|g| {
//!     let produce = g.create_cmd(vec!["echo", "foo"]);
//!     let mangle = g.create_cmd(vec!["sed", "s/o/x/"]);
//!     g.chain(produce, mangle)
//! })
//! .unwrap();
//! assert_eq!(result, json!("fxo\n"));
//! ```

pub use drun_dag::{
    value_to_string, Graph, GraphCore, GraphState, Group, Operand, Outcome, RunError, Task,
    TaskBody, TaskId, TaskOpts, TaskRef, TaskState, Value, WorkerId,
};
pub use drun_exec::{analyze, execute, run_graph, run_graph_with_log};
pub use drun_store as checkpoint;
