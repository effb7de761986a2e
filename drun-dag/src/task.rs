use std::fmt;
use std::path::PathBuf;

use anyhow::Error;
use serde_json::Value;

/// The identifier of a task, unique within a graph and strictly increasing in
/// creation order.
pub type TaskId = u64;

/// The identifier of a worker thread inside the thread registry of a graph.
pub type WorkerId = u64;

/// The deferred computation of a task.
///
/// The body receives the results of the task's inputs, positionally and in
/// `inputs` order, and produces the task's own result. It runs on a worker
/// thread with the graph mutex released, so it must not touch other tasks'
/// state; caller-side captures are the user's responsibility to synchronize.
pub type TaskBody = Box<dyn FnOnce(Vec<Value>) -> Result<Value, Error> + Send>;

/// The lifecycle state of a task.
///
/// A task moves `Pending -> Running -> Done` at most once, or
/// `Pending -> Skipped` at most once when its checkpoint is found during
/// analysis. A failing body leaves the task `Running` and records the error
/// at graph level instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Not dispatched yet, inputs may still be missing.
    Pending,
    /// A worker thread is executing the body.
    Running,
    /// The body completed and `result` is set.
    Done,
    /// Elided by a checkpoint hit, `result` was loaded from disk.
    Skipped,
}

/// A node of the graph: a deferred computation together with its dependency
/// edges, lifecycle state and eventual result.
///
/// Tasks are owned by their graph's registry and mutated only under the graph
/// mutex. Edges are stored both ways: for every input edge `a -> b` in
/// `b.inputs` the reverse entry exists in `a.outputs`.
pub struct Task {
    /// The identifier of this task.
    pub id: TaskId,
    /// Display label, used in logs. Defaults to the stringified id.
    pub name: String,
    /// The body, present until it is taken by the dispatching scheduler.
    pub body: Option<TaskBody>,
    /// The tasks this one depends on, in the order the edges were added.
    pub inputs: Vec<TaskId>,
    /// The tasks depending on this one, in the order the edges were added.
    pub outputs: Vec<TaskId>,
    /// Optional path where the result is persisted and probed.
    pub ckpt: Option<PathBuf>,
    /// Current lifecycle state.
    pub state: TaskState,
    /// The result, set exactly once when the task becomes `Done` or
    /// `Skipped`.
    pub result: Option<Value>,
}

impl Task {
    /// Create a `Pending` task with no edges.
    pub fn new(id: TaskId, opts: TaskOpts, body: TaskBody) -> Task {
        Task {
            id,
            name: opts.name.unwrap_or_else(|| id.to_string()),
            body: Some(body),
            inputs: Vec::new(),
            outputs: Vec::new(),
            ckpt: opts.ckpt,
            state: TaskState::Pending,
            result: None,
        }
    }

    /// Whether this task's result is final, i.e. it is `Done` or `Skipped`.
    pub fn is_complete(&self) -> bool {
        matches!(self.state, TaskState::Done | TaskState::Skipped)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("ckpt", &self.ckpt)
            .field("state", &self.state)
            .field("result", &self.result)
            .finish()
    }
}

/// A lightweight handle to a registered task.
///
/// Handles are cheap to copy and safe to capture in task bodies; all state
/// lives in the graph registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskRef {
    /// The id of the task inside its graph.
    pub id: TaskId,
}

/// Optional attributes of a task, in builder style.
///
/// ```
/// use drun_dag::TaskOpts;
///
/// let opts = TaskOpts::new().name("compile").ckpt("/tmp/compile.ckpt");
/// assert_eq!(opts.name.as_deref(), Some("compile"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TaskOpts {
    /// Display label override.
    pub name: Option<String>,
    /// Checkpoint path.
    pub ckpt: Option<PathBuf>,
}

impl TaskOpts {
    /// Make an empty set of options.
    pub fn new() -> TaskOpts {
        TaskOpts::default()
    }

    /// Set the display label of the task.
    pub fn name<S: Into<String>>(mut self, name: S) -> TaskOpts {
        self.name = Some(name.into());
        self
    }

    /// Set the checkpoint path of the task.
    pub fn ckpt<P: Into<PathBuf>>(mut self, path: P) -> TaskOpts {
        self.ckpt = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_default_name_is_id() {
        let task = Task::new(7, TaskOpts::new(), Box::new(|_| Ok(json!(null))));
        assert_eq!(task.name, "7");
        assert_eq!(task.state, TaskState::Pending);
        assert!(task.result.is_none());
    }

    #[test]
    fn test_opts_override() {
        let opts = TaskOpts::new().name("build").ckpt("out/build");
        let task = Task::new(0, opts, Box::new(|_| Ok(json!(null))));
        assert_eq!(task.name, "build");
        assert_eq!(task.ckpt.as_deref(), Some(std::path::Path::new("out/build")));
    }

    #[test]
    fn test_is_complete() {
        let mut task = Task::new(0, TaskOpts::new(), Box::new(|_| Ok(json!(null))));
        assert!(!task.is_complete());
        task.state = TaskState::Running;
        assert!(!task.is_complete());
        task.state = TaskState::Done;
        assert!(task.is_complete());
        task.state = TaskState::Skipped;
        assert!(task.is_complete());
    }
}
