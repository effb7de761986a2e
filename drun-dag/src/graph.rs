use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use anyhow::Error;
use serde_json::Value;

use crate::{Group, Operand, Outcome, RunError, Task, TaskBody, TaskId, TaskOpts, TaskRef, WorkerId};

/// The mutable state of a graph, shared by the builder, the scheduler and the
/// worker threads. Everything in here is protected by [`GraphCore::state`].
pub struct GraphState {
    /// The task registry, keyed by id. Iteration follows registration order.
    pub tasks: BTreeMap<TaskId, Task>,
    /// The id the next registered task will get.
    pub next_task: TaskId,
    /// The thread registry: one entry per outstanding worker. Workers remove
    /// their own entry, under the mutex, as their last act before exiting.
    pub workers: HashMap<WorkerId, JoinHandle<()>>,
    /// The id the next spawned worker will get.
    pub next_worker: WorkerId,
    /// The first failure reported by a worker. Later failures are dropped.
    pub failure: Option<RunError>,
}

impl GraphState {
    /// Whether every input of `task` has a final result, i.e. the task may be
    /// dispatched.
    pub fn inputs_complete(&self, task: &Task) -> bool {
        task.inputs
            .iter()
            .all(|input| self.tasks.get(input).map(Task::is_complete).unwrap_or(false))
    }
}

/// The shared core of a graph: the state under its mutex, the condition
/// variable used to signal progress, and the run log sink.
pub struct GraphCore {
    /// The graph state, protected by the one graph-wide mutex.
    pub state: Mutex<GraphState>,
    /// Signaled on worker completion and on task registration, so that an
    /// active scheduler rescans the registry.
    pub progress: Condvar,
    sink: Mutex<Box<dyn Write + Send>>,
}

impl GraphCore {
    /// Append one line to the run log. Sink errors are not fatal to the run.
    pub fn log_line(&self, line: fmt::Arguments) {
        debug!("{}", line);
        let mut sink = self.sink.lock().unwrap();
        if let Err(err) = writeln!(sink, "{}", line) {
            warn!("The run log sink rejected a line: {}", err);
        }
    }
}

/// A handle to a graph of tasks.
///
/// The handle is cheap to clone and safe to share: it can be captured by task
/// bodies to register more tasks while the graph is running. All operations
/// take the graph mutex internally.
#[derive(Clone)]
pub struct Graph {
    core: Arc<GraphCore>,
}

impl Graph {
    /// Make an empty graph logging to `sink`.
    pub fn new<W: Write + Send + 'static>(sink: W) -> Graph {
        Graph {
            core: Arc::new(GraphCore {
                state: Mutex::new(GraphState {
                    tasks: BTreeMap::new(),
                    next_task: 0,
                    workers: HashMap::new(),
                    next_worker: 0,
                    failure: None,
                }),
                progress: Condvar::new(),
                sink: Mutex::new(Box::new(sink)),
            }),
        }
    }

    /// The shared core of this graph, used by the analysis and execution
    /// layers.
    pub fn core(&self) -> &Arc<GraphCore> {
        &self.core
    }

    /// The number of registered tasks.
    pub fn task_count(&self) -> usize {
        self.core.state.lock().unwrap().tasks.len()
    }

    /// Register a task with default options.
    ///
    /// The task starts `Pending` with no edges; use [`Graph::chain`] to make
    /// it depend on others. Registration signals the progress condition
    /// variable, so a scheduler that is already running picks the task up.
    pub fn create_task<B>(&self, body: B) -> TaskRef
    where
        B: FnOnce(Vec<Value>) -> Result<Value, Error> + Send + 'static,
    {
        self.create_task_with(TaskOpts::new(), body)
    }

    /// Register a task with explicit options.
    pub fn create_task_with<B>(&self, opts: TaskOpts, body: B) -> TaskRef
    where
        B: FnOnce(Vec<Value>) -> Result<Value, Error> + Send + 'static,
    {
        let id = {
            let mut state = self.core.state.lock().unwrap();
            let id = state.next_task;
            state.next_task += 1;
            let task = Task::new(id, opts, Box::new(body) as TaskBody);
            trace!("Registered task {} '{}'", id, task.name);
            state.tasks.insert(id, task);
            id
        };
        self.core.progress.notify_all();
        TaskRef { id }
    }

    /// Serial composition: make every task of `downstream` depend on every
    /// task of `upstream` (a complete bipartite set of edges, appended
    /// without deduplication), and return the downstream operand for further
    /// composition.
    pub fn chain<L, R>(&self, upstream: L, downstream: R) -> Operand
    where
        L: Into<Operand>,
        R: Into<Operand>,
    {
        let upstream = upstream.into();
        let downstream = downstream.into();
        let mut state = self.core.state.lock().unwrap();
        for producer in upstream.tasks() {
            for consumer in downstream.tasks() {
                if let Some(task) = state.tasks.get_mut(&consumer.id) {
                    task.inputs.push(producer.id);
                }
                if let Some(task) = state.tasks.get_mut(&producer.id) {
                    task.outputs.push(consumer.id);
                }
            }
        }
        downstream
    }

    /// Parallel composition: a new group holding the tasks of `left` followed
    /// by the tasks of `right`. No edges are touched.
    pub fn bundle<L, R>(&self, left: L, right: R) -> Group
    where
        L: Into<Operand>,
        R: Into<Operand>,
    {
        let left = left.into();
        let right = right.into();
        let mut members = Vec::with_capacity(left.tasks().len() + right.tasks().len());
        members.extend_from_slice(left.tasks());
        members.extend_from_slice(right.tasks());
        Group { members }
    }

    /// Substitute every task leaf of `outcome` by its final result.
    ///
    /// A task without a result (it never ran, or pruning dropped it from the
    /// registry) resolves to null. At the top level a one-element sequence
    /// unwraps to its sole element; longer sequences become an array.
    pub fn resolve(&self, outcome: Outcome) -> Value {
        let state = self.core.state.lock().unwrap();
        match outcome {
            Outcome::Seq(items) => {
                let mut values: Vec<Value> =
                    items.into_iter().map(|item| substitute(&state, item)).collect();
                if values.len() == 1 {
                    values.remove(0)
                } else {
                    Value::Array(values)
                }
            }
            other => substitute(&state, other),
        }
    }
}

fn substitute(state: &GraphState, outcome: Outcome) -> Value {
    match outcome {
        Outcome::Value(value) => value,
        Outcome::Node(task) => state
            .tasks
            .get(&task.id)
            .and_then(|task| task.result.clone())
            .unwrap_or(Value::Null),
        Outcome::Seq(items) => {
            Value::Array(items.into_iter().map(|item| substitute(state, item)).collect())
        }
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        let state = self.core.state.lock().unwrap();
        formatter
            .debug_struct("Graph")
            .field("tasks", &state.tasks.len())
            .field("workers", &state.workers.len())
            .field("failed", &state.failure.is_some())
            .finish()
    }
}
