use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use serde_json::Value;

use drun_dag::{
    Graph, GraphCore, GraphState, RunError, TaskBody, TaskId, TaskState, WorkerId,
};

/// Run the graph until quiescence, dispatching every ready task to its own
/// worker thread.
///
/// The calling thread is the coordinator: it scans the registry for `Pending`
/// tasks whose inputs are all complete, marks them `Running`, spawns workers,
/// and then waits on the graph's condition variable for progress. Wake-ups
/// come from worker completion and from task registration inside running
/// bodies, so dynamically created tasks are picked up on the next scan.
///
/// On the first worker failure no further tasks are dispatched; the
/// coordinator keeps waiting until every outstanding worker has published
/// and deregistered itself, then returns that failure. Failures reported
/// while draining are dropped.
pub fn execute(graph: &Graph) -> Result<(), RunError> {
    let core = graph.core().clone();
    let mut state = core.state.lock().unwrap();
    loop {
        if state.failure.is_none() {
            dispatch(&core, &mut state);
        }
        if state.workers.is_empty() {
            // quiescent: nothing runs and nothing new can become ready
            return match state.failure.take() {
                Some(failure) => Err(failure),
                None => Ok(()),
            };
        }
        state = core.progress.wait(state).unwrap();
    }
}

/// Move every ready task to `Running` and spawn its worker.
fn dispatch(core: &Arc<GraphCore>, state: &mut GraphState) {
    let ready: Vec<TaskId> = state
        .tasks
        .values()
        .filter(|task| task.state == TaskState::Pending && state.inputs_complete(task))
        .map(|task| task.id)
        .collect();
    for id in ready {
        let inputs: Vec<Value> = match state.tasks.get(&id) {
            Some(task) => task
                .inputs
                .iter()
                .map(|input| {
                    state
                        .tasks
                        .get(input)
                        .and_then(|task| task.result.clone())
                        .unwrap_or(Value::Null)
                })
                .collect(),
            None => continue,
        };
        let (name, ckpt, body) = match state.tasks.get_mut(&id) {
            Some(task) => {
                task.state = TaskState::Running;
                (task.name.clone(), task.ckpt.clone(), task.body.take())
            }
            None => continue,
        };
        let body = match body {
            Some(body) => body,
            None => continue,
        };
        core.log_line(format_args!("DR: start {}", name));
        let worker_id = state.next_worker;
        state.next_worker += 1;
        let worker_core = core.clone();
        let worker_name = name.clone();
        let handle = thread::Builder::new()
            .name(format!("Worker of '{}'", name))
            .spawn(move || run_worker(worker_core, id, worker_id, worker_name, ckpt, body, inputs));
        match handle {
            Ok(handle) => {
                state.workers.insert(worker_id, handle);
            }
            Err(err) => {
                if state.failure.is_none() {
                    state.failure = Some(RunError::Body {
                        task: name,
                        cause: anyhow::Error::new(err).context("Failed to spawn the worker thread"),
                    });
                }
                break;
            }
        }
    }
}

/// The body of a worker thread: run the task body with the mutex released,
/// then re-acquire it to publish the result (or the failure) and deregister.
fn run_worker(
    core: Arc<GraphCore>,
    task_id: TaskId,
    worker_id: WorkerId,
    name: String,
    ckpt: Option<PathBuf>,
    body: TaskBody,
    inputs: Vec<Value>,
) {
    trace!("Worker {} picked up task '{}'", worker_id, name);
    let outcome = body(inputs);
    let mut state = core.state.lock().unwrap();
    match outcome {
        Ok(value) => {
            let persisted = match &ckpt {
                Some(path) => {
                    drun_store::store(path, &value).map_err(|cause| RunError::Checkpoint {
                        path: path.clone(),
                        cause,
                    })
                }
                None => Ok(()),
            };
            match persisted {
                Ok(()) => {
                    if let Some(task) = state.tasks.get_mut(&task_id) {
                        task.result = Some(value);
                        task.state = TaskState::Done;
                    }
                }
                Err(failure) => {
                    if state.failure.is_none() {
                        state.failure = Some(failure);
                    }
                }
            }
        }
        Err(err) => {
            // keep typed engine errors (e.g. a non-zero exit) as they are
            let failure = match err.downcast::<RunError>() {
                Ok(known) => known,
                Err(other) => RunError::Body { task: name, cause: other },
            };
            if state.failure.is_none() {
                state.failure = Some(failure);
            } else {
                trace!("Dropping a failure observed while draining");
            }
        }
    }
    state.workers.remove(&worker_id);
    drop(state);
    core.progress.notify_all();
}
