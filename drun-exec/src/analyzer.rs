use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use drun_dag::{Graph, GraphCore, GraphState, RunError, TaskId, TaskState};

/// The visit color of a task during the depth-first traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Not reached yet.
    White,
    /// On the current visit path; reaching a gray task again is a cycle.
    Gray,
    /// Fully visited.
    Black,
}

/// The bookkeeping of one analysis pass.
#[derive(Default)]
struct Analysis {
    colors: HashMap<TaskId, Color>,
    /// Tasks that survive with a body still to run.
    pending: Vec<TaskId>,
    /// Tasks elided by a checkpoint hit; kept in the registry so their
    /// consumers can read the loaded results.
    skipped: Vec<TaskId>,
}

/// Validate that the graph is acyclic and elide every subgraph whose terminal
/// task has a checkpoint on disk.
///
/// Goals are the tasks with no dependents; a non-empty graph without goals
/// cannot be acyclic. From each goal the input edges are walked depth-first:
/// a task whose checkpoint file exists gets its stored value loaded, becomes
/// `Skipped`, and its upstream is not visited at all. Afterwards the registry
/// is replaced by the set of visited tasks; edge lists are left untouched, so
/// the scheduler simply observes skipped inputs as already complete.
///
/// A checkpoint file that exists but cannot be decoded aborts the analysis.
pub fn analyze(graph: &Graph) -> Result<(), RunError> {
    let core = graph.core().clone();
    let mut state = core.state.lock().unwrap();

    let goals: Vec<TaskId> = state
        .tasks
        .values()
        .filter(|task| task.outputs.is_empty())
        .map(|task| task.id)
        .collect();
    if goals.is_empty() && !state.tasks.is_empty() {
        return Err(RunError::Cycle(
            "every task has a downstream dependent, nowhere to start from".into(),
        ));
    }

    let mut analysis = Analysis::default();
    for goal in goals {
        analysis.visit(&core, &mut state, goal)?;
    }

    let before = state.tasks.len();
    let keep: HashSet<TaskId> = analysis
        .pending
        .iter()
        .chain(analysis.skipped.iter())
        .copied()
        .collect();
    let dropped: Vec<String> = state
        .tasks
        .values()
        .filter(|task| !keep.contains(&task.id))
        .map(|task| task.name.clone())
        .collect();
    state.tasks.retain(|id, _| keep.contains(id));

    let elided = before - analysis.pending.len();
    if elided > 0 {
        if !dropped.is_empty() {
            debug!("Dropped from the registry: {}", dropped.iter().join(", "));
        }
        core.log_line(format_args!("DR: {} tasks were skipped thanks to ckpts", elided));
    }
    Ok(())
}

impl Analysis {
    fn visit(
        &mut self,
        core: &GraphCore,
        state: &mut GraphState,
        id: TaskId,
    ) -> Result<(), RunError> {
        match self.colors.get(&id).copied().unwrap_or(Color::White) {
            Color::Gray => {
                let name = state
                    .tasks
                    .get(&id)
                    .map(|task| task.name.clone())
                    .unwrap_or_else(|| id.to_string());
                return Err(RunError::Cycle(format!("'{}' is part of a cycle", name)));
            }
            Color::Black => return Ok(()),
            Color::White => {}
        }
        let (name, ckpt, inputs) = match state.tasks.get(&id) {
            Some(task) => (task.name.clone(), task.ckpt.clone(), task.inputs.clone()),
            None => return Ok(()),
        };
        if let Some(path) = ckpt {
            if path.exists() {
                let value = drun_store::load(&path).map_err(|cause| RunError::Checkpoint {
                    path: path.clone(),
                    cause,
                })?;
                if let Some(task) = state.tasks.get_mut(&id) {
                    task.result = Some(value);
                    task.state = TaskState::Skipped;
                }
                core.log_line(format_args!(
                    "DR: there is a ckpt {} for {}",
                    path.display(),
                    name
                ));
                self.colors.insert(id, Color::Black);
                self.skipped.push(id);
                return Ok(());
            }
        }
        self.colors.insert(id, Color::Gray);
        self.pending.push(id);
        for input in inputs {
            self.visit(core, state, input)?;
        }
        self.colors.insert(id, Color::Black);
        Ok(())
    }
}
