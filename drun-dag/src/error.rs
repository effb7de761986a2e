use std::path::PathBuf;

use thiserror::Error;

/// An error produced while building or running a graph.
///
/// A run surfaces exactly one of these: analysis errors are raised before any
/// worker starts, and the scheduler keeps only the first failure reported by
/// a worker. Later failures observed while the remaining workers drain are
/// dropped.
#[derive(Debug, Error)]
pub enum RunError {
    /// The dependency edges do not form a DAG.
    #[error("dependency cycle: {0}")]
    Cycle(String),
    /// The graph builder was used incorrectly.
    #[error("graph misuse: {0}")]
    Usage(String),
    /// A command task's subprocess exited with a non-zero code.
    #[error("command '{command}' exited with code {code}")]
    Exec {
        /// The command line that failed, joined with spaces.
        command: String,
        /// The exit code of the process (-1 if terminated by a signal).
        code: i32,
    },
    /// A user task body returned an error.
    #[error("task '{task}' failed: {cause}")]
    Body {
        /// The name of the failing task.
        task: String,
        /// The error the body returned.
        cause: anyhow::Error,
    },
    /// A checkpoint file exists but cannot be read back, or cannot be
    /// written after a successful task.
    #[error("broken checkpoint {path:?}: {cause}")]
    Checkpoint {
        /// The path of the offending checkpoint.
        path: PathBuf,
        /// The underlying codec or I/O error.
        cause: anyhow::Error,
    },
}
