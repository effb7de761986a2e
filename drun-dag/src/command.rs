use std::io;
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{Context, Error};
use serde_json::Value;

use crate::{Graph, RunError, TaskOpts, TaskRef};

impl Graph {
    /// Register a task backed by a subprocess, with default options.
    ///
    /// The task accepts zero or one input. The input, if any, is stringified
    /// and fed to the child's stdin; the captured stdout becomes the task's
    /// result when the child exits with code zero, and a non-zero exit fails
    /// the task with the exit code.
    ///
    /// ```
    /// use drun_dag::Graph;
    ///
    /// let graph = Graph::new(std::io::sink());
    /// let hello = graph.create_cmd(vec!["echo", "hello"]);
    /// let shout = graph.create_cmd(vec!["tr", "a-z", "A-Z"]);
    /// graph.chain(hello, shout);
    /// ```
    pub fn create_cmd<I, S>(&self, argv: I) -> TaskRef
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.create_cmd_with(TaskOpts::new(), argv)
    }

    /// Register a subprocess task with explicit options.
    pub fn create_cmd_with<I, S>(&self, opts: TaskOpts, argv: I) -> TaskRef
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        self.create_task_with(opts, move |inputs| run_command(&argv, inputs))
    }
}

/// Spawn `argv` feeding it at most one input and capturing its stdout.
pub(crate) fn run_command(argv: &[String], inputs: Vec<Value>) -> Result<Value, Error> {
    if argv.is_empty() {
        return Err(RunError::Usage("a command task needs a non-empty argv".into()).into());
    }
    if inputs.len() > 1 {
        return Err(RunError::Usage(format!(
            "a command task accepts at most one input, got {}",
            inputs.len()
        ))
        .into());
    }
    let program = which::which(&argv[0])
        .with_context(|| format!("Executable '{}' not found in PATH", argv[0]))?;
    let payload = inputs.into_iter().next().map(|value| value_to_string(&value));

    let mut command = Command::new(program);
    command
        .args(&argv[1..])
        .stdin(if payload.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());
    trace!("Spawning {:?}", argv);
    let mut child = command
        .spawn()
        .with_context(|| format!("Failed to spawn '{}'", argv[0]))?;
    // feed stdin from its own thread: both pipes are bounded, so writing the
    // whole payload before draining stdout can deadlock past the pipe size
    let writer = match payload {
        Some(text) => child.stdin.take().map(|mut stdin| {
            // dropping stdin closes the pipe once the write is done
            thread::spawn(move || stdin.write_all(text.as_bytes()))
        }),
        None => None,
    };
    let output = child
        .wait_with_output()
        .with_context(|| format!("Failed to wait for '{}'", argv[0]))?;
    if let Some(writer) = writer {
        writer
            .join()
            .unwrap_or_else(|_| {
                Err(io::Error::new(io::ErrorKind::Other, "the stdin writer panicked"))
            })
            .with_context(|| format!("Cannot write the input of '{}'", argv[0]))?;
    }
    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        return Err(RunError::Exec { command: argv.join(" "), code }.into());
    }
    Ok(Value::String(String::from_utf8_lossy(&output.stdout).into_owned()))
}

/// The string form of a value fed to a subprocess: strings pass through raw,
/// anything else is JSON-encoded.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&json!("raw")), "raw");
        assert_eq!(value_to_string(&json!(42)), "42");
        assert_eq!(value_to_string(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn test_captures_stdout() {
        let argv = vec!["echo".to_string(), "hi".to_string()];
        let result = run_command(&argv, vec![]).unwrap();
        assert_eq!(result, json!("hi\n"));
    }

    #[test]
    fn test_feeds_stdin() {
        let argv = vec!["cat".to_string()];
        let result = run_command(&argv, vec![json!("piped\n")]).unwrap();
        assert_eq!(result, json!("piped\n"));
    }

    #[test]
    fn test_payload_larger_than_the_pipe_buffer() {
        let argv = vec!["cat".to_string()];
        let big = "x".repeat(1 << 20);
        let result = run_command(&argv, vec![json!(big.clone())]).unwrap();
        assert_eq!(result, json!(big));
    }

    #[test]
    fn test_nonzero_exit_is_exec_error() {
        let argv = vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()];
        let err = run_command(&argv, vec![]).unwrap_err();
        match err.downcast::<RunError>().unwrap() {
            RunError::Exec { code, .. } => assert_eq!(code, 3),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_too_many_inputs_is_usage_error() {
        let argv = vec!["echo".to_string()];
        let err = run_command(&argv, vec![json!(1), json!(2)]).unwrap_err();
        assert!(matches!(err.downcast::<RunError>().unwrap(), RunError::Usage(_)));
    }

    #[test]
    fn test_missing_executable() {
        let argv = vec!["surely-not-a-real-binary-0451".to_string()];
        assert!(run_command(&argv, vec![]).is_err());
    }
}
