//! Checkpoint codec for the task results of a graph.
//!
//! A checkpoint is a single file at a user-supplied path holding one task
//! result. The encoding is JSON, so it is self-describing and round-trips the
//! value types a task body can produce (strings, numbers, sequences,
//! mappings). Writes go through a temporary file in the same directory which
//! is then renamed into place, so a reader either sees the complete previous
//! content or the complete new one, never a partial file.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use tempdir::TempDir;
//!
//! let dir = TempDir::new("drun-test").unwrap();
//! let path = dir.path().join("result");
//! drun_store::store(&path, &json!({"answer": 42})).unwrap();
//! assert_eq!(drun_store::load(&path).unwrap(), json!({"answer": 42}));
//! ```

#![deny(missing_docs)]

#[macro_use]
extern crate log;

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Error};
use serde_json::Value;

/// Persist `value` at `path`, replacing any previous checkpoint.
///
/// Missing parent directories are created. The value is encoded into a
/// temporary file next to the destination and renamed into place, assuming
/// the usual same-filesystem atomicity of `rename`.
pub fn store(path: &Path, value: &Value) -> Result<(), Error> {
    let parent = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    if let Some(dir) = parent {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create checkpoint directory {}", dir.display()))?;
    }
    let tmpdir = tempdir::TempDir::new_in(parent.unwrap_or_else(|| Path::new(".")), "ckpt")
        .context("Failed to create temporary directory for the checkpoint")?;
    let tmpfile_path = tmpdir.path().join("value");
    let tmpfile = File::create(&tmpfile_path)
        .context("Failed to create temporary checkpoint file")?;
    serde_json::to_writer(tmpfile, value)
        .with_context(|| format!("Cannot encode checkpoint {}", path.display()))?;
    std::fs::rename(&tmpfile_path, path)
        .with_context(|| format!("Failed to rename {} -> {}", tmpfile_path.display(), path.display()))?;
    trace!("Stored checkpoint {}", path.display());
    Ok(())
}

/// Read back the value stored at `path`.
///
/// Fails if the file is missing or its content cannot be decoded, with a
/// message distinguishing the two cases; callers decide which is fatal.
pub fn load(path: &Path) -> Result<Value, Error> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open checkpoint {}", path.display()))?;
    let value = serde_json::from_reader(file)
        .with_context(|| format!("Checkpoint {} is not decodable", path.display()))?;
    trace!("Loaded checkpoint {}", path.display());
    Ok(value)
}
