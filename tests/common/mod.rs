#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, Mutex};

/// Initialize the log facade once per test binary.
pub fn setup() {
    let _ = env_logger::Builder::from_default_env()
        .is_test(true)
        .try_init();
}

/// A clonable sink capturing the run log, so tests can assert on its lines.
#[derive(Clone, Default)]
pub struct CapturedLog {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLog {
    pub fn new() -> CapturedLog {
        CapturedLog::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
