//! Shared helpers for the integration tests.

use std::io;
use std::sync::{Arc, Mutex};

use reqlog::{Logger, LoggerBuilder};
use serde_json::Value;

/// In-memory output stream. Clones share one buffer.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    /// Every record written so far, parsed.
    pub fn records(&self) -> Vec<Value> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(|line| serde_json::from_str(line).expect("record is JSON"))
            .collect()
    }
}

/// A builder already writing into `capture`.
pub fn builder(capture: &Capture) -> LoggerBuilder {
    let capture = capture.clone();
    Logger::builder().stream(move || capture.clone())
}

/// Access records only (handler lines carry no `status_code`).
#[allow(dead_code)]
pub fn access_records(capture: &Capture) -> Vec<Value> {
    capture
        .records()
        .into_iter()
        .filter(|r| r.get("status_code").is_some())
        .collect()
}
