//! Per-session trace logging.
//!
//! When `StreamConfig::trace_log_dir` is set, every event going into and
//! out of a coordinator is appended to `{dir}/{session_id}.log`. Diagnostics
//! that are not part of the trace go through the `log` facade instead.

use chrono::{SecondsFormat, Utc};
use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::{Arc, Mutex},
};

/// Thread-safe handle to an append-only log file.
pub type LogHandle = Arc<Mutex<Option<File>>>;

/// Current UTC time as ISO 8601 with milliseconds (e.g. 2026-02-04T10:15:30.123Z).
fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// True when the handle holds an open file.
pub fn is_enabled(handle: &LogHandle) -> bool {
    handle.lock().map(|guard| guard.is_some()).unwrap_or(false)
}

/// Write a timestamped line to the log file (if present).
pub fn log_line(handle: &LogHandle, direction: &str, data: &str) {
    if let Ok(mut guard) = handle.lock() {
        if let Some(ref mut file) = *guard {
            let ts = utc_timestamp();
            if let Err(err) = writeln!(file, "[{}] {}: {}", ts, direction, data) {
                log::warn!("Failed to write trace line: {}", err);
            }
        }
    }
}

/// Open (or create) a log file at `{log_dir}/{log_id}.log` and return a shared handle.
///
/// With no directory, or when the file cannot be opened, the handle is empty
/// and [`log_line`] does nothing.
pub fn open_log_file(log_dir: Option<&str>, log_id: &str) -> LogHandle {
    let file = log_dir.and_then(|dir| {
        let path = Path::new(dir).join(format!("{}.log", log_id));
        let opened = std::fs::create_dir_all(dir).and_then(|_| {
            OpenOptions::new().create(true).append(true).open(&path)
        });
        match opened {
            Ok(file) => Some(file),
            Err(err) => {
                log::warn!("Failed to open trace log {}: {}", path.display(), err);
                None
            }
        }
    });
    Arc::new(Mutex::new(file))
}
