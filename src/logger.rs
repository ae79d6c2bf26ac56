//! Session logger — writes log output to a single file chosen by the host.
//!
//! The engine is a library, so nothing is logged until the host calls
//! [`init`] with a path; every macro is a silent no-op before that. The file
//! is truncated at each `init`, so it only ever contains output from the
//! most-recent session.
//!
//! Usage — anywhere in the crate use the `log_info!` / `log_warn!` /
//! `log_err!` macros, or call `logger::write_line(...)` directly.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Returns the path to the current session log file, if initialised.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

/// Write a line to the session log. Silently ignores I/O errors so that
/// logging never crashes the host.
pub fn write_line(line: &str) {
    if let Some(mutex) = LOG_FILE.get()
        && let Ok(mut file) = mutex.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
}

/// Write a timestamped, level-tagged line to the session log.
pub fn write(level: &str, msg: &str) {
    let ts = timestamp();
    write_line(&format!("[{}] [{}] {}", ts, level, msg));
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write("INFO", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write("WARN", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write("ERROR", &format!($($arg)*));
    };
}

/// Initialise the session logger. Creates (or truncates) the log file at
/// `path`. Calling more than once keeps the first sink.
pub fn init(path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Ok(file) = File::create(path) {
        let _ = LOG_FILE.set(Mutex::new(file));
        let _ = LOG_PATH.set(path.to_path_buf());
        write("INFO", "session log started");
    }
}

/// Seconds.millis since the Unix epoch — enough resolution to order events
/// within a session without pulling in a time crate.
fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => format!("{}.{:03}", d.as_secs(), d.subsec_millis()),
        Err(_) => "0.000".to_string(),
    }
}
