//! Opt-in file logging.
//!
//! Everything is off until [`init_logging`] runs with logging enabled. Lines
//! that may carry user content (transcripts, file names) go through
//! [`log_debug_content`] and need the separate content switch.

use std::{
    env, fs,
    io::Write,
    panic,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, OnceLock,
    },
    time::{SystemTime, UNIX_EPOCH},
};

const LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;
const CRASH_LOG_MAX_BYTES: u64 = 256 * 1024;
static LOG_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_CONTENT_ENABLED: AtomicBool = AtomicBool::new(false);
static DEBUG_LOG: OnceLock<Mutex<Option<RotatingFile>>> = OnceLock::new();

/// Which log sinks are active for this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogSettings {
    pub enabled: bool,
    /// Allow transcript text and file names in the debug log.
    pub content: bool,
}

/// Debug log location; truncated once it grows past 5 MiB.
pub fn log_file_path() -> PathBuf {
    env::temp_dir().join("ttylink.log")
}

/// Crash log location (metadata only unless content logging is on).
pub fn crash_log_path() -> PathBuf {
    env::temp_dir().join("ttylink_crash.log")
}

struct RotatingFile {
    path: PathBuf,
    file: fs::File,
    max_bytes: u64,
    bytes_written: u64,
}

impl RotatingFile {
    fn open(path: PathBuf, max_bytes: u64) -> Option<Self> {
        let mut bytes_written = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if bytes_written > max_bytes {
            let _ = fs::remove_file(&path);
            bytes_written = 0;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok()?;
        Some(Self {
            path,
            file,
            max_bytes,
            bytes_written,
        })
    }

    fn write_line(&mut self, line: &str) {
        if self.bytes_written.saturating_add(line.len() as u64) > self.max_bytes {
            if let Ok(file) = fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)
            {
                self.file = file;
                self.bytes_written = 0;
            }
        }
        if self.file.write_all(line.as_bytes()).is_ok() {
            self.bytes_written = self.bytes_written.saturating_add(line.len() as u64);
        }
    }
}

fn debug_log() -> &'static Mutex<Option<RotatingFile>> {
    DEBUG_LOG.get_or_init(|| Mutex::new(None))
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub fn init_logging(settings: LogSettings) {
    LOG_ENABLED.store(settings.enabled, Ordering::Relaxed);
    LOG_CONTENT_ENABLED.store(settings.enabled && settings.content, Ordering::Relaxed);

    let mut writer = debug_log()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *writer = if settings.enabled {
        RotatingFile::open(log_file_path(), LOG_MAX_BYTES)
    } else {
        None
    };
}

/// Append a timestamped line to the debug log when logging is enabled.
pub fn log_debug(msg: &str) {
    if !LOG_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let line = format!("[{}] {msg}\n", unix_seconds());
    let mut writer = debug_log()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(writer) = writer.as_mut() {
        writer.write_line(&line);
    }
}

/// Like [`log_debug`], but only when content logging was also requested.
pub fn log_debug_content(msg: &str) {
    if !LOG_CONTENT_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    log_debug(msg);
}

/// Panic hook body: one line with location and version, payload only with content logging.
pub fn log_panic(info: &panic::PanicHookInfo<'_>) {
    if !LOG_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let location = info
        .location()
        .map(|loc| format!("{}:{}", loc.file(), loc.line()))
        .unwrap_or_else(|| "unknown".to_string());

    let payload = if LOG_CONTENT_ENABLED.load(Ordering::Relaxed) {
        if let Some(text) = info.payload().downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = info.payload().downcast_ref::<String>() {
            text.clone()
        } else {
            "non-string panic payload".to_string()
        }
    } else {
        "panic payload omitted (log-content disabled)".to_string()
    };

    let line = format!(
        "[{}] panic at {location}: {payload} (v{})\n",
        unix_seconds(),
        env!("CARGO_PKG_VERSION")
    );
    if let Some(mut crash_log) = RotatingFile::open(crash_log_path(), CRASH_LOG_MAX_BYTES) {
        crash_log.write_line(&line);
    }
}
