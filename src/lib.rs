//! ttylink: a terminal client for gotty-style servers with chunked file
//! upload and push-to-talk dictation.

pub mod app;
pub mod asr;
pub mod audio;
pub mod channel;
pub mod config;
pub mod dictation;
pub mod doctor;
mod lock;
pub mod observers;
pub mod telemetry;
pub mod terminal;
pub mod timers;
pub mod transcript;
pub mod upload;

pub(crate) use lock::lock_or_recover;
pub use app::{
    crash_log_path, init_logging, log_debug, log_debug_content, log_file_path, log_panic,
    LogSettings,
};
pub use telemetry::init_tracing;
