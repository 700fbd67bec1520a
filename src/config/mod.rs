//! Command-line parsing and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use crate::dictation::DEFAULT_HOTKEY;
use clap::Parser;
use std::path::PathBuf;

pub use defaults::{
    DEFAULT_ASR_CONNECT_TIMEOUT_MS, DEFAULT_ASR_FRAME_SAMPLES, DEFAULT_ASR_HOLD_MS,
    DEFAULT_ASR_QUIET_MS, DEFAULT_ASR_STOP_GRACE_MS, DEFAULT_UPLOAD_CHUNK_SIZE,
    DEFAULT_UPLOAD_MESSAGE_SIZE, DEFAULT_UPLOAD_PAUSE_MS,
};

/// CLI options for the ttylink client. Validated values feed the upload and
/// dictation configs handed to the runtime.
#[derive(Debug, Parser, Clone)]
#[command(about = "ttylink terminal client", author, version)]
pub struct AppConfig {
    /// Terminal page URL (http(s)://host[:port]/path/)
    #[arg(long, env = "TTYLINK_URL")]
    pub url: Option<String>,

    /// Query string appended to websocket URLs (without '?')
    #[arg(long = "ws-query-args", value_name = "QUERY")]
    pub ws_query_args: Option<String>,

    /// Token sent in the dictation handshake
    #[arg(
        long = "auth-token",
        env = "TTYLINK_AUTH_TOKEN",
        default_value = "",
        hide_env_values = true
    )]
    pub auth_token: String,

    /// The server accepts keyboard input (gotty --permit-write)
    #[arg(long = "permit-write", default_value_t = false)]
    pub permit_write: bool,

    /// Largest message the server accepts, until it announces its own (bytes)
    #[arg(long = "upload-message-size", default_value_t = DEFAULT_UPLOAD_MESSAGE_SIZE)]
    pub upload_message_size: usize,

    /// Preferred raw bytes per upload chunk
    #[arg(long = "upload-chunk-size", default_value_t = DEFAULT_UPLOAD_CHUNK_SIZE)]
    pub upload_chunk_size: usize,

    /// Pause between consecutive files of one upload (milliseconds)
    #[arg(long = "upload-pause-ms", default_value_t = DEFAULT_UPLOAD_PAUSE_MS)]
    pub upload_pause_ms: u64,

    /// Enable push-to-talk dictation
    #[arg(long = "enable-asr", env = "TTYLINK_ENABLE_ASR", default_value_t = false)]
    pub enable_asr: bool,

    /// How long the hotkey must be held before recording starts (milliseconds)
    #[arg(long = "asr-hold-ms", default_value_t = DEFAULT_ASR_HOLD_MS)]
    pub asr_hold_ms: u64,

    /// Physical key that starts dictation when held
    #[arg(long = "asr-hotkey", default_value = DEFAULT_HOTKEY)]
    pub asr_hotkey: String,

    /// Give up on the dictation server after this long (milliseconds)
    #[arg(long = "asr-connect-timeout-ms", default_value_t = DEFAULT_ASR_CONNECT_TIMEOUT_MS)]
    pub asr_connect_timeout_ms: u64,

    /// Wait for final transcript segments after stopping (milliseconds)
    #[arg(long = "asr-stop-grace-ms", default_value_t = DEFAULT_ASR_STOP_GRACE_MS)]
    pub asr_stop_grace_ms: u64,

    /// Extension granted by each late segment (milliseconds)
    #[arg(long = "asr-quiet-ms", default_value_t = DEFAULT_ASR_QUIET_MS)]
    pub asr_quiet_ms: u64,

    /// Native samples per audio buffer (power of two)
    #[arg(long = "asr-frame-samples", default_value_t = DEFAULT_ASR_FRAME_SAMPLES)]
    pub asr_frame_samples: usize,

    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Print dictation and upload readiness and exit
    #[arg(long = "doctor", default_value_t = false)]
    pub doctor: bool,

    /// Show how files would be chunked with the current settings and exit
    #[arg(long = "plan-upload", value_name = "FILE", num_args = 1..)]
    pub plan_upload: Vec<PathBuf>,

    /// Record one dictation for this many seconds, print the transcript and exit
    #[arg(long = "dictate-once", value_name = "SECONDS")]
    pub dictate_once: Option<u64>,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "TTYLINK_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "TTYLINK_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow logging transcript text and file names (debug log only)
    #[arg(
        long = "log-content",
        env = "TTYLINK_LOG_CONTENT",
        default_value_t = false
    )]
    pub log_content: bool,
}
