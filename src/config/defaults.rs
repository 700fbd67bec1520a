use crate::audio::DEFAULT_FRAME_SAMPLES;
use crate::dictation::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOLD, DEFAULT_QUIET_WINDOW, DEFAULT_STOP_GRACE,
};
use crate::upload::{DEFAULT_INTER_FILE_PAUSE, DEFAULT_MESSAGE_BUDGET, PREFERRED_CHUNK_SIZE};

pub const DEFAULT_UPLOAD_MESSAGE_SIZE: usize = DEFAULT_MESSAGE_BUDGET;
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = PREFERRED_CHUNK_SIZE;
pub const DEFAULT_UPLOAD_PAUSE_MS: u64 = DEFAULT_INTER_FILE_PAUSE.as_millis() as u64;
pub const DEFAULT_ASR_HOLD_MS: u64 = DEFAULT_HOLD.as_millis() as u64;
pub const DEFAULT_ASR_CONNECT_TIMEOUT_MS: u64 = DEFAULT_CONNECT_TIMEOUT.as_millis() as u64;
pub const DEFAULT_ASR_STOP_GRACE_MS: u64 = DEFAULT_STOP_GRACE.as_millis() as u64;
pub const DEFAULT_ASR_QUIET_MS: u64 = DEFAULT_QUIET_WINDOW.as_millis() as u64;
pub const DEFAULT_ASR_FRAME_SAMPLES: usize = DEFAULT_FRAME_SAMPLES;

pub(super) const MIN_UPLOAD_MESSAGE_SIZE: usize = 64;
pub(super) const MAX_UPLOAD_MESSAGE_SIZE: usize = 16 * 1024 * 1024;
pub(super) const MAX_UPLOAD_CHUNK_SIZE: usize = 4 * 1024 * 1024;
pub(super) const MAX_UPLOAD_PAUSE_MS: u64 = 10_000;
pub(super) const MIN_FRAME_SAMPLES: usize = 256;
pub(super) const MAX_FRAME_SAMPLES: usize = 16_384;
pub(super) const MAX_INPUT_DEVICE_LEN: usize = 256;
/// Physical key names as reported by keyboard events (`ShiftRight`, `KeyA`, `F9`).
pub(super) const HOTKEY_PATTERN: &str = r"^[A-Z][A-Za-z0-9]{1,31}$";
