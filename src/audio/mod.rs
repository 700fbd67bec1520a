//! Microphone capture for dictation.
//!
//! Audio is captured via CPAL, downmixed to mono, cut into fixed native
//! frames and block-averaged down to 16kHz before it is streamed to the
//! recognition side channel. Nothing is buffered beyond one partial frame.

use thiserror::Error;

/// Sample rate the recognition side channel expects.
pub const TARGET_RATE: u32 = 16_000;

mod dispatch;
mod recorder;
mod resample;

pub use dispatch::FrameSink;
pub use recorder::{
    AudioCaptureEngine, CaptureConfig, CaptureSession, CaptureStats, DEFAULT_FRAME_SAMPLES,
};
pub use resample::{resample_block_average, resampled_len};

/// Reasons the microphone could not be opened. Each maps to a distinct
/// user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("microphone access denied. {hint}")]
    PermissionDenied { hint: &'static str },
    #[error("no microphone available")]
    NoMicrophone,
    #[error("input device '{0}' not found")]
    DeviceNotFound(String),
    #[error("microphone access requires a secure connection (https/wss or localhost)")]
    InsecureContext,
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),
    #[error("a capture is already active")]
    AlreadyActive,
    #[error("audio device error: {0}")]
    Device(String),
}
