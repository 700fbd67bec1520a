//! Press-and-hold / click-to-toggle dictation.
//!
//! [`DictationController`] owns the gesture state machine, the transcript of
//! the current attempt and the timers that drive it. Side effects go through
//! [`DictationHost`] (socket and microphone) and
//! [`TerminalSink`](crate::terminal::TerminalSink) (overlay and text injection).

mod controller;
mod input;
mod policy;
#[cfg(test)]
mod tests;

use crate::asr::{ClientFrame, ConnectionFailure, ConnectionId};
use crate::audio::{CaptureError, CaptureSession};
use std::time::Duration;

pub use controller::{DictationController, DictationEvent, DictationState, StartMode};
pub use input::{InputBus, InputEvent, InputPublisher};
pub use policy::{check_policy, PolicyRejection};

pub const DEFAULT_HOTKEY: &str = "ShiftRight";
pub const DEFAULT_HOLD: Duration = Duration::from_millis(500);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_millis(700);
pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictationConfig {
    pub enabled: bool,
    pub permit_write: bool,
    pub secure_context: bool,
    pub auth_token: String,
    pub hotkey: String,
    pub hold: Duration,
    pub connect_timeout: Duration,
    /// Wait after the user stops before the transcript is considered final.
    pub stop_grace: Duration,
    /// Extension granted by each late segment while finalizing.
    pub quiet_window: Duration,
}

impl Default for DictationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            permit_write: true,
            secure_context: true,
            auth_token: String::new(),
            hotkey: DEFAULT_HOTKEY.to_string(),
            hold: DEFAULT_HOLD,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            stop_grace: DEFAULT_STOP_GRACE,
            quiet_window: DEFAULT_QUIET_WINDOW,
        }
    }
}

/// Socket and microphone operations the controller needs.
///
/// Every call carries the attempt's [`ConnectionId`]; the host reports
/// socket activity back as [`SideChannelEvent`](crate::asr::SideChannelEvent)s
/// tagged with the same id.
pub trait DictationHost {
    fn microphone_available(&mut self) -> bool;

    fn open_side_channel(&mut self, conn: ConnectionId) -> Result<(), ConnectionFailure>;

    /// False when the frame could not be queued.
    fn send_side_channel(&mut self, conn: ConnectionId, frame: ClientFrame) -> bool;

    fn close_side_channel(&mut self, conn: ConnectionId);

    /// Open the microphone; buffers are reported back tagged with `conn`.
    fn start_capture(&mut self, conn: ConnectionId) -> Result<CaptureSession, CaptureError>;

    /// Release the microphone synchronously.
    fn stop_capture(&mut self);
}
