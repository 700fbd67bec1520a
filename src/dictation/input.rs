//! Input events the dictation controller listens to.
//!
//! The embedding UI publishes key, click, focus and visibility events on an
//! [`InputBus`] owned by the controller. Once the controller shuts down the
//! bus is gone and publishing fails instead of reaching a dead listener.

use crossbeam_channel::{unbounded, Receiver, Sender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// `code` is a physical key name such as `ShiftRight`.
    KeyDown {
        code: String,
        repeat: bool,
        alt: bool,
        ctrl: bool,
        meta: bool,
    },
    KeyUp {
        code: String,
    },
    /// Press on the dictation toggle.
    Click,
    WindowBlur,
    VisibilityHidden,
    TerminalFocus(bool),
}

impl InputEvent {
    pub fn key_down(code: impl Into<String>) -> Self {
        InputEvent::KeyDown {
            code: code.into(),
            repeat: false,
            alt: false,
            ctrl: false,
            meta: false,
        }
    }

    pub fn key_up(code: impl Into<String>) -> Self {
        InputEvent::KeyUp { code: code.into() }
    }
}

/// Cloneable handle for producers on any thread.
#[derive(Debug, Clone)]
pub struct InputPublisher {
    sender: Sender<InputEvent>,
}

impl InputPublisher {
    /// False once the owning controller has shut down.
    pub fn publish(&self, event: InputEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

#[derive(Debug)]
pub struct InputBus {
    sender: Sender<InputEvent>,
    receiver: Receiver<InputEvent>,
}

impl InputBus {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub fn publisher(&self) -> InputPublisher {
        InputPublisher {
            sender: self.sender.clone(),
        }
    }

    pub fn drain(&self) -> Vec<InputEvent> {
        self.receiver.try_iter().collect()
    }
}

impl Default for InputBus {
    fn default() -> Self {
        Self::new()
    }
}
