//! Surface of the terminal widget this crate drives.
//!
//! Rendering and emulation live outside; the client only needs to write
//! output, show transient overlay messages and toggle keyboard input.

use std::time::Duration;

/// Display side of the terminal widget.
pub trait TerminalView {
    fn write_output(&mut self, data: &[u8]);

    /// Show an overlay message. `None` keeps it until [`remove_message`](Self::remove_message).
    fn show_message(&mut self, message: &str, timeout: Option<Duration>);

    fn remove_message(&mut self);

    fn set_stdin_enabled(&mut self, enabled: bool);

    fn set_window_title(&mut self, title: &str);
}

/// A terminal that can also inject bytes as if the user had typed them.
pub trait TerminalSink: TerminalView {
    fn send_input(&mut self, data: &[u8]);
}

/// Overlay message as recorded by [`MemoryTerminal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownMessage {
    pub text: String,
    pub timeout: Option<Duration>,
}

/// Headless terminal that records every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryTerminal {
    pub output: Vec<u8>,
    pub sent_input: Vec<Vec<u8>>,
    pub messages: Vec<ShownMessage>,
    pub current_message: Option<String>,
    pub stdin_enabled: bool,
    pub title: Option<String>,
}

impl Default for MemoryTerminal {
    fn default() -> Self {
        Self {
            output: Vec::new(),
            sent_input: Vec::new(),
            messages: Vec::new(),
            current_message: None,
            stdin_enabled: true,
            title: None,
        }
    }
}

impl MemoryTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_text(&self) -> Vec<String> {
        self.sent_input
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect()
    }

    pub fn last_message(&self) -> Option<&str> {
        self.messages.last().map(|message| message.text.as_str())
    }
}

impl TerminalView for MemoryTerminal {
    fn write_output(&mut self, data: &[u8]) {
        self.output.extend_from_slice(data);
    }

    fn show_message(&mut self, message: &str, timeout: Option<Duration>) {
        self.messages.push(ShownMessage {
            text: message.to_string(),
            timeout,
        });
        self.current_message = Some(message.to_string());
    }

    fn remove_message(&mut self) {
        self.current_message = None;
    }

    fn set_stdin_enabled(&mut self, enabled: bool) {
        self.stdin_enabled = enabled;
    }

    fn set_window_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }
}

impl TerminalSink for MemoryTerminal {
    fn send_input(&mut self, data: &[u8]) {
        self.sent_input.push(data.to_vec());
    }
}
