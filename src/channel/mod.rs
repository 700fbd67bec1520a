//! Primary byte channel to the remote terminal session.
//!
//! The transport itself (websocket factory, handshake) lives outside this
//! crate; everything here talks to it through [`ByteChannel`]. Frames are
//! tagged with a single leading byte, see [`protocol`].

pub mod protocol;

use anyhow::Result;

pub use protocol::{ClientMessage, ServerMessage, UploadChunkMessage};

/// One outbound frame; the channel preserves the order frames are sent in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Binary(Vec<u8>),
}

impl OutboundFrame {
    pub fn len(&self) -> usize {
        match self {
            OutboundFrame::Text(text) => text.len(),
            OutboundFrame::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            OutboundFrame::Text(text) => text.as_bytes(),
            OutboundFrame::Binary(bytes) => bytes,
        }
    }
}

/// Writer half of the shared interactive channel.
///
/// Keystrokes, upload chunks and dictation text all go through the same
/// channel from the event loop thread, so no locking is involved.
pub trait ByteChannel {
    fn send(&mut self, frame: OutboundFrame) -> Result<()>;

    fn send_message(&mut self, message: &ClientMessage) -> Result<()> {
        self.send(message.to_frame()?)
    }
}

/// In-memory channel that records every frame; used for upload planning and tests.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    frames: Vec<OutboundFrame>,
    fail_after: Option<usize>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send after the first `accepted` frames fail.
    pub fn failing_after(accepted: usize) -> Self {
        Self {
            frames: Vec::new(),
            fail_after: Some(accepted),
        }
    }

    pub fn frames(&self) -> &[OutboundFrame] {
        &self.frames
    }

    pub fn take_frames(&mut self) -> Vec<OutboundFrame> {
        std::mem::take(&mut self.frames)
    }
}

impl ByteChannel for MemoryChannel {
    fn send(&mut self, frame: OutboundFrame) -> Result<()> {
        if let Some(limit) = self.fail_after {
            if self.frames.len() >= limit {
                anyhow::bail!("channel closed after {limit} frames");
            }
        }
        self.frames.push(frame);
        Ok(())
    }
}
