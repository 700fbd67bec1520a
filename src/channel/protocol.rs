//! Wire format of the primary terminal channel.
//!
//! Each frame starts with one ASCII tag byte followed by the body. Client and
//! server use separate tag tables; the numbering matches the gotty protocol.

use super::OutboundFrame;
use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

// ============================================================================
// Client → server tags
// ============================================================================

pub const INPUT: u8 = b'1';
pub const PING: u8 = b'2';
pub const RESIZE_TERMINAL: u8 = b'3';
pub const SET_ENCODING: u8 = b'4';
pub const UPLOAD_CHUNK: u8 = b'7';
pub const UPLOAD_CANCEL: u8 = b'8';

// ============================================================================
// Server → client tags
// ============================================================================

pub const OUTPUT: u8 = b'1';
pub const PONG: u8 = b'2';
pub const SET_WINDOW_TITLE: u8 = b'3';
pub const SET_PREFERENCES: u8 = b'4';
pub const SET_RECONNECT: u8 = b'5';
pub const SET_BUFFER_SIZE: u8 = b'6';

/// Body of an `upload-chunk` frame. Field order is part of the wire format
/// because the chunk negotiator measures this exact serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadChunkMessage {
    pub name: String,
    pub size: u64,
    pub chunk: u64,
    #[serde(rename = "totalChunks")]
    pub total_chunks: u64,
    /// Base64 (standard alphabet, padded) of the raw slice.
    pub data: String,
}

impl UploadChunkMessage {
    /// Length in bytes of the full frame, tag included.
    pub fn framed_len(&self) -> Result<usize> {
        Ok(1 + serde_json::to_vec(self)
            .context("failed to serialize upload chunk")?
            .len())
    }
}

#[derive(Debug, Clone, Serialize)]
struct ResizeArgs {
    columns: u16,
    rows: u16,
}

/// Messages the client sends over the primary channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Raw keystroke bytes for the remote PTY.
    Input(Vec<u8>),
    Ping,
    ResizeTerminal { columns: u16, rows: u16 },
    SetEncoding(String),
    UploadChunk(UploadChunkMessage),
    /// Tells the server to drop partial state of the in-flight upload.
    UploadCancel,
}

impl ClientMessage {
    pub fn to_frame(&self) -> Result<OutboundFrame> {
        let frame = match self {
            ClientMessage::Input(bytes) => {
                let mut framed = Vec::with_capacity(bytes.len() + 1);
                framed.push(INPUT);
                framed.extend_from_slice(bytes);
                OutboundFrame::Binary(framed)
            }
            ClientMessage::Ping => OutboundFrame::Text(tagged(PING, "")),
            ClientMessage::ResizeTerminal { columns, rows } => {
                let body = serde_json::to_string(&ResizeArgs {
                    columns: *columns,
                    rows: *rows,
                })
                .context("failed to serialize resize request")?;
                OutboundFrame::Text(tagged(RESIZE_TERMINAL, &body))
            }
            ClientMessage::SetEncoding(encoding) => {
                OutboundFrame::Text(tagged(SET_ENCODING, encoding))
            }
            ClientMessage::UploadChunk(chunk) => {
                let body =
                    serde_json::to_string(chunk).context("failed to serialize upload chunk")?;
                OutboundFrame::Text(tagged(UPLOAD_CHUNK, &body))
            }
            ClientMessage::UploadCancel => OutboundFrame::Text(tagged(UPLOAD_CANCEL, "")),
        };
        Ok(frame)
    }
}

fn tagged(tag: u8, body: &str) -> String {
    let mut out = String::with_capacity(body.len() + 1);
    out.push(char::from(tag));
    out.push_str(body);
    out
}

/// Messages the server sends over the primary channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Decoded PTY output.
    Output(Vec<u8>),
    Pong,
    SetWindowTitle(String),
    SetPreferences(serde_json::Value),
    SetReconnect(u64),
    /// Maximum message size the server accepts; drives upload chunking.
    SetBufferSize(i64),
}

impl ServerMessage {
    pub fn parse(frame: &[u8]) -> Result<Self> {
        let (&tag, body) = frame
            .split_first()
            .ok_or_else(|| anyhow!("empty frame from server"))?;
        let message = match tag {
            OUTPUT => ServerMessage::Output(
                STANDARD
                    .decode(body)
                    .context("output frame is not valid base64")?,
            ),
            PONG => ServerMessage::Pong,
            SET_WINDOW_TITLE => {
                ServerMessage::SetWindowTitle(String::from_utf8_lossy(body).into_owned())
            }
            SET_PREFERENCES => ServerMessage::SetPreferences(
                serde_json::from_slice(body).context("malformed preferences")?,
            ),
            SET_RECONNECT => ServerMessage::SetReconnect(
                serde_json::from_slice(body).context("malformed reconnect interval")?,
            ),
            SET_BUFFER_SIZE => ServerMessage::SetBufferSize(
                serde_json::from_slice(body).context("malformed buffer size")?,
            ),
            other => bail!("unknown message type `{}`", char::from(other)),
        };
        Ok(message)
    }
}
