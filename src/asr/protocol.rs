//! Frames exchanged on the dictation side channel.

use crate::channel::OutboundFrame;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Final text frame telling the server no more audio follows.
pub const DONE_MESSAGE: &str = "Done";

/// First frame on every side-channel socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Handshake {
    #[serde(rename = "AuthToken")]
    pub auth_token: String,
    #[serde(rename = "Arguments")]
    pub arguments: String,
}

impl Handshake {
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            arguments: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    Handshake(Handshake),
    /// Mono samples at the target rate, sent as little-endian f32.
    Audio(Vec<f32>),
    Done,
}

impl ClientFrame {
    pub fn encode(&self) -> Result<OutboundFrame> {
        Ok(match self {
            ClientFrame::Handshake(handshake) => OutboundFrame::Text(
                serde_json::to_string(handshake).context("failed to serialize handshake")?,
            ),
            ClientFrame::Audio(samples) => {
                let mut bytes = Vec::with_capacity(samples.len() * 4);
                for sample in samples {
                    bytes.extend_from_slice(&sample.to_le_bytes());
                }
                OutboundFrame::Binary(bytes)
            }
            ClientFrame::Done => OutboundFrame::Text(DONE_MESSAGE.to_string()),
        })
    }
}

/// One decoded server update. `index` is `None` when the segment field was
/// missing or not a non-negative integer; such updates carry no text but
/// still count as server activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentUpdate {
    pub index: Option<u64>,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct RawSegment {
    #[serde(default)]
    segment: Value,
    #[serde(default)]
    text: Value,
}

/// Decode a server text frame. Errors only for frames that are not a JSON object.
pub fn parse_segment(raw: &str) -> Result<SegmentUpdate> {
    let parsed: RawSegment =
        serde_json::from_str(raw).context("side-channel frame is not a segment object")?;
    Ok(SegmentUpdate {
        index: segment_index(&parsed.segment),
        text: match parsed.text {
            Value::Null => String::new(),
            Value::String(text) => text,
            other => other.to_string(),
        },
    })
}

fn segment_index(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| integral(number.as_f64()?)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<u64>()
                .ok()
                .or_else(|| integral(text.parse::<f64>().ok()?))
        }
        _ => None,
    }
}

fn integral(value: f64) -> Option<u64> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
        Some(value as u64)
    } else {
        None
    }
}
