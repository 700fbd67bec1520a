//! Dictation side channel: the `asr/ws` websocket next to the terminal endpoint.
//!
//! The client sends a JSON handshake, then binary frames of 16kHz mono f32
//! samples, then `Done`. The server streams `{segment, text}` updates back
//! and closes the socket when transcription is over.

pub mod protocol;
mod socket;

use anyhow::{bail, Context, Result};
use std::fmt;
use thiserror::Error;
use url::Url;

pub use protocol::{parse_segment, ClientFrame, Handshake, SegmentUpdate, DONE_MESSAGE};
pub use socket::{SideChannelEvent, SideChannelEventKind, WsSideChannel};

/// Path of the dictation endpoint relative to the terminal base URL.
pub const SIDE_CHANNEL_PATH: &str = "asr/ws";

/// Identifies one side-channel socket so events from a torn-down attempt
/// can be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asr-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionFailure {
    #[error("dictation server did not answer in time")]
    Timeout,
    #[error("dictation connection closed before it opened")]
    ClosedBeforeOpen,
    #[error("dictation connection failed: {0}")]
    Socket(String),
}

/// Build the side-channel URL from the terminal page URL.
///
/// `https`/`wss` bases map to `wss`, `http`/`ws` to `ws`. The endpoint is
/// appended to the base path and `query` (without `?`) is carried over.
pub fn side_channel_url(base: &Url, query: Option<&str>) -> Result<Url> {
    let scheme = match base.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => bail!("unsupported terminal URL scheme '{other}'"),
    };
    let host = base
        .host_str()
        .with_context(|| format!("terminal URL '{base}' has no host"))?;
    let authority = match base.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    let mut path = base.path().to_string();
    if !path.ends_with('/') {
        path.push('/');
    }
    let mut raw = format!("{scheme}://{authority}{path}{SIDE_CHANNEL_PATH}");
    if let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) {
        raw.push('?');
        raw.push_str(query.trim_start_matches('?'));
    }
    Url::parse(&raw).with_context(|| format!("invalid side-channel URL '{raw}'"))
}

/// Whether microphone audio may be streamed to `base`: encrypted transports
/// always qualify, plaintext only when the host is the local machine.
pub fn is_secure_context(base: &Url) -> bool {
    if matches!(base.scheme(), "https" | "wss") {
        return true;
    }
    matches!(base.host_str(), Some("localhost") | Some("127.0.0.1"))
}
