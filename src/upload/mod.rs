//! Chunked file upload over the shared terminal channel.
//!
//! Files are split into base64 chunks whose framed size never exceeds the
//! server's message budget. One file is in flight at a time and one chunk is
//! sent per event-loop turn, so keystrokes keep flowing during large uploads.

mod negotiate;
mod queue;
mod session;
mod source;

use std::time::Duration;
use thiserror::Error;

pub use negotiate::{chunk_count, negotiate_chunk_size, PREFERRED_CHUNK_SIZE};
pub use queue::{UploadEvent, UploadQueue};
pub use session::{CancelFlag, SessionStep, TaskId, UploadSession, UploadStatus, UploadTask};
pub use source::{DiskFile, FileSource, MemoryFile};

/// Message budget assumed until the server announces its buffer size.
pub const DEFAULT_MESSAGE_BUDGET: usize = 1024;

/// Cosmetic gap between consecutive files of one drop.
pub const DEFAULT_INTER_FILE_PAUSE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    pub message_budget: usize,
    pub preferred_chunk_size: usize,
    pub inter_file_pause: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            message_budget: DEFAULT_MESSAGE_BUDGET,
            preferred_chunk_size: PREFERRED_CHUNK_SIZE,
            inter_file_pause: DEFAULT_INTER_FILE_PAUSE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("{name} is empty")]
    EmptyFile { name: String },
    #[error("failed to upload {name}: a chunk does not fit in a {budget}-byte message")]
    Negotiation { name: String, budget: usize },
    #[error("failed to upload {name}: {reason}")]
    Transfer { name: String, reason: String },
}

impl UploadError {
    pub fn file_name(&self) -> &str {
        match self {
            UploadError::EmptyFile { name }
            | UploadError::Negotiation { name, .. }
            | UploadError::Transfer { name, .. } => name,
        }
    }
}
