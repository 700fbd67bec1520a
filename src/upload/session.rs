//! One file transfer, advanced one chunk per event-loop turn.

use super::negotiate::{chunk_count, negotiate_chunk_size};
use super::source::FileSource;
use super::UploadError;
use crate::channel::{ByteChannel, ClientMessage, UploadChunkMessage};
use crate::log_debug;
use crate::timers::Clock;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque per-task identifier, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "upload-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Uploading,
    Completed,
    Cancelled,
    Failed,
}

impl UploadStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, UploadStatus::Uploading)
    }

    pub fn label(self) -> &'static str {
        match self {
            UploadStatus::Uploading => "uploading",
            UploadStatus::Completed => "completed",
            UploadStatus::Cancelled => "cancelled",
            UploadStatus::Failed => "error",
        }
    }
}

/// Observable state of one transfer. Progress and throughput freeze once the
/// status leaves `Uploading`.
#[derive(Debug, Clone)]
pub struct UploadTask {
    id: TaskId,
    name: String,
    size: u64,
    progress: u8,
    bytes_per_sec: f64,
    status: UploadStatus,
    started_at: Instant,
}

impl UploadTask {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn bytes_per_sec(&self) -> f64 {
        self.bytes_per_sec
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }
}

/// Cooperative cancellation flag, checked before each chunk is read.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Result of one [`UploadSession::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    /// A chunk went out; `progress` is the updated percentage.
    Sent { chunk: u64, progress: u8 },
    /// Nothing was sent; the session is in this terminal status.
    Finished(UploadStatus),
}

pub struct UploadSession {
    task: UploadTask,
    source: Box<dyn FileSource>,
    chunk_size: usize,
    total_chunks: u64,
    next_chunk: u64,
    bytes_sent: u64,
    cancel: CancelFlag,
    error: Option<UploadError>,
}

impl UploadSession {
    /// Validate the file and negotiate its chunk size. Nothing is sent yet.
    pub fn begin(
        source: Box<dyn FileSource>,
        budget: usize,
        preferred_chunk_size: usize,
        now: Instant,
    ) -> Result<Self, UploadError> {
        let name = source.name().to_string();
        let size = source.len();
        if size == 0 {
            return Err(UploadError::EmptyFile { name });
        }
        let chunk_size = negotiate_chunk_size(budget, &name, size, preferred_chunk_size);
        if chunk_size == 0 {
            return Err(UploadError::Negotiation { name, budget });
        }
        let total_chunks = chunk_count(size, chunk_size);
        log_debug(&format!(
            "upload negotiated: size={size} budget={budget} chunk_size={chunk_size} chunks={total_chunks}"
        ));
        Ok(Self {
            task: UploadTask {
                id: TaskId::next(),
                name,
                size,
                progress: 0,
                bytes_per_sec: 0.0,
                status: UploadStatus::Uploading,
                started_at: now,
            },
            source,
            chunk_size,
            total_chunks,
            next_chunk: 0,
            bytes_sent: 0,
            cancel: CancelFlag::default(),
            error: None,
        })
    }

    pub fn task(&self) -> &UploadTask {
        &self.task
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn total_chunks(&self) -> u64 {
        self.total_chunks
    }

    pub fn error(&self) -> Option<&UploadError> {
        self.error.as_ref()
    }

    /// Handle for requesting cancellation from outside the loop.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Send the next chunk, or observe cancellation/completion.
    pub fn step(&mut self, channel: &mut dyn ByteChannel, now: Instant) -> SessionStep {
        if self.task.status.is_terminal() {
            return SessionStep::Finished(self.task.status);
        }
        if self.cancel.is_requested() {
            if let Err(err) = channel.send_message(&ClientMessage::UploadCancel) {
                log_debug(&format!("upload cancel notification failed: {err:#}"));
            }
            self.task.status = UploadStatus::Cancelled;
            return SessionStep::Finished(self.task.status);
        }

        let chunk = self.next_chunk;
        let sent = match self.send_chunk(channel, chunk) {
            Ok(sent) => sent,
            Err(err) => {
                log_debug(&format!("upload chunk {chunk} failed: {err:#}"));
                self.error = Some(UploadError::Transfer {
                    name: self.task.name.clone(),
                    reason: format!("{err:#}"),
                });
                self.task.status = UploadStatus::Failed;
                return SessionStep::Finished(self.task.status);
            }
        };

        self.next_chunk += 1;
        self.bytes_sent += sent;
        let percent = (self.next_chunk as f64 * 100.0 / self.total_chunks as f64).round();
        self.task.progress = self.task.progress.max(percent.min(100.0) as u8);
        let elapsed = now
            .saturating_duration_since(self.task.started_at)
            .as_secs_f64()
            .max(1e-3);
        self.task.bytes_per_sec = self.bytes_sent as f64 / elapsed;

        if self.next_chunk >= self.total_chunks {
            self.task.progress = 100;
            self.task.status = UploadStatus::Completed;
        }
        SessionStep::Sent {
            chunk,
            progress: self.task.progress,
        }
    }

    /// Drive the session until it reaches a terminal status.
    pub fn run_to_completion(
        &mut self,
        channel: &mut dyn ByteChannel,
        clock: &dyn Clock,
    ) -> UploadStatus {
        loop {
            if let SessionStep::Finished(status) = self.step(channel, clock.now()) {
                return status;
            }
        }
    }

    fn send_chunk(&mut self, channel: &mut dyn ByteChannel, chunk: u64) -> anyhow::Result<u64> {
        let start = chunk * self.chunk_size as u64;
        let end = (start + self.chunk_size as u64).min(self.task.size);
        let mut raw = vec![0u8; (end - start) as usize];
        self.source.read_at(start, &mut raw)?;
        let message = UploadChunkMessage {
            name: self.task.name.clone(),
            size: self.task.size,
            chunk,
            total_chunks: self.total_chunks,
            data: STANDARD.encode(&raw),
        };
        channel.send_message(&ClientMessage::UploadChunk(message))?;
        Ok(raw.len() as u64)
    }
}
