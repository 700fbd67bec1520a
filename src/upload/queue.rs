//! Serializes dropped/selected files through one [`UploadSession`] at a time.

use super::session::{SessionStep, TaskId, UploadSession, UploadStatus, UploadTask};
use super::source::FileSource;
use super::{UploadConfig, UploadError};
use crate::channel::ByteChannel;
use crate::observers::{ObserverRegistry, SubscriptionToken};
use crate::timers::TimerSlot;
use crate::{log_debug, log_debug_content};
use std::collections::VecDeque;
use std::time::Instant;

/// Progress and outcome notifications published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    Started {
        id: TaskId,
        name: String,
        size: u64,
        chunk_size: usize,
        total_chunks: u64,
    },
    Progress {
        id: TaskId,
        name: String,
        percent: u8,
        bytes_per_sec: f64,
    },
    Finished {
        id: TaskId,
        name: String,
        status: UploadStatus,
        error: Option<UploadError>,
    },
    /// The file never started (empty, or the budget cannot fit a chunk).
    Rejected { error: UploadError },
}

pub struct UploadQueue {
    config: UploadConfig,
    pending: VecDeque<Box<dyn FileSource>>,
    current: Option<UploadSession>,
    last_finished: Option<UploadTask>,
    pause: TimerSlot,
    observers: ObserverRegistry<UploadEvent>,
}

impl UploadQueue {
    pub fn new(config: UploadConfig) -> Self {
        Self {
            config,
            pending: VecDeque::new(),
            current: None,
            last_finished: None,
            pause: TimerSlot::new("upload-pause"),
            observers: ObserverRegistry::new(),
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Server-announced message budget; applies to files that start later.
    pub fn set_message_budget(&mut self, budget: i64) {
        if budget > 0 {
            self.config.message_budget = usize::try_from(budget).unwrap_or(usize::MAX);
            log_debug(&format!("upload message budget set to {budget}"));
        }
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionToken
    where
        F: FnMut(&UploadEvent) + Send + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        self.observers.unsubscribe(token)
    }

    /// Append files in the order given.
    pub fn enqueue<I>(&mut self, files: I)
    where
        I: IntoIterator<Item = Box<dyn FileSource>>,
    {
        self.pending.extend(files);
    }

    pub fn current(&self) -> Option<&UploadTask> {
        self.current.as_ref().map(UploadSession::task)
    }

    pub fn last_finished(&self) -> Option<&UploadTask> {
        self.last_finished.as_ref()
    }

    /// Drop the finished task once its result is no longer shown.
    pub fn dismiss(&mut self) {
        self.last_finished = None;
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }

    /// True when [`poll`](Self::poll) would make progress without waiting.
    pub fn has_ready_work(&self, now: Instant) -> bool {
        if self.current.is_some() {
            return true;
        }
        if self.pending.is_empty() {
            return false;
        }
        match self.pause.deadline() {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pause.deadline()
    }

    /// Ask the in-flight upload to stop at the next chunk boundary.
    pub fn cancel_current(&mut self) -> bool {
        match &self.current {
            Some(session) => {
                session.cancel_flag().request();
                true
            }
            None => false,
        }
    }

    /// Cancel the in-flight upload and forget everything still queued.
    pub fn cancel_all(&mut self) {
        self.pending.clear();
        self.pause.cancel();
        self.cancel_current();
    }

    /// Advance by at most one chunk. Returns false when there was nothing to do.
    pub fn poll(&mut self, now: Instant, channel: &mut dyn ByteChannel) -> bool {
        if let Some(session) = self.current.as_mut() {
            let step = session.step(channel, now);
            let task = session.task().clone();
            if let SessionStep::Sent { progress, .. } = step {
                self.observers.notify(&UploadEvent::Progress {
                    id: task.id(),
                    name: task.name().to_string(),
                    percent: progress,
                    bytes_per_sec: task.bytes_per_sec(),
                });
            }
            if task.status().is_terminal() {
                self.finish_current(now);
            }
            return true;
        }

        if self.pending.is_empty() {
            return false;
        }
        if self.pause.is_armed() && !self.pause.fire_if_due(now) {
            return false;
        }
        let Some(source) = self.pending.pop_front() else {
            return false;
        };
        match UploadSession::begin(
            source,
            self.config.message_budget,
            self.config.preferred_chunk_size,
            now,
        ) {
            Ok(session) => {
                log_debug_content(&format!("upload started: {}", session.task().name()));
                self.observers.notify(&UploadEvent::Started {
                    id: session.task().id(),
                    name: session.task().name().to_string(),
                    size: session.task().size(),
                    chunk_size: session.chunk_size(),
                    total_chunks: session.total_chunks(),
                });
                self.observers.notify(&UploadEvent::Progress {
                    id: session.task().id(),
                    name: session.task().name().to_string(),
                    percent: 0,
                    bytes_per_sec: 0.0,
                });
                self.current = Some(session);
            }
            Err(error) => {
                log_debug(&format!("upload rejected: {error}"));
                tracing::warn!(target: "upload", error = %error, "upload rejected");
                self.observers.notify(&UploadEvent::Rejected { error });
                self.arm_pause_if_more(now);
            }
        }
        true
    }

    fn finish_current(&mut self, now: Instant) {
        let Some(session) = self.current.take() else {
            return;
        };
        let task = session.task().clone();
        let error = session.error().cloned();
        tracing::info!(
            target: "upload",
            id = %task.id(),
            status = task.status().label(),
            size = task.size(),
            chunks = session.total_chunks(),
            bytes_per_sec = task.bytes_per_sec(),
            "upload finished"
        );
        log_debug(&format!(
            "upload {} finished: status={} progress={}",
            task.id(),
            task.status().label(),
            task.progress()
        ));
        self.observers.notify(&UploadEvent::Finished {
            id: task.id(),
            name: task.name().to_string(),
            status: task.status(),
            error,
        });
        self.last_finished = Some(task);
        self.arm_pause_if_more(now);
    }

    fn arm_pause_if_more(&mut self, now: Instant) {
        if !self.pending.is_empty() {
            self.pause.arm(now, self.config.inter_file_pause);
        }
    }
}
