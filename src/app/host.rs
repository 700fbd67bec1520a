//! Dictation host backed by the real microphone and websocket.

use super::runtime::ClientEvent;
use crate::asr::{ClientFrame, ConnectionFailure, ConnectionId, WsSideChannel};
use crate::audio::{AudioCaptureEngine, CaptureConfig, CaptureError, CaptureSession};
use crate::dictation::DictationHost;
use crate::log_debug;
use crossbeam_channel::Sender;
use url::Url;

/// Opens one [`WsSideChannel`] per attempt and feeds socket events and
/// captured audio back into the runtime's event queue.
pub struct LiveDictationHost {
    endpoint: Url,
    capture: AudioCaptureEngine,
    socket: Option<WsSideChannel>,
    events: Sender<ClientEvent>,
}

impl LiveDictationHost {
    pub fn new(endpoint: Url, capture: CaptureConfig, events: Sender<ClientEvent>) -> Self {
        Self {
            endpoint,
            capture: AudioCaptureEngine::new(capture),
            socket: None,
            events,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl DictationHost for LiveDictationHost {
    fn microphone_available(&mut self) -> bool {
        self.capture.microphone_available()
    }

    fn open_side_channel(&mut self, conn: ConnectionId) -> Result<(), ConnectionFailure> {
        if let Some(previous) = self.socket.take() {
            log_debug(&format!("dropping leftover side channel {}", previous.conn()));
        }
        let events = self.events.clone();
        self.socket = Some(WsSideChannel::spawn(
            conn,
            self.endpoint.clone(),
            move |event| {
                let _ = events.send(ClientEvent::SideChannel(event));
            },
        ));
        Ok(())
    }

    fn send_side_channel(&mut self, conn: ConnectionId, frame: ClientFrame) -> bool {
        match self.socket.as_ref() {
            Some(socket) if socket.conn() == conn => socket.send(frame),
            _ => false,
        }
    }

    fn close_side_channel(&mut self, conn: ConnectionId) {
        if self.socket.as_ref().is_some_and(|socket| socket.conn() == conn) {
            self.socket = None;
        }
    }

    fn start_capture(&mut self, conn: ConnectionId) -> Result<CaptureSession, CaptureError> {
        let events = self.events.clone();
        self.capture.start(Box::new(move |samples| {
            events.send(ClientEvent::Audio { conn, samples }).is_ok()
        }))
    }

    fn stop_capture(&mut self) {
        if let Some(stats) = self.capture.stop() {
            tracing::info!(
                target: "dictation",
                frames = stats.frames_emitted,
                dropped = stats.frames_dropped,
                "capture released"
            );
        }
    }
}
