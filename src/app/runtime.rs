//! Single-threaded event loop that ties the terminal channel, uploads and
//! dictation together.
//!
//! Producers on other threads (UI input, websocket worker, audio callback)
//! only send [`ClientEvent`]s; every piece of state is touched from the loop
//! thread alone, so no locks guard the channel or the controllers.

use crate::asr::{ConnectionId, SideChannelEvent};
use crate::channel::{ByteChannel, ClientMessage, ServerMessage};
use crate::dictation::{
    DictationConfig, DictationController, DictationHost, InputEvent, InputPublisher,
};
use crate::observers::SubscriptionToken;
use crate::terminal::{TerminalSink, TerminalView};
use crate::timers::{earliest, Clock};
use crate::upload::{DiskFile, FileSource, UploadConfig, UploadEvent, UploadQueue, UploadStatus};
use crate::{log_debug, log_debug_content};
use crossbeam_channel::{select, unbounded, Receiver, Sender};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Upper bound on one blocking wait, so a stuck producer never freezes timers.
const EVENT_LOOP_IDLE: Duration = Duration::from_millis(50);
const UPLOAD_RESULT_MESSAGE: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Raw frame from the primary channel.
    Server(Vec<u8>),
    /// Bytes typed into the terminal.
    Keystrokes(Vec<u8>),
    Resize { columns: u16, rows: u16 },
    Input(InputEvent),
    UploadFiles(Vec<PathBuf>),
    CancelUpload,
    CancelAllUploads,
    SideChannel(SideChannelEvent),
    Audio { conn: ConnectionId, samples: Vec<f32> },
    /// Primary channel went away; the loop winds down.
    ServerClosed,
    Shutdown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub upload: UploadConfig,
    pub dictation: DictationConfig,
}

/// Terminal as seen by dictation: display calls reach the widget, injected
/// text goes out on the primary channel like typed input.
struct TerminalPort<'a> {
    view: &'a mut dyn TerminalView,
    channel: &'a mut dyn ByteChannel,
    stdin_enabled: &'a mut bool,
}

impl TerminalView for TerminalPort<'_> {
    fn write_output(&mut self, data: &[u8]) {
        self.view.write_output(data);
    }

    fn show_message(&mut self, message: &str, timeout: Option<Duration>) {
        self.view.show_message(message, timeout);
    }

    fn remove_message(&mut self) {
        self.view.remove_message();
    }

    fn set_stdin_enabled(&mut self, enabled: bool) {
        *self.stdin_enabled = enabled;
        self.view.set_stdin_enabled(enabled);
    }

    fn set_window_title(&mut self, title: &str) {
        self.view.set_window_title(title);
    }
}

impl TerminalSink for TerminalPort<'_> {
    fn send_input(&mut self, data: &[u8]) {
        if let Err(err) = self
            .channel
            .send_message(&ClientMessage::Input(data.to_vec()))
        {
            log_debug(&format!("failed to send dictated input: {err:#}"));
        }
    }
}

pub struct ClientRuntime<C, V, H, K>
where
    C: ByteChannel,
    V: TerminalView,
    H: DictationHost,
    K: Clock,
{
    channel: C,
    view: V,
    host: H,
    clock: K,
    uploads: UploadQueue,
    upload_token: SubscriptionToken,
    upload_notices: Receiver<UploadEvent>,
    dictation: DictationController,
    events_tx: Sender<ClientEvent>,
    events_rx: Receiver<ClientEvent>,
    stdin_enabled: bool,
    reconnect_after: Option<Duration>,
    running: bool,
}

impl<C, V, H, K> ClientRuntime<C, V, H, K>
where
    C: ByteChannel,
    V: TerminalView,
    H: DictationHost,
    K: Clock,
{
    pub fn new(config: RuntimeConfig, channel: C, view: V, host: H, clock: K) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self::with_events(config, channel, view, host, clock, (events_tx, events_rx))
    }

    /// Build around an existing event channel, for hosts that need the
    /// sender before the runtime exists.
    pub fn with_events(
        config: RuntimeConfig,
        channel: C,
        view: V,
        host: H,
        clock: K,
        (events_tx, events_rx): (Sender<ClientEvent>, Receiver<ClientEvent>),
    ) -> Self {
        let mut uploads = UploadQueue::new(config.upload);
        let (notice_tx, upload_notices) = unbounded();
        let upload_token = uploads.subscribe(move |event| {
            let _ = notice_tx.send(event.clone());
        });
        Self {
            channel,
            view,
            host,
            clock,
            uploads,
            upload_token,
            upload_notices,
            dictation: DictationController::new(config.dictation),
            events_tx,
            events_rx,
            stdin_enabled: true,
            reconnect_after: None,
            running: true,
        }
    }

    pub fn sender(&self) -> Sender<ClientEvent> {
        self.events_tx.clone()
    }

    pub fn input_publisher(&self) -> Option<InputPublisher> {
        self.dictation.input_publisher()
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    pub fn uploads(&self) -> &UploadQueue {
        &self.uploads
    }

    pub fn dictation(&self) -> &DictationController {
        &self.dictation
    }

    pub fn reconnect_after(&self) -> Option<Duration> {
        self.reconnect_after
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run until shutdown or until the primary channel closes.
    pub fn run(&mut self) {
        while self.running {
            let now = self.clock.now();
            self.turn(now);
            if !self.running {
                break;
            }
            let wait = self.wait_budget(self.clock.now());
            let events_rx = self.events_rx.clone();
            select! {
                recv(events_rx) -> event => match event {
                    Ok(event) => {
                        let now = self.clock.now();
                        self.dispatch(event, now);
                    }
                    Err(_) => self.running = false,
                },
                default(wait) => {}
            }
        }
        self.shutdown();
    }

    /// Handle everything already queued, then run one turn. Returns false
    /// once the runtime has stopped.
    pub fn pump(&mut self) -> bool {
        while self.running {
            let Ok(event) = self.events_rx.try_recv() else {
                break;
            };
            let now = self.clock.now();
            self.dispatch(event, now);
        }
        if self.running {
            let now = self.clock.now();
            self.turn(now);
        }
        self.running
    }

    pub fn dispatch(&mut self, event: ClientEvent, now: Instant) {
        match event {
            ClientEvent::Server(frame) => self.handle_server_frame(&frame),
            ClientEvent::Keystrokes(bytes) => {
                if !self.stdin_enabled {
                    return;
                }
                if let Err(err) = self.channel.send_message(&ClientMessage::Input(bytes)) {
                    log_debug(&format!("failed to send keystrokes: {err:#}"));
                }
            }
            ClientEvent::Resize { columns, rows } => {
                if let Err(err) = self
                    .channel
                    .send_message(&ClientMessage::ResizeTerminal { columns, rows })
                {
                    log_debug(&format!("failed to send resize: {err:#}"));
                }
            }
            ClientEvent::Input(input) => {
                let mut port = TerminalPort {
                    view: &mut self.view,
                    channel: &mut self.channel,
                    stdin_enabled: &mut self.stdin_enabled,
                };
                self.dictation
                    .handle_input(input, now, &mut self.host, &mut port);
            }
            ClientEvent::UploadFiles(paths) => self.enqueue_paths(paths),
            ClientEvent::CancelUpload => {
                self.uploads.cancel_current();
            }
            ClientEvent::CancelAllUploads => self.uploads.cancel_all(),
            ClientEvent::SideChannel(event) => {
                let mut port = TerminalPort {
                    view: &mut self.view,
                    channel: &mut self.channel,
                    stdin_enabled: &mut self.stdin_enabled,
                };
                self.dictation
                    .on_side_channel(event, now, &mut self.host, &mut port);
            }
            ClientEvent::Audio { conn, samples } => {
                self.dictation.on_audio_frame(conn, samples, &mut self.host);
            }
            ClientEvent::ServerClosed => {
                log_debug("primary channel closed");
                self.running = false;
            }
            ClientEvent::Shutdown => self.running = false,
        }
    }

    /// Fire due timers, drain published input and send at most one upload chunk.
    pub fn turn(&mut self, now: Instant) {
        {
            let mut port = TerminalPort {
                view: &mut self.view,
                channel: &mut self.channel,
                stdin_enabled: &mut self.stdin_enabled,
            };
            self.dictation.pump_input(now, &mut self.host, &mut port);
            self.dictation.poll_timers(now, &mut self.host, &mut port);
        }
        self.uploads.poll(now, &mut self.channel);
        self.show_upload_notices();
    }

    fn wait_budget(&self, now: Instant) -> Duration {
        if self.uploads.has_ready_work(now) {
            return Duration::ZERO;
        }
        match earliest([self.dictation.next_deadline(), self.uploads.next_deadline()]) {
            Some(deadline) => deadline.saturating_duration_since(now).min(EVENT_LOOP_IDLE),
            None => EVENT_LOOP_IDLE,
        }
    }

    fn handle_server_frame(&mut self, frame: &[u8]) {
        let message = match ServerMessage::parse(frame) {
            Ok(message) => message,
            Err(err) => {
                log_debug(&format!("ignoring server frame: {err:#}"));
                return;
            }
        };
        match message {
            ServerMessage::Output(bytes) => self.view.write_output(&bytes),
            ServerMessage::Pong => {}
            ServerMessage::SetWindowTitle(title) => self.view.set_window_title(&title),
            ServerMessage::SetPreferences(prefs) => {
                log_debug(&format!("server preferences: {prefs}"));
            }
            ServerMessage::SetReconnect(seconds) => {
                self.reconnect_after = Some(Duration::from_secs(seconds));
            }
            ServerMessage::SetBufferSize(size) => self.uploads.set_message_budget(size),
        }
    }

    fn enqueue_paths(&mut self, paths: Vec<PathBuf>) {
        let mut files: Vec<Box<dyn FileSource>> = Vec::with_capacity(paths.len());
        for path in paths {
            match DiskFile::open(&path) {
                Ok(file) => files.push(Box::new(file)),
                Err(err) => {
                    log_debug_content(&format!("cannot upload {}: {err:#}", path.display()));
                    self.view
                        .show_message(&format!("Upload failed: {err:#}"), Some(UPLOAD_RESULT_MESSAGE));
                }
            }
        }
        self.uploads.enqueue(files);
    }

    fn show_upload_notices(&mut self) {
        for notice in self.upload_notices.try_iter() {
            match notice {
                UploadEvent::Started { .. } => {}
                UploadEvent::Progress {
                    name,
                    percent,
                    bytes_per_sec,
                    ..
                } => {
                    self.view.show_message(
                        &format!(
                            "Uploading {name}: {percent}% ({})",
                            format_rate(bytes_per_sec)
                        ),
                        None,
                    );
                }
                UploadEvent::Finished {
                    name,
                    status,
                    error,
                    ..
                } => {
                    let text = match (status, error) {
                        (UploadStatus::Completed, _) => format!("Uploaded {name}"),
                        (UploadStatus::Cancelled, _) => format!("Upload of {name} cancelled"),
                        (_, Some(error)) => format!("Upload failed: {error}"),
                        (_, None) => format!("Upload of {name} failed"),
                    };
                    self.view.remove_message();
                    self.view.show_message(&text, Some(UPLOAD_RESULT_MESSAGE));
                    self.uploads.dismiss();
                }
                UploadEvent::Rejected { error } => {
                    self.view.show_message(
                        &format!("Upload failed: {error}"),
                        Some(UPLOAD_RESULT_MESSAGE),
                    );
                }
            }
        }
    }

    fn shutdown(&mut self) {
        self.uploads.cancel_all();
        while self.uploads.poll(self.clock.now(), &mut self.channel) {}
        self.show_upload_notices();
        self.uploads.unsubscribe(self.upload_token);
        let mut port = TerminalPort {
            view: &mut self.view,
            channel: &mut self.channel,
            stdin_enabled: &mut self.stdin_enabled,
        };
        self.dictation.shutdown(&mut self.host, &mut port);
    }

    /// Stop the loop from the owning thread and release everything it holds.
    pub fn stop(&mut self) {
        self.running = false;
        self.shutdown();
    }
}

fn format_rate(bytes_per_sec: f64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    if bytes_per_sec >= MIB {
        format!("{:.1} MiB/s", bytes_per_sec / MIB)
    } else if bytes_per_sec >= KIB {
        format!("{:.1} KiB/s", bytes_per_sec / KIB)
    } else {
        format!("{bytes_per_sec:.0} B/s")
    }
}
