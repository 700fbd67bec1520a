use super::input::{InputBus, InputEvent, InputPublisher};
use super::policy::{check_policy, PolicyRejection};
use super::{DictationConfig, DictationHost};
use crate::asr::{
    parse_segment, ClientFrame, ConnectionFailure, ConnectionId, Handshake, SideChannelEvent,
    SideChannelEventKind,
};
use crate::audio::CaptureError;
use crate::observers::{ObserverRegistry, SubscriptionToken};
use crate::terminal::TerminalSink;
use crate::timers::{earliest, TimerSlot};
use crate::transcript::TranscriptAssembler;
use crate::{log_debug, log_debug_content};
use std::time::{Duration, Instant};

const RECORDING_MESSAGE: &str = "Recording... stop to insert";
const REJECTION_MESSAGE_TIMEOUT: Duration = Duration::from_millis(2500);
const FAILURE_MESSAGE_TIMEOUT: Duration = Duration::from_millis(2000);

/// How the current recording was started; decides which events stop it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    Button,
    Hotkey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictationState {
    Idle,
    HoldArmed,
    Recording { mode: StartMode },
    Finalizing { mode: StartMode },
}

impl DictationState {
    fn label(self) -> &'static str {
        match self {
            DictationState::Idle => "idle",
            DictationState::HoldArmed => "hold_armed",
            DictationState::Recording { .. } => "recording",
            DictationState::Finalizing { .. } => "finalizing",
        }
    }
}

/// Notifications for UI listeners (button state, status line).
#[derive(Debug, Clone, PartialEq)]
pub enum DictationEvent {
    StateChanged(DictationState),
    /// Text handed to the terminal; `chars` avoids leaking content to observers.
    Inserted { chars: usize },
    Rejected(PolicyRejection),
    ConnectionFailed(ConnectionFailure),
    CaptureFailed(CaptureError),
}

/// Per-attempt state, created on entering `Recording` and consumed by finalize.
struct Attempt {
    conn: ConnectionId,
    opened: bool,
    capturing: bool,
    transcript: TranscriptAssembler,
}

pub struct DictationController {
    config: DictationConfig,
    state: DictationState,
    attempt: Option<Attempt>,
    next_conn: u64,
    terminal_focused: bool,
    hold: TimerSlot,
    connect: TimerSlot,
    settle: TimerSlot,
    bus: Option<InputBus>,
    observers: ObserverRegistry<DictationEvent>,
}

impl DictationController {
    pub fn new(config: DictationConfig) -> Self {
        Self {
            config,
            state: DictationState::Idle,
            attempt: None,
            next_conn: 0,
            terminal_focused: true,
            hold: TimerSlot::new("dictation-hold"),
            connect: TimerSlot::new("dictation-connect"),
            settle: TimerSlot::new("dictation-settle"),
            bus: Some(InputBus::new()),
            observers: ObserverRegistry::new(),
        }
    }

    pub fn config(&self) -> &DictationConfig {
        &self.config
    }

    pub fn state(&self) -> DictationState {
        self.state
    }

    /// True from the moment recording starts until finalize completes.
    pub fn is_recording(&self) -> bool {
        matches!(
            self.state,
            DictationState::Recording { .. } | DictationState::Finalizing { .. }
        )
    }

    pub fn current_connection(&self) -> Option<ConnectionId> {
        self.attempt.as_ref().map(|attempt| attempt.conn)
    }

    /// Publisher for the controller's input bus; `None` after shutdown.
    pub fn input_publisher(&self) -> Option<InputPublisher> {
        self.bus.as_ref().map(InputBus::publisher)
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionToken
    where
        F: FnMut(&DictationEvent) + Send + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        self.observers.unsubscribe(token)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        earliest([
            self.hold.deadline(),
            self.connect.deadline(),
            self.settle.deadline(),
        ])
    }

    /// Handle everything published on the input bus since the last call.
    pub fn pump_input(
        &mut self,
        now: Instant,
        host: &mut dyn DictationHost,
        term: &mut dyn TerminalSink,
    ) {
        let events = match self.bus.as_ref() {
            Some(bus) => bus.drain(),
            None => return,
        };
        for event in events {
            self.handle_input(event, now, host, term);
        }
    }

    pub fn handle_input(
        &mut self,
        event: InputEvent,
        now: Instant,
        host: &mut dyn DictationHost,
        term: &mut dyn TerminalSink,
    ) {
        if self.bus.is_none() {
            return;
        }
        match event {
            InputEvent::TerminalFocus(focused) => self.terminal_focused = focused,
            InputEvent::KeyDown {
                code,
                repeat,
                alt,
                ctrl,
                meta,
            } => {
                if !self.config.enabled || !self.config.permit_write || !self.terminal_focused {
                    return;
                }
                if self.is_recording() {
                    return;
                }
                let is_hotkey = code == self.config.hotkey;
                if self.state == DictationState::HoldArmed && !is_hotkey {
                    self.cancel_hold();
                    return;
                }
                if !is_hotkey || repeat || alt || ctrl || meta {
                    return;
                }
                self.arm_hold(now);
            }
            InputEvent::KeyUp { code } => {
                if code != self.config.hotkey {
                    return;
                }
                match self.state {
                    DictationState::HoldArmed => self.cancel_hold(),
                    DictationState::Recording {
                        mode: StartMode::Hotkey,
                    } => self.stop(now, host),
                    _ => {}
                }
            }
            InputEvent::WindowBlur | InputEvent::VisibilityHidden => {
                self.cancel_hold();
                if self.state
                    == (DictationState::Recording {
                        mode: StartMode::Hotkey,
                    })
                {
                    self.stop(now, host);
                }
            }
            InputEvent::Click => {
                if !self.config.enabled {
                    return;
                }
                match self.state {
                    DictationState::Recording { .. } => self.stop(now, host),
                    DictationState::Finalizing { .. } => {}
                    DictationState::Idle | DictationState::HoldArmed => {
                        self.cancel_hold();
                        self.start(StartMode::Button, now, host, term);
                    }
                }
            }
        }
    }

    pub fn on_side_channel(
        &mut self,
        event: SideChannelEvent,
        now: Instant,
        host: &mut dyn DictationHost,
        term: &mut dyn TerminalSink,
    ) {
        let Some(attempt) = self.attempt.as_mut().filter(|a| a.conn == event.conn) else {
            log_debug(&format!("ignoring stale side-channel event from {}", event.conn));
            return;
        };
        match event.kind {
            SideChannelEventKind::Opened => {
                if attempt.opened {
                    return;
                }
                attempt.opened = true;
                let conn = attempt.conn;
                self.connect.cancel();
                if !matches!(self.state, DictationState::Recording { .. }) {
                    // Stopped while connecting: no audio will follow.
                    host.close_side_channel(conn);
                    return;
                }
                log_debug(&format!("{conn}: side channel open"));
                let handshake = Handshake::new(self.config.auth_token.clone());
                if !host.send_side_channel(conn, ClientFrame::Handshake(handshake)) {
                    log_debug(&format!("{conn}: failed to queue handshake"));
                }
                match host.start_capture(conn) {
                    Ok(session) => {
                        if let Some(attempt) = self.attempt.as_mut() {
                            attempt.capturing = true;
                        }
                        log_debug(&format!(
                            "{conn}: capturing from '{}' at {}Hz -> {}Hz",
                            session.device_name, session.native_rate, session.target_rate
                        ));
                    }
                    Err(err) => {
                        tracing::warn!(target: "dictation", error = %err, "capture failed");
                        self.finalize(false, host, term);
                        term.show_message(
                            &format!("Cannot start dictation: {err}"),
                            Some(REJECTION_MESSAGE_TIMEOUT),
                        );
                        self.observers.notify(&DictationEvent::CaptureFailed(err));
                    }
                }
            }
            SideChannelEventKind::Message(raw) => {
                let update = match parse_segment(&raw) {
                    Ok(update) => update,
                    Err(err) => {
                        log_debug(&format!("{}: ignoring frame: {err:#}", attempt.conn));
                        return;
                    }
                };
                if let Some(index) = update.index {
                    log_debug_content(&format!("segment {index}: {:?}", update.text));
                    attempt.transcript.ingest(index, update.text);
                }
                if matches!(self.state, DictationState::Finalizing { .. }) && self.settle.is_armed()
                {
                    self.settle.arm(now, self.config.quiet_window);
                }
            }
            SideChannelEventKind::Closed => {
                if attempt.opened {
                    log_debug(&format!("{}: side channel closed by server", attempt.conn));
                    self.finalize(true, host, term);
                } else {
                    self.fail_connection(ConnectionFailure::ClosedBeforeOpen, host, term);
                }
            }
            SideChannelEventKind::Error(reason) => {
                let insert = attempt.opened;
                let failure = ConnectionFailure::Socket(reason);
                tracing::warn!(target: "dictation", error = %failure, "side channel error");
                self.finalize(insert, host, term);
                term.show_message(&failure.to_string(), Some(FAILURE_MESSAGE_TIMEOUT));
                self.observers
                    .notify(&DictationEvent::ConnectionFailed(failure));
            }
        }
    }

    /// Forward one resampled capture buffer. False when it was not sent.
    pub fn on_audio_frame(
        &mut self,
        conn: ConnectionId,
        samples: Vec<f32>,
        host: &mut dyn DictationHost,
    ) -> bool {
        let streaming = matches!(self.state, DictationState::Recording { .. })
            && self
                .attempt
                .as_ref()
                .is_some_and(|a| a.conn == conn && a.opened && a.capturing);
        streaming && host.send_side_channel(conn, ClientFrame::Audio(samples))
    }

    pub fn poll_timers(
        &mut self,
        now: Instant,
        host: &mut dyn DictationHost,
        term: &mut dyn TerminalSink,
    ) {
        if self.hold.fire_if_due(now) && self.state == DictationState::HoldArmed {
            self.transition(DictationState::Idle);
            self.start(StartMode::Hotkey, now, host, term);
        }
        if self.connect.fire_if_due(now) {
            self.fail_connection(ConnectionFailure::Timeout, host, term);
        }
        if self.settle.fire_if_due(now) {
            self.finalize(true, host, term);
        }
    }

    /// Abandon any attempt without inserting text and close the input bus.
    pub fn shutdown(&mut self, host: &mut dyn DictationHost, term: &mut dyn TerminalSink) {
        self.cancel_hold();
        self.finalize(false, host, term);
        self.bus = None;
        log_debug("dictation controller shut down");
    }

    fn arm_hold(&mut self, now: Instant) {
        if self.state == DictationState::HoldArmed {
            return;
        }
        self.hold.arm(now, self.config.hold);
        self.transition(DictationState::HoldArmed);
    }

    fn cancel_hold(&mut self) {
        self.hold.cancel();
        if self.state == DictationState::HoldArmed {
            self.transition(DictationState::Idle);
        }
    }

    fn start(
        &mut self,
        mode: StartMode,
        now: Instant,
        host: &mut dyn DictationHost,
        term: &mut dyn TerminalSink,
    ) {
        if !self.config.enabled || self.is_recording() {
            return;
        }
        if let Err(rejection) = check_policy(&self.config, host.microphone_available()) {
            log_debug(&format!("dictation rejected: {rejection}"));
            term.show_message(&rejection.to_string(), Some(REJECTION_MESSAGE_TIMEOUT));
            self.observers.notify(&DictationEvent::Rejected(rejection));
            return;
        }

        self.next_conn += 1;
        let conn = ConnectionId(self.next_conn);
        self.attempt = Some(Attempt {
            conn,
            opened: false,
            capturing: false,
            transcript: TranscriptAssembler::new(),
        });
        term.set_stdin_enabled(false);
        term.show_message(RECORDING_MESSAGE, None);
        self.transition(DictationState::Recording { mode });
        self.connect.arm(now, self.config.connect_timeout);

        if let Err(failure) = host.open_side_channel(conn) {
            self.fail_connection(failure, host, term);
        }
    }

    /// User stop: release the microphone now, then wait for late segments.
    fn stop(&mut self, now: Instant, host: &mut dyn DictationHost) {
        let DictationState::Recording { mode } = self.state else {
            return;
        };
        self.hold.cancel();
        if let Some(attempt) = self.attempt.as_mut() {
            if attempt.capturing {
                host.stop_capture();
                attempt.capturing = false;
            }
            if attempt.opened && !host.send_side_channel(attempt.conn, ClientFrame::Done) {
                log_debug(&format!("{}: failed to queue Done", attempt.conn));
            }
        }
        self.transition(DictationState::Finalizing { mode });
        self.settle.arm(now, self.config.stop_grace);
    }

    fn fail_connection(
        &mut self,
        failure: ConnectionFailure,
        host: &mut dyn DictationHost,
        term: &mut dyn TerminalSink,
    ) {
        tracing::warn!(target: "dictation", error = %failure, "side channel failed");
        self.finalize(false, host, term);
        term.show_message(&failure.to_string(), Some(FAILURE_MESSAGE_TIMEOUT));
        self.observers
            .notify(&DictationEvent::ConnectionFailed(failure));
    }

    fn finalize(
        &mut self,
        insert: bool,
        host: &mut dyn DictationHost,
        term: &mut dyn TerminalSink,
    ) {
        if !self.is_recording() {
            return;
        }
        self.hold.cancel();
        self.connect.cancel();
        self.settle.cancel();

        let Some(attempt) = self.attempt.take() else {
            self.transition(DictationState::Idle);
            return;
        };
        let conn = attempt.conn;
        let text = attempt.transcript.finalize();
        let inserted = insert && !text.is_empty();
        if inserted {
            log_debug_content(&format!("{conn}: inserting {text:?}"));
            term.send_input(text.as_bytes());
        }

        term.set_stdin_enabled(true);
        term.remove_message();
        if attempt.capturing {
            host.stop_capture();
        }
        host.close_side_channel(conn);

        tracing::info!(
            target: "dictation",
            conn = conn.0,
            inserted,
            chars = text.chars().count(),
            "dictation finalized"
        );
        self.transition(DictationState::Idle);
        if inserted {
            self.observers.notify(&DictationEvent::Inserted {
                chars: text.chars().count(),
            });
        }
    }

    fn transition(&mut self, next: DictationState) {
        if self.state == next {
            return;
        }
        log_debug(&format!(
            "dictation: {} -> {}",
            self.state.label(),
            next.label()
        ));
        self.state = next;
        self.observers.notify(&DictationEvent::StateChanged(next));
    }
}
