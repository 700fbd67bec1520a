use super::*;
use crate::asr::{Handshake, SideChannelEvent, SideChannelEventKind};
use crate::terminal::MemoryTerminal;
use crate::timers::{Clock, ManualClock};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct FakeHost {
    microphone: bool,
    open_error: Option<ConnectionFailure>,
    capture_error: Option<CaptureError>,
    opened: Vec<ConnectionId>,
    closed: Vec<ConnectionId>,
    sent: Vec<(ConnectionId, ClientFrame)>,
    capture_starts: usize,
    capture_stops: usize,
    capturing: bool,
}

impl FakeHost {
    fn new() -> Self {
        Self {
            microphone: true,
            ..Self::default()
        }
    }

    fn audio_frames(&self) -> usize {
        self.sent
            .iter()
            .filter(|(_, frame)| matches!(frame, ClientFrame::Audio(_)))
            .count()
    }

    fn sent_done(&self) -> bool {
        self.sent
            .iter()
            .any(|(_, frame)| matches!(frame, ClientFrame::Done))
    }
}

impl DictationHost for FakeHost {
    fn microphone_available(&mut self) -> bool {
        self.microphone
    }

    fn open_side_channel(&mut self, conn: ConnectionId) -> Result<(), ConnectionFailure> {
        if let Some(failure) = self.open_error.clone() {
            return Err(failure);
        }
        self.opened.push(conn);
        Ok(())
    }

    fn send_side_channel(&mut self, conn: ConnectionId, frame: ClientFrame) -> bool {
        self.sent.push((conn, frame));
        true
    }

    fn close_side_channel(&mut self, conn: ConnectionId) {
        self.closed.push(conn);
    }

    fn start_capture(&mut self, _conn: ConnectionId) -> Result<CaptureSession, CaptureError> {
        if let Some(err) = self.capture_error.clone() {
            return Err(err);
        }
        self.capture_starts += 1;
        self.capturing = true;
        Ok(CaptureSession {
            device_name: "fake mic".to_string(),
            native_rate: 48_000,
            target_rate: 16_000,
            channels: 1,
            frame_samples: 2048,
        })
    }

    fn stop_capture(&mut self) {
        self.capture_stops += 1;
        self.capturing = false;
    }
}

struct Harness {
    clock: ManualClock,
    host: FakeHost,
    term: MemoryTerminal,
    controller: DictationController,
    events: Arc<Mutex<Vec<DictationEvent>>>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(DictationConfig {
            auth_token: "token".to_string(),
            ..DictationConfig::default()
        })
    }

    fn with_config(config: DictationConfig) -> Self {
        let mut controller = DictationController::new(config);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        controller.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        Self {
            clock: ManualClock::new(),
            host: FakeHost::new(),
            term: MemoryTerminal::new(),
            controller,
            events,
        }
    }

    fn input(&mut self, event: InputEvent) {
        let now = self.clock.now();
        self.controller
            .handle_input(event, now, &mut self.host, &mut self.term);
    }

    fn advance(&mut self, ms: u64) {
        self.clock.advance(Duration::from_millis(ms));
        let now = self.clock.now();
        self.controller
            .poll_timers(now, &mut self.host, &mut self.term);
    }

    fn side(&mut self, kind: SideChannelEventKind) {
        let conn = self.controller.current_connection().unwrap();
        self.side_from(conn, kind);
    }

    fn side_from(&mut self, conn: ConnectionId, kind: SideChannelEventKind) {
        let now = self.clock.now();
        self.controller.on_side_channel(
            SideChannelEvent { conn, kind },
            now,
            &mut self.host,
            &mut self.term,
        );
    }

    fn segment(&mut self, index: u64, text: &str) {
        self.side(SideChannelEventKind::Message(format!(
            r#"{{"segment":{index},"text":"{text}"}}"#
        )));
    }

    fn start_button_recording(&mut self) {
        self.input(InputEvent::Click);
        self.side(SideChannelEventKind::Opened);
    }

    fn recorded(&self) -> Vec<DictationEvent> {
        self.events.lock().unwrap().clone()
    }
}

fn recording(mode: StartMode) -> DictationState {
    DictationState::Recording { mode }
}

#[test]
fn short_hotkey_tap_never_records() {
    let mut h = Harness::new();
    h.input(InputEvent::key_down(DEFAULT_HOTKEY));
    assert_eq!(h.controller.state(), DictationState::HoldArmed);
    h.advance(499);
    h.input(InputEvent::key_up(DEFAULT_HOTKEY));
    assert_eq!(h.controller.state(), DictationState::Idle);
    h.advance(1000);
    assert_eq!(h.controller.state(), DictationState::Idle);
    assert!(h.host.opened.is_empty());
}

#[test]
fn holding_past_the_threshold_records_in_hotkey_mode() {
    let mut h = Harness::new();
    h.input(InputEvent::key_down(DEFAULT_HOTKEY));
    h.advance(500);
    assert_eq!(h.controller.state(), recording(StartMode::Hotkey));
    assert_eq!(h.host.opened.len(), 1);
    assert!(!h.term.stdin_enabled);
    assert!(h.term.current_message.is_some());
}

#[test]
fn other_key_interrupts_the_hold() {
    let mut h = Harness::new();
    h.input(InputEvent::key_down(DEFAULT_HOTKEY));
    h.advance(200);
    h.input(InputEvent::key_down("KeyA"));
    assert_eq!(h.controller.state(), DictationState::Idle);
    h.advance(1000);
    assert!(h.host.opened.is_empty());
}

#[test]
fn blur_and_hidden_abort_the_hold() {
    for abort in [InputEvent::WindowBlur, InputEvent::VisibilityHidden] {
        let mut h = Harness::new();
        h.input(InputEvent::key_down(DEFAULT_HOTKEY));
        h.input(abort);
        h.advance(1000);
        assert_eq!(h.controller.state(), DictationState::Idle);
        assert!(h.host.opened.is_empty());
    }
}

#[test]
fn repeats_and_modifier_chords_do_not_arm() {
    let mut h = Harness::new();
    h.input(InputEvent::KeyDown {
        code: DEFAULT_HOTKEY.to_string(),
        repeat: true,
        alt: false,
        ctrl: false,
        meta: false,
    });
    h.input(InputEvent::KeyDown {
        code: DEFAULT_HOTKEY.to_string(),
        repeat: false,
        alt: false,
        ctrl: true,
        meta: false,
    });
    assert_eq!(h.controller.state(), DictationState::Idle);
}

#[test]
fn repeat_keydown_keeps_the_original_deadline() {
    let mut h = Harness::new();
    h.input(InputEvent::key_down(DEFAULT_HOTKEY));
    h.advance(300);
    h.input(InputEvent::KeyDown {
        code: DEFAULT_HOTKEY.to_string(),
        repeat: true,
        alt: false,
        ctrl: false,
        meta: false,
    });
    h.advance(200);
    assert_eq!(h.controller.state(), recording(StartMode::Hotkey));
}

#[test]
fn unfocused_terminal_ignores_the_hotkey() {
    let mut h = Harness::new();
    h.input(InputEvent::TerminalFocus(false));
    h.input(InputEvent::key_down(DEFAULT_HOTKEY));
    assert_eq!(h.controller.state(), DictationState::Idle);
    h.input(InputEvent::TerminalFocus(true));
    h.input(InputEvent::key_down(DEFAULT_HOTKEY));
    assert_eq!(h.controller.state(), DictationState::HoldArmed);
}

#[test]
fn custom_hotkey_and_hold_duration_are_honoured() {
    let mut h = Harness::with_config(DictationConfig {
        hotkey: "F9".to_string(),
        hold: Duration::from_millis(100),
        ..DictationConfig::default()
    });
    h.input(InputEvent::key_down(DEFAULT_HOTKEY));
    assert_eq!(h.controller.state(), DictationState::Idle);
    h.input(InputEvent::key_down("F9"));
    h.advance(100);
    assert_eq!(h.controller.state(), recording(StartMode::Hotkey));
}

#[test]
fn open_sends_handshake_then_starts_capture() {
    let mut h = Harness::new();
    h.start_button_recording();
    assert_eq!(h.controller.state(), recording(StartMode::Button));
    assert_eq!(h.host.capture_starts, 1);
    let conn = h.controller.current_connection().unwrap();
    assert_eq!(
        h.host.sent.first(),
        Some(&(conn, ClientFrame::Handshake(Handshake::new("token"))))
    );
}

#[test]
fn audio_frames_flow_only_while_recording() {
    let mut h = Harness::new();
    h.input(InputEvent::Click);
    let conn = h.controller.current_connection().unwrap();
    assert!(!h.controller.on_audio_frame(conn, vec![0.0; 4], &mut h.host));

    h.side(SideChannelEventKind::Opened);
    assert!(h.controller.on_audio_frame(conn, vec![0.0; 4], &mut h.host));
    assert!(!h
        .controller
        .on_audio_frame(ConnectionId(conn.0 + 1), vec![0.0; 4], &mut h.host));

    h.input(InputEvent::Click);
    assert!(!h.controller.on_audio_frame(conn, vec![0.0; 4], &mut h.host));
    assert_eq!(h.host.audio_frames(), 1);
}

#[test]
fn button_stop_releases_mic_and_inserts_after_grace() {
    let mut h = Harness::new();
    h.start_button_recording();
    h.segment(1, "world");
    h.segment(0, "hello");

    h.input(InputEvent::Click);
    assert_eq!(
        h.controller.state(),
        DictationState::Finalizing {
            mode: StartMode::Button
        }
    );
    assert!(!h.host.capturing);
    assert_eq!(h.host.capture_stops, 1);
    assert!(h.host.sent_done());
    assert!(h.term.sent_input.is_empty());

    h.advance(699);
    assert!(h.term.sent_input.is_empty());
    h.advance(1);
    assert_eq!(h.term.sent_text(), vec!["hello world".to_string()]);
    assert_eq!(h.controller.state(), DictationState::Idle);
    assert!(h.term.stdin_enabled);
    assert_eq!(h.term.current_message, None);
    assert!(h
        .recorded()
        .contains(&DictationEvent::Inserted { chars: 11 }));
}

#[test]
fn late_segments_extend_the_quiet_window() {
    let mut h = Harness::new();
    h.start_button_recording();
    h.input(InputEvent::Click);

    h.advance(600);
    h.segment(0, "still");
    h.advance(200);
    h.segment(1, "talking");
    h.advance(249);
    assert!(h.controller.is_recording());
    h.advance(1);
    assert_eq!(h.term.sent_text(), vec!["still talking".to_string()]);
}

#[test]
fn segments_while_recording_do_not_finalize() {
    let mut h = Harness::new();
    h.start_button_recording();
    h.segment(0, "partial");
    h.advance(2000);
    assert_eq!(h.controller.state(), recording(StartMode::Button));
}

#[test]
fn hotkey_release_stops_hotkey_recording() {
    let mut h = Harness::new();
    h.input(InputEvent::key_down(DEFAULT_HOTKEY));
    h.advance(500);
    h.side(SideChannelEventKind::Opened);
    h.segment(0, "ls -la");
    h.input(InputEvent::key_down("KeyA"));
    assert_eq!(h.controller.state(), recording(StartMode::Hotkey));
    h.input(InputEvent::key_up(DEFAULT_HOTKEY));
    assert!(matches!(
        h.controller.state(),
        DictationState::Finalizing { .. }
    ));
    h.advance(700);
    assert_eq!(h.term.sent_text(), vec!["ls -la".to_string()]);
}

#[test]
fn blur_stops_hotkey_recording_but_not_button_recording() {
    let mut h = Harness::new();
    h.start_button_recording();
    h.input(InputEvent::WindowBlur);
    h.input(InputEvent::key_up(DEFAULT_HOTKEY));
    assert_eq!(h.controller.state(), recording(StartMode::Button));

    let mut h = Harness::new();
    h.input(InputEvent::key_down(DEFAULT_HOTKEY));
    h.advance(500);
    h.input(InputEvent::VisibilityHidden);
    assert!(matches!(
        h.controller.state(),
        DictationState::Finalizing { .. }
    ));
}

#[test]
fn connect_timeout_fails_without_inserting() {
    let mut h = Harness::new();
    h.input(InputEvent::Click);
    assert_eq!(h.controller.state(), recording(StartMode::Button));
    h.advance(4999);
    assert_eq!(h.controller.state(), recording(StartMode::Button));
    h.advance(1);
    assert_eq!(h.controller.state(), DictationState::Idle);
    assert!(h.term.sent_input.is_empty());
    assert!(h.term.stdin_enabled);
    assert_eq!(
        h.term.last_message(),
        Some(ConnectionFailure::Timeout.to_string().as_str())
    );
    assert_eq!(h.host.capture_starts, 0);
    assert!(h
        .recorded()
        .contains(&DictationEvent::ConnectionFailed(ConnectionFailure::Timeout)));
}

#[test]
fn close_before_open_is_a_connection_failure() {
    let mut h = Harness::new();
    h.input(InputEvent::Click);
    h.side(SideChannelEventKind::Closed);
    assert_eq!(h.controller.state(), DictationState::Idle);
    assert_eq!(
        h.term.last_message(),
        Some(ConnectionFailure::ClosedBeforeOpen.to_string().as_str())
    );
}

#[test]
fn server_close_while_recording_inserts_what_arrived() {
    let mut h = Harness::new();
    h.start_button_recording();
    h.segment(0, "echo hi");
    h.side(SideChannelEventKind::Closed);
    assert_eq!(h.controller.state(), DictationState::Idle);
    assert_eq!(h.term.sent_text(), vec!["echo hi".to_string()]);
    assert!(!h.host.capturing);
}

#[test]
fn socket_error_after_open_inserts_partial_transcript() {
    let mut h = Harness::new();
    h.start_button_recording();
    h.segment(0, "partial");
    h.side(SideChannelEventKind::Error("reset".to_string()));
    assert_eq!(h.term.sent_text(), vec!["partial".to_string()]);
    assert_eq!(h.controller.state(), DictationState::Idle);
    assert!(h.term.last_message().unwrap().contains("reset"));
}

#[test]
fn socket_error_before_any_segment_inserts_nothing() {
    let mut h = Harness::new();
    h.input(InputEvent::Click);
    h.side(SideChannelEventKind::Error("refused".to_string()));
    assert!(h.term.sent_input.is_empty());
    assert_eq!(h.controller.state(), DictationState::Idle);
}

#[test]
fn stale_connection_events_are_ignored() {
    let mut h = Harness::new();
    h.input(InputEvent::Click);
    let first = h.controller.current_connection().unwrap();
    h.advance(5000);
    h.input(InputEvent::Click);
    let second = h.controller.current_connection().unwrap();
    assert_ne!(first, second);

    h.side_from(first, SideChannelEventKind::Opened);
    h.side_from(first, SideChannelEventKind::Closed);
    assert_eq!(h.controller.state(), recording(StartMode::Button));
    assert_eq!(h.host.capture_starts, 0);
}

#[test]
fn unparseable_frames_are_ignored() {
    let mut h = Harness::new();
    h.start_button_recording();
    h.side(SideChannelEventKind::Message("garbage".to_string()));
    h.side(SideChannelEventKind::Message(
        r#"{"segment":"x","text":"lost"}"#.to_string(),
    ));
    h.segment(0, "kept");
    h.input(InputEvent::Click);
    h.advance(700);
    assert_eq!(h.term.sent_text(), vec!["kept".to_string()]);
}

#[test]
fn policy_rejections_never_open_a_socket() {
    let cases = [
        (
            DictationConfig {
                permit_write: false,
                ..DictationConfig::default()
            },
            true,
            PolicyRejection::WriteNotPermitted,
        ),
        (
            DictationConfig {
                secure_context: false,
                ..DictationConfig::default()
            },
            true,
            PolicyRejection::InsecureContext,
        ),
        (DictationConfig::default(), false, PolicyRejection::NoMicrophone),
    ];
    for (config, microphone, expected) in cases {
        let mut h = Harness::with_config(config);
        h.host.microphone = microphone;
        h.input(InputEvent::Click);
        assert_eq!(h.controller.state(), DictationState::Idle);
        assert!(h.host.opened.is_empty());
        assert_eq!(h.term.last_message(), Some(expected.to_string().as_str()));
        assert!(h.recorded().contains(&DictationEvent::Rejected(expected)));
    }
}

#[test]
fn disabled_controller_ignores_everything() {
    let mut h = Harness::with_config(DictationConfig {
        enabled: false,
        ..DictationConfig::default()
    });
    h.input(InputEvent::Click);
    h.input(InputEvent::key_down(DEFAULT_HOTKEY));
    h.advance(1000);
    assert_eq!(h.controller.state(), DictationState::Idle);
    assert!(h.term.messages.is_empty());
}

#[test]
fn capture_failure_after_open_finalizes_without_insert() {
    let mut h = Harness::new();
    h.host.capture_error = Some(CaptureError::PermissionDenied { hint: "allow it" });
    h.input(InputEvent::Click);
    let conn = h.controller.current_connection().unwrap();
    h.side(SideChannelEventKind::Opened);
    assert_eq!(h.controller.state(), DictationState::Idle);
    assert!(h.host.closed.contains(&conn));
    assert!(h.term.last_message().unwrap().contains("denied"));
    assert!(h.term.stdin_enabled);
}

#[test]
fn open_failure_is_reported_immediately() {
    let mut h = Harness::new();
    h.host.open_error = Some(ConnectionFailure::Socket("bad url".to_string()));
    h.input(InputEvent::Click);
    assert_eq!(h.controller.state(), DictationState::Idle);
    assert_eq!(h.controller.next_deadline(), None);
}

#[test]
fn open_after_user_stop_closes_socket_without_capturing() {
    let mut h = Harness::new();
    h.input(InputEvent::Click);
    h.input(InputEvent::Click);
    let conn = h.controller.current_connection().unwrap();
    h.side(SideChannelEventKind::Opened);
    assert_eq!(h.host.capture_starts, 0);
    assert!(h.host.closed.contains(&conn));
    h.advance(700);
    assert_eq!(h.controller.state(), DictationState::Idle);
}

#[test]
fn at_most_one_timer_per_purpose() {
    let mut h = Harness::new();
    h.input(InputEvent::key_down(DEFAULT_HOTKEY));
    let first = h.controller.next_deadline().unwrap();
    h.clock.advance(Duration::from_millis(100));
    h.input(InputEvent::key_down(DEFAULT_HOTKEY));
    assert_eq!(h.controller.next_deadline(), Some(first));
}

#[test]
fn shutdown_discards_attempt_and_closes_bus() {
    let mut h = Harness::new();
    let publisher = h.controller.input_publisher().unwrap();
    h.start_button_recording();
    h.segment(0, "never inserted");

    h.controller.shutdown(&mut h.host, &mut h.term);
    assert_eq!(h.controller.state(), DictationState::Idle);
    assert!(h.term.sent_input.is_empty());
    assert!(!h.host.capturing);
    assert_eq!(h.controller.next_deadline(), None);
    assert!(!publisher.publish(InputEvent::Click));
    assert!(h.controller.input_publisher().is_none());
}

#[test]
fn published_input_is_handled_on_pump() {
    let mut h = Harness::new();
    let publisher = h.controller.input_publisher().unwrap();
    assert!(publisher.publish(InputEvent::key_down(DEFAULT_HOTKEY)));
    assert_eq!(h.controller.state(), DictationState::Idle);
    let now = h.clock.now();
    h.controller.pump_input(now, &mut h.host, &mut h.term);
    assert_eq!(h.controller.state(), DictationState::HoldArmed);
}

#[test]
fn observers_see_each_transition_once() {
    let mut h = Harness::new();
    h.start_button_recording();
    h.input(InputEvent::Click);
    h.advance(700);
    let states: Vec<DictationState> = h
        .recorded()
        .into_iter()
        .filter_map(|event| match event {
            DictationEvent::StateChanged(state) => Some(state),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            recording(StartMode::Button),
            DictationState::Finalizing {
                mode: StartMode::Button
            },
            DictationState::Idle,
        ]
    );
}
