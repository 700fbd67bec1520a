//! `--dictate-once`: one button-mode dictation against the live server.

use anyhow::Result;
use crossbeam_channel::unbounded;
use std::thread;
use std::time::{Duration, Instant};
use ttylink::app::{ClientEvent, ClientRuntime, LiveDictationHost, RuntimeConfig};
use ttylink::channel::{protocol, MemoryChannel};
use ttylink::config::AppConfig;
use ttylink::dictation::{DictationState, InputEvent};
use ttylink::terminal::MemoryTerminal;
use ttylink::timers::SystemClock;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Record for `seconds`, wait for the transcript, and return the text the
/// terminal would have received.
pub(crate) fn dictate_once(config: &AppConfig, seconds: u64) -> Result<String> {
    let endpoint = config.side_channel_url()?;
    let (events_tx, events_rx) = unbounded();
    let host = LiveDictationHost::new(endpoint, config.capture_config(), events_tx.clone());
    let runtime_config = RuntimeConfig {
        upload: config.upload_config(),
        dictation: config.dictation_config(),
    };
    let mut runtime = ClientRuntime::with_events(
        runtime_config,
        MemoryChannel::new(),
        MemoryTerminal::new(),
        host,
        SystemClock,
        (events_tx, events_rx),
    );

    let sender = runtime.sender();
    let _ = sender.send(ClientEvent::Input(InputEvent::Click));
    runtime.pump();

    let record_until = Instant::now() + Duration::from_secs(seconds);
    let mut stop_sent = false;
    while runtime.pump() {
        let state = runtime.dictation().state();
        if state == DictationState::Idle {
            break;
        }
        if !stop_sent && Instant::now() >= record_until {
            if let DictationState::Recording { .. } = state {
                let _ = sender.send(ClientEvent::Input(InputEvent::Click));
            }
            stop_sent = true;
        }
        thread::sleep(POLL_INTERVAL);
    }
    runtime.stop();

    for message in &runtime.view().messages {
        eprintln!("{}", message.text);
    }
    Ok(inserted_text(runtime.channel()))
}

fn inserted_text(channel: &MemoryChannel) -> String {
    channel
        .frames()
        .iter()
        .filter_map(|frame| match frame.as_bytes().split_first() {
            Some((&protocol::INPUT, rest)) => Some(String::from_utf8_lossy(rest).into_owned()),
            _ => None,
        })
        .collect()
}
