use anyhow::Result;
use std::path::PathBuf;
use ttylink::channel::MemoryChannel;
use ttylink::timers::{Clock, SystemClock};
use ttylink::upload::{DiskFile, UploadConfig, UploadSession, UploadStatus};

/// Device names from CPAL, or from `TTYLINK_TEST_DEVICES` (comma separated)
/// when set so the listing can be checked without audio hardware.
pub(crate) fn input_devices() -> Vec<String> {
    if let Ok(raw) = std::env::var("TTYLINK_TEST_DEVICES") {
        return parse_device_list(&raw);
    }
    ttylink::audio::AudioCaptureEngine::list_devices().unwrap_or_else(|err| {
        eprintln!("Failed to list audio input devices: {err}");
        Vec::new()
    })
}

fn parse_device_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

pub(crate) fn list_input_devices() -> Result<()> {
    let devices = input_devices();
    if devices.is_empty() {
        println!("No audio input devices detected.");
    } else {
        println!("Available audio input devices:");
        for name in devices {
            println!("  - {name}");
        }
    }
    Ok(())
}

/// Run each file through a real upload session against an in-memory channel
/// and print the negotiated framing. Returns false if any file failed.
pub(crate) fn plan_uploads(paths: &[PathBuf], config: &UploadConfig) -> bool {
    let clock = SystemClock;
    let mut all_ok = true;
    for path in paths {
        let source = match DiskFile::open(path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("{}: {err:#}", path.display());
                all_ok = false;
                continue;
            }
        };
        let mut session = match UploadSession::begin(
            Box::new(source),
            config.message_budget,
            config.preferred_chunk_size,
            clock.now(),
        ) {
            Ok(session) => session,
            Err(err) => {
                eprintln!("{}: {err}", path.display());
                all_ok = false;
                continue;
            }
        };
        let mut channel = MemoryChannel::new();
        let status = session.run_to_completion(&mut channel, &clock);
        let largest = channel
            .frames()
            .iter()
            .map(|frame| frame.len())
            .max()
            .unwrap_or(0);
        println!(
            "{}: {} bytes, chunk {} bytes x {} (largest message {} of {} bytes), {}",
            session.task().name(),
            session.task().size(),
            session.chunk_size(),
            session.total_chunks(),
            largest,
            config.message_budget,
            status.label()
        );
        if status != UploadStatus::Completed {
            if let Some(err) = session.error() {
                eprintln!("{err}");
            }
            all_ok = false;
        }
    }
    all_ok
}
