//! Live microphone capture via CPAL.
//!
//! Handles device lookup, sample format conversion, and streaming hand-off.
//! Audio is never accumulated: every fixed-size native frame is resampled to
//! the protocol rate and pushed to the sink as soon as it is complete.

use super::dispatch::{FrameDispatcher, FrameSink};
use super::{CaptureError, TARGET_RATE};
use crate::{lock_or_recover, log_debug};
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BuildStreamError, DefaultStreamConfigError, PlayStreamError, SampleFormat, StreamConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Native samples per emitted buffer before resampling.
pub const DEFAULT_FRAME_SAMPLES: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub preferred_device: Option<String>,
    pub frame_samples: usize,
    /// False when the side channel would travel over a non-loopback plaintext link.
    pub secure_context: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            preferred_device: None,
            frame_samples: DEFAULT_FRAME_SAMPLES,
            secure_context: true,
        }
    }
}

/// Parameters of one open capture, read from the device at start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSession {
    pub device_name: String,
    pub native_rate: u32,
    pub target_rate: u32,
    pub channels: u16,
    pub frame_samples: usize,
}

/// Counters reported when a capture is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureStats {
    pub frames_emitted: usize,
    pub frames_dropped: usize,
}

struct ActiveCapture {
    stream: cpal::Stream,
    session: CaptureSession,
    dispatcher: Arc<Mutex<FrameDispatcher>>,
    dropped: Arc<AtomicUsize>,
}

/// Owns the microphone while a dictation attempt is recording.
///
/// Only one capture may be open at a time; [`stop`](Self::stop) releases the
/// device synchronously.
pub struct AudioCaptureEngine {
    config: CaptureConfig,
    active: Option<ActiveCapture>,
}

impl AudioCaptureEngine {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            active: None,
        }
    }

    /// List microphone names so the CLI can expose a human-friendly selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    pub fn microphone_available(&self) -> bool {
        self.find_device().is_ok()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn session(&self) -> Option<&CaptureSession> {
        self.active.as_ref().map(|active| &active.session)
    }

    fn find_device(&self) -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        match self.config.preferred_device.as_deref() {
            Some(name) => {
                let mut devices = host
                    .input_devices()
                    .map_err(|err| CaptureError::Device(err.to_string()))?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string()))
            }
            None => host.default_input_device().ok_or(CaptureError::NoMicrophone),
        }
    }

    /// Open the microphone and stream resampled buffers into `sink`.
    pub fn start(&mut self, sink: FrameSink) -> Result<CaptureSession, CaptureError> {
        if self.active.is_some() {
            return Err(CaptureError::AlreadyActive);
        }
        if !self.config.secure_context {
            return Err(CaptureError::InsecureContext);
        }
        let device = self.find_device()?;
        let default_config = device
            .default_input_config()
            .map_err(map_default_config_error)?;
        let format = default_config.sample_format();
        let device_config: StreamConfig = default_config.into();
        let native_rate = device_config.sample_rate.0;
        if native_rate == 0 {
            return Err(CaptureError::Device(
                "device reported a 0 Hz sample rate".to_string(),
            ));
        }
        let channels = usize::from(device_config.channels.max(1));
        let device_name = device
            .name()
            .unwrap_or_else(|_| "unknown input device".to_string());
        log_debug(&format!(
            "capture config: format={format:?} sample_rate={native_rate}Hz channels={channels}"
        ));

        let dropped = Arc::new(AtomicUsize::new(0));
        let dispatcher = Arc::new(Mutex::new(FrameDispatcher::new(
            self.config.frame_samples,
            native_rate,
            TARGET_RATE,
            sink,
            dropped.clone(),
        )));

        let err_fn = |err| log_debug(&format!("audio_stream_error: {err}"));
        let stream = match format {
            SampleFormat::F32 => {
                let dispatcher = dispatcher.clone();
                let dropped = dropped.clone();
                device.build_input_stream(
                    &device_config,
                    move |data: &[f32], _| {
                        if let Ok(mut pump) = dispatcher.try_lock() {
                            pump.push(data, channels, |sample| sample);
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    err_fn,
                    None,
                )
            }
            SampleFormat::I16 => {
                let dispatcher = dispatcher.clone();
                let dropped = dropped.clone();
                device.build_input_stream(
                    &device_config,
                    move |data: &[i16], _| {
                        if let Ok(mut pump) = dispatcher.try_lock() {
                            pump.push(data, channels, |sample| sample as f32 / 32_768.0);
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    err_fn,
                    None,
                )
            }
            SampleFormat::U16 => {
                let dispatcher = dispatcher.clone();
                let dropped = dropped.clone();
                device.build_input_stream(
                    &device_config,
                    move |data: &[u16], _| {
                        if let Ok(mut pump) = dispatcher.try_lock() {
                            pump.push(data, channels, |sample| {
                                (sample as f32 - 32_768.0) / 32_768.0
                            });
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    err_fn,
                    None,
                )
            }
            other => return Err(CaptureError::UnsupportedFormat(format!("{other:?}"))),
        }
        .map_err(map_build_error)?;

        stream.play().map_err(map_play_error)?;

        let session = CaptureSession {
            device_name,
            native_rate,
            target_rate: TARGET_RATE,
            channels: device_config.channels,
            frame_samples: self.config.frame_samples,
        };
        self.active = Some(ActiveCapture {
            stream,
            session: session.clone(),
            dispatcher,
            dropped,
        });
        Ok(session)
    }

    /// Release the device. Safe to call when nothing is open.
    pub fn stop(&mut self) -> Option<CaptureStats> {
        let active = self.active.take()?;
        if let Err(err) = active.stream.pause() {
            log_debug(&format!("failed to pause audio stream: {err}"));
        }
        drop(active.stream);
        let dispatcher = lock_or_recover(&active.dispatcher, "audio dispatcher");
        let stats = CaptureStats {
            frames_emitted: dispatcher.emitted(),
            frames_dropped: active.dropped.load(Ordering::Relaxed),
        };
        log_debug(&format!(
            "capture stopped: emitted={} dropped={} partial_samples={}",
            stats.frames_emitted,
            stats.frames_dropped,
            dispatcher.pending_len()
        ));
        Some(stats)
    }
}

impl Drop for AudioCaptureEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

pub(super) fn mic_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "macOS: System Settings > Privacy & Security > Microphone (enable your terminal)."
    }
    #[cfg(target_os = "linux")]
    {
        "Linux: check PipeWire/PulseAudio permissions and ensure the device is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Windows: Settings > Privacy & Security > Microphone (allow access for your terminal)."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check OS microphone permissions."
    }
}

pub(super) fn classify_backend_error(description: &str) -> CaptureError {
    let lower = description.to_ascii_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized")
    {
        CaptureError::PermissionDenied {
            hint: mic_permission_hint(),
        }
    } else {
        CaptureError::Device(description.to_string())
    }
}

fn map_default_config_error(err: DefaultStreamConfigError) -> CaptureError {
    match err {
        DefaultStreamConfigError::DeviceNotAvailable => CaptureError::NoMicrophone,
        DefaultStreamConfigError::BackendSpecific { err } => {
            classify_backend_error(&err.description)
        }
        other => CaptureError::Device(other.to_string()),
    }
}

fn map_build_error(err: BuildStreamError) -> CaptureError {
    match err {
        BuildStreamError::DeviceNotAvailable => CaptureError::NoMicrophone,
        BuildStreamError::BackendSpecific { err } => classify_backend_error(&err.description),
        other => CaptureError::Device(other.to_string()),
    }
}

fn map_play_error(err: PlayStreamError) -> CaptureError {
    match err {
        PlayStreamError::DeviceNotAvailable => CaptureError::NoMicrophone,
        PlayStreamError::BackendSpecific { err } => classify_backend_error(&err.description),
    }
}
