//! `--doctor` report: what upload and dictation would do with the current flags.

use crate::audio::AudioCaptureEngine;
use crate::config::AppConfig;
use crate::dictation::{check_policy, PolicyRejection};
use crate::upload::{chunk_count, negotiate_chunk_size};
use crate::{crash_log_path, log_file_path};
use std::{env, fmt::Display};

pub struct DoctorReport {
    lines: Vec<String>,
}

impl DoctorReport {
    pub fn new(title: &str) -> Self {
        Self {
            lines: vec![title.to_string()],
        }
    }

    pub fn section(&mut self, title: &str) {
        self.lines.push(String::new());
        self.lines.push(format!("{title}:"));
    }

    pub fn push_kv(&mut self, key: &str, value: impl Display) {
        self.lines.push(format!("  {key}: {value}"));
    }

    pub fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

/// Build the report. Device probing is skipped when `devices` is `None`.
pub fn doctor_report(config: &AppConfig, devices: Option<&[String]>) -> DoctorReport {
    let mut report = DoctorReport::new("ttylink doctor");
    report.push_kv("version", env!("CARGO_PKG_VERSION"));
    report.push_kv("os", format!("{}/{}", env::consts::OS, env::consts::ARCH));

    let mut validated = config.clone();
    let validation_result = validated.validate();
    let resolved = validation_result
        .as_ref()
        .map(|_| &validated)
        .unwrap_or(config);

    report.section("Config");
    match &validation_result {
        Ok(()) => report.push_kv("validation", "ok"),
        Err(err) => report.push_kv("validation", format!("error: {err}")),
    }
    let logs = resolved.log_settings();
    report.push_kv("logs", if logs.enabled { "enabled" } else { "disabled" });
    report.push_kv(
        "log_content",
        if logs.content { "enabled" } else { "disabled" },
    );
    report.push_kv("log_file", log_file_path().display());
    report.push_kv("crash_log", crash_log_path().display());

    report.section("Server");
    match resolved.base_url() {
        Ok(Some(url)) => report.push_kv("url", url),
        Ok(None) => report.push_kv("url", "unset"),
        Err(err) => report.push_kv("url", format!("error: {err}")),
    }
    report.push_kv("permit_write", resolved.permit_write);
    report.push_kv("secure_context", resolved.secure_context());

    report.section("Upload");
    let upload = resolved.upload_config();
    report.push_kv("message_budget", upload.message_budget);
    report.push_kv("preferred_chunk", upload.preferred_chunk_size);
    // A 1 MiB file with a typical name shows the effective chunk size.
    let sample_size = 1024 * 1024;
    let chunk = negotiate_chunk_size(
        upload.message_budget,
        "example.bin",
        sample_size,
        upload.preferred_chunk_size,
    );
    if chunk == 0 {
        report.push_kv("chunk_for_1MiB", "none (budget too small)");
    } else {
        report.push_kv(
            "chunk_for_1MiB",
            format!("{chunk} bytes x {}", chunk_count(sample_size, chunk)),
        );
    }

    report.section("Dictation");
    let dictation = resolved.dictation_config();
    report.push_kv("enabled", dictation.enabled);
    report.push_kv("hotkey", &dictation.hotkey);
    report.push_kv("hold_ms", dictation.hold.as_millis());
    match resolved.side_channel_url() {
        Ok(url) => report.push_kv("endpoint", url),
        Err(_) => report.push_kv("endpoint", "unavailable (no --url)"),
    }
    let mic_available = devices.map(|names| !names.is_empty());
    let policy = check_policy(&dictation, mic_available.unwrap_or(true));
    report.push_kv("policy", policy_label(policy, mic_available.is_none()));

    report.section("Audio");
    report.push_kv(
        "input_device",
        resolved.input_device.as_deref().unwrap_or("default"),
    );
    report.push_kv("frame_samples", resolved.asr_frame_samples);
    match devices {
        None => report.push_kv("devices", "not probed"),
        Some([]) => report.push_kv("devices", "none"),
        Some(names) => {
            report.push_kv("device_count", names.len());
            report.push_line("  devices:");
            for name in names {
                report.push_line(format!("    - {name}"));
            }
        }
    }

    report
}

/// Probe CPAL for input devices, folding errors into an empty list.
pub fn probe_devices() -> Vec<String> {
    AudioCaptureEngine::list_devices().unwrap_or_default()
}

fn policy_label(policy: Result<(), PolicyRejection>, unprobed: bool) -> String {
    match policy {
        Ok(()) if unprobed => "ok (microphone not probed)".to_string(),
        Ok(()) => "ok".to_string(),
        Err(rejection) => format!("blocked: {rejection}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn render(args: &[&str], devices: Option<&[String]>) -> String {
        let mut argv = vec!["test-app"];
        argv.extend_from_slice(args);
        doctor_report(&AppConfig::parse_from(argv), devices).render()
    }

    #[test]
    fn report_lists_sections() {
        let text = render(&[], None);
        for section in ["Config:", "Server:", "Upload:", "Dictation:", "Audio:"] {
            assert!(text.contains(section), "missing {section}");
        }
        assert!(text.contains("devices: not probed"));
    }

    #[test]
    fn report_shows_validation_errors() {
        let text = render(&["--upload-chunk-size", "0"], None);
        assert!(text.contains("validation: error: --upload-chunk-size"));
    }

    #[test]
    fn report_explains_blocked_dictation() {
        let devices: Vec<String> = Vec::new();
        let text = render(
            &["--url", "http://10.1.2.3:8080/", "--enable-asr", "--permit-write"],
            Some(devices.as_slice()),
        );
        assert!(text.contains("endpoint: ws://10.1.2.3:8080/asr/ws"));
        assert!(text.contains("policy: blocked:"));
    }

    #[test]
    fn report_lists_devices() {
        let devices = vec!["USB Mic".to_string()];
        let text = render(&[], Some(devices.as_slice()));
        assert!(text.contains("device_count: 1"));
        assert!(text.contains("    - USB Mic"));
    }
}
