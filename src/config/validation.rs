use super::defaults::{
    HOTKEY_PATTERN, MAX_FRAME_SAMPLES, MAX_INPUT_DEVICE_LEN, MAX_UPLOAD_CHUNK_SIZE,
    MAX_UPLOAD_MESSAGE_SIZE, MAX_UPLOAD_PAUSE_MS, MIN_FRAME_SAMPLES, MIN_UPLOAD_MESSAGE_SIZE,
};
use super::AppConfig;
use crate::app::LogSettings;
use crate::asr::{is_secure_context, side_channel_url};
use crate::audio::CaptureConfig;
use crate::dictation::DictationConfig;
use crate::upload::UploadConfig;
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use regex::Regex;
use std::time::Duration;
use url::Url;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize strings.
    pub fn validate(&mut self) -> Result<()> {
        if !(MIN_UPLOAD_MESSAGE_SIZE..=MAX_UPLOAD_MESSAGE_SIZE).contains(&self.upload_message_size)
        {
            bail!(
                "--upload-message-size must be between {MIN_UPLOAD_MESSAGE_SIZE} and {MAX_UPLOAD_MESSAGE_SIZE} bytes, got {}",
                self.upload_message_size
            );
        }
        if self.upload_chunk_size == 0 || self.upload_chunk_size > MAX_UPLOAD_CHUNK_SIZE {
            bail!(
                "--upload-chunk-size must be between 1 and {MAX_UPLOAD_CHUNK_SIZE} bytes, got {}",
                self.upload_chunk_size
            );
        }
        if self.upload_pause_ms > MAX_UPLOAD_PAUSE_MS {
            bail!(
                "--upload-pause-ms must be at most {MAX_UPLOAD_PAUSE_MS} ms, got {}",
                self.upload_pause_ms
            );
        }

        if !(50..=5_000).contains(&self.asr_hold_ms) {
            bail!(
                "--asr-hold-ms must be between 50 and 5000 ms, got {}",
                self.asr_hold_ms
            );
        }
        if !(500..=60_000).contains(&self.asr_connect_timeout_ms) {
            bail!(
                "--asr-connect-timeout-ms must be between 500 and 60000 ms, got {}",
                self.asr_connect_timeout_ms
            );
        }
        if self.asr_stop_grace_ms > 10_000 {
            bail!(
                "--asr-stop-grace-ms must be at most 10000 ms, got {}",
                self.asr_stop_grace_ms
            );
        }
        if !(50..=5_000).contains(&self.asr_quiet_ms) {
            bail!(
                "--asr-quiet-ms must be between 50 and 5000 ms, got {}",
                self.asr_quiet_ms
            );
        }
        if !(MIN_FRAME_SAMPLES..=MAX_FRAME_SAMPLES).contains(&self.asr_frame_samples)
            || !self.asr_frame_samples.is_power_of_two()
        {
            bail!(
                "--asr-frame-samples must be a power of two between {MIN_FRAME_SAMPLES} and {MAX_FRAME_SAMPLES}, got {}",
                self.asr_frame_samples
            );
        }

        self.asr_hotkey = self.asr_hotkey.trim().to_string();
        let hotkey_re = Regex::new(HOTKEY_PATTERN).context("invalid hotkey pattern")?;
        if !hotkey_re.is_match(&self.asr_hotkey) {
            bail!(
                "--asr-hotkey must be a physical key name such as ShiftRight or F9, got '{}'",
                self.asr_hotkey
            );
        }

        if let Some(device) = &self.input_device {
            if device.trim().is_empty()
                || device.len() > MAX_INPUT_DEVICE_LEN
                || device.chars().any(char::is_control)
            {
                bail!(
                    "--input-device must be 1-{MAX_INPUT_DEVICE_LEN} characters with no control characters"
                );
            }
        }

        if let Some(query) = self.ws_query_args.as_mut() {
            *query = query.trim().trim_start_matches('?').to_string();
            if query.chars().any(|ch| ch.is_whitespace() || ch == '#') {
                bail!("--ws-query-args must not contain whitespace or '#'");
            }
        }

        if let Some(seconds) = self.dictate_once {
            if !(1..=60).contains(&seconds) {
                bail!("--dictate-once must be between 1 and 60 seconds, got {seconds}");
            }
        }

        if let Some(url) = self.base_url()? {
            // Fail early instead of at the first dictation attempt.
            side_channel_url(&url, self.ws_query_args.as_deref())?;
        } else if self.enable_asr || self.dictate_once.is_some() {
            bail!("dictation requires --url");
        }

        Ok(())
    }

    /// Parsed terminal page URL, if one was given.
    pub fn base_url(&self) -> Result<Option<Url>> {
        let Some(raw) = self.url.as_deref() else {
            return Ok(None);
        };
        let url = Url::parse(raw.trim()).with_context(|| format!("--url '{raw}' is not a URL"))?;
        if !matches!(url.scheme(), "http" | "https" | "ws" | "wss") {
            bail!("--url must use http, https, ws or wss, got '{}'", url.scheme());
        }
        if url.host_str().is_none() {
            bail!("--url '{raw}' has no host");
        }
        Ok(Some(url))
    }

    /// Dictation endpoint derived from `--url`.
    pub fn side_channel_url(&self) -> Result<Url> {
        let base = self
            .base_url()?
            .ok_or_else(|| anyhow!("dictation needs --url"))?;
        side_channel_url(&base, self.ws_query_args.as_deref())
    }

    pub fn secure_context(&self) -> bool {
        matches!(self.base_url(), Ok(Some(url)) if is_secure_context(&url))
    }

    pub fn upload_config(&self) -> UploadConfig {
        UploadConfig {
            message_budget: self.upload_message_size,
            preferred_chunk_size: self.upload_chunk_size,
            inter_file_pause: Duration::from_millis(self.upload_pause_ms),
        }
    }

    pub fn dictation_config(&self) -> DictationConfig {
        DictationConfig {
            enabled: self.enable_asr || self.dictate_once.is_some(),
            permit_write: self.permit_write,
            secure_context: self.secure_context(),
            auth_token: self.auth_token.clone(),
            hotkey: self.asr_hotkey.clone(),
            hold: Duration::from_millis(self.asr_hold_ms),
            connect_timeout: Duration::from_millis(self.asr_connect_timeout_ms),
            stop_grace: Duration::from_millis(self.asr_stop_grace_ms),
            quiet_window: Duration::from_millis(self.asr_quiet_ms),
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            preferred_device: self.input_device.clone(),
            frame_samples: self.asr_frame_samples,
            secure_context: self.secure_context(),
        }
    }

    pub fn log_settings(&self) -> LogSettings {
        let enabled = self.logs && !self.no_logs;
        LogSettings {
            enabled,
            content: enabled && self.log_content,
        }
    }
}
