use super::defaults::{MAX_UPLOAD_CHUNK_SIZE, MIN_UPLOAD_MESSAGE_SIZE};
use super::AppConfig;
use clap::Parser;
use std::time::Duration;

fn parse(args: &[&str]) -> AppConfig {
    let mut argv = vec!["test-app"];
    argv.extend_from_slice(args);
    AppConfig::parse_from(argv)
}

#[test]
fn defaults_validate() {
    let mut cfg = parse(&[]);
    assert!(cfg.validate().is_ok());
    assert!(!cfg.enable_asr);
    assert_eq!(cfg.asr_hotkey, "ShiftRight");
}

#[test]
fn rejects_message_size_out_of_bounds() {
    let too_small = (MIN_UPLOAD_MESSAGE_SIZE - 1).to_string();
    let mut cfg = parse(&["--upload-message-size", &too_small]);
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("--upload-message-size"));

    let mut cfg = parse(&["--upload-message-size", "1024"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_chunk_size_out_of_bounds() {
    let mut cfg = parse(&["--upload-chunk-size", "0"]);
    assert!(cfg.validate().is_err());

    let too_big = (MAX_UPLOAD_CHUNK_SIZE + 1).to_string();
    let mut cfg = parse(&["--upload-chunk-size", &too_big]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_long_upload_pause() {
    let mut cfg = parse(&["--upload-pause-ms", "10001"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_hold_out_of_bounds() {
    let mut cfg = parse(&["--asr-hold-ms", "10"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--asr-hold-ms", "5001"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_connect_timeout_out_of_bounds() {
    let mut cfg = parse(&["--asr-connect-timeout-ms", "100"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn frame_samples_must_be_power_of_two() {
    let mut cfg = parse(&["--asr-frame-samples", "3000"]);
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("power of two"));

    let mut cfg = parse(&["--asr-frame-samples", "4096"]);
    assert!(cfg.validate().is_ok());

    let mut cfg = parse(&["--asr-frame-samples", "128"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn hotkey_is_trimmed_and_checked() {
    let mut cfg = parse(&["--asr-hotkey", "  F9 "]);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.asr_hotkey, "F9");

    let mut cfg = parse(&["--asr-hotkey", "shift right"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--asr-hotkey", "A"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_input_device_with_control_chars() {
    let mut cfg = parse(&["--input-device", "USB\u{7}Mic"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--input-device", "   "]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--input-device", "USB Mic"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn enable_asr_requires_url() {
    let mut cfg = parse(&["--enable-asr"]);
    cfg.url = None;
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("--url"));
}

#[test]
fn rejects_bad_urls() {
    let mut cfg = parse(&["--url", "not a url"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--url", "ftp://example.com/"]);
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("ftp"));
}

#[test]
fn query_args_drop_leading_question_mark() {
    let mut cfg = parse(&[
        "--url",
        "https://example.com/term",
        "--ws-query-args",
        "?arg=1",
    ]);
    cfg.validate().expect("valid config");
    assert_eq!(cfg.ws_query_args.as_deref(), Some("arg=1"));
    assert_eq!(
        cfg.side_channel_url().expect("side channel url").as_str(),
        "wss://example.com/term/asr/ws?arg=1"
    );

    let mut cfg = parse(&["--ws-query-args", "a=1 b=2"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn side_channel_url_needs_base() {
    let mut cfg = parse(&[]);
    cfg.url = None;
    assert!(cfg.side_channel_url().is_err());
}

#[test]
fn dictation_config_reflects_flags() {
    let mut cfg = parse(&[
        "--url",
        "http://10.0.0.5:8080/",
        "--enable-asr",
        "--permit-write",
        "--asr-hold-ms",
        "300",
        "--asr-quiet-ms",
        "400",
    ]);
    cfg.validate().expect("valid config");
    let dictation = cfg.dictation_config();
    assert!(dictation.enabled);
    assert!(dictation.permit_write);
    assert!(!dictation.secure_context);
    assert_eq!(dictation.hold, Duration::from_millis(300));
    assert_eq!(dictation.quiet_window, Duration::from_millis(400));
    assert!(!cfg.capture_config().secure_context);
}

#[test]
fn loopback_http_counts_as_secure() {
    let mut cfg = parse(&["--url", "http://localhost:8080/"]);
    cfg.validate().expect("valid config");
    assert!(cfg.secure_context());
    assert!(cfg.dictation_config().secure_context);
}

#[test]
fn upload_config_reflects_flags() {
    let mut cfg = parse(&[
        "--upload-message-size",
        "4096",
        "--upload-chunk-size",
        "1000",
        "--upload-pause-ms",
        "0",
    ]);
    cfg.validate().expect("valid config");
    let upload = cfg.upload_config();
    assert_eq!(upload.message_budget, 4096);
    assert_eq!(upload.preferred_chunk_size, 1000);
    assert_eq!(upload.inter_file_pause, Duration::ZERO);
}

#[test]
fn no_logs_overrides_logs() {
    let cfg = parse(&["--logs", "--log-content", "--no-logs"]);
    let settings = cfg.log_settings();
    assert!(!settings.enabled);
    assert!(!settings.content);

    let cfg = parse(&["--log-content"]);
    assert!(!cfg.log_settings().content);

    let cfg = parse(&["--logs", "--log-content"]);
    assert!(cfg.log_settings().content);
}

#[test]
fn dictate_once_bounds_and_enables_dictation() {
    let mut cfg = parse(&["--url", "https://example.com/", "--dictate-once", "0"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--url", "https://example.com/", "--dictate-once", "3"]);
    cfg.validate().expect("valid config");
    assert!(cfg.dictation_config().enabled);

    let mut cfg = parse(&["--dictate-once", "3"]);
    cfg.url = None;
    assert!(cfg.validate().is_err());
}
