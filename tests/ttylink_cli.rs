use std::fs;
use std::process::Command;

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn ttylink_bin() -> &'static str {
    env!("CARGO_BIN_EXE_ttylink")
}

#[test]
fn ttylink_help_mentions_flags() {
    let output = Command::new(ttylink_bin())
        .arg("--help")
        .output()
        .expect("run ttylink --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("--plan-upload"));
    assert!(combined.contains("--enable-asr"));
}

#[test]
fn ttylink_list_input_devices_uses_override() {
    let output = Command::new(ttylink_bin())
        .arg("--list-input-devices")
        .env("TTYLINK_TEST_DEVICES", "USB Mic,Built-in")
        .output()
        .expect("run ttylink --list-input-devices");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("Available audio input devices"));
    assert!(combined.contains("  - USB Mic"));
}

#[test]
fn ttylink_plan_upload_reports_chunks() {
    let dir = std::env::temp_dir().join(format!("ttylink-cli-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("notes.txt");
    fs::write(&path, vec![b'x'; 5000]).expect("write temp file");

    let output = Command::new(ttylink_bin())
        .arg("--plan-upload")
        .arg(&path)
        .args(["--upload-message-size", "1024", "--upload-pause-ms", "0"])
        .output()
        .expect("run ttylink --plan-upload");
    let combined = combined_output(&output);
    let _ = fs::remove_dir_all(&dir);

    assert!(output.status.success(), "{combined}");
    assert!(combined.contains("notes.txt: 5000 bytes"));
    assert!(combined.contains("completed"));
}

#[test]
fn ttylink_plan_upload_fails_on_empty_file() {
    let dir = std::env::temp_dir().join(format!("ttylink-cli-empty-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("empty.bin");
    fs::write(&path, b"").expect("write temp file");

    let output = Command::new(ttylink_bin())
        .arg("--plan-upload")
        .arg(&path)
        .output()
        .expect("run ttylink --plan-upload");
    let combined = combined_output(&output);
    let _ = fs::remove_dir_all(&dir);

    assert!(!output.status.success());
    assert!(combined.contains("empty.bin is empty"));
}

#[test]
fn ttylink_rejects_invalid_flags() {
    let output = Command::new(ttylink_bin())
        .args(["--asr-frame-samples", "1000"])
        .output()
        .expect("run ttylink");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("--asr-frame-samples"));
}

#[test]
fn ttylink_doctor_prints_report() {
    let output = Command::new(ttylink_bin())
        .args(["--doctor", "--url", "https://example.com/term/"])
        .env("TTYLINK_TEST_DEVICES", "USB Mic")
        .output()
        .expect("run ttylink --doctor");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("ttylink doctor"));
    assert!(combined.contains("endpoint: wss://example.com/term/asr/ws"));
}
