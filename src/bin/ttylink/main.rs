//! ttylink command-line entry point.
//!
//! The websocket terminal session itself is opened by the embedding front-end;
//! this binary drives the upload and dictation paths directly for diagnostics
//! and one-shot dictation.

mod cli_utils;
mod dictate;

use anyhow::Result;
use std::panic;
use std::process::ExitCode;
use ttylink::config::AppConfig;
use ttylink::doctor::{doctor_report, probe_devices};
use ttylink::{init_logging, init_tracing, log_debug, log_file_path, log_panic};

use crate::cli_utils::{input_devices, list_input_devices, plan_uploads};
use crate::dictate::dictate_once;

fn main() -> Result<ExitCode> {
    let config = AppConfig::parse_args()?;
    let settings = config.log_settings();
    init_logging(settings);
    init_tracing(settings);
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        log_panic(info);
        default_hook(info);
    }));
    log_debug("=== ttylink started ===");
    log_debug(&format!("Log file: {:?}", log_file_path()));

    if config.doctor {
        let devices = if std::env::var_os("TTYLINK_TEST_DEVICES").is_some() {
            input_devices()
        } else {
            probe_devices()
        };
        println!("{}", doctor_report(&config, Some(devices.as_slice())).render());
        return Ok(ExitCode::SUCCESS);
    }

    if config.list_input_devices {
        list_input_devices()?;
        return Ok(ExitCode::SUCCESS);
    }

    if !config.plan_upload.is_empty() {
        let ok = plan_uploads(&config.plan_upload, &config.upload_config());
        return Ok(if ok {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    if let Some(seconds) = config.dictate_once {
        let text = dictate_once(&config, seconds)?;
        println!("{text}");
        return Ok(ExitCode::SUCCESS);
    }

    println!("Nothing to do. Try --doctor, --plan-upload <FILE> or --dictate-once <SECONDS>.");
    Ok(ExitCode::SUCCESS)
}
