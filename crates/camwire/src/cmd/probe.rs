use std::time::Duration;

use camwire_client::{CameraConfig, ClientError, Setting};
use camwire_frame::{FrameConfig, FrameError, ImageReader};
use camwire_transport::TcpTransport;
use serde::Serialize;

use crate::cmd::{open_settings, ProbeArgs};
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Serialize)]
struct PortCheck {
    name: &'static str,
    addr: String,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct ProbeOutput {
    host: String,
    checks: Vec<PortCheck>,
    overall: &'static str,
}

pub fn run(_args: ProbeArgs, config: CameraConfig, format: OutputFormat) -> CliResult<i32> {
    let checks = vec![image_check(&config), command_check(&config)];

    let has_fail = checks.iter().any(|c| c.status == CheckStatus::Fail);
    let output = ProbeOutput {
        host: config.host.clone(),
        checks,
        overall: if has_fail { "fail" } else { "pass" },
    };

    print_probe(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

/// Connect to the image port and wait for one frame.
fn image_check(config: &CameraConfig) -> PortCheck {
    let addr = config.image_addr();
    let timeout = config.image.connect_timeout.unwrap_or(DEFAULT_PROBE_TIMEOUT);
    let check = |status, detail: String| PortCheck {
        name: "image",
        addr: addr.clone(),
        status,
        detail,
    };

    let stream = match TcpTransport::connect(&addr, Some(timeout)) {
        Ok(stream) => stream,
        Err(err) => return check(CheckStatus::Fail, err.to_string()),
    };
    let frame_config = FrameConfig {
        max_payload_size: config.image.max_payload_size,
        read_timeout: Some(timeout),
    };
    let mut reader = match ImageReader::with_config_stream(stream, frame_config) {
        Ok(reader) => reader,
        Err(err) => return check(CheckStatus::Fail, err.to_string()),
    };

    let result = match reader.read_frame() {
        Ok(frame) => check(
            CheckStatus::Pass,
            format!(
                "frame {}x{}, {} bytes",
                frame.width,
                frame.height,
                frame.payload.len()
            ),
        ),
        Err(FrameError::Io(err))
            if matches!(
                err.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ) =>
        {
            check(
                CheckStatus::Warn,
                format!("connected, no frame within {timeout:?}"),
            )
        }
        Err(err) => check(CheckStatus::Fail, err.to_string()),
    };
    let _ = reader.get_ref().shutdown();
    result
}

/// Read one setting over the command port.
fn command_check(config: &CameraConfig) -> PortCheck {
    let mut config = config.clone();
    if config.command.io_timeout.is_none() {
        config.command.io_timeout = Some(
            config
                .command
                .connect_timeout
                .unwrap_or(DEFAULT_PROBE_TIMEOUT),
        );
    }
    let addr = config.command_addr();
    let (status, detail) = match open_settings(&config).get(Setting::ExpAuto) {
        Ok(Some(value)) => (CheckStatus::Pass, format!("{}={value}", Setting::ExpAuto)),
        Ok(None) => (
            CheckStatus::Pass,
            format!("{} answered with no value", Setting::ExpAuto),
        ),
        Err(err @ ClientError::Device { .. }) => (CheckStatus::Warn, err.to_string()),
        Err(err) => (CheckStatus::Fail, err.to_string()),
    };

    PortCheck {
        name: "command",
        addr,
        status,
        detail,
    }
}

fn print_probe(output: &ProbeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("camwire probe {}\n", output.host);
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<8} {:<24} {}",
                    status_text(c.status),
                    c.name,
                    c.addr,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: camera reachable");
            } else {
                println!("\n  Result: one or more ports failed");
            }
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Warn => "WARN",
        CheckStatus::Fail => "FAIL",
    }
}
