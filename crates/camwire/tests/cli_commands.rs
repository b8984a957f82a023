#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::Duration;

use camwire_client::sim::{SimCamera, SimConfig};
use camwire_frame::{COMMIT, SET};

fn camwire(sim: &SimCamera, args: &[&str]) -> Output {
    run_against(sim.image_addr().port(), sim.command_addr().port(), args)
}

fn run_against(image_port: u16, command_port: u16, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_camwire"))
        .env_remove("CAMWIRE_HOST")
        .env_remove("CAMWIRE_IMAGE_PORT")
        .env_remove("CAMWIRE_COMMAND_PORT")
        .args(["--log-level", "error", "--host", "127.0.0.1"])
        .args(["--image-port", &image_port.to_string()])
        .args(["--command-port", &command_port.to_string()])
        .args(["--connect-timeout", "1s"])
        .args(args)
        .output()
        .expect("camwire should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn closed_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("bind should succeed")
        .local_addr()
        .expect("local addr")
        .port()
}

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "camwire-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

#[test]
fn get_all_lists_every_setting() {
    let sim = SimCamera::start(SimConfig::default()).expect("sim should start");
    let output = camwire(&sim, &["--format", "json", "get", "all"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let values: serde_json::Value =
        serde_json::from_str(stdout(&output).trim()).expect("output should be JSON");
    let entries = values.as_array().expect("get all should print an array");
    assert_eq!(entries.len(), 14);
    assert_eq!(entries[0]["setting"], "EXP_AUTO");
    assert_eq!(entries[6]["value"], 640);
}

#[test]
fn set_then_get_roundtrips_and_commits() {
    let sim = SimCamera::start(SimConfig::default()).expect("sim should start");

    let set = camwire(&sim, &["--format", "json", "set", "exp-time", "25.5"]);
    assert!(set.status.success());
    assert!(stdout(&set).contains("\"committed\":true"));

    let get = camwire(&sim, &["--format", "json", "get", "EXP_TIME"]);
    assert!(get.status.success());
    let value: serde_json::Value =
        serde_json::from_str(stdout(&get).trim()).expect("output should be JSON");
    assert_eq!(value["value"], 25.5);
    assert_eq!(sim.state().commits(), 1);
}

#[test]
fn set_no_commit_skips_commit() {
    let sim = SimCamera::start(SimConfig::default()).expect("sim should start");
    let output = camwire(&sim, &["set", "trig-mode", "on", "--no-commit"]);

    assert!(output.status.success());
    assert_eq!(sim.state().commits(), 0);
    assert_eq!(sim.state().stored(0x0E), Some(vec![1]));
}

#[test]
fn fov_set_sends_four_commands_then_commit() {
    let sim = SimCamera::start(SimConfig::default()).expect("sim should start");
    let output = camwire(&sim, &["--format", "json", "fov", "--set", "8", "4", "800", "600"]);

    assert!(output.status.success());
    let fov: serde_json::Value =
        serde_json::from_str(stdout(&output).trim()).expect("output should be JSON");
    assert_eq!(fov["width"], 800);
    assert_eq!(fov["height"], 600);

    let writes: Vec<(u32, u32)> = sim
        .state()
        .requests()
        .iter()
        .filter(|h| h.code == SET || h.code == COMMIT)
        .map(|h| (h.code, h.sub_command))
        .collect();
    assert_eq!(
        writes,
        vec![(SET, 0x05), (SET, 0x06), (SET, 0x07), (SET, 0x08), (COMMIT, 0)]
    );
}

#[test]
fn digital_gain_reads_back() {
    let sim = SimCamera::start(SimConfig::default()).expect("sim should start");
    let output = camwire(
        &sim,
        &["--format", "pretty", "digital-gain", "--set", "1.5", "1.25", "2", "0.5"],
    );

    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "gr=1.5 gb=1.25 r=2 b=0.5");
}

#[test]
fn device_rejection_exits_40() {
    let sim = SimCamera::start(SimConfig::default()).expect("sim should start");
    sim.state().reject(0x04, 2);

    let output = camwire(&sim, &["set", "again", "3.0"]);
    assert_eq!(output.status.code(), Some(40));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error 2"));
}

#[test]
fn bad_input_exits_64() {
    let sim = SimCamera::start(SimConfig::default()).expect("sim should start");

    let unknown = camwire(&sim, &["get", "zoom"]);
    assert_eq!(unknown.status.code(), Some(64));

    let bad_value = camwire(&sim, &["set", "width", "wide"]);
    assert_eq!(bad_value.status.code(), Some(64));
    assert!(sim.state().requests().is_empty());
}

#[test]
fn unreachable_camera_exits_3() {
    let output = run_against(closed_port(), closed_port(), &["get", "width"]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn stream_prints_requested_frame_count() {
    let sim = SimCamera::start(SimConfig {
        frame_interval: Duration::from_millis(5),
        ..SimConfig::default()
    })
    .expect("sim should start");
    let dir = unique_temp_dir("stream");
    let dir_arg = dir.to_string_lossy().into_owned();

    let output = camwire(
        &sim,
        &["--format", "json", "stream", "--count", "3", "--save-dir", &dir_arg],
    );

    assert!(output.status.success());
    let lines: Vec<serde_json::Value> = stdout(&output)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2]["index"], 2);
    assert_eq!(lines[0]["width"], 640);

    let saved = std::fs::read(dir.join("frame-000000.jpg")).expect("frame should be saved");
    assert_eq!(saved, SimConfig::default().payload.to_vec());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn probe_passes_against_live_camera() {
    let sim = SimCamera::start(SimConfig::default()).expect("sim should start");
    let output = camwire(&sim, &["--format", "json", "probe"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("\"overall\":\"pass\""));
}

#[test]
fn probe_fails_with_30_when_ports_are_closed() {
    let output = run_against(closed_port(), closed_port(), &["--format", "json", "probe"]);

    assert_eq!(output.status.code(), Some(30));
    assert!(stdout(&output).contains("\"overall\":\"fail\""));
}

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_camwire"))
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    assert_eq!(
        stdout(&output).trim(),
        format!("camwire {}", env!("CARGO_PKG_VERSION"))
    );
}
