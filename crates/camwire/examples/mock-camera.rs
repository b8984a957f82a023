//! Simulated camera serving the image stream and the command protocol.
//!
//! Run with:
//!   cargo run -p camwire --example mock-camera --features sim
//!
//! In another terminal:
//!   cargo run -p camwire --features cli -- --host 127.0.0.1 get all
//!   cargo run -p camwire --features cli -- --host 127.0.0.1 stream --count 10

use std::time::Duration;

use camwire::client::sim::{SimCamera, SimConfig};
use camwire::client::{DEFAULT_COMMAND_PORT, DEFAULT_IMAGE_PORT};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let image_port = port_from_env("CAMWIRE_IMAGE_PORT", DEFAULT_IMAGE_PORT)?;
    let command_port = port_from_env("CAMWIRE_COMMAND_PORT", DEFAULT_COMMAND_PORT)?;

    let sim = SimCamera::bind(
        &format!("127.0.0.1:{image_port}"),
        &format!("127.0.0.1:{command_port}"),
        SimConfig {
            frame_interval: Duration::from_millis(100),
            ..SimConfig::default()
        },
    )?;
    eprintln!(
        "Mock camera up: image={} command={}",
        sim.image_addr(),
        sim.command_addr()
    );

    loop {
        std::thread::sleep(Duration::from_secs(5));
        let state = sim.state();
        eprintln!(
            "frames sent: {}, image clients: {}, commands: {}, commits: {}",
            state.frames_sent(),
            state.image_connections(),
            state.requests().len(),
            state.commits()
        );
    }
}

fn port_from_env(name: &str, default: u16) -> Result<u16, Box<dyn std::error::Error>> {
    match std::env::var(name) {
        Ok(value) => Ok(value.parse()?),
        Err(_) => Ok(default),
    }
}
