//! Stream frames from a camera for a few seconds while adjusting exposure.
//!
//! Run with:
//!   cargo run -p camwire --example stream-frames -- 192.168.1.201
//!
//! Without an argument it connects to localhost, which pairs with the
//! `mock-camera` example.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use camwire::client::{CameraConfig, CaptureSession};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let host = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1".to_string());
    let config = CameraConfig::new(host);

    let bytes = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&bytes);
    let mut session = CaptureSession::new(config, move |frame| {
        counter.fetch_add(frame.payload.len() as u64, Ordering::Relaxed);
        eprintln!("frame {}x{} ({} bytes)", frame.width, frame.height, frame.payload.len());
    });

    if !session.start_capture()? {
        eprintln!("Camera not reachable yet; the supervisor keeps retrying");
    }

    let settings = session.settings_mut();
    settings.set_auto_exposure(false, false)?;
    settings.set_exposure_time(15.0, true)?;
    eprintln!("Exposure now {} ms", settings.get_exposure_time()?);

    std::thread::sleep(Duration::from_secs(3));
    session.stop_capture();

    eprintln!(
        "Received {} frames, {} bytes",
        session.frames_received(),
        bytes.load(Ordering::Relaxed)
    );
    Ok(())
}
