use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use camwire_client::{CameraConfig, CaptureSession};
use camwire_frame::ImageFrame;
use tracing::{info, warn};

use crate::cmd::StreamArgs;
use crate::exit::{client_error, io_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::{print_frame, OutputFormat};

const WAKE_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: StreamArgs, config: CameraConfig, format: OutputFormat) -> CliResult<i32> {
    if let Some(dir) = &args.save_dir {
        std::fs::create_dir_all(dir)
            .map_err(|err| io_error(&format!("cannot create {}", dir.display()), err))?;
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    // The callback runs on the receive thread; printing and disk writes stay here.
    let (tx, rx) = mpsc::channel::<ImageFrame>();
    let mut session = CaptureSession::new(config, move |frame| {
        let _ = tx.send(frame);
    });

    let connected = session
        .start_capture()
        .map_err(|err| client_error("capture failed to start", err))?;
    if !connected {
        warn!("waiting for the camera to come up");
    }

    let mut received = 0u64;
    let result = loop {
        if !running.load(Ordering::SeqCst) {
            break Ok(());
        }
        if args.count.is_some_and(|count| received >= count) {
            break Ok(());
        }

        let frame = match rx.recv_timeout(WAKE_INTERVAL) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                break Err(CliError::new(INTERNAL, "frame callback went away"));
            }
        };

        let saved = match &args.save_dir {
            Some(dir) => match save_frame(dir, received, &frame) {
                Ok(path) => Some(path),
                Err(err) => break Err(err),
            },
            None => None,
        };
        print_frame(received, &frame, saved.as_deref(), format);
        received += 1;
    };

    session.stop_capture();
    info!(frames = received, "stream finished");
    result?;

    match args.count {
        Some(count) if received < count => Ok(FAILURE),
        _ => Ok(SUCCESS),
    }
}

fn save_frame(dir: &Path, index: u64, frame: &ImageFrame) -> CliResult<PathBuf> {
    let path = dir.join(format!("frame-{index:06}.jpg"));
    std::fs::write(&path, &frame.payload)
        .map_err(|err| io_error(&format!("cannot write {}", path.display()), err))?;
    Ok(path)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_saved_with_sequential_names() {
        let dir = std::env::temp_dir().join(format!("camwire-save-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let frame = ImageFrame::new(2, 2, b"jpeg-bytes".to_vec());
        let path = save_frame(&dir, 7, &frame).unwrap();

        assert_eq!(path.file_name().unwrap(), "frame-000007.jpg");
        assert_eq!(std::fs::read(&path).unwrap(), b"jpeg-bytes");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
