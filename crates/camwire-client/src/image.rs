use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use camwire_frame::{FrameError, ImageFrame, ImageReader};
use camwire_transport::{CameraStream, TcpTransport};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ImageConfig;

/// Consumer of decoded frames. Runs on the receive thread, so it should be
/// quick or hand work off elsewhere.
pub type FrameCallback = Arc<dyn Fn(ImageFrame) + Send + Sync>;

/// Lifecycle of the image stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    Idle,
    Connecting,
    Streaming,
    Closing,
    Failed,
}

/// Long-lived streaming connection to the camera's image port.
///
/// `start` connects and spawns a receive thread that decodes frames and hands
/// each one to the registered callback. The thread owns its own handle to the
/// socket; the channel keeps a clone only to shut it down from outside.
pub struct ImageChannel {
    addr: String,
    config: ImageConfig,
    callback: Option<FrameCallback>,
    control: Option<CameraStream>,
    worker: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
    state: ChannelState,
}

impl ImageChannel {
    pub fn new(addr: impl Into<String>, config: ImageConfig) -> Self {
        Self {
            addr: addr.into(),
            config,
            callback: None,
            control: None,
            worker: None,
            stop: Arc::new(AtomicBool::new(false)),
            frames: Arc::new(AtomicU64::new(0)),
            state: ChannelState::Idle,
        }
    }

    pub fn address(&self) -> &str {
        &self.addr
    }

    /// Set the frame consumer. Takes effect on the next `start`.
    pub fn register_callback<F>(&mut self, callback: F)
    where
        F: Fn(ImageFrame) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
    }

    /// Connect and spawn the receive thread.
    ///
    /// Returns `false`, without spawning anything, when the connection cannot
    /// be opened. Returns `true` immediately if a receive thread is already
    /// running.
    pub fn start(&mut self) -> bool {
        if self.status() {
            return true;
        }
        self.close();
        self.state = ChannelState::Connecting;

        let stream = match TcpTransport::connect(&self.addr, self.config.connect_timeout) {
            Ok(stream) => stream,
            Err(err) => {
                debug!(addr = %self.addr, error = %err, "image connection failed");
                self.state = ChannelState::Failed;
                return false;
            }
        };

        let control = match stream.try_clone() {
            Ok(control) => control,
            Err(err) => {
                warn!(addr = %self.addr, error = %err, "could not clone image socket");
                let _ = stream.shutdown();
                self.state = ChannelState::Failed;
                return false;
            }
        };

        let reader = match ImageReader::with_config_stream(stream, self.config.frame_config()) {
            Ok(reader) => reader,
            Err(err) => {
                warn!(addr = %self.addr, error = %err, "could not configure image socket");
                let _ = control.shutdown();
                self.state = ChannelState::Failed;
                return false;
            }
        };

        // Fresh flag per run so a late-exiting thread never sees a reset.
        let stop = Arc::new(AtomicBool::new(false));
        let callback = self.callback.clone();
        let frames = Arc::clone(&self.frames);
        let addr = self.addr.clone();
        let thread_stop = Arc::clone(&stop);

        let spawned = std::thread::Builder::new()
            .name("camwire-image".to_string())
            .spawn(move || run_receiver(reader, callback, &thread_stop, &frames, &addr));

        match spawned {
            Ok(handle) => {
                info!(addr = %self.addr, "image stream started");
                self.stop = stop;
                self.control = Some(control);
                self.worker = Some(handle);
                self.state = ChannelState::Streaming;
                true
            }
            Err(err) => {
                warn!(addr = %self.addr, error = %err, "failed to spawn receive thread");
                let _ = control.shutdown();
                self.state = ChannelState::Failed;
                false
            }
        }
    }

    /// True while the receive thread is alive.
    pub fn status(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn state(&self) -> ChannelState {
        match self.state {
            ChannelState::Streaming if !self.status() => ChannelState::Failed,
            state => state,
        }
    }

    /// Frames delivered to the callback since this channel was created.
    pub fn frames_received(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Ask the receive thread to exit and unblock its read, without waiting.
    pub fn signal_stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(control) = &self.control {
            if let Err(err) = control.shutdown() {
                debug!(error = %err, "image socket already closed");
            }
        }
        if self.worker.is_some() {
            self.state = ChannelState::Closing;
        }
    }

    /// Stop the receive thread and wait for it to exit. Idempotent.
    pub fn stop(&mut self) {
        self.signal_stop();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!(addr = %self.addr, "receive thread panicked");
            }
        }
        self.control = None;
        self.state = ChannelState::Idle;
    }

    /// Shut down and release the socket, reaping the thread if it has exited.
    /// Safe to call when already closed.
    pub fn close(&mut self) {
        if let Some(control) = self.control.take() {
            if let Err(err) = control.shutdown() {
                debug!(error = %err, "image socket already closed");
            }
            debug!(addr = %self.addr, "image socket released");
        }
        if self.worker.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(handle) = self.worker.take() {
                let _ = handle.join();
            }
        }
        if self.worker.is_none() {
            self.state = ChannelState::Idle;
        }
    }
}

impl Drop for ImageChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ImageChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageChannel")
            .field("addr", &self.addr)
            .field("state", &self.state())
            .field("frames_received", &self.frames_received())
            .finish()
    }
}

fn run_receiver(
    mut reader: ImageReader<CameraStream>,
    callback: Option<FrameCallback>,
    stop: &AtomicBool,
    frames: &AtomicU64,
    addr: &str,
) {
    match receive_loop(&mut reader, callback.as_deref(), stop, frames) {
        Ok(()) => info!(addr, "image stream stopped"),
        Err(FrameError::ConnectionClosed) => warn!(addr, "camera closed the image stream"),
        Err(err) => warn!(addr, error = %err, "image stream failed"),
    }
    if let Err(err) = reader.get_ref().shutdown() {
        debug!(error = %err, "image socket already closed");
    }
}

/// Read frames and deliver them until `stop` is set or a read fails.
///
/// `Ok` means the loop was asked to stop; a read error seen after the stop
/// flag is set counts as a stop, since shutting the socket is how a blocked
/// read gets cancelled.
fn receive_loop<R: Read>(
    reader: &mut ImageReader<R>,
    callback: Option<&(dyn Fn(ImageFrame) + Send + Sync)>,
    stop: &AtomicBool,
    frames: &AtomicU64,
) -> Result<(), FrameError> {
    while !stop.load(Ordering::SeqCst) {
        match reader.read_frame() {
            Ok(frame) => {
                frames.fetch_add(1, Ordering::Relaxed);
                if let Some(callback) = callback {
                    callback(frame);
                }
            }
            Err(_) if stop.load(Ordering::SeqCst) => return Ok(()),
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
