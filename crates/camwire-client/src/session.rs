use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use camwire_frame::ImageFrame;
use tracing::{info, warn};

use crate::config::CameraConfig;
use crate::error::Result;
use crate::image::{ChannelState, ImageChannel};
use crate::settings::SensorSettings;
use crate::supervisor::{lock, Supervisor};

const STOP_POLL: Duration = Duration::from_millis(10);

/// One camera: the image stream, its supervisor and the settings facade.
pub struct CaptureSession {
    config: CameraConfig,
    image: Arc<Mutex<ImageChannel>>,
    settings: SensorSettings,
    supervisor: Option<Supervisor>,
    running: bool,
}

impl CaptureSession {
    pub fn new<F>(config: CameraConfig, callback: F) -> Self
    where
        F: Fn(ImageFrame) + Send + Sync + 'static,
    {
        let mut image = ImageChannel::new(config.image_addr(), config.image.clone());
        image.register_callback(callback);
        let settings = SensorSettings::new(config.command_addr(), config.command.clone());

        Self {
            config,
            image: Arc::new(Mutex::new(image)),
            settings,
            supervisor: None,
            running: false,
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Start streaming and supervision.
    ///
    /// Returns whether the first connection succeeded. Either way the
    /// supervisor keeps reconnecting until `stop_capture`.
    pub fn start_capture(&mut self) -> Result<bool> {
        if self.running {
            return Ok(lock(&self.image).status());
        }

        let connected = lock(&self.image).start();
        if !connected {
            warn!(
                addr = %self.config.image_addr(),
                "camera not reachable yet, supervisor will keep retrying"
            );
        }

        let supervisor = Supervisor::spawn(Arc::clone(&self.image), self.config.supervisor.clone());
        match supervisor {
            Ok(supervisor) => self.supervisor = Some(supervisor),
            Err(err) => {
                lock(&self.image).stop();
                return Err(err);
            }
        }

        self.running = true;
        info!(host = %self.config.host, "capture started");
        Ok(connected)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether frames are currently being received.
    pub fn stream_alive(&self) -> bool {
        lock(&self.image).status()
    }

    /// Stop supervision and streaming.
    ///
    /// Waits up to `shutdown_timeout` for the receive thread to exit and
    /// returns whether it did. Idempotent.
    pub fn stop_capture(&mut self) -> bool {
        self.running = false;
        if let Some(mut supervisor) = self.supervisor.take() {
            supervisor.stop();
        }

        lock(&self.image).signal_stop();
        let deadline = Instant::now() + self.config.shutdown_timeout;
        while lock(&self.image).status() {
            if Instant::now() >= deadline {
                warn!(
                    timeout = ?self.config.shutdown_timeout,
                    "receive thread still busy, leaving it to finish"
                );
                lock(&self.image).close();
                return false;
            }
            std::thread::sleep(STOP_POLL);
        }

        lock(&self.image).stop();
        info!(host = %self.config.host, "capture stopped");
        true
    }

    pub fn settings(&self) -> &SensorSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SensorSettings {
        &mut self.settings
    }

    pub fn image_state(&self) -> ChannelState {
        lock(&self.image).state()
    }

    pub fn frames_received(&self) -> u64 {
        lock(&self.image).frames_received()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.running {
            self.stop_capture();
        }
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("host", &self.config.host)
            .field("running", &self.running)
            .field("settings", &self.settings)
            .finish()
    }
}
