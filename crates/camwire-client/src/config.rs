use std::time::Duration;

use camwire_frame::{FrameConfig, DEFAULT_MAX_PAYLOAD};
use serde::{Deserialize, Serialize};

/// Default image stream port.
pub const DEFAULT_IMAGE_PORT: u16 = 7891;

/// Default command port.
pub const DEFAULT_COMMAND_PORT: u16 = 7893;

/// Default camera host.
pub const DEFAULT_HOST: &str = "localhost";

/// Largest command reply accepted by default. Setting values are a few bytes.
pub const DEFAULT_MAX_REPLY: usize = 4096;

/// Configuration for the image channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Largest payload accepted from a frame header. Default: 64 MiB.
    pub max_payload_size: usize,
    /// Bound on each connect attempt. Default: 3 s.
    pub connect_timeout: Option<Duration>,
    /// Read timeout on the stream. Default: none, a silent camera blocks the
    /// receive loop until the socket is shut down.
    pub read_timeout: Option<Duration>,
}

impl ImageConfig {
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
            read_timeout: self.read_timeout,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            connect_timeout: Some(Duration::from_secs(3)),
            read_timeout: None,
        }
    }
}

/// Configuration for the command channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Bound on each connect attempt. Default: 3 s.
    pub connect_timeout: Option<Duration>,
    /// Read/write timeout for a request/response exchange. Default: none.
    pub io_timeout: Option<Duration>,
    /// Largest reply value accepted from a response header. Default: 4 KiB.
    pub max_reply_size: usize,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(3)),
            io_timeout: None,
            max_reply_size: DEFAULT_MAX_REPLY,
        }
    }
}

/// Configuration for the capture supervisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Time between liveness checks while the stream is healthy. Default: 500 ms.
    pub poll_interval: Duration,
    /// Log a warning every this many failed reconnect attempts. Default: 5.
    pub display_interval: u32,
    /// Upper bound on the wait between failed reconnect attempts. Default: 5 s.
    pub max_backoff: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            display_interval: 5,
            max_backoff: Duration::from_secs(5),
        }
    }
}

/// Everything needed to talk to one camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub host: String,
    pub image_port: u16,
    pub command_port: u16,
    pub image: ImageConfig,
    pub command: CommandConfig,
    pub supervisor: SupervisorConfig,
    /// How long `stop_capture` waits for the receive thread to exit. Default: 5 s.
    pub shutdown_timeout: Duration,
}

impl CameraConfig {
    /// Default configuration for a camera at `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// `host:port` of the image stream.
    pub fn image_addr(&self) -> String {
        join_host_port(&self.host, self.image_port)
    }

    /// `host:port` of the command server.
    pub fn command_addr(&self) -> String {
        join_host_port(&self.host, self.command_port)
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            image_port: DEFAULT_IMAGE_PORT,
            command_port: DEFAULT_COMMAND_PORT,
            image: ImageConfig::default(),
            command: CommandConfig::default(),
            supervisor: SupervisorConfig::default(),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

fn join_host_port(host: &str, port: u16) -> String {
    // Bare IPv6 literals need brackets.
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
