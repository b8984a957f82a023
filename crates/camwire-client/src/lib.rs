//! Dual-channel camera client.
//!
//! A camera exposes two TCP ports: an image port that streams framed images
//! continuously, and a command port that answers SET/GET requests for sensor
//! settings. This crate wraps both:
//!
//! - [`ImageChannel`] receives frames on a background thread and hands each
//!   one to a callback.
//! - [`CommandChannel`] runs one request/response exchange at a time, with an
//!   optional COMMIT trailer.
//! - [`SensorSettings`] is the typed facade over the command channel.
//! - [`Supervisor`] reconnects the image stream when it drops.
//! - [`CaptureSession`] ties the pieces together for one camera.

pub mod command;
pub mod config;
pub mod error;
pub mod image;
pub mod session;
pub mod settings;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod supervisor;
pub mod table;

pub use command::CommandChannel;
pub use config::{
    CameraConfig, CommandConfig, ImageConfig, SupervisorConfig, DEFAULT_COMMAND_PORT,
    DEFAULT_HOST, DEFAULT_IMAGE_PORT, DEFAULT_MAX_REPLY,
};
pub use error::{ClientError, Result};
pub use image::{ChannelState, FrameCallback, ImageChannel};
pub use session::CaptureSession;
pub use settings::{CaptureMode, DigitalGain, FieldOfView, SensorSettings};
pub use supervisor::{Reconnector, StreamLink, Supervisor, Tick};
pub use table::{Setting, SubCommand, SUB_COMMANDS};
