//! TCP transport for talking to a networked camera.
//!
//! This is the lowest layer of camwire. The image and command channels both
//! sit on top of the [`CameraStream`] returned by [`TcpTransport::connect`].

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use stream::CameraStream;
pub use tcp::TcpTransport;
