//! Client for networked cameras that stream images on one TCP port and take
//! sensor commands on another.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP connect and the stream handle
//! - [`frame`]: image frame and command wire codec
//! - [`client`]: image and command channels, the settings facade, capture
//!   supervision

/// Re-export transport types.
pub mod transport {
    pub use camwire_transport::*;
}

/// Re-export wire codec types.
pub mod frame {
    pub use camwire_frame::*;
}

/// Re-export client types.
pub mod client {
    pub use camwire_client::*;
}
