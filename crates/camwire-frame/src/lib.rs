//! Wire codec for the camera's image stream and command protocol.
//!
//! Two formats live here:
//! - Image frames: a 10-byte header (`0xAA`, width, height, payload size, `0x55`)
//!   followed by the raw payload.
//! - Commands: a 16-byte header (code, sub-command, error, value size) followed
//!   by a typed value, padded to an even length.
//!
//! Everything in this crate is stateless except [`ImageReader`], which owns the
//! read side of a stream and hands back complete frames.

#[cfg(feature = "async")]
pub mod codec;
pub mod command;
pub mod error;
pub mod header;
pub mod reader;
pub mod value;

#[cfg(feature = "async")]
pub use codec::ImageFrameCodec;
pub use command::{
    command_name, encode_command, encode_commit, CommandHeader, COMMAND_HEADER_SIZE, COMMIT, GET,
    SET,
};
pub use error::{FrameError, Result};
pub use header::{
    decode_frame_header, decode_image_frame, encode_frame_header, encode_image_frame, FrameHeader,
    ImageFrame, DEFAULT_MAX_PAYLOAD, FRAME_HEADER_SIZE, MARKER_END, MARKER_START,
};
pub use reader::{read_full, FrameConfig, ImageReader};
pub use value::{decode_value, encode_value, SettingKind, Value, WireType};
