use crate::value::WireType;

/// Errors that can occur during frame and command encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A frame header was not exactly 10 bytes.
    #[error("frame header must be 10 bytes, got {0}")]
    BadLength(usize),

    /// The frame header markers were wrong.
    #[error("invalid frame markers (start 0x{start:02X}, end 0x{end:02X}; expected 0xAA/0x55)")]
    BadMarker { start: u8, end: u8 },

    /// The stream ended part way through a frame header.
    #[error("short frame header ({got} of 10 bytes)")]
    ShortHeader { got: usize },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,

    /// Not enough bytes to decode a value or header.
    #[error("truncated {what}: need {need} bytes, got {got}")]
    Truncated {
        what: &'static str,
        need: usize,
        got: usize,
    },

    /// A value does not match the wire type it is being encoded as.
    #[error("value of type {actual} cannot be encoded as {expected}")]
    TypeMismatch {
        expected: WireType,
        actual: WireType,
    },

    /// Text could not be parsed as a value of the requested wire type.
    #[error("invalid {wire} value: {input:?}")]
    InvalidValue { wire: WireType, input: String },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
