//! Command request/response encoding.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::value::{encode_value, Value, WireType};

/// Command header: code (4) + sub-command (4) + error (4) + value size (4) = 16 bytes.
pub const COMMAND_HEADER_SIZE: usize = 16;

/// Write a setting.
pub const SET: u32 = 0x33;

/// Read a setting.
pub const GET: u32 = 0x3D;

/// Apply the batch of settings written since the last commit.
pub const COMMIT: u32 = 50;

/// Returns a human-readable name for a command code.
pub fn command_name(code: u32) -> &'static str {
    match code {
        SET => "SET",
        GET => "GET",
        COMMIT => "COMMIT",
        _ => "UNKNOWN",
    }
}

/// Header shared by command requests and responses.
///
/// In a response, `code` and `sub_command` echo the request, `error` carries the
/// device status and `value_size` the length of the reply that follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    pub code: u32,
    pub sub_command: u32,
    pub error: u32,
    pub value_size: u32,
}

impl CommandHeader {
    /// A request header. The error field is always zero on send.
    pub fn request(code: u32, sub_command: u32, value_size: u32) -> Self {
        Self {
            code,
            sub_command,
            error: 0,
            value_size,
        }
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(COMMAND_HEADER_SIZE);
        dst.put_u32_le(self.code);
        dst.put_u32_le(self.sub_command);
        dst.put_u32_le(self.error);
        dst.put_u32_le(self.value_size);
    }

    pub fn to_bytes(&self) -> [u8; COMMAND_HEADER_SIZE] {
        let mut out = [0u8; COMMAND_HEADER_SIZE];
        out[0..4].copy_from_slice(&self.code.to_le_bytes());
        out[4..8].copy_from_slice(&self.sub_command.to_le_bytes());
        out[8..12].copy_from_slice(&self.error.to_le_bytes());
        out[12..16].copy_from_slice(&self.value_size.to_le_bytes());
        out
    }

    /// Decode a header from the first 16 bytes of `src`.
    pub fn decode(src: &[u8]) -> Result<Self> {
        if src.len() < COMMAND_HEADER_SIZE {
            return Err(FrameError::Truncated {
                what: "command header",
                need: COMMAND_HEADER_SIZE,
                got: src.len(),
            });
        }
        let word = |i: usize| u32::from_le_bytes([src[i], src[i + 1], src[i + 2], src[i + 3]]);
        Ok(Self {
            code: word(0),
            sub_command: word(4),
            error: word(8),
            value_size: word(12),
        })
    }
}

/// Encode a command request.
///
/// Wire format:
/// ```text
/// ┌──────────┬─────────────┬──────────┬────────────┬───────────┬─────────┐
/// │ Code     │ Sub-command │ Error=0  │ Value size │ Value     │ Pad     │
/// │ (4B LE)  │ (4B LE)     │ (4B LE)  │ (4B LE)    │ (size B)  │ (0|1 B) │
/// └──────────┴─────────────┴──────────┴────────────┴───────────┴─────────┘
/// ```
///
/// `value size` counts the value only; the pad byte is added when that count
/// is odd so the whole request is even-length.
pub fn encode_command(code: u32, sub_command: u32, wire: WireType, value: &Value) -> Result<Bytes> {
    let mut encoded = BytesMut::new();
    let value_len = encode_value(wire, value, &mut encoded)?;
    let value_size = u32::try_from(value_len).map_err(|_| FrameError::PayloadTooLarge {
        size: value_len,
        max: u32::MAX as usize,
    })?;

    let mut out = BytesMut::with_capacity(COMMAND_HEADER_SIZE + value_len + 1);
    CommandHeader::request(code, sub_command, value_size).encode(&mut out);
    out.put_slice(&encoded);
    if value_len % 2 != 0 {
        out.put_u8(0);
    }
    Ok(out.freeze())
}

/// The fixed COMMIT request `(50, 0, 0, 0)`.
pub fn encode_commit() -> [u8; COMMAND_HEADER_SIZE] {
    CommandHeader::request(COMMIT, 0, 0).to_bytes()
}
