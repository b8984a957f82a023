use std::fmt;

use bytes::{BufMut, BytesMut};
use serde::Serialize;

use crate::error::{FrameError, Result};

/// On-the-wire encoding of a setting value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireType {
    /// One byte, 0 or 1.
    Bool,
    /// NUL-terminated bytes.
    String,
    /// 4 bytes, little-endian.
    Int32,
    /// 4 bytes, little-endian IEEE 754.
    Float32,
    /// 8 bytes, little-endian IEEE 754.
    Float64,
}

impl WireType {
    pub fn name(self) -> &'static str {
        match self {
            WireType::Bool => "bool",
            WireType::String => "string",
            WireType::Int32 => "int32",
            WireType::Float32 => "float32",
            WireType::Float64 => "float64",
        }
    }

    /// Encoded size for fixed-width types; `None` for strings.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            WireType::Bool => Some(1),
            WireType::Int32 | WireType::Float32 => Some(4),
            WireType::Float64 => Some(8),
            WireType::String => None,
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Setting kinds as the camera application names them.
///
/// Several kinds share a wire encoding: `dropdown` and `radio` travel as
/// `int32`, `button` as `bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Boolean,
    String,
    Integer,
    Float,
    Double,
    Dropdown,
    Radio,
    Button,
}

impl SettingKind {
    pub fn wire_type(self) -> WireType {
        match self {
            SettingKind::Boolean | SettingKind::Button => WireType::Bool,
            SettingKind::Integer | SettingKind::Dropdown | SettingKind::Radio => WireType::Int32,
            SettingKind::Float => WireType::Float32,
            SettingKind::Double => WireType::Float64,
            SettingKind::String => WireType::String,
        }
    }
}

/// A typed setting value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    Float32(f32),
    Float64(f64),
    Str(String),
}

impl Value {
    pub fn wire_type(&self) -> WireType {
        match self {
            Value::Bool(_) => WireType::Bool,
            Value::Int32(_) => WireType::Int32,
            Value::Float32(_) => WireType::Float32,
            Value::Float64(_) => WireType::Float64,
            Value::Str(_) => WireType::String,
        }
    }

    /// The zero value of a wire type, sent as the argument of a GET request.
    pub fn placeholder(wire: WireType) -> Self {
        match wire {
            WireType::Bool => Value::Bool(false),
            WireType::Int32 => Value::Int32(0),
            WireType::Float32 => Value::Float32(0.0),
            WireType::Float64 => Value::Float64(0.0),
            WireType::String => Value::Str(String::new()),
        }
    }

    /// Parse text as a value of the given wire type.
    ///
    /// Booleans accept `true/false`, `on/off`, `yes/no` and integers (non-zero is true).
    pub fn parse(wire: WireType, input: &str) -> Result<Self> {
        let text = input.trim();
        let invalid = || FrameError::InvalidValue {
            wire,
            input: input.to_string(),
        };
        match wire {
            WireType::Bool => match text.to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" => Ok(Value::Bool(true)),
                "false" | "off" | "no" => Ok(Value::Bool(false)),
                other => other
                    .parse::<i64>()
                    .map(|n| Value::Bool(n != 0))
                    .map_err(|_| invalid()),
            },
            WireType::Int32 => text.parse().map(Value::Int32).map_err(|_| invalid()),
            WireType::Float32 => text.parse().map(Value::Float32).map_err(|_| invalid()),
            WireType::Float64 => text.parse().map(Value::Float64).map_err(|_| invalid()),
            WireType::String => Ok(Value::Str(input.to_string())),
        }
    }

    /// Truthiness of a reply: booleans as-is, integers compared against zero.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int32(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            Value::Float32(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Str(v) => f.write_str(v),
        }
    }
}

/// Encode a value as `wire`, appending to `dst`. Returns the number of bytes written.
///
/// Strings are written as `len + 1` bytes, the last one a NUL terminator.
pub fn encode_value(wire: WireType, value: &Value, dst: &mut BytesMut) -> Result<usize> {
    let start = dst.len();
    match (wire, value) {
        (WireType::Bool, Value::Bool(v)) => dst.put_u8(u8::from(*v)),
        (WireType::Int32, Value::Int32(v)) => dst.put_i32_le(*v),
        (WireType::Float32, Value::Float32(v)) => dst.put_f32_le(*v),
        (WireType::Float64, Value::Float64(v)) => dst.put_f64_le(*v),
        (WireType::String, Value::Str(v)) => {
            dst.put_slice(v.as_bytes());
            dst.put_u8(0);
        }
        (expected, actual) => {
            return Err(FrameError::TypeMismatch {
                expected,
                actual: actual.wire_type(),
            })
        }
    }
    Ok(dst.len() - start)
}

/// Decode reply bytes as `wire`.
///
/// A boolean is true when any reply byte is non-zero, so devices answering
/// with a 1-byte or 4-byte integer both decode correctly. Strings end at the
/// first NUL.
pub fn decode_value(src: &[u8], wire: WireType) -> Result<Value> {
    let need = wire.fixed_size().unwrap_or(0);
    if src.len() < need || (wire == WireType::Bool && src.is_empty()) {
        return Err(FrameError::Truncated {
            what: "value",
            need: need.max(1),
            got: src.len(),
        });
    }

    let value = match wire {
        WireType::Bool => Value::Bool(src.iter().any(|b| *b != 0)),
        WireType::Int32 => Value::Int32(i32::from_le_bytes([src[0], src[1], src[2], src[3]])),
        WireType::Float32 => Value::Float32(f32::from_le_bytes([src[0], src[1], src[2], src[3]])),
        WireType::Float64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&src[..8]);
            Value::Float64(f64::from_le_bytes(raw))
        }
        WireType::String => {
            let end = src.iter().position(|b| *b == 0).unwrap_or(src.len());
            Value::Str(String::from_utf8_lossy(&src[..end]).into_owned())
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_aliases_share_wire_types() {
        assert_eq!(SettingKind::Dropdown.wire_type(), WireType::Int32);
        assert_eq!(SettingKind::Radio.wire_type(), WireType::Int32);
        assert_eq!(SettingKind::Button.wire_type(), WireType::Bool);
        assert_eq!(SettingKind::Double.wire_type(), WireType::Float64);
        assert_eq!(SettingKind::String.wire_type(), WireType::String);
    }

    #[test]
    fn string_is_nul_terminated() {
        let mut buf = BytesMut::new();
        let n = encode_value(WireType::String, &Value::Str("cam".into()), &mut buf).unwrap();
        assert_eq!(n, 4);
        assert_eq!(buf.as_ref(), b"cam\0");
    }

    #[test]
    fn encode_rejects_mismatched_value() {
        let mut buf = BytesMut::new();
        let err = encode_value(WireType::Float32, &Value::Int32(1), &mut buf).unwrap_err();
        assert!(matches!(
            err,
            FrameError::TypeMismatch {
                expected: WireType::Float32,
                actual: WireType::Int32
            }
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_bool_compares_non_zero() {
        assert_eq!(decode_value(&[0], WireType::Bool).unwrap(), Value::Bool(false));
        assert_eq!(decode_value(&[1], WireType::Bool).unwrap(), Value::Bool(true));
        assert_eq!(decode_value(&[0, 1, 0, 0], WireType::Bool).unwrap(), Value::Bool(true));
        assert!(matches!(
            decode_value(&[], WireType::Bool),
            Err(FrameError::Truncated { .. })
        ));
    }

    #[test]
    fn decode_numeric_values() {
        assert_eq!(
            decode_value(&(-7i32).to_le_bytes(), WireType::Int32).unwrap(),
            Value::Int32(-7)
        );
        assert_eq!(
            decode_value(&1.5f32.to_le_bytes(), WireType::Float32).unwrap(),
            Value::Float32(1.5)
        );
        assert_eq!(
            decode_value(&2.25f64.to_le_bytes(), WireType::Float64).unwrap(),
            Value::Float64(2.25)
        );
        assert!(matches!(
            decode_value(&[1, 2], WireType::Float32),
            Err(FrameError::Truncated { need: 4, got: 2, .. })
        ));
    }

    #[test]
    fn decode_string_stops_at_nul() {
        assert_eq!(
            decode_value(b"v1.2\0\0", WireType::String).unwrap(),
            Value::Str("v1.2".into())
        );
        assert_eq!(
            decode_value(b"", WireType::String).unwrap(),
            Value::Str(String::new())
        );
    }

    #[test]
    fn parse_text_values() {
        assert_eq!(Value::parse(WireType::Bool, "on").unwrap(), Value::Bool(true));
        assert_eq!(Value::parse(WireType::Bool, "0").unwrap(), Value::Bool(false));
        assert_eq!(Value::parse(WireType::Int32, " 640 ").unwrap(), Value::Int32(640));
        assert_eq!(
            Value::parse(WireType::Float32, "12.5").unwrap(),
            Value::Float32(12.5)
        );
        assert!(matches!(
            Value::parse(WireType::Int32, "wide"),
            Err(FrameError::InvalidValue { .. })
        ));
    }

    #[test]
    fn truthiness_of_integer_replies() {
        assert_eq!(Value::Int32(3).as_bool(), Some(true));
        assert_eq!(Value::Int32(0).as_bool(), Some(false));
        assert_eq!(Value::Float32(1.0).as_bool(), None);
    }
}
