use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Image frame header: start (1) + width (2) + height (2) + size (4) + end (1) = 10 bytes.
pub const FRAME_HEADER_SIZE: usize = 10;

/// First byte of every image frame header.
pub const MARKER_START: u8 = 0xAA;

/// Last byte of every image frame header.
pub const MARKER_END: u8 = 0x55;

/// Default maximum image payload size: 64 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024 * 1024;

/// Decoded image frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub width: u16,
    pub height: u16,
    pub payload_size: u32,
}

/// One complete image delivered by the camera.
///
/// The payload is opaque here (typically JPEG); decoding it is up to the consumer.
#[derive(Debug, Clone)]
pub struct ImageFrame {
    pub width: u16,
    pub height: u16,
    pub payload: Bytes,
}

impl ImageFrame {
    /// Create a new frame.
    pub fn new(width: u16, height: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        FRAME_HEADER_SIZE + self.payload.len()
    }
}

/// Encode a frame header into its 10-byte wire form.
///
/// Wire format:
/// ```text
/// ┌────────┬───────────┬───────────┬──────────────┬────────┐
/// │ 0xAA   │ Width     │ Height    │ Payload size │ 0x55   │
/// │ (1B)   │ (2B LE)   │ (2B LE)   │ (4B LE)      │ (1B)   │
/// └────────┴───────────┴───────────┴──────────────┴────────┘
/// ```
pub fn encode_frame_header(header: &FrameHeader) -> [u8; FRAME_HEADER_SIZE] {
    let mut out = [0u8; FRAME_HEADER_SIZE];
    out[0] = MARKER_START;
    out[1..3].copy_from_slice(&header.width.to_le_bytes());
    out[3..5].copy_from_slice(&header.height.to_le_bytes());
    out[5..9].copy_from_slice(&header.payload_size.to_le_bytes());
    out[9] = MARKER_END;
    out
}

/// Decode a frame header from exactly 10 bytes.
pub fn decode_frame_header(src: &[u8]) -> Result<FrameHeader> {
    let raw: &[u8; FRAME_HEADER_SIZE] = src
        .try_into()
        .map_err(|_| FrameError::BadLength(src.len()))?;

    if raw[0] != MARKER_START || raw[9] != MARKER_END {
        return Err(FrameError::BadMarker {
            start: raw[0],
            end: raw[9],
        });
    }

    Ok(FrameHeader {
        width: u16::from_le_bytes([raw[1], raw[2]]),
        height: u16::from_le_bytes([raw[3], raw[4]]),
        payload_size: u32::from_le_bytes([raw[5], raw[6], raw[7], raw[8]]),
    })
}

/// Encode a complete image frame (header + payload).
pub fn encode_image_frame(
    width: u16,
    height: u16,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    let payload_size = u32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    dst.reserve(FRAME_HEADER_SIZE + payload.len());
    dst.put_slice(&encode_frame_header(&FrameHeader {
        width,
        height,
        payload_size,
    }));
    dst.put_slice(payload);
    Ok(())
}

/// Decode an image frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_image_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<ImageFrame>> {
    if src.len() < FRAME_HEADER_SIZE {
        return Ok(None);
    }

    let header = decode_frame_header(&src[..FRAME_HEADER_SIZE])?;
    let payload_len = header.payload_size as usize;
    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    if src.len() < FRAME_HEADER_SIZE + payload_len {
        src.reserve(FRAME_HEADER_SIZE + payload_len - src.len());
        return Ok(None);
    }

    src.advance(FRAME_HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(ImageFrame {
        width: header.width,
        height: header.height,
        payload,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_header_layout() {
        let bytes = encode_frame_header(&FrameHeader {
            width: 640,
            height: 480,
            payload_size: 0x0102_0304,
        });
        assert_eq!(
            bytes,
            [0xAA, 0x80, 0x02, 0xE0, 0x01, 0x04, 0x03, 0x02, 0x01, 0x55]
        );
    }

    #[test]
    fn test_decode_bad_start_marker() {
        let mut bytes = encode_frame_header(&FrameHeader {
            width: 1,
            height: 1,
            payload_size: 1,
        });
        bytes[0] = 0xAB;
        let result = decode_frame_header(&bytes);
        assert!(matches!(
            result,
            Err(FrameError::BadMarker {
                start: 0xAB,
                end: 0x55
            })
        ));
    }

    #[test]
    fn test_decode_bad_end_marker() {
        let mut bytes = encode_frame_header(&FrameHeader {
            width: 1,
            height: 1,
            payload_size: 1,
        });
        bytes[9] = 0x00;
        assert!(matches!(
            decode_frame_header(&bytes),
            Err(FrameError::BadMarker { .. })
        ));
    }

    #[test]
    fn test_decode_image_frame_incomplete() {
        let mut buf = BytesMut::new();
        encode_image_frame(4, 2, b"abcdefgh", &mut buf).unwrap();
        buf.truncate(FRAME_HEADER_SIZE + 3);

        assert!(decode_image_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .is_none());
        assert_eq!(buf.len(), FRAME_HEADER_SIZE + 3);
    }

    #[test]
    fn test_decode_image_frame_back_to_back() {
        let mut buf = BytesMut::new();
        encode_image_frame(2, 2, b"first", &mut buf).unwrap();
        encode_image_frame(3, 3, b"", &mut buf).unwrap();

        let first = decode_image_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!((first.width, first.height), (2, 2));
        assert_eq!(first.payload.as_ref(), b"first");

        let second = decode_image_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!((second.width, second.height), (3, 3));
        assert!(second.payload.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_image_frame_too_large() {
        let mut buf = BytesMut::new();
        buf.put_slice(&encode_frame_header(&FrameHeader {
            width: 1,
            height: 1,
            payload_size: 1024,
        }));
        let result = decode_image_frame(&mut buf, 16);
        assert!(matches!(
            result,
            Err(FrameError::PayloadTooLarge { size: 1024, max: 16 })
        ));
    }

    #[test]
    fn test_frame_wire_size() {
        let frame = ImageFrame::new(1, 1, Bytes::from_static(b"jpeg"));
        assert_eq!(frame.wire_size(), FRAME_HEADER_SIZE + 4);
    }

    proptest! {
        #[test]
        fn header_roundtrip(width: u16, height: u16, payload_size: u32) {
            let header = FrameHeader { width, height, payload_size };
            let decoded = decode_frame_header(&encode_frame_header(&header)).unwrap();
            prop_assert_eq!(decoded, header);
        }

        #[test]
        fn header_rejects_wrong_length(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            prop_assume!(bytes.len() != FRAME_HEADER_SIZE);
            let is_bad_length = matches!(
                decode_frame_header(&bytes),
                Err(FrameError::BadLength(n)) if n == bytes.len()
            );
            prop_assert!(is_bad_length);
        }
    }
}
