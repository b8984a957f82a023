//! `tokio_util` codec for the image stream.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::FrameError;
use crate::header::{decode_image_frame, encode_image_frame, ImageFrame, DEFAULT_MAX_PAYLOAD};

/// Decodes [`ImageFrame`]s from an async byte stream (and encodes them, for
/// simulators and tests).
#[derive(Debug, Clone)]
pub struct ImageFrameCodec {
    max_payload_size: usize,
}

impl ImageFrameCodec {
    pub fn new(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }
}

impl Default for ImageFrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD)
    }
}

impl Decoder for ImageFrameCodec {
    type Item = ImageFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_image_frame(src, self.max_payload_size)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None if buf.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl Encoder<ImageFrame> for ImageFrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: ImageFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.payload.len() > self.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: item.payload.len(),
                max: self.max_payload_size,
            });
        }
        encode_image_frame(item.width, item.height, &item.payload, dst)
    }
}
