use std::io::{ErrorKind, Read};
use std::time::Duration;

use bytes::BytesMut;
use camwire_transport::CameraStream;

use crate::error::{FrameError, Result};
use crate::header::{decode_frame_header, ImageFrame, DEFAULT_MAX_PAYLOAD, FRAME_HEADER_SIZE};

/// Configuration for reading image frames.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 64 MiB.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations. Default: none, reads block until
    /// data arrives or the peer closes.
    pub read_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
        }
    }
}

/// Reads complete image frames from any `Read` stream.
///
/// Reads exactly one header, then exactly `payload_size` bytes, looping over
/// partial reads. Never reads past the end of the current frame.
pub struct ImageReader<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Read> ImageReader<T> {
    /// Create a new image reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new image reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when the stream ends cleanly
    /// between frames or part way through a payload, and
    /// `Err(FrameError::ShortHeader)` when it ends inside a header.
    pub fn read_frame(&mut self) -> Result<ImageFrame> {
        let mut raw = [0u8; FRAME_HEADER_SIZE];
        match read_full(&mut self.inner, &mut raw)? {
            0 => return Err(FrameError::ConnectionClosed),
            FRAME_HEADER_SIZE => {}
            got => return Err(FrameError::ShortHeader { got }),
        }

        let header = decode_frame_header(&raw)?;
        let size = header.payload_size as usize;
        if size > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size,
                max: self.config.max_payload_size,
            });
        }

        let mut payload = BytesMut::zeroed(size);
        if read_full(&mut self.inner, &mut payload)? < size {
            return Err(FrameError::ConnectionClosed);
        }

        Ok(ImageFrame {
            width: header.width,
            height: header.height,
            payload: payload.freeze(),
        })
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }
}

impl ImageReader<CameraStream> {
    /// Create an image reader for a `CameraStream` and apply the read timeout from config.
    pub fn with_config_stream(inner: CameraStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

/// Read until `buf` is full or the stream reports EOF. Returns the bytes read,
/// so a result shorter than `buf` means the peer closed part way through.
pub fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(filled)
}

fn transport_to_frame_error(err: camwire_transport::TransportError) -> FrameError {
    match err {
        camwire_transport::TransportError::Io(io) => FrameError::Io(io),
        camwire_transport::TransportError::Resolve { source, .. }
        | camwire_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
    }
}
