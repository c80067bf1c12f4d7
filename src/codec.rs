use bytes::BytesMut;
use std::convert::TryInto;
use std::io::Cursor;
use tokio_util::codec::Decoder;

use crate::frame::{self, Frame};
use crate::Error;

/// Splits a byte stream into complete top-level frames, leaving their bytes untouched.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
    max_depth: usize,
}

impl FrameCodec {
    pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

    pub fn new() -> FrameCodec {
        Self::with_max_frame_size(Self::DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> FrameCodec {
        FrameCodec {
            max_frame_size,
            max_depth: frame::DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets how many levels aggregates may nest. Deeper frames fail to decode.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Check if the buffered data exceeds a certain limit to prevent DoS attacks.
        if src.len() > self.max_frame_size {
            return Err(format!(
                "frame size exceeds limit of {} bytes",
                self.max_frame_size
            )
            .into());
        }

        let mut cursor = Cursor::new(&src[..]);
        match Frame::check_depth(&mut cursor, self.max_depth) {
            Ok(()) => {}
            Err(frame::Error::Incomplete) => return Ok(None), // Not enough data to read a frame.
            Err(err) => return Err(err.into()),
        }

        let position: usize = cursor.position().try_into()?;

        // Remove the frame from the buffer, handing its bytes over without copying.
        let bytes = src.split_to(position).freeze();

        Ok(Some(Frame::from_checked(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_partial_frame() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from("*2\r\n$4\r\nECHO\r\n$2\r\nh");

        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"i\r\n+next");
        let frame = codec.decode(&mut buf).unwrap().unwrap();

        assert_eq!(frame.as_bytes(), b"*2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n");
        assert_eq!(&buf[..], b"+next");
    }

    #[test]
    fn decode_pipelined_frames() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from("*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n");

        let first = codec.decode(&mut buf).unwrap().unwrap();
        let second = codec.decode(&mut buf).unwrap().unwrap();

        assert_eq!(first, second);
        assert!(buf.is_empty());
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_invalid_data_type() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from("?\r\n");

        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn decode_nested_too_deep() {
        let mut codec = FrameCodec::new().max_depth(2);
        let mut buf = BytesMut::from("*1\r\n*1\r\n*1\r\n");

        assert!(codec.decode(&mut buf).is_err());

        let mut codec = FrameCodec::new().max_depth(2);
        let mut buf = BytesMut::from("*1\r\n*1\r\n:1\r\n");

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.as_bytes(), b"*1\r\n*1\r\n:1\r\n");
    }

    #[test]
    fn decode_frame_over_limit() {
        let mut codec = FrameCodec::with_max_frame_size(8);
        let mut buf = BytesMut::from("$10\r\n0123456789\r\n");

        assert!(codec.decode(&mut buf).is_err());
    }
}
