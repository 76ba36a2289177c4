//! Size-prefixed stream framer.
//!
//! On stream transports each message is sent as:
//!
//!   `<u32 little-endian length><message bytes>`
//!
//! This module provides an incremental framer that can be fed arbitrary
//! chunks and yields whole messages (without the prefix) when available.
use bytes::{Buf, Bytes, BytesMut};
use tracing::{trace, warn};

use crate::buffer::SIZE_PREFIX_LENGTH;
use crate::error::ProtocolError;

/// Default upper bound on a single message.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Incremental splitter for size-prefixed messages.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    max_frame_size: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl FrameDecoder {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
            max_frame_size,
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes received but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Extract the next complete message, if one is buffered.
    ///
    /// An oversized length prefix cannot be resynchronized from, so the
    /// buffered bytes are dropped and `FrameTooLarge` is returned.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>, ProtocolError> {
        if self.buf.len() < SIZE_PREFIX_LENGTH {
            return Ok(None);
        }

        let mut prefix = [0u8; SIZE_PREFIX_LENGTH];
        prefix.copy_from_slice(&self.buf[..SIZE_PREFIX_LENGTH]);
        let len = u32::from_le_bytes(prefix) as usize;

        if len > self.max_frame_size {
            warn!(size = len, max = self.max_frame_size, "Dropping oversized frame");
            self.buf.clear();
            return Err(ProtocolError::FrameTooLarge {
                size: len,
                max: self.max_frame_size,
            });
        }

        if self.buf.len() < SIZE_PREFIX_LENGTH + len {
            return Ok(None);
        }

        self.buf.advance(SIZE_PREFIX_LENGTH);
        let frame = self.buf.split_to(len).freeze();
        trace!(len, "Frame complete");
        Ok(Some(frame))
    }
}

/// Prepend the `u32` length prefix to an unprefixed message.
pub fn frame(message: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let len = u32::try_from(message.len()).map_err(|_| ProtocolError::FrameTooLarge {
        size: message.len(),
        max: u32::MAX as usize,
    })?;
    let mut out = Vec::with_capacity(SIZE_PREFIX_LENGTH + message.len());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(message);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_across_chunks() {
        let mut framer = FrameDecoder::default();
        let mut stream = frame(b"first").unwrap();
        stream.extend(frame(b"second!").unwrap());

        framer.push(&stream[..3]);
        assert_eq!(framer.next_frame().unwrap(), None);
        framer.push(&stream[3..7]);
        assert_eq!(framer.next_frame().unwrap(), None);
        framer.push(&stream[7..]);

        assert_eq!(framer.next_frame().unwrap().as_deref(), Some(&b"first"[..]));
        assert_eq!(framer.next_frame().unwrap().as_deref(), Some(&b"second!"[..]));
        assert_eq!(framer.next_frame().unwrap(), None);
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_empty_frame() {
        let mut framer = FrameDecoder::default();
        framer.push(&frame(b"").unwrap());
        assert_eq!(framer.next_frame().unwrap().as_deref(), Some(&b""[..]));
    }

    #[test]
    fn test_oversized_frame() {
        let mut framer = FrameDecoder::new(8);
        framer.push(&frame(b"way too long for the limit").unwrap());
        assert_eq!(
            framer.next_frame(),
            Err(ProtocolError::FrameTooLarge { size: 26, max: 8 })
        );
        assert_eq!(framer.buffered(), 0);

        framer.push(&frame(b"ok").unwrap());
        assert_eq!(framer.next_frame().unwrap().as_deref(), Some(&b"ok"[..]));
    }
}
