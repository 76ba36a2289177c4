//! Protocol errors.

use thiserror::Error;

/// Errors that can occur while encoding or decoding hub messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A read or offset resolution went past the end of the buffer.
    #[error("read of {len} bytes at offset {offset} exceeds buffer of {buffer_len} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        buffer_len: usize,
    },

    /// A union carried a type tag this client does not know.
    #[error("unknown {union} variant tag {tag}")]
    UnknownUnionTag { union: &'static str, tag: u8 },

    /// A vtable is inconsistent with itself or with the buffer.
    #[error("malformed vtable at offset {offset}: {reason}")]
    MalformedVtable { offset: usize, reason: &'static str },

    /// The builder was asked to produce an invalid encoding.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(&'static str),

    /// A string field is not valid UTF-8.
    #[error("string at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },

    /// A closed enum field carried an undefined value.
    #[error("unknown {name} value {value}")]
    UnknownEnumValue { name: &'static str, value: u8 },

    /// A union tag was set but its payload offset is absent.
    #[error("{union} tag {tag} has no payload")]
    MissingUnionPayload { union: &'static str, tag: u8 },

    /// A size prefix announced a frame larger than allowed.
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge { size: usize, max: usize },
}

impl ProtocolError {
    /// Whether the error only means "a newer peer sent something we don't know".
    ///
    /// Such errors may be skipped; everything else means the buffer is corrupt.
    pub fn is_forward_compatible(&self) -> bool {
        matches!(self, ProtocolError::UnknownUnionTag { .. })
    }
}
