//! Bounds-checked reads over a received buffer.
//!
//! Every read takes an absolute position and fails with
//! [`ProtocolError::OutOfBounds`] if any byte of the target range lies past
//! the end of the slice. Positions come from the buffer itself, so all
//! arithmetic on them is checked.

use crate::error::ProtocolError;

/// Size of a relative offset (`uoffset`) in bytes.
pub const SIZE_UOFFSET: usize = 4;

/// Size of a vtable offset (`soffset`) in bytes.
pub const SIZE_SOFFSET: usize = 4;

/// Size of the optional length prefix in front of a root table.
pub const SIZE_PREFIX_LENGTH: usize = 4;

/// A fixed-width little-endian value that can be read from or written to a buffer.
pub trait Scalar: Copy + PartialEq {
    /// Width in bytes (also the alignment used when writing).
    const SIZE: usize;

    /// Decode from exactly `SIZE` bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;

    /// Encode into `out`, which is exactly `SIZE` bytes.
    fn write_le(self, out: &mut [u8]);
}

macro_rules! impl_scalar {
    ($($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }

                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_scalar!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl Scalar for bool {
    const SIZE: usize = 1;

    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn write_le(self, out: &mut [u8]) {
        out[0] = u8::from(self);
    }
}

/// A read-only view over received bytes.
#[derive(Debug, Clone, Copy)]
pub struct Buffer<'a> {
    bytes: &'a [u8],
}

impl<'a> Buffer<'a> {
    /// Wrap a byte slice.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], ProtocolError> {
        let out_of_bounds = || ProtocolError::OutOfBounds {
            offset,
            len,
            buffer_len: self.bytes.len(),
        };

        let end = offset.checked_add(len).ok_or_else(out_of_bounds)?;
        self.bytes.get(offset..end).ok_or_else(out_of_bounds)
    }

    /// Read a scalar at `offset`.
    pub fn read<T: Scalar>(&self, offset: usize) -> Result<T, ProtocolError> {
        self.slice(offset, T::SIZE).map(T::from_le_slice)
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, ProtocolError> {
        self.read(offset)
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16, ProtocolError> {
        self.read(offset)
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32, ProtocolError> {
        self.read(offset)
    }

    pub fn read_i32(&self, offset: usize) -> Result<i32, ProtocolError> {
        self.read(offset)
    }

    /// Follow the relative offset stored at `offset`.
    ///
    /// Variable-length fields (strings, nested tables, vectors) store a
    /// forward `u32` distance from the field's own position to the data.
    /// The returned position is guaranteed to lie inside the buffer.
    pub fn deref_offset(&self, offset: usize) -> Result<usize, ProtocolError> {
        let relative = self.read_u32(offset)? as usize;
        let target = offset
            .checked_add(relative)
            .filter(|&target| target < self.bytes.len())
            .ok_or(ProtocolError::OutOfBounds {
                offset,
                len: relative,
                buffer_len: self.bytes.len(),
            })?;
        Ok(target)
    }

    /// Check the length-prefixed vector whose header is at `offset`.
    ///
    /// Returns the position of the first element and the element count once
    /// the whole element range is known to be in bounds.
    pub fn read_vector(&self, offset: usize, element_size: usize) -> Result<(usize, usize), ProtocolError> {
        let count = self.read_u32(offset)? as usize;
        let start = offset + SIZE_UOFFSET;
        let byte_len = count.checked_mul(element_size).ok_or(ProtocolError::OutOfBounds {
            offset: start,
            len: usize::MAX,
            buffer_len: self.bytes.len(),
        })?;
        self.slice(start, byte_len)?;
        Ok((start, count))
    }

    /// Read a length-prefixed UTF-8 string whose header is at `offset`.
    ///
    /// The length prefix is authoritative; embedded NUL bytes are data and
    /// no terminator is expected.
    pub fn read_str(&self, offset: usize) -> Result<&'a str, ProtocolError> {
        let len = self.read_u32(offset)? as usize;
        let start = offset + SIZE_UOFFSET;
        let bytes = self.slice(start, len)?;
        std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8 { offset: start })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_scalars_little_endian() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0xff, 0x00, 0x00, 0x80, 0x3f];
        let buf = Buffer::new(&bytes);

        assert_eq!(buf.read_u8(0).unwrap(), 0x01);
        assert_eq!(buf.read_u16(0).unwrap(), 0x0201);
        assert_eq!(buf.read_u32(0).unwrap(), 0x0403_0201);
        assert_eq!(buf.read::<i8>(4).unwrap(), -1);
        assert_eq!(buf.read::<f32>(5).unwrap(), 1.0);
        assert!(buf.read::<bool>(4).unwrap());
    }

    #[test]
    fn test_read_past_end_fails() {
        let bytes = [0u8; 4];
        let buf = Buffer::new(&bytes);

        assert!(buf.read_u32(0).is_ok());
        assert_eq!(
            buf.read_u32(1),
            Err(ProtocolError::OutOfBounds {
                offset: 1,
                len: 4,
                buffer_len: 4
            })
        );
        assert!(buf.read::<u64>(0).is_err());
        assert!(buf.read_u8(4).is_err());
        assert!(buf.slice(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_deref_offset() {
        // Offset 4 at position 0 points at position 4.
        let bytes = [4, 0, 0, 0, 0xaa];
        let buf = Buffer::new(&bytes);
        assert_eq!(buf.deref_offset(0).unwrap(), 4);

        // Offset 5 would land exactly at the end.
        let bytes = [5, 0, 0, 0, 0xaa];
        let buf = Buffer::new(&bytes);
        assert!(matches!(
            buf.deref_offset(0),
            Err(ProtocolError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_read_str_keeps_embedded_nul() {
        let bytes = [3, 0, 0, 0, b'a', 0, b'b', 0];
        let buf = Buffer::new(&bytes);
        assert_eq!(buf.read_str(0).unwrap(), "a\0b");
    }

    #[test]
    fn test_read_str_without_terminator() {
        let bytes = [2, 0, 0, 0, b'h', b'i'];
        let buf = Buffer::new(&bytes);
        assert_eq!(buf.read_str(0).unwrap(), "hi");
    }

    #[test]
    fn test_read_str_errors() {
        let truncated = [5, 0, 0, 0, b'h', b'i'];
        assert!(matches!(
            Buffer::new(&truncated).read_str(0),
            Err(ProtocolError::OutOfBounds { .. })
        ));

        let invalid = [2, 0, 0, 0, 0xc3, 0x28];
        assert_eq!(
            Buffer::new(&invalid).read_str(0),
            Err(ProtocolError::InvalidUtf8 { offset: 4 })
        );
    }

    #[test]
    fn test_read_vector_bounds() {
        let bytes = [2, 0, 0, 0, 7, 9];
        let buf = Buffer::new(&bytes);
        assert_eq!(buf.read_vector(0, 1).unwrap(), (4, 2));
        assert!(buf.read_vector(0, 4).is_err());

        let huge = [0xff, 0xff, 0xff, 0xff];
        assert!(Buffer::new(&huge).read_vector(0, 4).is_err());
    }
}
