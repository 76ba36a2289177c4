//! Message builder.
//!
//! Messages are written back to front: children (strings, vectors, nested
//! tables) are created first and end up at higher addresses, then the tables
//! that refer to them. That keeps every relative offset a forward `u32`
//! distance, which is what the reader follows.
//!
//! Offsets handed out by the builder ([`Offset`]) count bytes from the end
//! of the buffer, because the final start position is not known until the
//! message is finished.

use crate::buffer::{Scalar, SIZE_PREFIX_LENGTH, SIZE_UOFFSET};
use crate::error::ProtocolError;

/// Position of an object written by a [`Builder`], counted from the end of
/// the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset(u32);

impl Offset {
    pub fn value(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
struct FieldLoc {
    offset: u32,
    slot: u16,
}

/// Builds one message at a time.
///
/// A builder owns its buffer exclusively; build one message, take the bytes,
/// then [`reset`](Builder::reset) it to build the next.
#[derive(Debug)]
pub struct Builder {
    buf: Vec<u8>,
    head: usize,
    min_align: usize,
    trailing_padding: usize,
    field_locs: Vec<FieldLoc>,
    table_start: Option<usize>,
    force_defaults: bool,
    finished: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
            head: capacity,
            min_align: 1,
            trailing_padding: 0,
            field_locs: Vec::new(),
            table_start: None,
            force_defaults: false,
            finished: false,
        }
    }

    /// Clear all state so the buffer can be reused for another message.
    pub fn reset(&mut self) {
        self.head = self.buf.len();
        self.min_align = 1;
        self.trailing_padding = 0;
        self.field_locs.clear();
        self.table_start = None;
        self.finished = false;
    }

    /// Write scalar fields even when they equal their default.
    pub fn force_defaults(&mut self, force: bool) {
        self.force_defaults = force;
    }

    fn used_space(&self) -> usize {
        self.buf.len() - self.head
    }

    fn grow(&mut self) {
        let old_len = self.buf.len();
        let new_len = (old_len * 2).max(64);
        let mut grown = vec![0u8; new_len];
        grown[new_len - old_len..].copy_from_slice(&self.buf);
        self.head += new_len - old_len;
        self.buf = grown;
    }

    /// Reserve `len` bytes in front of the written data and return their index.
    fn make_space(&mut self, len: usize) -> usize {
        while self.head < len {
            self.grow();
        }
        self.head -= len;
        self.head
    }

    fn pad(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        if self.used_space() == 0 {
            self.trailing_padding = len;
        }
        let at = self.make_space(len);
        self.buf[at..at + len].fill(0);
    }

    /// Pad so that after writing `len` more bytes the data is aligned to `alignment`.
    fn align(&mut self, len: usize, alignment: usize) {
        self.min_align = self.min_align.max(alignment);
        let unaligned = (self.used_space() + len) % alignment;
        if unaligned != 0 {
            self.pad(alignment - unaligned);
        }
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        let at = self.make_space(bytes.len());
        self.buf[at..at + bytes.len()].copy_from_slice(bytes);
    }

    fn push_scalar<T: Scalar>(&mut self, value: T) -> Offset {
        self.align(T::SIZE, T::SIZE);
        let at = self.make_space(T::SIZE);
        value.write_le(&mut self.buf[at..at + T::SIZE]);
        Offset(self.used_space() as u32)
    }

    /// Write a forward offset from the current position to `target`.
    ///
    /// `target` must be an object already written to this buffer.
    fn push_uoffset(&mut self, target: Offset) -> Result<Offset, ProtocolError> {
        self.align(SIZE_UOFFSET, SIZE_UOFFSET);
        if target.0 == 0 || target.0 as usize > self.used_space() {
            return Err(ProtocolError::InvalidEncoding("offset does not refer to this buffer"));
        }
        let relative = (self.used_space() + SIZE_UOFFSET) as u32 - target.0;
        Ok(self.push_scalar(relative))
    }

    fn ensure_not_in_table(&self, what: &'static str) -> Result<(), ProtocolError> {
        if self.finished {
            return Err(ProtocolError::InvalidEncoding("builder already finished"));
        }
        if self.table_start.is_some() {
            return Err(ProtocolError::InvalidEncoding(what));
        }
        Ok(())
    }

    fn ensure_in_table(&self) -> Result<(), ProtocolError> {
        if self.table_start.is_none() {
            return Err(ProtocolError::InvalidEncoding("field written outside a table"));
        }
        Ok(())
    }

    fn track_field(&mut self, slot: u16, offset: Offset) -> Result<(), ProtocolError> {
        if self.field_locs.iter().any(|loc| loc.slot == slot) {
            return Err(ProtocolError::InvalidEncoding("slot written twice"));
        }
        self.field_locs.push(FieldLoc {
            offset: offset.0,
            slot,
        });
        Ok(())
    }

    /// Create a length-prefixed UTF-8 string.
    pub fn create_string(&mut self, value: &str) -> Result<Offset, ProtocolError> {
        self.ensure_not_in_table("string created inside a table")?;
        let len = u32::try_from(value.len())
            .map_err(|_| ProtocolError::InvalidEncoding("string longer than u32::MAX"))?;

        self.align(value.len(), SIZE_UOFFSET);
        self.push_bytes(value.as_bytes());
        Ok(self.push_scalar(len))
    }

    /// Create a vector of scalars.
    pub fn create_vector<T: Scalar>(&mut self, items: &[T]) -> Result<Offset, ProtocolError> {
        self.ensure_not_in_table("vector created inside a table")?;
        let len = u32::try_from(items.len())
            .map_err(|_| ProtocolError::InvalidEncoding("vector longer than u32::MAX"))?;

        self.align(items.len() * T::SIZE, T::SIZE.max(SIZE_UOFFSET));
        for item in items.iter().rev() {
            self.push_scalar(*item);
        }
        Ok(self.push_scalar(len))
    }

    /// Create a vector of previously built tables.
    pub fn create_vector_of_tables(&mut self, items: &[Offset]) -> Result<Offset, ProtocolError> {
        self.ensure_not_in_table("vector created inside a table")?;
        let len = u32::try_from(items.len())
            .map_err(|_| ProtocolError::InvalidEncoding("vector longer than u32::MAX"))?;

        self.align(items.len() * SIZE_UOFFSET, SIZE_UOFFSET);
        for item in items.iter().rev() {
            self.push_uoffset(*item)?;
        }
        Ok(self.push_scalar(len))
    }

    /// Begin a table. Children must already be built.
    pub fn start_table(&mut self) -> Result<(), ProtocolError> {
        self.ensure_not_in_table("tables cannot be nested during construction")?;
        self.field_locs.clear();
        self.table_start = Some(self.used_space());
        Ok(())
    }

    /// Add a scalar field; skipped when equal to `default` unless defaults are forced.
    pub fn add_scalar<T: Scalar>(&mut self, slot: u16, value: T, default: T) -> Result<(), ProtocolError> {
        self.ensure_in_table()?;
        if value == default && !self.force_defaults {
            return Ok(());
        }
        let offset = self.push_scalar(value);
        self.track_field(slot, offset)
    }

    /// Add a field referring to a string, vector or table.
    pub fn add_offset(&mut self, slot: u16, target: Offset) -> Result<(), ProtocolError> {
        self.ensure_in_table()?;
        let offset = self.push_uoffset(target)?;
        self.track_field(slot, offset)
    }

    /// Add a fixed-layout struct stored inline in the table.
    pub fn add_struct(&mut self, slot: u16, bytes: &[u8], alignment: usize) -> Result<(), ProtocolError> {
        self.ensure_in_table()?;
        self.align(bytes.len(), alignment);
        self.push_bytes(bytes);
        let offset = Offset(self.used_space() as u32);
        self.track_field(slot, offset)
    }

    /// Add a union as its type tag plus payload offset.
    ///
    /// Tag and payload go together: a non-zero tag needs a payload and tag 0
    /// ("none") must not have one.
    pub fn add_union(
        &mut self,
        type_slot: u16,
        value_slot: u16,
        tag: u8,
        payload: Option<Offset>,
    ) -> Result<(), ProtocolError> {
        match (tag, payload) {
            (0, None) => Ok(()),
            (0, Some(_)) => Err(ProtocolError::InvalidEncoding("union payload without a type tag")),
            (_, None) => Err(ProtocolError::InvalidEncoding("union type tag without a payload")),
            (tag, Some(payload)) => {
                self.add_scalar(type_slot, tag, 0)?;
                self.add_offset(value_slot, payload)
            }
        }
    }

    /// Finish the current table: write its vtable and return its offset.
    pub fn end_table(&mut self) -> Result<Offset, ProtocolError> {
        let start = self
            .table_start
            .take()
            .ok_or(ProtocolError::InvalidEncoding("end_table without start_table"))?;

        // Placeholder for the vtable distance, patched below.
        let object = self.push_scalar(0i32).0 as usize;
        let object_size = object - start;

        let slot_count = self
            .field_locs
            .iter()
            .map(|loc| loc.slot as usize + 1)
            .max()
            .unwrap_or(0);
        let vtable_len = 4 + 2 * slot_count;

        let object_size = u16::try_from(object_size)
            .map_err(|_| ProtocolError::InvalidEncoding("table body larger than 64 KiB"))?;
        let vtable_len_u16 = u16::try_from(vtable_len)
            .map_err(|_| ProtocolError::InvalidEncoding("too many table slots"))?;

        let at = self.make_space(vtable_len);
        self.buf[at..at + vtable_len].fill(0);
        vtable_len_u16.write_le(&mut self.buf[at..at + 2]);
        object_size.write_le(&mut self.buf[at + 2..at + 4]);
        for loc in &self.field_locs {
            let field_pos = (object - loc.offset as usize) as u16;
            let entry = at + 4 + 2 * loc.slot as usize;
            field_pos.write_le(&mut self.buf[entry..entry + 2]);
        }
        self.field_locs.clear();

        let vtable = self.used_space();
        let table_at = self.buf.len() - object;
        ((vtable - object) as i32).write_le(&mut self.buf[table_at..table_at + 4]);

        Ok(Offset(object as u32))
    }

    /// Write the root offset, and optionally the size prefix, completing the message.
    pub fn finish(&mut self, root: Offset, size_prefixed: bool) -> Result<(), ProtocolError> {
        self.ensure_not_in_table("finish called with an open table")?;

        let prefix = if size_prefixed { SIZE_PREFIX_LENGTH } else { 0 };
        let min_align = self.min_align.max(SIZE_UOFFSET);
        self.align(SIZE_UOFFSET + prefix, min_align);
        self.push_uoffset(root)?;

        if size_prefixed {
            let size = (self.used_space() - self.trailing_padding) as u32;
            self.push_scalar(size);
        }

        self.finished = true;
        Ok(())
    }

    /// The finished message.
    ///
    /// Padding at the very end of the buffer carries no data and is left off,
    /// so every byte of the result belongs to some field.
    pub fn finished_data(&self) -> Result<&[u8], ProtocolError> {
        if !self.finished {
            return Err(ProtocolError::InvalidEncoding("message not finished"));
        }
        Ok(&self.buf[self.head..self.buf.len() - self.trailing_padding])
    }

    /// Take the finished message out of the builder.
    pub fn into_bytes(self) -> Result<Vec<u8>, ProtocolError> {
        self.finished_data().map(<[u8]>::to_vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_layout() {
        let mut builder = Builder::new();
        builder.start_table().unwrap();
        let root = builder.end_table().unwrap();
        builder.finish(root, false).unwrap();

        assert_eq!(
            builder.finished_data().unwrap(),
            &[
                8, 0, 0, 0, // root offset
                4, 0, 4, 0, // vtable: 4 bytes, object 4 bytes, no slots
                4, 0, 0, 0, // table: distance back to vtable
            ]
        );
    }

    #[test]
    fn test_scalar_field_layout() {
        let mut builder = Builder::new();
        builder.start_table().unwrap();
        builder.add_scalar(0, 4i8, 0).unwrap();
        builder.add_scalar(1, 0u8, 0).unwrap();
        let root = builder.end_table().unwrap();
        builder.finish(root, false).unwrap();

        assert_eq!(
            builder.finished_data().unwrap(),
            &[
                12, 0, 0, 0, // root offset
                0, 0, // padding
                6, 0, 8, 0, 7, 0, // vtable: slot 0 at +7, slot 1 omitted
                6, 0, 0, 0, // table: distance back to vtable
                0, 0, 0, // padding
                4, // gpio pin
            ]
        );
    }

    #[test]
    fn test_size_prefix_counts_remaining_bytes() {
        let mut builder = Builder::new();
        builder.start_table().unwrap();
        let root = builder.end_table().unwrap();
        builder.finish(root, true).unwrap();

        let data = builder.finished_data().unwrap();
        assert_eq!(&data[..4], &[12, 0, 0, 0]);
        assert_eq!(data.len(), 16);
    }

    #[test]
    fn test_string_has_no_terminator_or_trailing_padding() {
        let mut builder = Builder::new();
        let name = builder.create_string("Home").unwrap();
        builder.start_table().unwrap();
        builder.add_offset(0, name).unwrap();
        let root = builder.end_table().unwrap();
        builder.finish(root, false).unwrap();

        let data = builder.finished_data().unwrap();
        assert_eq!(&data[data.len() - 8..], &[4, 0, 0, 0, b'H', b'o', b'm', b'e']);
    }

    #[test]
    fn test_grows_past_initial_capacity() {
        let mut builder = Builder::with_capacity(8);
        let long = "x".repeat(1000);
        let text = builder.create_string(&long).unwrap();
        builder.start_table().unwrap();
        builder.add_offset(0, text).unwrap();
        let root = builder.end_table().unwrap();
        builder.finish(root, false).unwrap();

        assert!(builder.finished_data().unwrap().len() > 1000);
    }

    #[test]
    fn test_force_defaults() {
        let mut builder = Builder::new();
        builder.force_defaults(true);
        builder.start_table().unwrap();
        builder.add_scalar(0, 0u8, 0).unwrap();
        let root = builder.end_table().unwrap();
        builder.finish(root, false).unwrap();

        let data = builder.finished_data().unwrap();
        // root offset, 2 bytes of padding, then a vtable declaring one slot
        assert_eq!(&data[6..8], &[6, 0]);
    }

    #[test]
    fn test_union_tag_and_payload_must_agree() {
        let mut builder = Builder::new();
        builder.start_table().unwrap();
        let child = builder.end_table().unwrap();

        builder.start_table().unwrap();
        assert_eq!(
            builder.add_union(0, 1, 0, Some(child)),
            Err(ProtocolError::InvalidEncoding("union payload without a type tag"))
        );
        assert_eq!(
            builder.add_union(0, 1, 3, None),
            Err(ProtocolError::InvalidEncoding("union type tag without a payload"))
        );
        assert!(builder.add_union(0, 1, 0, None).is_ok());
        assert!(builder.add_union(0, 1, 3, Some(child)).is_ok());
    }

    #[test]
    fn test_offsets_from_elsewhere_are_rejected() {
        let mut builder = Builder::new();
        let stale = builder.create_string("Home").unwrap();
        builder.reset();
        builder.start_table().unwrap();
        assert_eq!(
            builder.add_offset(0, stale),
            Err(ProtocolError::InvalidEncoding("offset does not refer to this buffer"))
        );

        let mut other = Builder::new();
        let foreign = other.create_string(&"x".repeat(64)).unwrap();
        let mut builder = Builder::new();
        builder.start_table().unwrap();
        let root = builder.end_table().unwrap();
        assert!(builder.create_vector_of_tables(&[root, foreign]).is_err());
        assert_eq!(
            builder.finish(foreign, false),
            Err(ProtocolError::InvalidEncoding("offset does not refer to this buffer"))
        );
    }

    #[test]
    fn test_misuse_is_rejected() {
        let mut builder = Builder::new();

        assert!(builder.add_scalar(0, 1u8, 0).is_err());
        assert!(builder.end_table().is_err());

        builder.start_table().unwrap();
        assert!(builder.start_table().is_err());
        assert!(builder.create_string("nested").is_err());
        builder.add_scalar(0, 1u8, 0).unwrap();
        assert_eq!(
            builder.add_scalar(0, 2u8, 0),
            Err(ProtocolError::InvalidEncoding("slot written twice"))
        );
        let root = builder.end_table().unwrap();

        assert!(builder.finished_data().is_err());
        builder.finish(root, false).unwrap();
        assert!(builder.start_table().is_err());

        builder.reset();
        assert!(builder.start_table().is_ok());
    }
}
