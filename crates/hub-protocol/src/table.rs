//! Table reader.
//!
//! A table starts with a signed distance back to its vtable. The vtable lists
//! its own byte length, the table body length, then one `u16` per slot giving
//! the field's position inside the body (0 = absent). Slots past the end of
//! an older, shorter vtable read as absent, which is what lets old readers
//! and new writers (and the reverse) talk to each other.

use crate::buffer::{Buffer, Scalar, SIZE_SOFFSET, SIZE_UOFFSET};
use crate::error::ProtocolError;

/// Length of the vtable header (vtable length + object length).
const VTABLE_HEADER: usize = 4;

/// A table located in a received buffer.
#[derive(Debug, Clone, Copy)]
pub struct Table<'a> {
    buf: Buffer<'a>,
    pos: usize,
    vtable: usize,
    vtable_len: usize,
    object_size: usize,
}

impl<'a> Table<'a> {
    /// Locate the table starting at `pos` and check its vtable.
    pub fn new(buf: Buffer<'a>, pos: usize) -> Result<Self, ProtocolError> {
        let soffset = i64::from(buf.read_i32(pos)?);
        let vtable = usize::try_from(pos as i64 - soffset).map_err(|_| ProtocolError::MalformedVtable {
            offset: pos,
            reason: "vtable lies before the start of the buffer",
        })?;

        let vtable_len = buf.read_u16(vtable)? as usize;
        let object_size = buf.read_u16(vtable + 2)? as usize;

        if vtable_len < VTABLE_HEADER || vtable_len % 2 != 0 {
            return Err(ProtocolError::MalformedVtable {
                offset: vtable,
                reason: "vtable length is not a valid size",
            });
        }
        if object_size < SIZE_SOFFSET {
            return Err(ProtocolError::MalformedVtable {
                offset: vtable,
                reason: "table body is shorter than its vtable offset",
            });
        }
        if vtable + vtable_len > buf.len() {
            return Err(ProtocolError::MalformedVtable {
                offset: vtable,
                reason: "vtable runs past the end of the buffer",
            });
        }
        buf.slice(pos, object_size)?;

        Ok(Self {
            buf,
            pos,
            vtable,
            vtable_len,
            object_size,
        })
    }

    /// Locate the root table of an unprefixed message.
    pub fn root(buf: Buffer<'a>) -> Result<Self, ProtocolError> {
        let pos = buf.deref_offset(0)?;
        Self::new(buf, pos)
    }

    /// Position of the table in the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of slots declared by the writer's vtable.
    pub fn slot_count(&self) -> usize {
        (self.vtable_len - VTABLE_HEADER) / 2
    }

    /// Absolute position of the field in `slot`, if present.
    ///
    /// `size` is the inline width of the field; it must fit inside the table body.
    fn field(&self, slot: u16, size: usize) -> Result<Option<usize>, ProtocolError> {
        let entry = VTABLE_HEADER + 2 * slot as usize;
        if entry + 2 > self.vtable_len {
            return Ok(None);
        }

        let offset = self.buf.read_u16(self.vtable + entry)? as usize;
        if offset == 0 {
            return Ok(None);
        }
        if offset < SIZE_SOFFSET || offset + size > self.object_size {
            return Err(ProtocolError::MalformedVtable {
                offset: self.vtable + entry,
                reason: "field lies outside the table body",
            });
        }
        Ok(Some(self.pos + offset))
    }

    /// Whether `slot` is present in this table.
    pub fn has(&self, slot: u16) -> Result<bool, ProtocolError> {
        Ok(self.field(slot, 0)?.is_some())
    }

    /// Read a scalar field, or `default` when absent.
    pub fn get<T: Scalar>(&self, slot: u16, default: T) -> Result<T, ProtocolError> {
        match self.field(slot, T::SIZE)? {
            Some(pos) => self.buf.read(pos),
            None => Ok(default),
        }
    }

    /// Follow the offset stored in `slot`.
    fn target(&self, slot: u16) -> Result<Option<usize>, ProtocolError> {
        match self.field(slot, SIZE_UOFFSET)? {
            Some(pos) => self.buf.deref_offset(pos).map(Some),
            None => Ok(None),
        }
    }

    pub fn get_str(&self, slot: u16) -> Result<Option<&'a str>, ProtocolError> {
        match self.target(slot)? {
            Some(pos) => self.buf.read_str(pos).map(Some),
            None => Ok(None),
        }
    }

    pub fn get_table(&self, slot: u16) -> Result<Option<Table<'a>>, ProtocolError> {
        match self.target(slot)? {
            Some(pos) => Table::new(self.buf, pos).map(Some),
            None => Ok(None),
        }
    }

    /// Read an inline struct of `N` bytes.
    pub fn get_struct<const N: usize>(&self, slot: u16) -> Result<Option<[u8; N]>, ProtocolError> {
        match self.field(slot, N)? {
            Some(pos) => {
                let mut out = [0u8; N];
                out.copy_from_slice(self.buf.slice(pos, N)?);
                Ok(Some(out))
            }
            None => Ok(None),
        }
    }

    /// Read a vector of scalars; absent reads as empty.
    pub fn get_vector<T: Scalar>(&self, slot: u16) -> Result<Vec<T>, ProtocolError> {
        let Some(pos) = self.target(slot)? else {
            return Ok(Vec::new());
        };
        let (start, count) = self.buf.read_vector(pos, T::SIZE)?;
        (0..count).map(|i| self.buf.read(start + i * T::SIZE)).collect()
    }

    /// Read a vector of tables; absent reads as empty.
    pub fn get_tables(&self, slot: u16) -> Result<Vec<Table<'a>>, ProtocolError> {
        let Some(pos) = self.target(slot)? else {
            return Ok(Vec::new());
        };
        let (start, count) = self.buf.read_vector(pos, SIZE_UOFFSET)?;
        (0..count)
            .map(|i| {
                let element = self.buf.deref_offset(start + i * SIZE_UOFFSET)?;
                Table::new(self.buf, element)
            })
            .collect()
    }
}
