//! Generic table codec.
//!
//! Each message type declares which slot each of its fields lives in, via
//! [`table_schema!`]. Reading and writing is then driven by the field types
//! through [`FieldCodec`], so one code path handles every table.

use hub_core::{
    AccountLinkResultCode, Bssid, SetGpioResultCode, WifiAuthMode, WifiNetworkEventType, WifiScanStatus,
};

use crate::buffer::{Buffer, SIZE_PREFIX_LENGTH};
use crate::builder::{Builder, Offset};
use crate::error::ProtocolError;
use crate::table::Table;

/// A type stored on the wire as a table.
pub trait TableSchema: Sized {
    /// Schema name used in logs and errors.
    const NAME: &'static str;

    /// Number of slots this version of the schema declares.
    const SLOT_COUNT: u16;

    fn read(table: &Table<'_>) -> Result<Self, ProtocolError>;

    fn write(&self, builder: &mut Builder) -> Result<Offset, ProtocolError>;
}

/// How one field type is read from and written to a table slot.
///
/// Writing happens in two steps because strings, vectors and nested tables
/// must exist before the table that refers to them is started.
pub trait FieldCodec: Sized {
    /// What `prepare` leaves behind for `add_field`.
    type Prepared;

    /// Build any out-of-line data for this field.
    fn prepare(&self, builder: &mut Builder) -> Result<Self::Prepared, ProtocolError>;

    /// Add the field to the open table.
    fn add_field(&self, prepared: Self::Prepared, slot: u16, builder: &mut Builder) -> Result<(), ProtocolError>;

    /// Read the field, falling back to its default when absent.
    fn read_field(table: &Table<'_>, slot: u16) -> Result<Self, ProtocolError>;
}

macro_rules! scalar_field {
    ($($ty:ty),*) => {
        $(
            impl FieldCodec for $ty {
                type Prepared = ();

                fn prepare(&self, _builder: &mut Builder) -> Result<(), ProtocolError> {
                    Ok(())
                }

                fn add_field(&self, _: (), slot: u16, builder: &mut Builder) -> Result<(), ProtocolError> {
                    builder.add_scalar(slot, *self, <$ty>::default())
                }

                fn read_field(table: &Table<'_>, slot: u16) -> Result<Self, ProtocolError> {
                    table.get(slot, <$ty>::default())
                }
            }
        )*
    };
}

scalar_field!(u8, i8, u16, i16, u32, i32, u64, i64, bool);

macro_rules! enum_field {
    ($($ty:ident),*) => {
        $(
            impl FieldCodec for $ty {
                type Prepared = ();

                fn prepare(&self, _builder: &mut Builder) -> Result<(), ProtocolError> {
                    Ok(())
                }

                fn add_field(&self, _: (), slot: u16, builder: &mut Builder) -> Result<(), ProtocolError> {
                    builder.add_scalar(slot, *self as u8, $ty::default() as u8)
                }

                fn read_field(table: &Table<'_>, slot: u16) -> Result<Self, ProtocolError> {
                    let raw = table.get(slot, $ty::default() as u8)?;
                    $ty::try_from(raw).map_err(|value| ProtocolError::UnknownEnumValue {
                        name: stringify!($ty),
                        value,
                    })
                }
            }
        )*
    };
}

enum_field!(WifiScanStatus, WifiNetworkEventType, SetGpioResultCode, AccountLinkResultCode);

/// Auth modes are open-ended: values from newer firmware read as `Unknown`.
impl FieldCodec for WifiAuthMode {
    type Prepared = ();

    fn prepare(&self, _builder: &mut Builder) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn add_field(&self, _: (), slot: u16, builder: &mut Builder) -> Result<(), ProtocolError> {
        builder.add_scalar(slot, *self as u8, WifiAuthMode::default() as u8)
    }

    fn read_field(table: &Table<'_>, slot: u16) -> Result<Self, ProtocolError> {
        table.get(slot, WifiAuthMode::default() as u8).map(WifiAuthMode::from)
    }
}

impl FieldCodec for Option<String> {
    type Prepared = Option<Offset>;

    fn prepare(&self, builder: &mut Builder) -> Result<Option<Offset>, ProtocolError> {
        self.as_deref().map(|s| builder.create_string(s)).transpose()
    }

    fn add_field(&self, prepared: Option<Offset>, slot: u16, builder: &mut Builder) -> Result<(), ProtocolError> {
        match prepared {
            Some(offset) => builder.add_offset(slot, offset),
            None => Ok(()),
        }
    }

    fn read_field(table: &Table<'_>, slot: u16) -> Result<Self, ProtocolError> {
        Ok(table.get_str(slot)?.map(String::from))
    }
}

/// The BSSID is a 6-byte inline struct with byte alignment.
impl FieldCodec for Option<Bssid> {
    type Prepared = ();

    fn prepare(&self, _builder: &mut Builder) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn add_field(&self, _: (), slot: u16, builder: &mut Builder) -> Result<(), ProtocolError> {
        match self {
            Some(bssid) => builder.add_struct(slot, bssid.octets(), 1),
            None => Ok(()),
        }
    }

    fn read_field(table: &Table<'_>, slot: u16) -> Result<Self, ProtocolError> {
        Ok(table.get_struct::<{ Bssid::LEN }>(slot)?.map(Bssid::new))
    }
}

/// A network record always has a BSSID; an absent one reads as all zeros.
impl FieldCodec for Bssid {
    type Prepared = ();

    fn prepare(&self, _builder: &mut Builder) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn add_field(&self, _: (), slot: u16, builder: &mut Builder) -> Result<(), ProtocolError> {
        builder.add_struct(slot, self.octets(), 1)
    }

    fn read_field(table: &Table<'_>, slot: u16) -> Result<Self, ProtocolError> {
        Ok(Option::<Bssid>::read_field(table, slot)?.unwrap_or_default())
    }
}

impl FieldCodec for Vec<i8> {
    type Prepared = Option<Offset>;

    fn prepare(&self, builder: &mut Builder) -> Result<Option<Offset>, ProtocolError> {
        if self.is_empty() {
            return Ok(None);
        }
        builder.create_vector(self).map(Some)
    }

    fn add_field(&self, prepared: Option<Offset>, slot: u16, builder: &mut Builder) -> Result<(), ProtocolError> {
        match prepared {
            Some(offset) => builder.add_offset(slot, offset),
            None => Ok(()),
        }
    }

    fn read_field(table: &Table<'_>, slot: u16) -> Result<Self, ProtocolError> {
        table.get_vector(slot)
    }
}

/// Implement [`TableSchema`] for a struct from its slot layout.
///
/// Every struct field must be listed. The macro also makes the type usable
/// as a field of other tables: directly (absent reads as `Default`), as an
/// `Option`, and as a `Vec`.
///
/// ```ignore
/// table_schema!(SetEstopPinCommandResult, "SetEstopPinCommandResult", {
///     0 => gpio_pin,
///     1 => result,
/// });
/// ```
macro_rules! table_schema {
    ($ty:ident, $name:literal, { $($slot:literal => $field:ident),+ $(,)? }) => {
        impl $crate::schema::TableSchema for $ty {
            const NAME: &'static str = $name;
            const SLOT_COUNT: u16 = [$($slot),+].len() as u16;

            fn read(table: &$crate::table::Table<'_>) -> Result<Self, $crate::error::ProtocolError> {
                Ok(Self {
                    $($field: $crate::schema::FieldCodec::read_field(table, $slot)?,)+
                })
            }

            fn write(
                &self,
                builder: &mut $crate::builder::Builder,
            ) -> Result<$crate::builder::Offset, $crate::error::ProtocolError> {
                $(let $field = $crate::schema::FieldCodec::prepare(&self.$field, builder)?;)+
                builder.start_table()?;
                $($crate::schema::FieldCodec::add_field(&self.$field, $field, $slot, builder)?;)+
                builder.end_table()
            }
        }

        impl $crate::schema::FieldCodec for $ty {
            type Prepared = $crate::builder::Offset;

            fn prepare(
                &self,
                builder: &mut $crate::builder::Builder,
            ) -> Result<$crate::builder::Offset, $crate::error::ProtocolError> {
                $crate::schema::TableSchema::write(self, builder)
            }

            fn add_field(
                &self,
                prepared: $crate::builder::Offset,
                slot: u16,
                builder: &mut $crate::builder::Builder,
            ) -> Result<(), $crate::error::ProtocolError> {
                builder.add_offset(slot, prepared)
            }

            fn read_field(table: &$crate::table::Table<'_>, slot: u16) -> Result<Self, $crate::error::ProtocolError> {
                match table.get_table(slot)? {
                    Some(child) => <$ty as $crate::schema::TableSchema>::read(&child),
                    None => Ok(Self::default()),
                }
            }
        }

        impl $crate::schema::FieldCodec for Option<$ty> {
            type Prepared = Option<$crate::builder::Offset>;

            fn prepare(
                &self,
                builder: &mut $crate::builder::Builder,
            ) -> Result<Option<$crate::builder::Offset>, $crate::error::ProtocolError> {
                self.as_ref()
                    .map(|value| <$ty as $crate::schema::TableSchema>::write(value, builder))
                    .transpose()
            }

            fn add_field(
                &self,
                prepared: Option<$crate::builder::Offset>,
                slot: u16,
                builder: &mut $crate::builder::Builder,
            ) -> Result<(), $crate::error::ProtocolError> {
                match prepared {
                    Some(offset) => builder.add_offset(slot, offset),
                    None => Ok(()),
                }
            }

            fn read_field(table: &$crate::table::Table<'_>, slot: u16) -> Result<Self, $crate::error::ProtocolError> {
                table
                    .get_table(slot)?
                    .map(|child| <$ty as $crate::schema::TableSchema>::read(&child))
                    .transpose()
            }
        }

        impl $crate::schema::FieldCodec for Vec<$ty> {
            type Prepared = Option<$crate::builder::Offset>;

            fn prepare(
                &self,
                builder: &mut $crate::builder::Builder,
            ) -> Result<Option<$crate::builder::Offset>, $crate::error::ProtocolError> {
                if self.is_empty() {
                    return Ok(None);
                }
                let items = self
                    .iter()
                    .map(|item| <$ty as $crate::schema::TableSchema>::write(item, builder))
                    .collect::<Result<Vec<_>, _>>()?;
                builder.create_vector_of_tables(&items).map(Some)
            }

            fn add_field(
                &self,
                prepared: Option<$crate::builder::Offset>,
                slot: u16,
                builder: &mut $crate::builder::Builder,
            ) -> Result<(), $crate::error::ProtocolError> {
                match prepared {
                    Some(offset) => builder.add_offset(slot, offset),
                    None => Ok(()),
                }
            }

            fn read_field(table: &$crate::table::Table<'_>, slot: u16) -> Result<Self, $crate::error::ProtocolError> {
                table
                    .get_tables(slot)?
                    .iter()
                    .map(|child| <$ty as $crate::schema::TableSchema>::read(child))
                    .collect()
            }
        }
    };
}

pub(crate) use table_schema;

/// Split off a size prefix and return the message it covers.
pub fn strip_size_prefix(bytes: &[u8]) -> Result<&[u8], ProtocolError> {
    let buf = Buffer::new(bytes);
    let len = buf.read_u32(0)? as usize;
    buf.slice(SIZE_PREFIX_LENGTH, len)
}

/// Decode a standalone message whose root table is a `T`.
pub fn decode_root<T: TableSchema>(bytes: &[u8]) -> Result<T, ProtocolError> {
    let root = Table::root(Buffer::new(bytes))?;
    T::read(&root)
}

/// Encode `value` as a standalone message.
pub fn encode_root<T: TableSchema>(value: &T, size_prefixed: bool) -> Result<Vec<u8>, ProtocolError> {
    let mut builder = Builder::new();
    let root = value.write(&mut builder)?;
    builder.finish(root, size_prefixed)?;
    builder.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// First revision of a record: one field.
    #[derive(Debug, Clone, Default, PartialEq)]
    struct ProbeV1 {
        level: u8,
    }

    /// Second revision: a field appended in a new slot.
    #[derive(Debug, Clone, Default, PartialEq)]
    struct ProbeV2 {
        level: u8,
        label: Option<String>,
    }

    table_schema!(ProbeV1, "Probe", { 0 => level });
    table_schema!(ProbeV2, "Probe", { 0 => level, 1 => label });

    #[test]
    fn test_slot_count() {
        assert_eq!(ProbeV1::SLOT_COUNT, 1);
        assert_eq!(ProbeV2::SLOT_COUNT, 2);
    }

    #[test]
    fn test_new_reader_old_writer() {
        let bytes = encode_root(&ProbeV1 { level: 3 }, false).unwrap();
        let decoded: ProbeV2 = decode_root(&bytes).unwrap();
        assert_eq!(
            decoded,
            ProbeV2 {
                level: 3,
                label: None
            }
        );
    }

    #[test]
    fn test_old_reader_new_writer() {
        let bytes = encode_root(
            &ProbeV2 {
                level: 9,
                label: Some("extra".to_string()),
            },
            false,
        )
        .unwrap();
        let decoded: ProbeV1 = decode_root(&bytes).unwrap();
        assert_eq!(decoded, ProbeV1 { level: 9 });
    }

    #[test]
    fn test_defaults_are_not_written() {
        let empty = encode_root(&ProbeV2::default(), false).unwrap();
        let full = encode_root(
            &ProbeV2 {
                level: 1,
                label: Some("x".to_string()),
            },
            false,
        )
        .unwrap();
        assert!(empty.len() < full.len());
        assert_eq!(decode_root::<ProbeV2>(&empty).unwrap(), ProbeV2::default());
    }

    #[test]
    fn test_size_prefix() {
        let bytes = encode_root(&ProbeV1 { level: 3 }, true).unwrap();
        let inner = strip_size_prefix(&bytes).unwrap();
        assert_eq!(inner.len() + SIZE_PREFIX_LENGTH, bytes.len());
        assert_eq!(decode_root::<ProbeV1>(inner).unwrap(), ProbeV1 { level: 3 });

        assert!(matches!(
            strip_size_prefix(&bytes[..bytes.len() - 1]),
            Err(ProtocolError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_unknown_enum_value() {
        let mut builder = Builder::new();
        builder.start_table().unwrap();
        builder.add_scalar(0, 77u8, 0).unwrap();
        let root = builder.end_table().unwrap();
        builder.finish(root, false).unwrap();
        let bytes = builder.into_bytes().unwrap();

        let table = Table::root(Buffer::new(&bytes)).unwrap();
        assert_eq!(
            SetGpioResultCode::read_field(&table, 0),
            Err(ProtocolError::UnknownEnumValue {
                name: "SetGpioResultCode",
                value: 77
            })
        );
        assert_eq!(WifiAuthMode::read_field(&table, 0), Ok(WifiAuthMode::Unknown));
    }
}
