//! Tagged union payloads.
//!
//! A union takes two adjacent slots in its parent table: a `u8` type tag and
//! the offset of the payload table. Tag 0 means "no payload". Tags this
//! build does not know are surfaced as [`UnionValue::Unknown`] without
//! touching the payload, since its layout cannot be known.

use serde::{Deserialize, Serialize};

use crate::builder::{Builder, Offset};
use crate::error::ProtocolError;
use crate::schema::TableSchema;
use crate::table::Table;

/// A decoded union field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnionValue<P> {
    /// Tag 0.
    None,
    Known(P),
    /// A tag added by a newer peer.
    Unknown { tag: u8 },
}

impl<P: UnionPayload> UnionValue<P> {
    /// Wire tag of this value.
    pub fn tag(&self) -> u8 {
        match self {
            UnionValue::None => 0,
            UnionValue::Known(payload) => payload.tag(),
            UnionValue::Unknown { tag } => *tag,
        }
    }

    /// The payload, treating an unknown tag as an error.
    pub fn into_known(self) -> Result<Option<P>, ProtocolError> {
        match self {
            UnionValue::None => Ok(None),
            UnionValue::Known(payload) => Ok(Some(payload)),
            UnionValue::Unknown { tag } => Err(ProtocolError::UnknownUnionTag { union: P::NAME, tag }),
        }
    }

    pub fn as_known(&self) -> Option<&P> {
        match self {
            UnionValue::Known(payload) => Some(payload),
            _ => None,
        }
    }
}

impl<P> From<P> for UnionValue<P> {
    fn from(payload: P) -> Self {
        UnionValue::Known(payload)
    }
}

/// The set of payload tables a union can carry.
pub trait UnionPayload: Sized {
    /// Union name used in errors and logs.
    const NAME: &'static str;

    /// Whether `tag` names a variant this build can decode.
    fn is_known_tag(tag: u8) -> bool;

    /// Wire tag of this variant (never 0).
    fn tag(&self) -> u8;

    /// Decode the payload table of a known `tag`.
    fn read_variant(tag: u8, table: &Table<'_>) -> Result<Self, ProtocolError>;

    /// Build the payload table and return its offset.
    fn write_variant(&self, builder: &mut Builder) -> Result<Offset, ProtocolError>;
}

/// A payload table that is one variant of union `U`.
pub trait UnionVariant<U>: TableSchema {
    /// Wire tag of the variant.
    const TAG: u8;
}

/// Read the union stored in `type_slot` / `value_slot` of `table`.
pub fn read_union<P: UnionPayload>(
    table: &Table<'_>,
    type_slot: u16,
    value_slot: u16,
) -> Result<UnionValue<P>, ProtocolError> {
    let tag: u8 = table.get(type_slot, 0)?;
    if tag == 0 {
        return Ok(UnionValue::None);
    }
    if !P::is_known_tag(tag) {
        return Ok(UnionValue::Unknown { tag });
    }

    let payload = table
        .get_table(value_slot)?
        .ok_or(ProtocolError::MissingUnionPayload { union: P::NAME, tag })?;
    P::read_variant(tag, &payload).map(UnionValue::Known)
}

/// Build the payload of `value`; returns the tag and payload offset to add
/// to the parent table with [`Builder::add_union`].
pub fn prepare_union<P: UnionPayload>(
    value: &UnionValue<P>,
    builder: &mut Builder,
) -> Result<(u8, Option<Offset>), ProtocolError> {
    match value {
        UnionValue::None => Ok((0, None)),
        UnionValue::Known(payload) => Ok((payload.tag(), Some(payload.write_variant(builder)?))),
        UnionValue::Unknown { .. } => Err(ProtocolError::InvalidEncoding("cannot encode an unknown union variant")),
    }
}

/// Declares a union payload enum whose variants each wrap one table type.
///
/// Generates the enum, its [`UnionPayload`] impl, `From` conversions from
/// each payload type and the [`UnionVariant`] tag of each payload type.
macro_rules! union_payload {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($union_name:literal) {
            $($(#[$vmeta:meta])* $variant:ident($payload:ident) = $tag:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(tag = "type", rename_all = "camelCase")]
        pub enum $name {
            $($(#[$vmeta])* $variant($payload),)+
        }

        impl $crate::union::UnionPayload for $name {
            const NAME: &'static str = $union_name;

            fn is_known_tag(tag: u8) -> bool {
                matches!(tag, $($tag)|+)
            }

            fn tag(&self) -> u8 {
                match self {
                    $($name::$variant(_) => $tag,)+
                }
            }

            fn read_variant(
                tag: u8,
                table: &$crate::table::Table<'_>,
            ) -> Result<Self, $crate::error::ProtocolError> {
                match tag {
                    $($tag => <$payload as $crate::schema::TableSchema>::read(table).map($name::$variant),)+
                    tag => Err($crate::error::ProtocolError::UnknownUnionTag { union: $union_name, tag }),
                }
            }

            fn write_variant(
                &self,
                builder: &mut $crate::builder::Builder,
            ) -> Result<$crate::builder::Offset, $crate::error::ProtocolError> {
                match self {
                    $($name::$variant(payload) => $crate::schema::TableSchema::write(payload, builder),)+
                }
            }
        }

        $(
            impl From<$payload> for $name {
                fn from(payload: $payload) -> Self {
                    $name::$variant(payload)
                }
            }

            impl $crate::union::UnionVariant<$name> for $payload {
                const TAG: u8 = $tag;
            }
        )+
    };
}

pub(crate) use union_payload;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use crate::schema::table_schema;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct Ping {
        pub seq: u32,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct Note {
        pub text: Option<String>,
    }

    table_schema!(Ping, "Ping", { 0 => seq });
    table_schema!(Note, "Note", { 0 => text });

    union_payload! {
        pub enum Probe ("Probe") {
            Ping(Ping) = 1,
            Note(Note) = 2,
        }
    }

    fn envelope(tag: u8, with_payload: bool) -> Vec<u8> {
        let mut builder = Builder::new();
        let payload = if with_payload {
            Some(Ping { seq: 5 }.write(&mut builder).unwrap())
        } else {
            None
        };
        builder.start_table().unwrap();
        builder.force_defaults(true);
        builder.add_scalar(0, tag, 0).unwrap();
        builder.force_defaults(false);
        if let Some(payload) = payload {
            builder.add_offset(1, payload).unwrap();
        }
        let root = builder.end_table().unwrap();
        builder.finish(root, false).unwrap();
        builder.into_bytes().unwrap()
    }

    fn read(bytes: &[u8]) -> Result<UnionValue<Probe>, ProtocolError> {
        let table = Table::root(Buffer::new(bytes))?;
        read_union(&table, 0, 1)
    }

    #[test]
    fn test_dispatch_known_tag() {
        let value = read(&envelope(1, true)).unwrap();
        assert_eq!(value, UnionValue::Known(Probe::Ping(Ping { seq: 5 })));
        assert_eq!(value.tag(), 1);
    }

    #[test]
    fn test_unknown_tag_is_not_dispatched() {
        let value = read(&envelope(42, true)).unwrap();
        assert_eq!(value, UnionValue::Unknown { tag: 42 });
        assert_eq!(
            value.into_known(),
            Err(ProtocolError::UnknownUnionTag { union: "Probe", tag: 42 })
        );
    }

    #[test]
    fn test_tag_zero_ignores_offset() {
        assert_eq!(read(&envelope(0, true)).unwrap(), UnionValue::None);
        assert_eq!(read(&envelope(0, false)).unwrap().into_known(), Ok(None));
    }

    #[test]
    fn test_known_tag_without_payload() {
        assert_eq!(
            read(&envelope(2, false)),
            Err(ProtocolError::MissingUnionPayload { union: "Probe", tag: 2 })
        );
    }

    #[test]
    fn test_variant_tags() {
        assert_eq!(<Ping as UnionVariant<Probe>>::TAG, 1);
        assert_eq!(<Note as UnionVariant<Probe>>::TAG, 2);
    }

    #[test]
    fn test_prepare_union() {
        let mut builder = Builder::new();
        let note: UnionValue<Probe> = Probe::from(Note { text: None }).into();
        let (tag, offset) = prepare_union(&note, &mut builder).unwrap();
        assert_eq!(tag, 2);
        assert!(offset.is_some());

        assert_eq!(prepare_union(&UnionValue::<Probe>::None, &mut builder).unwrap(), (0, None));
        assert!(matches!(
            prepare_union(&UnionValue::<Probe>::Unknown { tag: 9 }, &mut builder),
            Err(ProtocolError::InvalidEncoding(_))
        ));
    }
}
