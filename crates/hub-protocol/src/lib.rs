//! # hub-protocol
//!
//! Hub binary message protocol.
//!
//! This crate provides:
//! - A bounds-checked buffer cursor and a back-to-front message builder
//! - The generic table codec with per-record slot layouts
//! - Tagged union dispatch and the message envelopes for both directions
//! - Encode/decode entry points and a stream framer
//!
//! Decoding never reads outside the given slice; a malformed or truncated
//! buffer is an error, never a panic.

pub mod buffer;
pub mod builder;
pub mod codec;
pub mod error;
pub mod framer;
pub mod messages;
pub mod records;
pub mod schema;
pub mod table;
pub mod union;

pub use builder::{Builder, Offset};
pub use codec::*;
pub use error::ProtocolError;
pub use framer::FrameDecoder;
pub use messages::*;
pub use schema::TableSchema;
pub use union::{UnionPayload, UnionValue};
