//! Client errors.

use hub_protocol::ProtocolError;
use thiserror::Error;

/// Errors returned by the hub client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Encoding or decoding a message failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The other end of a channel has gone away.
    #[error("{0} channel closed")]
    ChannelClosed(&'static str),

    /// The configuration cannot be used.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}
