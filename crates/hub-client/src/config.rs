//! Client configuration.

use serde::{Deserialize, Serialize};

use hub_protocol::framer::DEFAULT_MAX_FRAME_SIZE;
use hub_protocol::Framing;

use crate::error::ClientError;

/// Configuration for the hub client.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
///
/// # Example
/// ```json
/// { "framing": "sizePrefixed", "maxFrameSize": 16384 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// How messages are delimited on the transport.
    ///
    /// `bare`: every chunk handed to the client is one message (WebSocket
    /// binary frames). `sizePrefixed`: chunks are an arbitrary byte stream of
    /// length-prefixed messages.
    pub framing: Framing,

    /// Largest accepted message in bytes.
    pub max_frame_size: usize,

    /// Capacity of the inbound event channel.
    pub event_capacity: usize,

    /// Capacity of the outbound command channel.
    pub outbound_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            framing: Framing::Bare,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            event_capacity: 256,
            outbound_capacity: 64,
        }
    }
}

impl ClientConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ClientError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ClientError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the client cannot run with.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.max_frame_size == 0 {
            return Err(ClientError::InvalidConfig("maxFrameSize must be positive".to_string()));
        }
        if self.event_capacity == 0 || self.outbound_capacity == 0 {
            return Err(ClientError::InvalidConfig("channel capacities must be positive".to_string()));
        }
        Ok(())
    }
}
