//! Message codec for the hub protocol.
//!
//! Messages travel as binary envelopes, either bare (root offset at byte 0)
//! or size-prefixed (a `u32` length in front). This module provides the
//! encode and decode entry points for both directions.

use serde::{Deserialize, Serialize};

use crate::builder::Builder;
use crate::error::ProtocolError;
use crate::messages::*;
use crate::schema::{decode_root, strip_size_prefix, TableSchema};
use crate::union::UnionVariant;

/// How a message root is laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Framing {
    /// Root offset at byte 0.
    #[default]
    Bare,
    /// A `u32` byte count, then the bare message.
    SizePrefixed,
}

impl Framing {
    pub fn is_size_prefixed(self) -> bool {
        self == Framing::SizePrefixed
    }
}

fn unframe(bytes: &[u8], framing: Framing) -> Result<&[u8], ProtocolError> {
    match framing {
        Framing::Bare => Ok(bytes),
        Framing::SizePrefixed => strip_size_prefix(bytes),
    }
}

fn encode_message<T: TableSchema>(message: &T, framing: Framing) -> Result<Vec<u8>, ProtocolError> {
    let mut builder = Builder::new();
    let root = message.write(&mut builder)?;
    builder.finish(root, framing.is_size_prefixed())?;
    builder.into_bytes()
}

/// Wrap one payload table in its envelope without cloning it into the union.
fn encode_variant<U, T: UnionVariant<U>>(payload: &T, framing: Framing) -> Result<Vec<u8>, ProtocolError> {
    let mut builder = Builder::new();
    let payload = payload.write(&mut builder)?;
    builder.start_table()?;
    builder.add_union(PAYLOAD_TYPE_SLOT, PAYLOAD_SLOT, T::TAG, Some(payload))?;
    let root = builder.end_table()?;
    builder.finish(root, framing.is_size_prefixed())?;
    builder.into_bytes()
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode a message received by the hub.
pub fn decode_local_to_hub(bytes: &[u8]) -> Result<LocalToHubMessage, ProtocolError> {
    decode_root(bytes)
}

/// Decode a size-prefixed message received by the hub.
pub fn decode_local_to_hub_size_prefixed(bytes: &[u8]) -> Result<LocalToHubMessage, ProtocolError> {
    decode_root(strip_size_prefix(bytes)?)
}

/// Decode a message sent by the hub.
pub fn decode_hub_to_local(bytes: &[u8]) -> Result<HubToLocalMessage, ProtocolError> {
    decode_root(bytes)
}

/// Decode a size-prefixed message sent by the hub.
pub fn decode_hub_to_local_size_prefixed(bytes: &[u8]) -> Result<HubToLocalMessage, ProtocolError> {
    decode_root(strip_size_prefix(bytes)?)
}

/// Decode a message sent by the hub using the given framing.
pub fn decode_hub_to_local_framed(bytes: &[u8], framing: Framing) -> Result<HubToLocalMessage, ProtocolError> {
    decode_root(unframe(bytes, framing)?)
}

/// Decode a message received by the hub using the given framing.
pub fn decode_local_to_hub_framed(bytes: &[u8], framing: Framing) -> Result<LocalToHubMessage, ProtocolError> {
    decode_root(unframe(bytes, framing)?)
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode a message for the hub.
pub fn encode_local_to_hub(message: &LocalToHubMessage, framing: Framing) -> Result<Vec<u8>, ProtocolError> {
    encode_message(message, framing)
}

/// Encode a message as the hub would send it.
pub fn encode_hub_to_local(message: &HubToLocalMessage, framing: Framing) -> Result<Vec<u8>, ProtocolError> {
    encode_message(message, framing)
}

macro_rules! variant_encoders {
    ($union:ident { $($fn_name:ident => $payload:ident,)+ }) => {
        $(
            #[doc = concat!("Encode a [`", stringify!($payload), "`] in its envelope.")]
            pub fn $fn_name(payload: &$payload, framing: Framing) -> Result<Vec<u8>, ProtocolError> {
                encode_variant::<$union, $payload>(payload, framing)
            }
        )+
    };
}

variant_encoders!(LocalToHubPayload {
    encode_wifi_scan_command => WifiScanCommand,
    encode_wifi_network_save_command => WifiNetworkSaveCommand,
    encode_wifi_network_forget_command => WifiNetworkForgetCommand,
    encode_wifi_network_connect_command => WifiNetworkConnectCommand,
    encode_wifi_network_disconnect_command => WifiNetworkDisconnectCommand,
    encode_account_link_command => AccountLinkCommand,
    encode_account_unlink_command => AccountUnlinkCommand,
    encode_set_rf_tx_pin_command => SetRfTxPinCommand,
    encode_set_estop_enabled_command => SetEstopEnabledCommand,
    encode_set_estop_pin_command => SetEstopPinCommand,
});

variant_encoders!(HubToLocalPayload {
    encode_ready_message => ReadyMessage,
    encode_error_message => ErrorMessage,
    encode_wifi_scan_status_message => WifiScanStatusMessage,
    encode_wifi_network_event => WifiNetworkEvent,
    encode_wifi_got_ip_event => WifiGotIpEvent,
    encode_wifi_lost_ip_event => WifiLostIpEvent,
    encode_account_link_command_result => AccountLinkCommandResult,
    encode_set_rf_tx_pin_command_result => SetRfTxPinCommandResult,
    encode_set_estop_enabled_command_result => SetEstopEnabledCommandResult,
    encode_set_estop_pin_command_result => SetEstopPinCommandResult,
});
