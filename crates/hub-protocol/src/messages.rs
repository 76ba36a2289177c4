//! Protocol message types.
//!
//! This module defines all messages exchanged with the hub:
//! - Local → Hub: Wi-Fi, account and GPIO commands
//! - Hub → Local: the ready message, events and command results
//!
//! Each direction is an envelope table whose payload is a tagged union.
//! Payload tags are part of the protocol and must never be renumbered.

use std::fmt;

use hub_core::{
    AccountLinkResultCode, HubConfig, SetGpioResultCode, WifiNetwork, WifiNetworkEventType, WifiScanStatus,
};
use serde::{Deserialize, Serialize};

use crate::builder::{Builder, Offset};
use crate::error::ProtocolError;
use crate::schema::{table_schema, TableSchema};
use crate::table::Table;
use crate::union::{prepare_union, read_union, union_payload, UnionValue};

/// Envelope slot holding the payload type tag.
pub const PAYLOAD_TYPE_SLOT: u16 = 0;

/// Envelope slot holding the payload offset.
pub const PAYLOAD_SLOT: u16 = 1;

// ============================================================================
// Local → Hub commands
// ============================================================================

/// Start (or stop) a Wi-Fi scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiScanCommand {
    pub run: bool,
}

/// Store credentials for a network, optionally connecting right away.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiNetworkSaveCommand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    pub connect: bool,
}

impl fmt::Debug for WifiNetworkSaveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiNetworkSaveCommand")
            .field("ssid", &self.ssid)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connect", &self.connect)
            .finish()
    }
}

/// Delete stored credentials for a network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiNetworkForgetCommand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
}

/// Connect to a saved network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiNetworkConnectCommand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
}

/// Disconnect from the current network.
///
/// Carries no data; the field exists because tables need at least one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiNetworkDisconnectCommand {
    pub placeholder: bool,
}

/// Link the hub to an account using a pairing code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountLinkCommand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Unlink the hub from its account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUnlinkCommand {
    pub placeholder: bool,
}

/// Move the RF transmitter to another GPIO pin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRfTxPinCommand {
    pub pin: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetEstopEnabledCommand {
    pub enabled: bool,
}

/// Move the e-stop input to another GPIO pin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetEstopPinCommand {
    pub pin: i8,
}

table_schema!(WifiScanCommand, "WifiScanCommand", { 0 => run });
table_schema!(WifiNetworkSaveCommand, "WifiNetworkSaveCommand", {
    0 => ssid,
    1 => password,
    2 => connect,
});
table_schema!(WifiNetworkForgetCommand, "WifiNetworkForgetCommand", { 0 => ssid });
table_schema!(WifiNetworkConnectCommand, "WifiNetworkConnectCommand", { 0 => ssid });
table_schema!(WifiNetworkDisconnectCommand, "WifiNetworkDisconnectCommand", { 0 => placeholder });
table_schema!(AccountLinkCommand, "AccountLinkCommand", { 0 => code });
table_schema!(AccountUnlinkCommand, "AccountUnlinkCommand", { 0 => placeholder });
table_schema!(SetRfTxPinCommand, "SetRfTxPinCommand", { 0 => pin });
table_schema!(SetEstopEnabledCommand, "SetEstopEnabledCommand", { 0 => enabled });
table_schema!(SetEstopPinCommand, "SetEstopPinCommand", { 0 => pin });

// ============================================================================
// Hub → Local messages
// ============================================================================

/// Sent by the hub once a session is established.
///
/// Carries everything the UI needs to render its initial state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyMessage {
    /// Always true; a liveness marker.
    pub poggies: bool,

    /// Network the hub is currently connected to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_wifi: Option<WifiNetwork>,

    pub account_linked: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<HubConfig>,

    /// GPIO pins usable as inputs on this board.
    pub gpio_valid_inputs: Vec<i8>,

    /// GPIO pins usable as outputs on this board.
    pub gpio_valid_outputs: Vec<i8>,
}

/// An error reported by the hub.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiScanStatusMessage {
    pub status: WifiScanStatus,
}

/// A change affecting one or more scanned networks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiNetworkEvent {
    pub event_type: WifiNetworkEventType,
    pub networks: Vec<WifiNetwork>,
}

/// The hub obtained an IP address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiGotIpEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

/// The hub lost its IP address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiLostIpEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountLinkCommandResult {
    pub result: AccountLinkResultCode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRfTxPinCommandResult {
    pub pin: u8,
    pub result: SetGpioResultCode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetEstopEnabledCommandResult {
    pub enabled: bool,
    pub success: bool,
}

/// Outcome of a [`SetEstopPinCommand`].
///
/// # Example
/// ```json
/// { "gpioPin": 4, "result": "Success" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetEstopPinCommandResult {
    pub gpio_pin: i8,
    pub result: SetGpioResultCode,
}

table_schema!(ReadyMessage, "HubReadyMessage", {
    0 => poggies,
    1 => connected_wifi,
    2 => account_linked,
    3 => config,
    4 => gpio_valid_inputs,
    5 => gpio_valid_outputs,
});
table_schema!(ErrorMessage, "ErrorMessage", { 0 => message });
table_schema!(WifiScanStatusMessage, "WifiScanStatusMessage", { 0 => status });
table_schema!(WifiNetworkEvent, "WifiNetworkEvent", {
    0 => event_type,
    1 => networks,
});
table_schema!(WifiGotIpEvent, "WifiGotIpEvent", { 0 => ip });
table_schema!(WifiLostIpEvent, "WifiLostIpEvent", { 0 => ip });
table_schema!(AccountLinkCommandResult, "AccountLinkCommandResult", { 0 => result });
table_schema!(SetRfTxPinCommandResult, "SetRfTxPinCommandResult", {
    0 => pin,
    1 => result,
});
table_schema!(SetEstopEnabledCommandResult, "SetEstopEnabledCommandResult", {
    0 => enabled,
    1 => success,
});
table_schema!(SetEstopPinCommandResult, "SetEstopPinCommandResult", {
    0 => gpio_pin,
    1 => result,
});

// ============================================================================
// Payload unions
// ============================================================================

union_payload! {
    /// Commands sent to the hub.
    pub enum LocalToHubPayload ("LocalToHubMessagePayload") {
        WifiScanCommand(WifiScanCommand) = 1,
        WifiNetworkSaveCommand(WifiNetworkSaveCommand) = 2,
        WifiNetworkForgetCommand(WifiNetworkForgetCommand) = 3,
        WifiNetworkConnectCommand(WifiNetworkConnectCommand) = 4,
        WifiNetworkDisconnectCommand(WifiNetworkDisconnectCommand) = 5,
        AccountLinkCommand(AccountLinkCommand) = 6,
        AccountUnlinkCommand(AccountUnlinkCommand) = 7,
        SetRfTxPinCommand(SetRfTxPinCommand) = 8,
        SetEstopEnabledCommand(SetEstopEnabledCommand) = 9,
        SetEstopPinCommand(SetEstopPinCommand) = 10,
    }
}

union_payload! {
    /// Messages sent by the hub.
    pub enum HubToLocalPayload ("HubToLocalMessagePayload") {
        ReadyMessage(ReadyMessage) = 1,
        ErrorMessage(ErrorMessage) = 2,
        WifiScanStatusMessage(WifiScanStatusMessage) = 3,
        WifiNetworkEvent(WifiNetworkEvent) = 4,
        WifiGotIpEvent(WifiGotIpEvent) = 5,
        WifiLostIpEvent(WifiLostIpEvent) = 6,
        AccountLinkCommandResult(AccountLinkCommandResult) = 7,
        SetRfTxPinCommandResult(SetRfTxPinCommandResult) = 8,
        SetEstopEnabledCommandResult(SetEstopEnabledCommandResult) = 9,
        SetEstopPinCommandResult(SetEstopPinCommandResult) = 10,
    }
}

// ============================================================================
// Envelopes
// ============================================================================

/// A message from the local client to the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalToHubMessage {
    pub payload: UnionValue<LocalToHubPayload>,
}

/// A message from the hub to the local client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubToLocalMessage {
    pub payload: UnionValue<HubToLocalPayload>,
}

impl LocalToHubMessage {
    pub fn new(payload: impl Into<LocalToHubPayload>) -> Self {
        Self {
            payload: UnionValue::Known(payload.into()),
        }
    }
}

impl HubToLocalMessage {
    pub fn new(payload: impl Into<HubToLocalPayload>) -> Self {
        Self {
            payload: UnionValue::Known(payload.into()),
        }
    }
}

macro_rules! envelope_schema {
    ($ty:ident, $name:literal) => {
        impl TableSchema for $ty {
            const NAME: &'static str = $name;
            const SLOT_COUNT: u16 = 2;

            fn read(table: &Table<'_>) -> Result<Self, ProtocolError> {
                Ok(Self {
                    payload: read_union(table, PAYLOAD_TYPE_SLOT, PAYLOAD_SLOT)?,
                })
            }

            fn write(&self, builder: &mut Builder) -> Result<Offset, ProtocolError> {
                let (tag, payload) = prepare_union(&self.payload, builder)?;
                builder.start_table()?;
                builder.add_union(PAYLOAD_TYPE_SLOT, PAYLOAD_SLOT, tag, payload)?;
                builder.end_table()
            }
        }
    };
}

envelope_schema!(LocalToHubMessage, "LocalToHubMessage");
envelope_schema!(HubToLocalMessage, "HubToLocalMessage");
