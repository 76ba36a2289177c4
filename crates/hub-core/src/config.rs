//! Hub configuration mirror.
//!
//! The hub sends its configuration in the ready message. The UI keeps a copy
//! so that settings can be shown and optimistically edited while the
//! matching command is in flight. Nothing here is persisted; the hub owns
//! the stored configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bssid::Bssid;

/// The hub configuration as reported by the hub.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubConfig {
    /// RF transmitter settings.
    pub rf: RfConfig,

    /// Wi-Fi settings and stored credentials.
    pub wifi: WifiConfig,

    pub captive_portal: CaptivePortalConfig,

    /// Backend connection settings.
    pub backend: BackendConfig,

    pub serial_input: SerialInputConfig,

    /// Firmware update settings.
    pub ota_update: OtaUpdateConfig,

    /// Emergency stop settings.
    pub estop: EstopConfig,
}

/// RF transmitter settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfConfig {
    /// GPIO pin driving the RF transmitter.
    pub tx_pin: u8,

    /// Send keep-alive frames to known shockers.
    pub keepalive_enabled: bool,
}

/// Emergency stop settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstopConfig {
    pub enabled: bool,

    /// GPIO pin the e-stop button is wired to.
    pub gpio_pin: i8,
}

/// Captive portal settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptivePortalConfig {
    /// Keep the portal open even while connected to a network.
    pub always_enabled: bool,
}

/// Backend connection settings.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Device token for the backend (never serialized to views).
    #[serde(skip_serializing, default)]
    pub auth_token: Option<String>,

    /// Gateway to use instead of the one assigned by the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lcg_override: Option<String>,
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("domain", &self.domain)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("lcg_override", &self.lcg_override)
            .finish()
    }
}

/// Serial console settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialInputConfig {
    pub echo_enabled: bool,
}

/// Firmware update settings.
///
/// `update_channel` and `update_step` are carried as raw wire values; the UI
/// only displays them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtaUpdateConfig {
    pub is_enabled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdn_domain: Option<String>,

    pub update_channel: u8,

    pub check_on_startup: bool,

    pub check_periodically: bool,

    /// Minutes between periodic checks.
    pub check_interval: u16,

    pub allow_backend_management: bool,

    pub require_manual_approval: bool,

    /// Identifier of the update in progress.
    pub update_id: i32,

    pub update_step: u8,
}

/// Wi-Fi settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiConfig {
    /// SSID prefix of the hub's own access point.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ap_ssid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Stored network credentials.
    pub credentials: Vec<WifiCredentials>,
}

/// Credentials for one stored network.
///
/// Every field is optional: an absent SSID in an update means "leave
/// unchanged", and the BSSID is only needed to pick between access points
/// sharing an SSID.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiCredentials {
    /// Credential slot on the hub.
    pub id: u8,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bssid: Option<Bssid>,

    /// Network password (never serialized to views).
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
}

impl fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("id", &self.id)
            .field("ssid", &self.ssid)
            .field("bssid", &self.bssid)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
