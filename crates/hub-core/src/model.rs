//! Hub data model types.
//!
//! These types represent the records exchanged with the hub:
//! - Wi-Fi networks seen by the hub's scanner
//! - Scan and network event status codes
//! - Result codes for GPIO and account-link commands
//!
//! Enum discriminants are the values used on the wire and must never be
//! renumbered.

use serde::{Deserialize, Serialize};

use crate::bssid::Bssid;

/// Security mode advertised by an access point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum WifiAuthMode {
    #[default]
    Open = 0,
    Wep = 1,
    WpaPsk = 2,
    Wpa2Psk = 3,
    WpaWpa2Psk = 4,
    Wpa2Enterprise = 5,
    Wpa3Psk = 6,
    Wpa2Wpa3Psk = 7,
    WapiPsk = 8,
    Unknown = 9,
}

impl WifiAuthMode {
    /// Short human-readable name, also used in network group keys.
    pub fn name(&self) -> &'static str {
        match self {
            WifiAuthMode::Open => "Open",
            WifiAuthMode::Wep => "WEP",
            WifiAuthMode::WpaPsk => "WPA",
            WifiAuthMode::Wpa2Psk => "WPA2",
            WifiAuthMode::WpaWpa2Psk => "WPA/WPA2",
            WifiAuthMode::Wpa2Enterprise => "WPA2-Enterprise",
            WifiAuthMode::Wpa3Psk => "WPA3",
            WifiAuthMode::Wpa2Wpa3Psk => "WPA2/WPA3",
            WifiAuthMode::WapiPsk => "WAPI",
            WifiAuthMode::Unknown => "Unknown",
        }
    }
}

/// Newer firmware may report modes this client does not know yet; those
/// collapse to `Unknown` instead of failing the whole scan result.
impl From<u8> for WifiAuthMode {
    fn from(value: u8) -> Self {
        match value {
            0 => WifiAuthMode::Open,
            1 => WifiAuthMode::Wep,
            2 => WifiAuthMode::WpaPsk,
            3 => WifiAuthMode::Wpa2Psk,
            4 => WifiAuthMode::WpaWpa2Psk,
            5 => WifiAuthMode::Wpa2Enterprise,
            6 => WifiAuthMode::Wpa3Psk,
            7 => WifiAuthMode::Wpa2Wpa3Psk,
            8 => WifiAuthMode::WapiPsk,
            _ => WifiAuthMode::Unknown,
        }
    }
}

/// Declares a closed wire enum with a `TryFrom<u8>` conversion.
///
/// The error value is the unrecognized discriminant.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(#[default] $default:ident = $default_value:literal,)?
            $($variant:ident = $value:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum $name {
            $(#[default] $default = $default_value,)?
            $($variant = $value,)*
        }

        impl TryFrom<u8> for $name {
            type Error = u8;

            fn try_from(value: u8) -> Result<Self, u8> {
                match value {
                    $($default_value => Ok($name::$default),)?
                    $($value => Ok($name::$variant),)*
                    other => Err(other),
                }
            }
        }
    };
}

wire_enum! {
    /// Progress of a Wi-Fi scan on the hub.
    pub enum WifiScanStatus {
        #[default] Started = 0,
        InProgress = 1,
        Completed = 2,
        TimedOut = 3,
        Aborted = 4,
        Error = 5,
    }
}

wire_enum! {
    /// What happened to the networks carried by a network event.
    pub enum WifiNetworkEventType {
        #[default] Discovered = 0,
        Updated = 1,
        Lost = 2,
        Saved = 3,
        Removed = 4,
        Connected = 5,
        Disconnected = 6,
    }
}

wire_enum! {
    /// Outcome of a command that assigns a GPIO pin.
    pub enum SetGpioResultCode {
        #[default] Success = 0,
        InvalidPin = 1,
        PinInUse = 2,
        NotSupported = 3,
        InternalError = 4,
    }
}

wire_enum! {
    /// Outcome of an account link attempt.
    pub enum AccountLinkResultCode {
        #[default] Success = 0,
        CodeRequired = 1,
        InvalidCodeLength = 2,
        NoInternetConnection = 3,
        InvalidCode = 4,
        RateLimited = 5,
        InternalError = 6,
    }
}

/// A Wi-Fi network reported by the hub's scanner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiNetwork {
    /// Network name; hidden networks have none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,

    /// Access point address, unique per network record.
    pub bssid: Bssid,

    /// Radio channel (1-14).
    pub channel: u8,

    /// Signal strength in dBm (higher is stronger).
    pub rssi: i8,

    /// Advertised security mode.
    pub auth_mode: WifiAuthMode,

    /// Whether the hub has credentials stored for this network.
    pub saved: bool,
}

impl WifiNetwork {
    /// Key of the group this network belongs to.
    ///
    /// Networks are grouped by SSID (or BSSID when the SSID is hidden) and
    /// security mode, so `Home` on WPA2 and `Home` on WPA3 stay apart.
    pub fn group_key(&self) -> String {
        match self.ssid.as_deref().filter(|s| !s.is_empty()) {
            Some(ssid) => format!("{}_{}", ssid, self.auth_mode.name()),
            None => format!("{}_{}", self.bssid, self.auth_mode.name()),
        }
    }
}

/// Networks sharing an SSID and security mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiNetworkGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,

    pub security: WifiAuthMode,

    /// True if any member network is saved.
    pub saved: bool,

    /// Members ordered by descending signal strength.
    pub networks: Vec<WifiNetwork>,
}

impl WifiNetworkGroup {
    /// Create an empty group.
    pub fn new(ssid: Option<String>, security: WifiAuthMode) -> Self {
        Self {
            ssid,
            security,
            saved: false,
            networks: Vec::new(),
        }
    }
}
