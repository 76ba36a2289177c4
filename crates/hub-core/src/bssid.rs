//! BSSID parsing and formatting.
//!
//! A BSSID is the 6-byte MAC address of a Wi-Fi access point. On the wire it
//! travels as a fixed-layout struct; everywhere else it is displayed as
//! upper-case, colon-separated hex pairs (`AA:BB:CC:DD:EE:01`).

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The MAC address of an access point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bssid([u8; Bssid::LEN]);

impl Bssid {
    /// Number of octets in a BSSID.
    pub const LEN: usize = 6;

    /// Create a BSSID from its raw octets.
    pub const fn new(octets: [u8; Self::LEN]) -> Self {
        Self(octets)
    }

    /// Get the raw octets.
    pub fn octets(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Parse a BSSID from `AA:BB:CC:DD:EE:FF` form.
    ///
    /// Both upper and lower case hex are accepted, and `-` may be used
    /// instead of `:` as the separator.
    pub fn parse(text: &str) -> Result<Self, BssidError> {
        let separator = if text.contains('-') { '-' } else { ':' };
        let parts: Vec<&str> = text.split(separator).collect();

        if parts.len() != Self::LEN {
            return Err(BssidError::WrongOctetCount(parts.len()));
        }

        let mut octets = [0u8; Self::LEN];
        for (octet, part) in octets.iter_mut().zip(parts) {
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(BssidError::InvalidOctet(part.to_string()));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| BssidError::InvalidOctet(part.to_string()))?;
        }

        Ok(Self(octets))
    }
}

impl fmt::Display for Bssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for Bssid {
    type Err = BssidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Bssid::parse(s)
    }
}

impl From<[u8; Bssid::LEN]> for Bssid {
    fn from(octets: [u8; Bssid::LEN]) -> Self {
        Self(octets)
    }
}

impl Serialize for Bssid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Bssid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Bssid::parse(&text).map_err(de::Error::custom)
    }
}

/// Errors that can occur when parsing a BSSID.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BssidError {
    #[error("expected 6 octets, found {0}")]
    WrongOctetCount(usize),

    #[error("invalid octet '{0}'")]
    InvalidOctet(String),
}
