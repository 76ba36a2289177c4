//! # hub-core
//!
//! Core hub data model and client state projection.
//!
//! This crate provides:
//! - Data model types (Wi-Fi networks, status and result codes)
//! - BSSID parsing and formatting
//! - The hub configuration mirror
//! - In-memory device state with the derived network grouping
//!
//! This crate is intentionally runtime-agnostic and contains no async code
//! and no wire format knowledge; `hub-protocol` encodes these types.

pub mod bssid;
pub mod config;
pub mod model;
pub mod store;

pub use bssid::{Bssid, BssidError};
pub use config::{
    BackendConfig, CaptivePortalConfig, EstopConfig, HubConfig, OtaUpdateConfig, RfConfig, SerialInputConfig,
    WifiConfig, WifiCredentials,
};
pub use model::*;
pub use store::{DeviceState, DeviceStateStore};
