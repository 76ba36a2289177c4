//! # hub-client
//!
//! Client side of the hub link.
//!
//! Feeds bytes received from the hub through the protocol decoder into the
//! device state, publishes state snapshots, and encodes commands for the
//! transport. Opening and maintaining the transport is up to the caller.

pub mod client;
pub mod config;
pub mod error;
pub mod handler;

pub use client::{ClientEvent, HubClient, HubHandle};
pub use config::ClientConfig;
pub use error::ClientError;
pub use handler::{apply_config_edit, apply_hub_message, ConfigEdit};
pub use hub_core::{DeviceState, DeviceStateStore};
