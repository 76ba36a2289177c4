//! Folding hub messages into the device state.
//!
//! Messages arrive fully decoded, so a frame that fails to decode never
//! reaches this module and the state is left as it was.

use tracing::{debug, info, warn};

use hub_core::{
    AccountLinkResultCode, DeviceState, DeviceStateStore, SetGpioResultCode, WifiNetworkEventType,
};
use hub_protocol::{HubToLocalMessage, HubToLocalPayload, UnionValue, WifiNetworkEvent};

/// Optimistic edits to the mirrored configuration, applied while the
/// matching command is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEdit {
    RfTxPin(u8),
    EstopEnabled(bool),
    EstopGpioPin(i8),
}

/// Apply an optimistic configuration edit.
pub fn apply_config_edit(state: &mut DeviceState, edit: ConfigEdit) {
    match edit {
        ConfigEdit::RfTxPin(pin) => state.set_rf_tx_pin(pin),
        ConfigEdit::EstopEnabled(enabled) => state.set_estop_enabled(enabled),
        ConfigEdit::EstopGpioPin(pin) => state.set_estop_gpio_pin(pin),
    }
}

/// Fold one hub message into the state.
///
/// Returns true if the state may have changed.
pub fn apply_hub_message(state: &mut DeviceState, message: HubToLocalMessage) -> bool {
    let payload = match message.payload {
        UnionValue::Known(payload) => payload,
        UnionValue::Unknown { tag } => {
            warn!(tag, "Ignoring hub message with unknown payload type");
            return false;
        }
        UnionValue::None => {
            debug!("Ignoring hub message without payload");
            return false;
        }
    };

    match payload {
        HubToLocalPayload::ReadyMessage(ready) => {
            info!(
                account_linked = ready.account_linked,
                connected = ready.connected_wifi.is_some(),
                "Hub ready"
            );
            state.set_connected_bssid(ready.connected_wifi.map(|network| network.bssid));
            state.set_account_linked(ready.account_linked);
            state.set_config(ready.config);
            state.set_gpio_valid_pins(ready.gpio_valid_inputs, ready.gpio_valid_outputs);
            true
        }
        HubToLocalPayload::ErrorMessage(error) => {
            warn!("Hub reported error: {}", error.message.as_deref().unwrap_or("<no message>"));
            false
        }
        HubToLocalPayload::WifiScanStatusMessage(status) => {
            debug!(status = ?status.status, "Wi-Fi scan status");
            state.set_scan_status(Some(status.status));
            true
        }
        HubToLocalPayload::WifiNetworkEvent(event) => {
            apply_network_event(state, event);
            true
        }
        HubToLocalPayload::WifiGotIpEvent(event) => {
            info!("Hub got IP {}", event.ip.as_deref().unwrap_or("<unknown>"));
            false
        }
        HubToLocalPayload::WifiLostIpEvent(event) => {
            info!("Hub lost IP {}", event.ip.as_deref().unwrap_or("<unknown>"));
            false
        }
        HubToLocalPayload::AccountLinkCommandResult(result) => {
            if result.result == AccountLinkResultCode::Success {
                info!("Account linked");
                state.set_account_linked(true);
                true
            } else {
                warn!(result = ?result.result, "Account link failed");
                false
            }
        }
        HubToLocalPayload::SetRfTxPinCommandResult(result) => {
            if result.result == SetGpioResultCode::Success {
                state.set_rf_tx_pin(result.pin);
                true
            } else {
                warn!(pin = result.pin, result = ?result.result, "Setting RF TX pin failed");
                false
            }
        }
        HubToLocalPayload::SetEstopEnabledCommandResult(result) => {
            if result.success {
                state.set_estop_enabled(result.enabled);
                true
            } else {
                warn!(enabled = result.enabled, "Changing e-stop state failed");
                false
            }
        }
        HubToLocalPayload::SetEstopPinCommandResult(result) => {
            if result.result == SetGpioResultCode::Success {
                state.set_estop_gpio_pin(result.gpio_pin);
                true
            } else {
                warn!(pin = result.gpio_pin, result = ?result.result, "Setting e-stop pin failed");
                false
            }
        }
    }
}

fn apply_network_event(state: &mut DeviceState, event: WifiNetworkEvent) {
    debug!(
        event = ?event.event_type,
        count = event.networks.len(),
        "Wi-Fi network event"
    );

    match event.event_type {
        WifiNetworkEventType::Discovered
        | WifiNetworkEventType::Updated
        | WifiNetworkEventType::Saved
        | WifiNetworkEventType::Removed => {
            for network in event.networks {
                state.upsert_network(network);
            }
        }
        WifiNetworkEventType::Lost => {
            for network in &event.networks {
                state.remove_network(&network.bssid);
            }
        }
        WifiNetworkEventType::Connected => {
            for network in event.networks {
                state.set_connected_bssid(Some(network.bssid));
                state.upsert_network(network);
            }
        }
        WifiNetworkEventType::Disconnected => {
            for network in event.networks {
                state.set_connected_bssid(None);
                state.upsert_network(network);
            }
        }
    }
}
