//! Client-side device state.
//!
//! The store mirrors what the hub has told us: the networks its scanner
//! sees, connection and scan status, account link state and configuration.
//! Networks are keyed by BSSID; a grouped view keyed by SSID and security
//! mode is derived from them and recomputed after every network mutation,
//! so it always matches the base mapping exactly.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::bssid::Bssid;
use crate::config::HubConfig;
use crate::model::{WifiNetwork, WifiNetworkGroup, WifiScanStatus};

/// Trait for device state implementations.
pub trait DeviceStateStore: Send + Sync {
    /// Insert or replace the network with the same BSSID.
    fn upsert_network(&mut self, network: WifiNetwork);

    /// Apply `updater` to an existing network. Returns false if the BSSID is unknown.
    fn update_network(&mut self, bssid: &Bssid, updater: &mut dyn FnMut(&mut WifiNetwork)) -> bool;

    /// Remove a network, returning it if it was present.
    fn remove_network(&mut self, bssid: &Bssid) -> Option<WifiNetwork>;

    /// Forget all networks and groups.
    fn clear_networks(&mut self);

    /// All known networks by BSSID.
    fn networks(&self) -> &HashMap<Bssid, WifiNetwork>;

    /// Networks grouped by SSID and security mode.
    fn network_groups(&self) -> &BTreeMap<String, WifiNetworkGroup>;

    fn set_connected_bssid(&mut self, bssid: Option<Bssid>);

    fn connected_bssid(&self) -> Option<Bssid>;

    fn set_scan_status(&mut self, status: Option<WifiScanStatus>);

    fn scan_status(&self) -> Option<WifiScanStatus>;

    fn set_account_linked(&mut self, linked: bool);

    fn account_linked(&self) -> bool;

    /// Replace the configuration mirror.
    fn set_config(&mut self, config: Option<HubConfig>);

    fn config(&self) -> Option<&HubConfig>;
}

/// In-memory device state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    wifi_connected_bssid: Option<Bssid>,
    wifi_scan_status: Option<WifiScanStatus>,
    wifi_networks: HashMap<Bssid, WifiNetwork>,
    wifi_network_groups: BTreeMap<String, WifiNetworkGroup>,
    account_linked: bool,
    config: Option<HubConfig>,
    gpio_valid_inputs: Vec<i8>,
    gpio_valid_outputs: Vec<i8>,
}

impl DeviceState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Optimistically set the RF transmit pin. No-op until a config is known.
    pub fn set_rf_tx_pin(&mut self, pin: u8) {
        if let Some(config) = self.config.as_mut() {
            config.rf.tx_pin = pin;
        }
    }

    /// Optimistically enable or disable the e-stop. No-op until a config is known.
    pub fn set_estop_enabled(&mut self, enabled: bool) {
        if let Some(config) = self.config.as_mut() {
            config.estop.enabled = enabled;
        }
    }

    /// Optimistically set the e-stop GPIO pin. No-op until a config is known.
    pub fn set_estop_gpio_pin(&mut self, pin: i8) {
        if let Some(config) = self.config.as_mut() {
            config.estop.gpio_pin = pin;
        }
    }

    /// Set the GPIO pins the hub accepts as inputs and outputs.
    pub fn set_gpio_valid_pins(&mut self, inputs: Vec<i8>, outputs: Vec<i8>) {
        self.gpio_valid_inputs = inputs;
        self.gpio_valid_outputs = outputs;
    }

    pub fn gpio_valid_inputs(&self) -> &[i8] {
        &self.gpio_valid_inputs
    }

    pub fn gpio_valid_outputs(&self) -> &[i8] {
        &self.gpio_valid_outputs
    }

    /// Rebuild the grouped view from the network map.
    fn recompute_groups(&mut self) {
        let mut groups: BTreeMap<String, WifiNetworkGroup> = BTreeMap::new();

        for network in self.wifi_networks.values() {
            let group = groups
                .entry(network.group_key())
                .or_insert_with(|| WifiNetworkGroup::new(network.ssid.clone(), network.auth_mode));

            group.saved |= network.saved;
            insert_sorted(&mut group.networks, network.clone(), by_signal_strength);
        }

        self.wifi_network_groups = groups;
    }
}

/// Strongest signal first; ties broken by BSSID so the order is stable.
fn by_signal_strength(a: &WifiNetwork, b: &WifiNetwork) -> Ordering {
    b.rssi.cmp(&a.rssi).then_with(|| a.bssid.cmp(&b.bssid))
}

/// Insert `value` into an already sorted vector, keeping it sorted.
fn insert_sorted<T>(items: &mut Vec<T>, value: T, compare: impl Fn(&T, &T) -> Ordering) {
    let index = items.partition_point(|item| compare(item, &value) == Ordering::Less);
    items.insert(index, value);
}

impl DeviceStateStore for DeviceState {
    fn upsert_network(&mut self, network: WifiNetwork) {
        self.wifi_networks.insert(network.bssid, network);
        self.recompute_groups();
    }

    fn update_network(&mut self, bssid: &Bssid, updater: &mut dyn FnMut(&mut WifiNetwork)) -> bool {
        let Some(network) = self.wifi_networks.get_mut(bssid) else {
            return false;
        };

        updater(network);

        // The updater may have rewritten the key itself.
        if network.bssid != *bssid {
            if let Some(moved) = self.wifi_networks.remove(bssid) {
                self.wifi_networks.insert(moved.bssid, moved);
            }
        }

        self.recompute_groups();
        true
    }

    fn remove_network(&mut self, bssid: &Bssid) -> Option<WifiNetwork> {
        let removed = self.wifi_networks.remove(bssid);
        self.recompute_groups();
        removed
    }

    fn clear_networks(&mut self) {
        self.wifi_networks.clear();
        self.wifi_network_groups.clear();
    }

    fn networks(&self) -> &HashMap<Bssid, WifiNetwork> {
        &self.wifi_networks
    }

    fn network_groups(&self) -> &BTreeMap<String, WifiNetworkGroup> {
        &self.wifi_network_groups
    }

    fn set_connected_bssid(&mut self, bssid: Option<Bssid>) {
        self.wifi_connected_bssid = bssid;
    }

    fn connected_bssid(&self) -> Option<Bssid> {
        self.wifi_connected_bssid
    }

    fn set_scan_status(&mut self, status: Option<WifiScanStatus>) {
        self.wifi_scan_status = status;
    }

    fn scan_status(&self) -> Option<WifiScanStatus> {
        self.wifi_scan_status
    }

    fn set_account_linked(&mut self, linked: bool) {
        self.account_linked = linked;
    }

    fn account_linked(&self) -> bool {
        self.account_linked
    }

    fn set_config(&mut self, config: Option<HubConfig>) {
        self.config = config;
    }

    fn config(&self) -> Option<&HubConfig> {
        self.config.as_ref()
    }
}
