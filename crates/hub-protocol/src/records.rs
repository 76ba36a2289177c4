//! Wire layout of the shared domain records.
//!
//! Slot numbers are part of the protocol. New fields get new slots at the
//! end; existing slots are never renumbered or reused.

use hub_core::{
    BackendConfig, CaptivePortalConfig, EstopConfig, HubConfig, OtaUpdateConfig, RfConfig, SerialInputConfig,
    WifiConfig, WifiCredentials, WifiNetwork,
};

use crate::schema::table_schema;

table_schema!(WifiCredentials, "WiFiCredentials", {
    0 => id,
    1 => ssid,
    2 => bssid,
    3 => password,
});

table_schema!(WifiNetwork, "WifiNetwork", {
    0 => ssid,
    1 => bssid,
    2 => channel,
    3 => rssi,
    4 => auth_mode,
    5 => saved,
});

table_schema!(RfConfig, "RFConfig", {
    0 => tx_pin,
    1 => keepalive_enabled,
});

table_schema!(WifiConfig, "WifiConfig", {
    0 => ap_ssid,
    1 => hostname,
    2 => credentials,
});

table_schema!(CaptivePortalConfig, "CaptivePortalConfig", {
    0 => always_enabled,
});

table_schema!(BackendConfig, "BackendConfig", {
    0 => domain,
    1 => auth_token,
    2 => lcg_override,
});

table_schema!(SerialInputConfig, "SerialInputConfig", {
    0 => echo_enabled,
});

table_schema!(OtaUpdateConfig, "OtaUpdateConfig", {
    0 => is_enabled,
    1 => cdn_domain,
    2 => update_channel,
    3 => check_on_startup,
    4 => check_periodically,
    5 => check_interval,
    6 => allow_backend_management,
    7 => require_manual_approval,
    8 => update_id,
    9 => update_step,
});

table_schema!(EstopConfig, "EStopConfig", {
    0 => enabled,
    1 => gpio_pin,
});

table_schema!(HubConfig, "HubConfig", {
    0 => rf,
    1 => wifi,
    2 => captive_portal,
    3 => backend,
    4 => serial_input,
    5 => ota_update,
    6 => estop,
});
