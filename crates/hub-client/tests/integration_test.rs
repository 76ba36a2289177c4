//! Integration tests for the hub client.
//!
//! These tests run an actual client task and feed it encoded hub messages
//! through its event channel, the way a transport would.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use hub_client::{ClientConfig, ClientEvent, DeviceState, DeviceStateStore, HubClient, HubHandle};
use hub_core::{Bssid, EstopConfig, HubConfig, RfConfig, SetGpioResultCode, WifiAuthMode, WifiNetwork, WifiNetworkEventType};
use hub_protocol::{
    decode_local_to_hub, decode_local_to_hub_size_prefixed, encode_ready_message,
    encode_set_estop_pin_command_result, encode_wifi_network_event, Framing, LocalToHubMessage,
    LocalToHubPayload, ReadyMessage, SetEstopPinCommand, SetEstopPinCommandResult, UnionValue,
    WifiNetworkEvent, WifiScanCommand,
};

struct TestClient {
    events: mpsc::Sender<ClientEvent>,
    outbound: mpsc::Receiver<Bytes>,
    state: watch::Receiver<DeviceState>,
    handle: HubHandle,
    task: tokio::task::JoinHandle<()>,
}

/// Start a client task with the given framing.
fn start_client(framing: Framing) -> TestClient {
    let config = ClientConfig {
        framing,
        ..Default::default()
    };
    let (client, outbound) = HubClient::new(config).unwrap();
    let events = client.event_sender();
    let state = client.subscribe();
    let handle = client.handle();

    let task = tokio::spawn(async move {
        client.run().await.unwrap();
    });

    TestClient {
        events,
        outbound,
        state,
        handle,
        task,
    }
}

impl TestClient {
    async fn send_bytes(&self, bytes: Vec<u8>) {
        self.events.send(ClientEvent::Received(Bytes::from(bytes))).await.unwrap();
    }

    /// Wait for the next published snapshot.
    async fn next_state(&mut self) -> DeviceState {
        timeout(Duration::from_secs(5), self.state.changed())
            .await
            .expect("Timed out waiting for state")
            .unwrap();
        self.state.borrow_and_update().clone()
    }

    async fn next_outbound(&mut self) -> Bytes {
        timeout(Duration::from_secs(5), self.outbound.recv())
            .await
            .expect("Timed out waiting for command")
            .expect("Outbound channel closed")
    }
}

fn network(last: u8, ssid: &str, rssi: i8) -> WifiNetwork {
    WifiNetwork {
        ssid: Some(ssid.to_string()),
        bssid: Bssid::new([0x10, 0x20, 0x30, 0x40, 0x50, last]),
        channel: 6,
        rssi,
        auth_mode: WifiAuthMode::Wpa2Psk,
        saved: false,
    }
}

fn ready() -> ReadyMessage {
    ReadyMessage {
        poggies: true,
        connected_wifi: None,
        account_linked: true,
        config: Some(HubConfig {
            rf: RfConfig {
                tx_pin: 15,
                keepalive_enabled: true,
            },
            estop: EstopConfig {
                enabled: true,
                gpio_pin: 13,
            },
            ..Default::default()
        }),
        gpio_valid_inputs: vec![4, 13],
        gpio_valid_outputs: vec![15],
    }
}

#[tokio::test]
async fn test_ready_updates_snapshot() {
    let mut client = start_client(Framing::Bare);

    client.send_bytes(encode_ready_message(&ready(), Framing::Bare).unwrap()).await;
    let state = client.next_state().await;

    assert!(state.account_linked());
    assert_eq!(state.config().map(|c| c.estop.gpio_pin), Some(13));
    assert_eq!(state.gpio_valid_inputs(), &[4, 13]);
    assert_eq!(client.handle.state(), state);
}

#[tokio::test]
async fn test_home_wpa2_grouping() {
    let mut client = start_client(Framing::Bare);

    let event = WifiNetworkEvent {
        event_type: WifiNetworkEventType::Discovered,
        networks: vec![network(1, "Home", -70), network(2, "Home", -45), network(3, "Cafe", -60)],
    };
    client.send_bytes(encode_wifi_network_event(&event, Framing::Bare).unwrap()).await;
    let state = client.next_state().await;

    let home = &state.network_groups()["Home_WPA2"];
    assert_eq!(home.ssid.as_deref(), Some("Home"));
    let rssi: Vec<i8> = home.networks.iter().map(|n| n.rssi).collect();
    assert_eq!(rssi, vec![-45, -70]);
    assert_eq!(state.network_groups().len(), 2);

    let json = serde_json::to_value(&state).unwrap();
    assert_eq!(json["wifiNetworkGroups"]["Home_WPA2"]["networks"][0]["rssi"], -45);
}

#[tokio::test]
async fn test_bad_frame_leaves_state_unchanged() {
    let mut client = start_client(Framing::Bare);

    client.send_bytes(encode_ready_message(&ready(), Framing::Bare).unwrap()).await;
    let before = client.next_state().await;

    // Truncated and garbage messages are dropped without publishing.
    let mut truncated = encode_ready_message(&ready(), Framing::Bare).unwrap();
    truncated.truncate(truncated.len() / 2);
    client.send_bytes(truncated).await;
    client.send_bytes(vec![0xff; 3]).await;

    let result = SetEstopPinCommandResult {
        gpio_pin: 4,
        result: SetGpioResultCode::Success,
    };
    client
        .send_bytes(encode_set_estop_pin_command_result(&result, Framing::Bare).unwrap())
        .await;
    let after = client.next_state().await;

    assert_eq!(before.config().map(|c| c.estop.gpio_pin), Some(13));
    assert_eq!(after.config().map(|c| c.estop.gpio_pin), Some(4));
    assert_eq!(after.account_linked(), before.account_linked());
}

#[tokio::test]
async fn test_size_prefixed_stream_in_chunks() {
    let mut client = start_client(Framing::SizePrefixed);

    let mut stream = encode_ready_message(&ready(), Framing::SizePrefixed).unwrap();
    let event = WifiNetworkEvent {
        event_type: WifiNetworkEventType::Connected,
        networks: vec![network(7, "Home", -50)],
    };
    stream.extend(encode_wifi_network_event(&event, Framing::SizePrefixed).unwrap());

    for chunk in stream.chunks(5) {
        client.send_bytes(chunk.to_vec()).await;
    }

    let state = loop {
        let state = client.next_state().await;
        if state.connected_bssid().is_some() {
            break state;
        }
    };
    assert_eq!(state.connected_bssid(), Some(network(7, "Home", -50).bssid));
    assert!(state.config().is_some());
    assert_eq!(state.networks().len(), 1);
}

#[tokio::test]
async fn test_commands_are_encoded() {
    let mut client = start_client(Framing::Bare);

    client.handle.send(WifiScanCommand { run: true }).await.unwrap();
    let bytes = client.next_outbound().await;
    assert_eq!(
        decode_local_to_hub(&bytes).unwrap(),
        LocalToHubMessage::new(WifiScanCommand { run: true })
    );
}

#[tokio::test]
async fn test_optimistic_config_edit() {
    let mut client = start_client(Framing::SizePrefixed);

    client.send_bytes(encode_ready_message(&ready(), Framing::SizePrefixed).unwrap()).await;
    client.next_state().await;

    client.handle.set_estop_pin(5).await.unwrap();

    let bytes = client.next_outbound().await;
    let message = decode_local_to_hub_size_prefixed(&bytes).unwrap();
    assert_eq!(
        message.payload,
        UnionValue::Known(LocalToHubPayload::SetEstopPinCommand(SetEstopPinCommand { pin: 5 }))
    );

    let state = client.next_state().await;
    assert_eq!(state.config().map(|c| c.estop.gpio_pin), Some(5));
}

#[tokio::test]
async fn test_run_stops_when_senders_dropped() {
    let client = start_client(Framing::Bare);
    let TestClient {
        events, handle, task, ..
    } = client;

    drop(events);
    drop(handle);

    timeout(Duration::from_secs(5), task)
        .await
        .expect("Client did not stop")
        .unwrap();
}

#[test]
fn test_zero_capacity_rejected() {
    let config = ClientConfig {
        outbound_capacity: 0,
        ..Default::default()
    };
    assert!(HubClient::new(config).is_err());
}
