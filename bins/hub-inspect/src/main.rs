//! Command line inspector for hub link captures.
//!
//! Commands:
//! - `decode <capture>` - print every message in a capture as JSON
//! - `replay <capture>` - feed a capture of hub messages through the client
//!   and print the resulting device state

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use hub_client::{ClientConfig, ClientEvent, DeviceState, DeviceStateStore, HubClient};
use hub_protocol::{decode_hub_to_local, decode_local_to_hub, FrameDecoder, Framing};

#[derive(Parser)]
#[command(name = "hub-inspect")]
#[command(about = "Decode and replay hub link captures")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Client configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every message in a capture as JSON
    Decode {
        /// Capture file
        capture: PathBuf,

        /// Which side sent the messages
        #[arg(short, long, value_enum, default_value_t = Direction::HubToLocal)]
        direction: Direction,

        /// How the capture is delimited
        #[arg(short, long, value_enum, default_value_t = FramingArg::SizePrefixed)]
        framing: FramingArg,
    },
    /// Feed a capture of hub messages through the client and print the state
    Replay {
        /// Capture file of size-prefixed hub messages
        capture: PathBuf,

        /// Bytes handed to the client per event
        #[arg(long, default_value_t = 512)]
        chunk_size: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Direction {
    HubToLocal,
    LocalToHub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FramingArg {
    Bare,
    SizePrefixed,
}

impl From<FramingArg> for Framing {
    fn from(arg: FramingArg) -> Self {
        match arg {
            FramingArg::Bare => Framing::Bare,
            FramingArg::SizePrefixed => Framing::SizePrefixed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,hub_client=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Decode {
            capture,
            direction,
            framing,
        } => {
            let bytes = read_capture(&capture)?;
            for message in decode_capture(&bytes, direction, framing.into(), config.max_frame_size)? {
                println!("{}", serde_json::to_string(&message)?);
            }
        }
        Commands::Replay { capture, chunk_size } => {
            if chunk_size == 0 {
                bail!("--chunk-size must be positive");
            }
            let bytes = read_capture(&capture)?;
            let state = replay(config, bytes, chunk_size).await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ClientConfig> {
    let Some(path) = path else {
        return Ok(ClientConfig::default());
    };
    let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let config = ClientConfig::from_json(&json).with_context(|| format!("Invalid config {}", path.display()))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

fn read_capture(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read capture {}", path.display()))?;
    debug!(len = bytes.len(), "Read capture {}", path.display());
    Ok(bytes)
}

/// Decode every message in a capture.
///
/// A bare capture holds exactly one message. Messages that fail to decode are
/// reported and skipped; a framing error ends the capture.
fn decode_capture(
    bytes: &[u8],
    direction: Direction,
    framing: Framing,
    max_frame_size: usize,
) -> Result<Vec<serde_json::Value>> {
    let frames = match framing {
        Framing::Bare => vec![Bytes::copy_from_slice(bytes)],
        Framing::SizePrefixed => {
            let mut framer = FrameDecoder::new(max_frame_size);
            framer.push(bytes);
            let mut frames = Vec::new();
            while let Some(frame) = framer.next_frame()? {
                frames.push(frame);
            }
            if framer.buffered() > 0 {
                warn!(remaining = framer.buffered(), "Capture ends with a partial frame");
            }
            frames
        }
    };

    let mut messages = Vec::with_capacity(frames.len());
    for (index, frame) in frames.iter().enumerate() {
        let decoded = match direction {
            Direction::HubToLocal => decode_hub_to_local(frame).map(|m| serde_json::to_value(m)),
            Direction::LocalToHub => decode_local_to_hub(frame).map(|m| serde_json::to_value(m)),
        };
        match decoded {
            Ok(value) => messages.push(value?),
            Err(e) => warn!(index, len = frame.len(), "Skipping undecodable message: {}", e),
        }
    }
    Ok(messages)
}

/// Run a client over a size-prefixed capture and return the final state.
async fn replay(config: ClientConfig, bytes: Vec<u8>, chunk_size: usize) -> Result<DeviceState> {
    let config = ClientConfig {
        framing: Framing::SizePrefixed,
        ..config
    };
    let (client, _outbound) = HubClient::new(config)?;
    let events = client.event_sender();
    let state = client.subscribe();

    let task = tokio::spawn(client.run());

    let bytes = Bytes::from(bytes);
    let mut offset = 0;
    while offset < bytes.len() {
        let end = (offset + chunk_size).min(bytes.len());
        events
            .send(ClientEvent::Received(bytes.slice(offset..end)))
            .await
            .context("Client stopped early")?;
        offset = end;
    }
    drop(events);

    task.await.context("Client task panicked")??;
    let snapshot = state.borrow().clone();
    info!(networks = snapshot.networks().len(), "Replay finished");
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_core::{Bssid, WifiAuthMode, WifiNetwork, WifiNetworkEventType};
    use hub_protocol::{encode_wifi_network_event, encode_wifi_scan_command, WifiNetworkEvent, WifiScanCommand};
    use pretty_assertions::assert_eq;

    fn capture() -> Vec<u8> {
        let event = |last: u8, rssi: i8| WifiNetworkEvent {
            event_type: WifiNetworkEventType::Discovered,
            networks: vec![WifiNetwork {
                ssid: Some("Home".to_string()),
                bssid: Bssid::new([2, 0, 0, 0, 0, last]),
                channel: 11,
                rssi,
                auth_mode: WifiAuthMode::Wpa2Psk,
                saved: true,
            }],
        };
        let mut bytes = encode_wifi_network_event(&event(1, -60), Framing::SizePrefixed).unwrap();
        bytes.extend(encode_wifi_network_event(&event(2, -40), Framing::SizePrefixed).unwrap());
        bytes
    }

    #[test]
    fn test_decode_size_prefixed_capture() {
        let messages = decode_capture(&capture(), Direction::HubToLocal, Framing::SizePrefixed, 1024).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1]["payload"]["known"]["type"], "wifiNetworkEvent");
        assert_eq!(messages[1]["payload"]["known"]["networks"][0]["rssi"], -40);
    }

    #[test]
    fn test_decode_bare_command() {
        let bytes = encode_wifi_scan_command(&WifiScanCommand { run: true }, Framing::Bare).unwrap();
        let messages = decode_capture(&bytes, Direction::LocalToHub, Framing::Bare, 1024).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["payload"]["known"]["run"], true);
    }

    #[test]
    fn test_decode_skips_garbage() {
        let messages = decode_capture(&[1, 2, 3], Direction::HubToLocal, Framing::Bare, 1024).unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_replay_groups_networks() {
        let state = replay(ClientConfig::default(), capture(), 7).await.unwrap();
        let group = &state.network_groups()["Home_WPA2"];
        let rssi: Vec<i8> = group.networks.iter().map(|n| n.rssi).collect();
        assert_eq!(rssi, vec![-40, -60]);
    }
}
