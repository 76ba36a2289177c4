//! Hub client.
//!
//! The client owns the device state inside one task:
//! - bytes received from the hub are framed, decoded and folded in
//! - optimistic config edits from the UI are applied
//! - after every change a snapshot is published to subscribers
//!
//! Commands for the hub are encoded by a [`HubHandle`] and handed to the
//! transport through the outbound channel.

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use hub_core::DeviceState;
use hub_protocol::{
    decode_hub_to_local, encode_local_to_hub, FrameDecoder, Framing, LocalToHubMessage, LocalToHubPayload,
    SetEstopEnabledCommand, SetEstopPinCommand, SetRfTxPinCommand, UnionPayload,
};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::handler::{apply_config_edit, apply_hub_message, ConfigEdit};

/// Events that can be sent to the client.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Bytes received from the hub.
    Received(Bytes),
    /// An optimistic edit of the mirrored configuration.
    EditConfig(ConfigEdit),
}

/// The hub client.
pub struct HubClient {
    config: ClientConfig,
    state: DeviceState,
    framer: FrameDecoder,
    /// Channel for receiving events from the transport and the UI.
    event_tx: mpsc::Sender<ClientEvent>,
    event_rx: mpsc::Receiver<ClientEvent>,
    /// Latest state, for subscribers.
    state_tx: watch::Sender<DeviceState>,
    /// Encoded commands for the transport.
    outbound_tx: mpsc::Sender<Bytes>,
}

impl HubClient {
    /// Create a new client with the given configuration.
    ///
    /// Also returns the receiver of encoded commands, which the transport
    /// drains and sends to the hub.
    pub fn new(config: ClientConfig) -> Result<(Self, mpsc::Receiver<Bytes>), ClientError> {
        config.validate()?;

        let (event_tx, event_rx) = mpsc::channel(config.event_capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_capacity);
        let (state_tx, _) = watch::channel(DeviceState::new());

        let client = Self {
            framer: FrameDecoder::new(config.max_frame_size),
            config,
            state: DeviceState::new(),
            event_tx,
            event_rx,
            state_tx,
            outbound_tx,
        };
        Ok((client, outbound_rx))
    }

    /// Get a sender for submitting events to the client.
    pub fn event_sender(&self) -> mpsc::Sender<ClientEvent> {
        self.event_tx.clone()
    }

    /// Subscribe to state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<DeviceState> {
        self.state_tx.subscribe()
    }

    /// Get a handle for sending commands.
    pub fn handle(&self) -> HubHandle {
        HubHandle {
            framing: self.config.framing,
            events: self.event_tx.clone(),
            outbound: self.outbound_tx.clone(),
            state: self.state_tx.subscribe(),
        }
    }

    /// Process events until every sender has been dropped.
    pub async fn run(self) -> Result<(), ClientError> {
        let HubClient {
            config,
            mut state,
            mut framer,
            event_tx,
            mut event_rx,
            state_tx,
            outbound_tx,
        } = self;
        // Only external senders keep the loop alive.
        drop(event_tx);
        drop(outbound_tx);

        info!(framing = ?config.framing, "Hub client started");

        while let Some(event) = event_rx.recv().await {
            let changed = match event {
                ClientEvent::Received(bytes) => receive(&config, &mut framer, &mut state, &bytes),
                ClientEvent::EditConfig(edit) => {
                    debug!(?edit, "Optimistic config edit");
                    apply_config_edit(&mut state, edit);
                    true
                }
            };

            if changed {
                state_tx.send_replace(state.clone());
            }
        }

        info!("Event channel closed, hub client stopping");
        Ok(())
    }
}

/// Decode and apply everything in `bytes`. Returns true if the state changed.
fn receive(config: &ClientConfig, framer: &mut FrameDecoder, state: &mut DeviceState, bytes: &[u8]) -> bool {
    match config.framing {
        Framing::Bare => {
            if bytes.len() > config.max_frame_size {
                warn!(size = bytes.len(), max = config.max_frame_size, "Dropping oversized message");
                return false;
            }
            apply_frame(state, bytes)
        }
        Framing::SizePrefixed => {
            framer.push(bytes);
            let mut changed = false;
            loop {
                match framer.next_frame() {
                    Ok(Some(frame)) => changed |= apply_frame(state, &frame),
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Framing error: {}", e);
                        break;
                    }
                }
            }
            changed
        }
    }
}

fn apply_frame(state: &mut DeviceState, frame: &[u8]) -> bool {
    match decode_hub_to_local(frame) {
        Ok(message) => apply_hub_message(state, message),
        Err(e) => {
            warn!(len = frame.len(), "Dropping undecodable hub message: {}", e);
            false
        }
    }
}

/// Cloneable handle for talking to a running client.
#[derive(Debug, Clone)]
pub struct HubHandle {
    framing: Framing,
    events: mpsc::Sender<ClientEvent>,
    outbound: mpsc::Sender<Bytes>,
    state: watch::Receiver<DeviceState>,
}

impl HubHandle {
    /// Encode a command and queue it for the transport.
    pub async fn send(&self, payload: impl Into<LocalToHubPayload>) -> Result<(), ClientError> {
        let payload = payload.into();
        debug!(tag = payload.tag(), "Sending command");

        let bytes = encode_local_to_hub(&LocalToHubMessage::new(payload), self.framing)?;
        self.outbound
            .send(Bytes::from(bytes))
            .await
            .map_err(|_| ClientError::ChannelClosed("outbound"))
    }

    /// Current state snapshot.
    pub fn state(&self) -> DeviceState {
        self.state.borrow().clone()
    }

    /// Subscribe to state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<DeviceState> {
        self.state.clone()
    }

    /// Move the RF transmitter, updating the mirrored config right away.
    pub async fn set_rf_tx_pin(&self, pin: u8) -> Result<(), ClientError> {
        self.send(SetRfTxPinCommand { pin }).await?;
        self.edit(ConfigEdit::RfTxPin(pin)).await
    }

    /// Enable or disable the e-stop, updating the mirrored config right away.
    pub async fn set_estop_enabled(&self, enabled: bool) -> Result<(), ClientError> {
        self.send(SetEstopEnabledCommand { enabled }).await?;
        self.edit(ConfigEdit::EstopEnabled(enabled)).await
    }

    /// Move the e-stop input, updating the mirrored config right away.
    pub async fn set_estop_pin(&self, pin: i8) -> Result<(), ClientError> {
        self.send(SetEstopPinCommand { pin }).await?;
        self.edit(ConfigEdit::EstopGpioPin(pin)).await
    }

    async fn edit(&self, edit: ConfigEdit) -> Result<(), ClientError> {
        self.events
            .send(ClientEvent::EditConfig(edit))
            .await
            .map_err(|_| ClientError::ChannelClosed("event"))
    }
}
