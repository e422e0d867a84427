use crate::room::{PresenceHook, RegistryConfig, RoomCommand, RoomRegistry};
use crate::signaling::PeerLinks;
use huddle_core::{IceServerConfig, PeerId, RoomId, SignalMessage, SignalPayload};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A registered connection of one peer to one room.
pub struct Attachment {
    pub room_id: RoomId,
    pub peer_id: PeerId,
    pub epoch: u64,
    /// Messages to write to the peer's socket, in order.
    pub rx: mpsc::UnboundedReceiver<SignalMessage>,
}

/// Entry point for transports: turns connections and inbound messages into
/// room commands.
#[derive(Clone)]
pub struct SignalingService {
    links: PeerLinks,
    registry: RoomRegistry,
    ice_servers: Arc<Vec<IceServerConfig>>,
}

impl SignalingService {
    pub fn new(
        config: RegistryConfig,
        ice_servers: Vec<IceServerConfig>,
        hook: Arc<dyn PresenceHook>,
    ) -> Self {
        let links = PeerLinks::new();
        let registry = RoomRegistry::new(config, Arc::new(links.clone()), hook);

        Self {
            links,
            registry,
            ice_servers: Arc::new(ice_servers),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn links(&self) -> &PeerLinks {
        &self.links
    }

    pub fn get_ice_servers(&self) -> Vec<IceServerConfig> {
        self.ice_servers.as_ref().clone()
    }

    /// Registers a new connection and queues the ICE configuration as its
    /// first message. Presence starts only when the peer sends `join`.
    pub fn connect(&self, room_id: &RoomId, peer_id: &PeerId) -> Attachment {
        let (epoch, rx) = self.links.register(room_id, peer_id);
        debug!(
            "Peer {} connected to room {} (epoch {})",
            peer_id, room_id, epoch
        );

        if !self.ice_servers.is_empty() {
            let msg = SignalMessage::new(
                room_id.clone(),
                PeerId::from(""),
                SignalPayload::IceConfig {
                    ice_servers: self.get_ice_servers(),
                },
            );
            self.links.send(room_id, peer_id, msg);
        }

        Attachment {
            room_id: room_id.clone(),
            peer_id: peer_id.clone(),
            epoch,
            rx,
        }
    }

    /// Routes one inbound message. Sender and room are taken from the
    /// connection, never trusted from the payload.
    pub async fn ingest(&self, room_id: &RoomId, peer_id: &PeerId, epoch: u64, mut msg: SignalMessage) {
        if &msg.sender_id != peer_id || &msg.room_id != room_id {
            warn!(
                "Rewriting envelope of {} from {} (claimed {}/{})",
                msg.payload.name(),
                peer_id,
                msg.room_id,
                msg.sender_id
            );
            msg.sender_id = peer_id.clone();
            msg.room_id = room_id.clone();
        }

        let cmd = match msg.payload {
            SignalPayload::Join => RoomCommand::Join {
                peer_id: peer_id.clone(),
                epoch,
            },
            SignalPayload::Leave => RoomCommand::Leave {
                peer_id: peer_id.clone(),
            },
            SignalPayload::Welcome { .. }
            | SignalPayload::IceConfig { .. }
            | SignalPayload::RoomClosed => {
                warn!(
                    "Peer {} sent relay-only message {}",
                    peer_id,
                    msg.payload.name()
                );
                return;
            }
            _ => RoomCommand::Relay(msg),
        };

        self.registry.dispatch(room_id, cmd).await;
    }

    /// Tears down connection `epoch`. Messages its writer never sent are
    /// handed back to the room and held for the peer.
    pub async fn disconnect(
        &self,
        room_id: &RoomId,
        peer_id: &PeerId,
        epoch: u64,
        undelivered: Vec<SignalMessage>,
    ) {
        self.links.unregister(room_id, peer_id, epoch);
        self.registry
            .dispatch(
                room_id,
                RoomCommand::Detach {
                    peer_id: peer_id.clone(),
                    epoch,
                    undelivered,
                },
            )
            .await;
    }
}
