use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use dashmap::DashMap;
use huddle_core::{PeerId, RoomId, SignalMessage};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, error};

struct PeerLink {
    epoch: u64,
    tx: mpsc::UnboundedSender<SignalMessage>,
}

/// Live connections keyed by (room, peer). Each connection gets a new epoch,
/// so teardown of a stale connection never removes its replacement.
#[derive(Clone, Default)]
pub struct PeerLinks {
    links: Arc<DashMap<(RoomId, PeerId), PeerLink>>,
    next_epoch: Arc<AtomicU64>,
}

impl PeerLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection, replacing any previous one for the same peer.
    pub fn register(
        &self,
        room_id: &RoomId,
        peer_id: &PeerId,
    ) -> (u64, mpsc::UnboundedReceiver<SignalMessage>) {
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();

        if self
            .links
            .insert((room_id.clone(), peer_id.clone()), PeerLink { epoch, tx })
            .is_some()
        {
            debug!("Replaced connection of {} in room {}", peer_id, room_id);
        }

        (epoch, rx)
    }

    pub fn unregister(&self, room_id: &RoomId, peer_id: &PeerId, epoch: u64) {
        self.links
            .remove_if(&(room_id.clone(), peer_id.clone()), |_, link| {
                link.epoch == epoch
            });
    }

    pub fn send(&self, room_id: &RoomId, peer_id: &PeerId, msg: SignalMessage) -> bool {
        let Some(link) = self.links.get(&(room_id.clone(), peer_id.clone())) else {
            return false;
        };

        if let Err(e) = link.tx.send(msg) {
            error!(
                "Failed to queue {} for {} in room {}",
                e.0.payload.name(),
                peer_id,
                room_id
            );
            return false;
        }
        true
    }

    pub fn is_connected(&self, room_id: &RoomId, peer_id: &PeerId) -> bool {
        self.links
            .contains_key(&(room_id.clone(), peer_id.clone()))
    }
}

#[async_trait]
impl SignalingOutput for PeerLinks {
    async fn deliver(&self, room_id: &RoomId, peer_id: &PeerId, msg: SignalMessage) -> bool {
        self.send(room_id, peer_id, msg)
    }
}
