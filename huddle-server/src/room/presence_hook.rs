use async_trait::async_trait;
use huddle_core::{PeerId, RoomId};
use tracing::info;

/// Observer for membership changes, for collaborators that track who is in
/// which room. Called from the room actor, so implementations must not block.
#[async_trait]
pub trait PresenceHook: Send + Sync + 'static {
    async fn on_join(&self, room_id: &RoomId, peer_id: &PeerId);

    async fn on_resume(&self, _room_id: &RoomId, _peer_id: &PeerId) {}

    async fn on_leave(&self, room_id: &RoomId, peer_id: &PeerId);

    async fn on_room_closed(&self, _room_id: &RoomId) {}
}

/// Hook that only writes presence changes to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogPresence;

#[async_trait]
impl PresenceHook for LogPresence {
    async fn on_join(&self, room_id: &RoomId, peer_id: &PeerId) {
        info!("Peer {} joined room {}", peer_id, room_id);
    }

    async fn on_resume(&self, room_id: &RoomId, peer_id: &PeerId) {
        info!("Peer {} resumed in room {}", peer_id, room_id);
    }

    async fn on_leave(&self, room_id: &RoomId, peer_id: &PeerId) {
        info!("Peer {} left room {}", peer_id, room_id);
    }

    async fn on_room_closed(&self, room_id: &RoomId) {
        info!("Room {} closed", room_id);
    }
}
