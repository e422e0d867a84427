use async_trait::async_trait;
use huddle_core::{PeerId, RoomId, SignalMessage};

/// Delivery seam used by rooms to reach their members.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Pushes a message to the member's live connection. Returns `false`
    /// when the member has no connection right now.
    async fn deliver(&self, room_id: &RoomId, peer_id: &PeerId, msg: SignalMessage) -> bool;
}
