use huddle_core::{PeerId, SignalMessage};
use tokio::sync::oneshot;

/// Commands processed by a room actor, one at a time.
#[derive(Debug)]
pub enum RoomCommand {
    /// Presence announcement over the connection identified by `epoch`.
    /// A peer that is already a member is resumed instead of re-added.
    Join { peer_id: PeerId, epoch: u64 },

    /// Explicit departure.
    Leave { peer_id: PeerId },

    /// Negotiation or media-state message to forward to other members.
    Relay(SignalMessage),

    /// The connection `epoch` of this peer went away. `undelivered` holds
    /// what its writer still had queued, oldest first.
    Detach {
        peer_id: PeerId,
        epoch: u64,
        undelivered: Vec<SignalMessage>,
    },

    /// Grace window of a suspended member ran out.
    GraceExpired { peer_id: PeerId, epoch: u64 },

    /// Current members in join order.
    Members { reply: oneshot::Sender<Vec<PeerId>> },

    /// The room is closed by the registry; every member is told and dropped.
    Close,
}
