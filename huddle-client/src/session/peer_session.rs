use crate::peer::PeerHandle;
use crate::session::PeerSnapshot;
use huddle_core::{HealthState, NegotiationState, TrackKind};
use std::collections::BTreeSet;

/// The session's record of one remote peer.
pub(crate) struct PeerSession {
    pub handle: PeerHandle,
    pub negotiation: NegotiationState,
    pub health: HealthState,
    pub tracks: BTreeSet<TrackKind>,
}

impl PeerSession {
    pub fn new(handle: PeerHandle) -> Self {
        Self {
            handle,
            negotiation: NegotiationState::Idle,
            health: HealthState::Connecting,
            tracks: BTreeSet::new(),
        }
    }

    pub fn snapshot(&self) -> PeerSnapshot {
        PeerSnapshot {
            peer_id: self.handle.peer_id().clone(),
            negotiation: self.negotiation,
            health: self.health,
            tracks: self.tracks.iter().copied().collect(),
        }
    }
}
