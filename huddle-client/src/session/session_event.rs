use crate::error::SessionError;
use crate::media::LocalMediaState;
use huddle_core::{ConnectionStatus, HealthState, NegotiationState, PeerId, RoomId, TrackKind};

/// Why a remote peer's session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerLeftReason {
    /// The relay reported the peer gone.
    Left,
    /// The connection could not be established or recovered.
    Failed(SessionError),
    /// Replaced by a fresh session for the same peer.
    Replaced,
    /// The local session ended.
    SessionEnded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PeerJoined {
        peer_id: PeerId,
    },
    PeerLeft {
        peer_id: PeerId,
        reason: PeerLeftReason,
    },
    TrackAdded {
        peer_id: PeerId,
        kind: TrackKind,
    },
    TrackRemoved {
        peer_id: PeerId,
        kind: TrackKind,
    },
    NegotiationChanged {
        peer_id: PeerId,
        state: NegotiationState,
    },
    HealthChanged {
        peer_id: PeerId,
        state: HealthState,
    },
    RemoteMediaState {
        peer_id: PeerId,
        audio_enabled: bool,
        video_enabled: bool,
    },
    LocalMediaChanged(LocalMediaState),
    StatusChanged(ConnectionStatus),
    SignalingInterrupted,
    /// `resumed` is false when the relay had already dropped us and every
    /// peer session was rebuilt.
    SignalingRestored {
        resumed: bool,
    },
    /// Last event of a session. All resources are released by then.
    Terminated {
        error: Option<SessionError>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeerSnapshot {
    pub peer_id: PeerId,
    pub negotiation: NegotiationState,
    pub health: HealthState,
    pub tracks: Vec<TrackKind>,
}

/// Point-in-time view of a session, published after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub room_id: RoomId,
    pub local_peer_id: PeerId,
    pub status: ConnectionStatus,
    pub signaling_up: bool,
    pub media: LocalMediaState,
    /// Remote peers ordered by id.
    pub peers: Vec<PeerSnapshot>,
    pub active: bool,
}

impl SessionSnapshot {
    pub fn new(room_id: RoomId, local_peer_id: PeerId, media: LocalMediaState) -> Self {
        Self {
            room_id,
            local_peer_id,
            status: ConnectionStatus::Connecting,
            signaling_up: true,
            media,
            peers: Vec::new(),
            active: true,
        }
    }

    pub fn peer(&self, peer_id: &PeerId) -> Option<&PeerSnapshot> {
        self.peers.iter().find(|p| &p.peer_id == peer_id)
    }
}
