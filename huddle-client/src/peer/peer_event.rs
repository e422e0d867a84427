use crate::error::SessionError;
use crate::media::LocalTrack;
use huddle_core::{HealthState, NegotiationState, PeerId, SignalPayload, TrackKind};
use std::sync::Arc;

/// Instructions from the session to one supervisor.
#[derive(Debug)]
pub enum PeerCommand {
    /// A signaling message sent by the supervised peer.
    Signal(SignalPayload),
    ReplaceVideo(Option<Arc<LocalTrack>>),
    /// Whether the relay connection is up. Answers cannot arrive while it
    /// is down, so waiting for them pauses.
    SignalingUp(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PeerEventKind {
    NegotiationChanged(NegotiationState),
    HealthChanged(HealthState),
    TrackAdded(TrackKind),
    TrackRemoved(TrackKind),
    RemoteMediaState {
        audio_enabled: bool,
        video_enabled: bool,
    },
    /// The supervisor stopped; the session must drop the peer.
    Failed(SessionError),
}

/// Emitted by a supervisor. `generation` tells a replaced supervisor's late
/// events apart from the current one's.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerEvent {
    pub peer_id: PeerId,
    pub generation: u64,
    pub kind: PeerEventKind,
}
