use huddle_core::TrackKind;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_m_line_index: Option<u16>,
}

/// Events a transport emits to the supervisor that owns it.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A local candidate to trickle to the remote peer.
    CandidateGenerated(IceCandidate),
    LinkStateChanged(LinkState),
    RemoteTrackAdded(TrackKind),
    RemoteTrackRemoved(TrackKind),
    Quality { packet_loss: f64, rtt: Duration },
}
