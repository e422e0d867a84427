use crate::model::peer::PeerId;
use crate::model::room::RoomId;
use crate::model::track::TrackKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// Envelope exchanged with the relay. `target_id` is absent for presence
/// broadcasts and relay-originated messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalMessage {
    pub room_id: RoomId,
    pub sender_id: PeerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<PeerId>,
    #[serde(flatten)]
    pub payload: SignalPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalPayload {
    Join,
    Leave,
    Offer {
        sdp: String,
        #[serde(default)]
        ice_restart: bool,
    },
    Answer {
        sdp: String,
    },
    IceCandidate {
        candidate: String,
        sdp_mid: Option<String>,
        sdp_m_line_index: Option<u16>,
        seq: u64,
    },
    TrackReplaced {
        removed: TrackKind,
        added: TrackKind,
    },
    MediaState {
        audio_enabled: bool,
        video_enabled: bool,
    },
    Welcome {
        peers: Vec<PeerId>,
        resumed: bool,
    },
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    RoomClosed,
}

impl SignalPayload {
    pub fn name(&self) -> &'static str {
        match self {
            SignalPayload::Join => "join",
            SignalPayload::Leave => "leave",
            SignalPayload::Offer { .. } => "offer",
            SignalPayload::Answer { .. } => "answer",
            SignalPayload::IceCandidate { .. } => "ice-candidate",
            SignalPayload::TrackReplaced { .. } => "track-replaced",
            SignalPayload::MediaState { .. } => "media-state",
            SignalPayload::Welcome { .. } => "welcome",
            SignalPayload::IceConfig { .. } => "ice-config",
            SignalPayload::RoomClosed => "room-closed",
        }
    }

    /// Presence messages are interpreted by the relay instead of forwarded verbatim.
    pub fn is_presence(&self) -> bool {
        matches!(self, SignalPayload::Join | SignalPayload::Leave)
    }
}

impl SignalMessage {
    pub fn new(room_id: RoomId, sender_id: PeerId, payload: SignalPayload) -> Self {
        Self {
            room_id,
            sender_id,
            target_id: None,
            payload,
        }
    }

    pub fn to(mut self, target_id: PeerId) -> Self {
        self.target_id = Some(target_id);
        self
    }
}
