use crate::media::DeviceKind;
use huddle_core::PeerId;
use thiserror::Error;

/// Failures reported by a capture backend.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("permission denied for {0}")]
    PermissionDenied(DeviceKind),
    #[error("no {0} device found")]
    DeviceNotFound(DeviceKind),
    #[error("{0} is already in use")]
    DeviceInUse(DeviceKind),
    /// The request was withdrawn before the device was granted.
    #[error("{0} request was cancelled")]
    Cancelled(DeviceKind),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Camera or microphone could not be acquired at join time.
    #[error("local media unavailable: {0}")]
    MediaUnavailable(MediaError),

    /// The relay could not be reached at join time.
    #[error("signaling unavailable: {0}")]
    SignalingUnavailable(String),

    /// Screen capture failed; the previous video source is kept.
    #[error("screen capture denied: {0}")]
    CaptureDenied(MediaError),

    #[error("negotiation with {peer} failed: {reason}")]
    NegotiationFailed { peer: PeerId, reason: String },

    #[error("peer {peer} did not recover in time")]
    PeerTimeout { peer: PeerId },

    #[error("room was closed by the relay")]
    RoomClosed,

    /// The session was already left.
    #[error("session is no longer active")]
    Left,
}

impl SessionError {
    pub fn negotiation(peer: &PeerId, err: impl std::fmt::Display) -> Self {
        SessionError::NegotiationFailed {
            peer: peer.clone(),
            reason: err.to_string(),
        }
    }
}
