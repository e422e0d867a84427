use serde::{Deserialize, Serialize};

/// Offer/answer progress for one remote peer.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum NegotiationState {
    Idle,
    OfferSent,
    OfferReceived,
    AnswerSent,
    Stable,
    Closed,
}

impl NegotiationState {
    /// A new exchange may only start from these states.
    pub fn is_settled(&self) -> bool {
        matches!(self, NegotiationState::Idle | NegotiationState::Stable)
    }
}

/// Connectivity of the media path to one remote peer.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum HealthState {
    Connecting,
    Connected,
    Degraded,
    Reconnecting,
    Failed,
    Closed,
}

impl HealthState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, HealthState::Failed | HealthState::Closed)
    }
}

/// Room-wide status shown to the user.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Degraded,
    Disconnected,
}
