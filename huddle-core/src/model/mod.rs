mod peer;
mod room;
mod signaling;
mod state;
mod track;

pub use peer::PeerId;
pub use room::RoomId;
pub use signaling::{IceServerConfig, SignalMessage, SignalPayload};
pub use state::{ConnectionStatus, HealthState, NegotiationState};
pub use track::TrackKind;
