mod negotiation;
mod peer_event;
mod peer_handle;
mod supervisor;

pub use negotiation::*;
pub use peer_event::*;
pub use peer_handle::*;
