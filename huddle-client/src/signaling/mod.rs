mod backoff;
mod signaling_channel;
mod signaling_connector;
mod ws_connector;

pub use backoff::*;
pub use signaling_channel::*;
pub use signaling_connector::*;
pub use ws_connector::*;
