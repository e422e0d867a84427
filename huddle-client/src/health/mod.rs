mod aggregate;
mod peer_health;

pub use aggregate::*;
pub use peer_health::*;
