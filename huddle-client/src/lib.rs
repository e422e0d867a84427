pub mod config;
pub mod error;
pub mod health;
pub mod media;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod transport;

pub use config::*;
pub use error::*;
pub use session::*;
