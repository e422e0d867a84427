mod peer_session;
mod room_handle;
mod room_session;
mod session_command;
mod session_controller;
mod session_event;
mod session_events;

pub use room_handle::*;
pub use session_controller::*;
pub use session_event::*;
pub use session_events::*;
