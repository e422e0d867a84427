mod member;
mod presence_hook;
mod registry_config;
mod room;
mod room_command;
mod room_registry;

pub use presence_hook::*;
pub use registry_config::*;
pub use room::*;
pub use room_command::*;
pub use room_registry::*;
