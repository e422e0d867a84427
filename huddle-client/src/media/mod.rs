mod device;
mod local_media;
mod local_track;
mod media_backend;
mod synthetic_backend;

pub use device::*;
pub use local_media::*;
pub use local_track::*;
pub use media_backend::*;
pub use synthetic_backend::*;
