mod backoff_config;
mod health_policy;
mod session_config;

pub use backoff_config::*;
pub use health_policy::*;
pub use session_config::*;
