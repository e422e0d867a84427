
pub use mock_presence::*;
pub use mock_signaling::*;
