use std::time::Duration;

#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// How long a member whose connection dropped is kept before it is
    /// reported as left.
    pub grace_window: Duration,
    /// Messages kept for a member that cannot currently be reached.
    pub backlog_limit: usize,
    pub command_buffer: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            grace_window: Duration::from_secs(30),
            backlog_limit: 256,
            command_buffer: 100,
        }
    }
}
