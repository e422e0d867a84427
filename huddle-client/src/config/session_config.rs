use crate::config::{BackoffConfig, HealthPolicy};
use huddle_core::utils::default_stun_urls;
use huddle_core::{IceServerConfig, PeerId};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub local_peer_id: PeerId,
    /// Used for every peer connection; servers announced by the relay are
    /// appended.
    pub ice_servers: Vec<IceServerConfig>,
    pub backoff: BackoffConfig,
    pub health: HealthPolicy,
    /// Buffered session events per subscriber.
    pub event_capacity: usize,
    pub command_buffer: usize,
}

impl SessionConfig {
    pub fn new(local_peer_id: PeerId) -> Self {
        Self {
            local_peer_id,
            ..Default::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            local_peer_id: PeerId::new(),
            ice_servers: vec![IceServerConfig {
                urls: default_stun_urls(),
                username: None,
                credential: None,
            }],
            backoff: BackoffConfig::default(),
            health: HealthPolicy::default(),
            event_capacity: 256,
            command_buffer: 32,
        }
    }
}
