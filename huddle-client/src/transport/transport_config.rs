use huddle_core::IceServerConfig;

/// Per-connection transport settings.
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}
