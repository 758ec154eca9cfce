use huddle_core::{DEFAULT_STUN_SERVER, IceServerConfig};
use std::net::SocketAddr;

/// Settings for one relay process.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub listen: SocketAddr,
    /// Handed to every client on connect; the relay never talks to these itself.
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 3000)),
            ice_servers: vec![IceServerConfig::from_url(DEFAULT_STUN_SERVER)],
        }
    }
}
