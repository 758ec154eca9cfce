use huddle_core::{DEFAULT_STUN_SERVER, IceServerConfig};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint of the relay, e.g. `ws://127.0.0.1:3000/ws`.
    pub relay_url: String,
    /// Used only when the relay's `ice_config` is empty.
    pub ice_servers: Vec<IceServerConfig>,
    /// Lets two peers on one host find each other over 127.0.0.1.
    pub include_loopback_candidates: bool,
    /// How long to wait for the relay's `welcome` after connecting.
    pub welcome_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: "ws://127.0.0.1:3000/ws".to_owned(),
            ice_servers: vec![IceServerConfig::from_url(DEFAULT_STUN_SERVER)],
            include_loopback_candidates: false,
            welcome_timeout: Duration::from_secs(10),
        }
    }
}
