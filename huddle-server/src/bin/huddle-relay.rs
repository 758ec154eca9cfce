use anyhow::Result;
use clap::Parser;
use huddle_core::{DEFAULT_STUN_SERVER, IceServerConfig};
use huddle_server::RelayConfig;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "huddle-relay", about = "Room signaling relay for huddle peers")]
struct Args {
    #[arg(long, default_value = "0.0.0.0:3000")]
    listen: SocketAddr,

    /// STUN/TURN url handed to clients; repeat for several.
    #[arg(long = "ice-server", default_values_t = [DEFAULT_STUN_SERVER.to_string()])]
    ice_servers: Vec<String>,

    /// Used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = RelayConfig {
        listen: args.listen,
        ice_servers: args.ice_servers.into_iter().map(IceServerConfig::from_url).collect(),
    };

    huddle_server::serve(config).await
}
