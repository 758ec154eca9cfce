use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use huddle_client::connection::RtcConnectionFactory;
use huddle_client::media::{LocalMedia, TrackKind};
use huddle_client::{ClientConfig, Session};
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use webrtc::media::Sample;

/// One Opus frame of digital silence.
const OPUS_SILENCE: [u8; 3] = [0xf8, 0xff, 0xfe];
const FRAME_DURATION: Duration = Duration::from_millis(20);
const STATUS_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "huddle-peer", about = "Join a huddle room and log the mesh")]
struct Args {
    /// Relay WebSocket endpoint.
    #[arg(long, default_value = "ws://127.0.0.1:3000/ws")]
    relay: String,

    #[arg(long)]
    room: String,

    /// Gather 127.0.0.1 candidates, for several peers on one machine.
    #[arg(long)]
    loopback: bool,

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

    let config = ClientConfig {
        relay_url: args.relay,
        include_loopback_candidates: args.loopback,
        ..Default::default()
    };

    let media = LocalMedia::audio_video("huddle-peer");
    let factory = RtcConnectionFactory::new(config.include_loopback_candidates);

    let mut session = Session::join(&config, args.room.as_str(), factory, media.clone())
        .await
        .context("Failed to join room")?;
    info!("Joined '{}' as {}", session.room(), session.local_id());

    // Keep the audio track flowing so remote peers see a live stream.
    let sampler = tokio::spawn(async move {
        let mut ticker = interval(FRAME_DURATION);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let sample = Sample {
            data: Bytes::from_static(&OPUS_SILENCE),
            duration: FRAME_DURATION,
            ..Default::default()
        };
        loop {
            ticker.tick().await;
            if let Err(e) = media.write_sample(TrackKind::Audio, &sample).await {
                debug!("Dropped silent sample: {}", e);
            }
        }
    });

    let mut status = interval(STATUS_INTERVAL);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, leaving");
                break;
            }
            _ = session.closed() => {
                info!("Relay connection ended");
                break;
            }
            _ = status.tick() => {
                for remote in session.remote_ids() {
                    let Some(link) = session.link(&remote) else { continue };
                    let tracks = session
                        .remote_stream(&remote)
                        .map(|s| s.tracks.len())
                        .unwrap_or(0);
                    info!("{} ({:?}): {:?}, {} remote tracks", remote, link.role, link.state(), tracks);
                }
            }
        }
    }

    sampler.abort();
    if !session.is_closed() {
        session.leave().await;
    }
    Ok(())
}
