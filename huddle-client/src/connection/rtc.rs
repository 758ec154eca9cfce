use crate::Result;
use crate::connection::{
    ConnectionFactory, ConnectionState, PeerConnection, RemoteTrack, TransportEvent,
};
use crate::media::{LocalMedia, TrackKind};
use async_trait::async_trait;
use huddle_core::{IceCandidate, IceServerConfig, ParticipantId, SdpKind, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// Builds `webrtc` peer connections for every link.
#[derive(Debug, Clone, Default)]
pub struct RtcConnectionFactory {
    include_loopback_candidates: bool,
}

impl RtcConnectionFactory {
    pub fn new(include_loopback_candidates: bool) -> Self {
        Self {
            include_loopback_candidates,
        }
    }
}

pub struct RtcConnection {
    remote: ParticipantId,
    peer_connection: Arc<RTCPeerConnection>,
}

impl RtcConnection {
    pub fn peer_connection(&self) -> &Arc<RTCPeerConnection> {
        &self.peer_connection
    }
}

fn to_rtc_ice_server(config: &IceServerConfig) -> RTCIceServer {
    RTCIceServer {
        urls: config.urls.clone(),
        username: config.username.clone().unwrap_or_default(),
        credential: config.credential.clone().unwrap_or_default(),
    }
}

fn to_connection_state(s: RTCPeerConnectionState) -> ConnectionState {
    match s {
        RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
        RTCPeerConnectionState::Connected => ConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => ConnectionState::Failed,
        RTCPeerConnectionState::Closed => ConnectionState::Closed,
        _ => ConnectionState::New,
    }
}

#[async_trait]
impl ConnectionFactory for RtcConnectionFactory {
    type Connection = RtcConnection;
    type Track = TrackRemote;

    async fn create(
        &self,
        remote: ParticipantId,
        ice_servers: &[IceServerConfig],
        media: &LocalMedia,
        events: mpsc::Sender<TransportEvent<TrackRemote>>,
    ) -> Result<RtcConnection> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let mut settings = SettingEngine::default();
        settings.set_include_loopback_candidate(self.include_loopback_candidates);

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .with_setting_engine(settings)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers.iter().map(to_rtc_ice_server).collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        for (kind, track) in media.tracks() {
            let sender = peer_connection
                .add_track(track as Arc<dyn TrackLocal + Send + Sync>)
                .await?;

            // RTCP has to be drained for the interceptors to work.
            tokio::spawn(async move {
                let mut rtcp_buf = vec![0u8; 1500];
                while sender.read(&mut rtcp_buf).await.is_ok() {}
                debug!("RTCP reader for {:?} track to {} stopped", kind, remote);
            });
        }

        let state_tx = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();

                Box::pin(async move {
                    info!("Peer connection to {} is now {:?}", remote, s);
                    let _ = tx
                        .send(TransportEvent::StateChanged(remote, to_connection_state(s)))
                        .await;
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                };
                let _ = tx
                    .send(TransportEvent::CandidateGathered(remote, candidate))
                    .await;
            })
        }));

        let track_tx = events;
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();

                Box::pin(async move {
                    let Some(kind) = TrackKind::from_codec_type(track.kind()) else {
                        warn!("Ignoring track {} of unknown kind from {}", track.id(), remote);
                        return;
                    };
                    let remote_track = RemoteTrack {
                        id: track.id(),
                        stream_id: track.stream_id(),
                        kind,
                        track,
                    };
                    debug!(
                        "Track {} ({:?}) arrived from {}",
                        remote_track.id, remote_track.kind, remote
                    );
                    let _ = tx
                        .send(TransportEvent::TrackReceived(remote, remote_track))
                        .await;
                })
            },
        ));

        Ok(RtcConnection {
            remote,
            peer_connection,
        })
    }
}

#[async_trait]
impl PeerConnection for RtcConnection {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = match desc.kind {
            SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
        };
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        debug!("Closing peer connection to {}", self.remote);
        self.peer_connection.close().await?;
        Ok(())
    }
}
