mod rtc;

pub use rtc::{RtcConnection, RtcConnectionFactory};

use crate::Result;
use crate::media::{LocalMedia, TrackKind};
use async_trait::async_trait;
use huddle_core::{IceCandidate, IceServerConfig, ParticipantId, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Transport-level connection state, as reported by the connection object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// A track the remote side sends us.
pub struct RemoteTrack<T> {
    pub id: String,
    pub stream_id: String,
    pub kind: TrackKind,
    pub track: Arc<T>,
}

impl<T> Clone for RemoteTrack<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            stream_id: self.stream_id.clone(),
            kind: self.kind,
            track: self.track.clone(),
        }
    }
}

/// Callbacks of a connection object, delivered to the manager loop.
pub enum TransportEvent<T> {
    /// A local candidate was gathered and should go to the remote peer now.
    CandidateGathered(ParticipantId, IceCandidate),
    TrackReceived(ParticipantId, RemoteTrack<T>),
    StateChanged(ParticipantId, ConnectionState),
}

#[async_trait]
pub trait PeerConnection: Send + Sync + 'static {
    /// Creates an offer and installs it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Creates an answer and installs it as the local description.
    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    type Connection: PeerConnection;
    type Track: Send + Sync + 'static;

    /// Builds a connection toward `remote` with the local tracks attached and
    /// its callbacks wired into `events`.
    async fn create(
        &self,
        remote: ParticipantId,
        ice_servers: &[IceServerConfig],
        media: &LocalMedia,
        events: mpsc::Sender<TransportEvent<Self::Track>>,
    ) -> Result<Self::Connection>;
}
