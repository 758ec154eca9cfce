use crate::connection::{ConnectionFactory, RemoteTrack, TransportEvent};
use crate::media::LocalMedia;
use crate::peer::link::{LinkCommand, LinkInfo, LinkRole, PeerLink};
use crate::signaling::Signaler;
use dashmap::DashMap;
use huddle_core::{IceServerConfig, NegotiationPayload, ParticipantId, RoomId, ServerMessage};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Everything one remote participant sends us, grouped by participant.
pub struct RemoteStream<T> {
    pub stream_id: String,
    pub tracks: Vec<RemoteTrack<T>>,
}

impl<T> Clone for RemoteStream<T> {
    fn clone(&self) -> Self {
        Self {
            stream_id: self.stream_id.clone(),
            tracks: self.tracks.clone(),
        }
    }
}

/// Live, shareable view of the manager's links and received streams.
pub struct PeerView<T> {
    links: Arc<DashMap<ParticipantId, LinkInfo>>,
    streams: Arc<DashMap<ParticipantId, RemoteStream<T>>>,
}

impl<T> Clone for PeerView<T> {
    fn clone(&self) -> Self {
        Self {
            links: self.links.clone(),
            streams: self.streams.clone(),
        }
    }
}

impl<T> PeerView<T> {
    fn new() -> Self {
        Self {
            links: Arc::new(DashMap::new()),
            streams: Arc::new(DashMap::new()),
        }
    }

    pub fn link(&self, remote: &ParticipantId) -> Option<LinkInfo> {
        self.links.get(remote).map(|entry| entry.value().clone())
    }

    pub fn remote_ids(&self) -> Vec<ParticipantId> {
        self.links.iter().map(|entry| *entry.key()).collect()
    }

    pub fn remote_stream(&self, remote: &ParticipantId) -> Option<RemoteStream<T>> {
        self.streams.get(remote).map(|entry| entry.value().clone())
    }

    pub fn remote_streams(&self) -> Vec<(ParticipantId, RemoteStream<T>)> {
        self.streams
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }
}

/// Local requests that end a session from inside.
#[derive(Debug)]
pub enum ManagerCommand {
    Leave,
}

/// Owns one [`PeerLink`] per remote participant and drives them from relay
/// messages and connection callbacks.
pub struct PeerManager<F: ConnectionFactory> {
    local_id: ParticipantId,
    factory: F,
    media: LocalMedia,
    ice_servers: Vec<IceServerConfig>,
    signals: Signaler,
    links: HashMap<ParticipantId, PeerLink>,
    /// Links being torn down; the loop never waits on these.
    closing: JoinSet<()>,
    view: PeerView<F::Track>,
    transport_tx: mpsc::Sender<TransportEvent<F::Track>>,
    transport_rx: mpsc::Receiver<TransportEvent<F::Track>>,
}

impl<F: ConnectionFactory> PeerManager<F> {
    /// `ice_servers` is the fallback until the relay sends a non-empty list.
    pub fn new(
        local_id: ParticipantId,
        factory: F,
        media: LocalMedia,
        signals: Signaler,
        ice_servers: Vec<IceServerConfig>,
    ) -> Self {
        let (transport_tx, transport_rx) = mpsc::channel(256);

        Self {
            local_id,
            factory,
            media,
            ice_servers,
            signals,
            links: HashMap::new(),
            closing: JoinSet::new(),
            view: PeerView::new(),
            transport_tx,
            transport_rx,
        }
    }

    pub fn view(&self) -> PeerView<F::Track> {
        self.view.clone()
    }

    pub async fn run(
        mut self,
        mut inbound: mpsc::UnboundedReceiver<ServerMessage>,
        mut commands: mpsc::Receiver<ManagerCommand>,
    ) {
        info!("Peer manager for {} started", self.local_id);

        loop {
            tokio::select! {
                msg = inbound.recv() => {
                    match msg {
                        Some(m) => self.handle_server_message(m).await,
                        None => {
                            warn!("Relay connection lost, tearing down all links");
                            break;
                        }
                    }
                }

                Some(evt) = self.transport_rx.recv() => {
                    self.handle_transport_event(evt);
                }

                Some(res) = self.closing.join_next(), if !self.closing.is_empty() => {
                    if let Err(e) = res {
                        warn!("Link close task failed: {}", e);
                    }
                }

                cmd = commands.recv() => {
                    match cmd {
                        Some(ManagerCommand::Leave) | None => {
                            if let Err(e) = self.signals.leave() {
                                debug!("Could not announce leave: {}", e);
                            }
                            break;
                        }
                    }
                }
            }
        }

        self.shutdown().await;
        info!("Peer manager for {} finished", self.local_id);
    }

    pub async fn handle_server_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Welcome { participant_id } => {
                self.local_id = participant_id;
            }
            ServerMessage::IceConfig { ice_servers } => {
                if ice_servers.is_empty() {
                    debug!("Relay sent no ICE servers, keeping local defaults");
                } else {
                    self.ice_servers = ice_servers;
                }
            }
            ServerMessage::Membership { room, member_ids } => {
                self.on_membership(room, member_ids).await;
            }
            ServerMessage::Joined { participant_id } => self.on_joined(participant_id).await,
            ServerMessage::Signaled { from, payload } => self.on_signaled(from, payload),
            ServerMessage::Left { participant_id } => self.on_left(participant_id),
        }
    }

    /// We just joined, so we offer to everyone already there.
    pub async fn on_membership(&mut self, room: RoomId, existing: Vec<ParticipantId>) {
        info!("Joined '{}' with {} existing members", room, existing.len());

        for remote in existing {
            self.create_peer_link(remote, LinkRole::Offerer).await;
        }
    }

    /// Someone arrived after us; they will offer.
    pub async fn on_joined(&mut self, remote: ParticipantId) {
        info!("{} joined the room", remote);
        self.create_peer_link(remote, LinkRole::Answerer).await;
    }

    pub fn on_signaled(&mut self, from: ParticipantId, payload: Value) {
        let Some(link) = self.links.get(&from) else {
            debug!("Dropping signal from unknown participant {}", from);
            return;
        };

        let payload = match NegotiationPayload::from_value(payload) {
            Ok(p) => p,
            Err(e) => {
                warn!("Malformed payload from {}: {}", from, e);
                return;
            }
        };

        match payload {
            NegotiationPayload::Description(desc) => {
                link.enqueue(LinkCommand::Description(desc))
            }
            NegotiationPayload::Candidate(candidate) => {
                link.enqueue(LinkCommand::Candidate(candidate))
            }
        }
    }

    pub fn on_left(&mut self, remote: ParticipantId) {
        self.view.links.remove(&remote);
        self.view.streams.remove(&remote);

        match self.links.remove(&remote) {
            Some(link) => {
                info!("{} left, closing its link", remote);
                self.closing.spawn(link.close());
            }
            None => debug!("{} left but had no link", remote),
        }
    }

    async fn create_peer_link(&mut self, remote: ParticipantId, role: LinkRole) {
        if remote == self.local_id {
            return;
        }
        if self.links.contains_key(&remote) {
            debug!("Link to {} already exists", remote);
            return;
        }

        let connection = match self
            .factory
            .create(
                remote,
                &self.ice_servers,
                &self.media,
                self.transport_tx.clone(),
            )
            .await
        {
            Ok(connection) => connection,
            Err(e) => {
                error!("Failed to create connection to {}: {}", remote, e);
                return;
            }
        };

        info!("Creating {:?} link to {}", role, remote);
        let link = PeerLink::spawn(remote, role, connection, self.signals.clone());
        self.view.links.insert(remote, link.info());
        self.links.insert(remote, link);
    }

    fn handle_transport_event(&mut self, event: TransportEvent<F::Track>) {
        match event {
            TransportEvent::CandidateGathered(remote, candidate) => {
                if !self.links.contains_key(&remote) {
                    return;
                }
                if let Err(e) = self.signals.signal(remote, candidate) {
                    error!("Failed to signal candidate to {}: {}", remote, e);
                }
            }
            TransportEvent::TrackReceived(remote, track) => self.record_remote_track(remote, track),
            TransportEvent::StateChanged(remote, state) => {
                if let Some(link) = self.links.get(&remote) {
                    link.enqueue(LinkCommand::Transport(state));
                }
            }
        }
    }

    /// One stream entry per remote; a track id seen twice is ignored.
    fn record_remote_track(&mut self, remote: ParticipantId, track: RemoteTrack<F::Track>) {
        if !self.links.contains_key(&remote) {
            return;
        }

        let mut stream = self
            .view
            .streams
            .entry(remote)
            .or_insert_with(|| RemoteStream {
                stream_id: track.stream_id.clone(),
                tracks: Vec::new(),
            });

        if stream.tracks.iter().any(|t| t.id == track.id) {
            return;
        }
        info!("Receiving {:?} from {}", track.kind, remote);
        stream.tracks.push(track);
    }

    async fn shutdown(&mut self) {
        // Callbacks fired while connections close must not wait on us.
        self.transport_rx.close();
        self.view.links.clear();
        self.view.streams.clear();

        for (_, link) in self.links.drain() {
            self.closing.spawn(link.close());
        }
        while let Some(res) = self.closing.join_next().await {
            if let Err(e) = res {
                warn!("Link close task failed: {}", e);
            }
        }
    }
}
