use crate::connection::{ConnectionState, PeerConnection};
use crate::signaling::Signaler;
use huddle_core::{IceCandidate, ParticipantId, SessionDescription};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How long a closing link may take to wind down before its task is aborted.
const LINK_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Fixed at creation from join order: whoever joined later offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    Offerer,
    Answerer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Created,
    LocalOfferSet,
    AwaitingOffer,
    HaveRemoteDescription,
    Connected,
    Closed,
}

/// Read-only view of a link, handed out to session users.
#[derive(Debug, Clone)]
pub struct LinkInfo {
    pub remote: ParticipantId,
    pub role: LinkRole,
    state: watch::Receiver<LinkState>,
}

impl LinkInfo {
    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    /// Waits until the link reaches `target` (or closes). Returns whether
    /// `target` was reached in time.
    pub async fn wait_for(&mut self, target: LinkState, timeout: Duration) -> bool {
        let wait = self
            .state
            .wait_for(|s| *s == target || *s == LinkState::Closed);
        match tokio::time::timeout(timeout, wait).await {
            Ok(Ok(state)) => *state == target,
            _ => false,
        }
    }
}

pub(crate) enum LinkCommand {
    Description(SessionDescription),
    Candidate(IceCandidate),
    Transport(ConnectionState),
}

/// Handle to one negotiation actor. Everything for a remote peer goes through
/// its FIFO, so a candidate can never overtake the description it depends on.
pub(crate) struct PeerLink {
    info: LinkInfo,
    commands: mpsc::UnboundedSender<LinkCommand>,
    close_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl PeerLink {
    pub(crate) fn spawn<C: PeerConnection>(
        remote: ParticipantId,
        role: LinkRole,
        connection: C,
        signals: Signaler,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(LinkState::Created);
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = oneshot::channel();

        let actor = LinkActor {
            remote,
            role,
            connection,
            signals,
            state: state_tx,
            has_remote_description: false,
            pending_candidates: Vec::new(),
            commands: command_rx,
            close_rx,
        };

        Self {
            info: LinkInfo {
                remote,
                role,
                state: state_rx,
            },
            commands,
            close_tx,
            task: tokio::spawn(actor.run()),
        }
    }

    pub(crate) fn info(&self) -> LinkInfo {
        self.info.clone()
    }

    pub(crate) fn enqueue(&self, cmd: LinkCommand) {
        if self.commands.send(cmd).is_err() {
            debug!("Link to {} already stopped", self.info.remote);
        }
    }

    /// Drops whatever is still queued and closes the connection. A command
    /// already in progress finishes first.
    pub(crate) async fn close(self) {
        let PeerLink {
            info,
            close_tx,
            mut task,
            ..
        } = self;
        let _ = close_tx.send(());

        if tokio::time::timeout(LINK_CLOSE_TIMEOUT, &mut task)
            .await
            .is_err()
        {
            warn!("Link to {} did not close in time, aborting", info.remote);
            task.abort();
        }
    }
}

struct LinkActor<C> {
    remote: ParticipantId,
    role: LinkRole,
    connection: C,
    signals: Signaler,
    state: watch::Sender<LinkState>,
    has_remote_description: bool,
    /// Remote candidates that arrived before any remote description.
    pending_candidates: Vec<IceCandidate>,
    commands: mpsc::UnboundedReceiver<LinkCommand>,
    close_rx: oneshot::Receiver<()>,
}

impl<C: PeerConnection> LinkActor<C> {
    async fn run(mut self) {
        match self.role {
            LinkRole::Offerer => self.send_offer().await,
            LinkRole::Answerer => self.set_state(LinkState::AwaitingOffer),
        }

        loop {
            tokio::select! {
                biased;

                _ = &mut self.close_rx => {
                    let queued = self.commands.len();
                    if queued > 0 {
                        debug!("Dropping {} queued commands for {}", queued, self.remote);
                    }
                    break;
                }

                cmd = self.commands.recv() => match cmd {
                    Some(LinkCommand::Description(desc)) => {
                        self.apply_remote_description(desc).await
                    }
                    Some(LinkCommand::Candidate(candidate)) => self.apply_candidate(candidate).await,
                    Some(LinkCommand::Transport(state)) => self.on_transport_state(state),
                    None => break,
                },
            }
        }

        if !self.pending_candidates.is_empty() {
            debug!(
                "Dropping {} unapplied candidates from {}",
                self.pending_candidates.len(),
                self.remote
            );
            self.pending_candidates.clear();
        }

        if let Err(e) = self.connection.close().await {
            warn!("Failed to close connection to {}: {}", self.remote, e);
        }
        self.set_state(LinkState::Closed);
        info!("Link to {} closed", self.remote);
    }

    async fn send_offer(&mut self) {
        let offer = match self.connection.create_offer().await {
            Ok(offer) => offer,
            Err(e) => {
                error!("Failed to create offer for {}: {}", self.remote, e);
                return;
            }
        };
        self.set_state(LinkState::LocalOfferSet);

        debug!("Sending offer to {}", self.remote);
        if let Err(e) = self.signals.signal(self.remote, offer) {
            error!("Failed to signal offer to {}: {}", self.remote, e);
        }
    }

    async fn apply_remote_description(&mut self, desc: SessionDescription) {
        if self.has_remote_description {
            warn!(
                "Ignoring {:?} from {}: renegotiation is not supported",
                desc.kind, self.remote
            );
            return;
        }

        let is_offer = desc.is_offer();
        if let Err(e) = self.connection.set_remote_description(desc).await {
            error!("Failed to set remote description from {}: {}", self.remote, e);
            return;
        }
        self.has_remote_description = true;

        if is_offer {
            match self.connection.create_answer().await {
                Ok(answer) => {
                    debug!("Sending answer to {}", self.remote);
                    if let Err(e) = self.signals.signal(self.remote, answer) {
                        error!("Failed to signal answer to {}: {}", self.remote, e);
                    }
                }
                Err(e) => error!("Failed to create answer for {}: {}", self.remote, e),
            }
        }

        if *self.state.borrow() != LinkState::Connected {
            self.set_state(LinkState::HaveRemoteDescription);
        }

        let pending = std::mem::take(&mut self.pending_candidates);
        if !pending.is_empty() {
            debug!("Applying {} deferred candidates from {}", pending.len(), self.remote);
        }
        for candidate in pending {
            self.add_candidate(candidate).await;
        }
    }

    async fn apply_candidate(&mut self, candidate: IceCandidate) {
        if !self.has_remote_description {
            debug!("Deferring candidate from {} until its description", self.remote);
            self.pending_candidates.push(candidate);
            return;
        }
        self.add_candidate(candidate).await;
    }

    async fn add_candidate(&self, candidate: IceCandidate) {
        if let Err(e) = self.connection.add_ice_candidate(candidate).await {
            warn!("Failed to add candidate from {}: {}", self.remote, e);
        }
    }

    fn on_transport_state(&self, state: ConnectionState) {
        match state {
            ConnectionState::Connected => {
                info!("Connected to {}", self.remote);
                self.set_state(LinkState::Connected);
            }
            ConnectionState::Failed | ConnectionState::Disconnected => {
                warn!("Connection to {} reported {:?}", self.remote, state);
            }
            _ => debug!("Connection to {} reported {:?}", self.remote, state),
        }
    }

    fn set_state(&self, state: LinkState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!("Link to {}: {:?} -> {:?}", self.remote, previous, state);
        }
    }
}
