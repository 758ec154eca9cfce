use crate::config::ClientConfig;
use crate::connection::ConnectionFactory;
use crate::media::LocalMedia;
use crate::peer::{LinkInfo, ManagerCommand, PeerManager, PeerView, RemoteStream};
use crate::signaling;
use crate::{Error, Result};
use huddle_core::{IceServerConfig, ParticipantId, RoomId, ServerMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// A joined room. Dropping the session (or calling [`Session::leave`]) tears
/// down every link.
pub struct Session<T> {
    local_id: ParticipantId,
    room: RoomId,
    media: LocalMedia,
    view: PeerView<T>,
    commands: mpsc::Sender<ManagerCommand>,
    task: Option<JoinHandle<()>>,
}

impl<T: Send + Sync + 'static> Session<T> {
    /// Connects to the relay, waits for our id and joins `room`.
    pub async fn join<F>(
        config: &ClientConfig,
        room: impl Into<RoomId>,
        factory: F,
        media: LocalMedia,
    ) -> Result<Self>
    where
        F: ConnectionFactory<Track = T>,
    {
        let room = room.into();
        let (signals, mut inbound) = signaling::connect(&config.relay_url).await?;

        let greeting = tokio::time::timeout(config.welcome_timeout, await_welcome(&mut inbound))
            .await
            .map_err(|_| Error::Timeout("waiting for relay welcome".to_owned()))??;

        info!("Relay assigned id {}", greeting.local_id);

        let ice_servers = if greeting.ice_servers.is_empty() {
            config.ice_servers.clone()
        } else {
            greeting.ice_servers
        };

        let manager = PeerManager::new(
            greeting.local_id,
            factory,
            media.clone(),
            signals.clone(),
            ice_servers,
        );
        let view = manager.view();
        let (commands, command_rx) = mpsc::channel(8);

        signals.join(room.clone())?;
        let task = tokio::spawn(manager.run(inbound, command_rx));
        drop(signals);

        Ok(Self {
            local_id: greeting.local_id,
            room,
            media,
            view,
            commands,
            task: Some(task),
        })
    }

    pub fn local_id(&self) -> ParticipantId {
        self.local_id
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn media(&self) -> &LocalMedia {
        &self.media
    }

    pub fn link(&self, remote: &ParticipantId) -> Option<LinkInfo> {
        self.view.link(remote)
    }

    pub fn remote_ids(&self) -> Vec<ParticipantId> {
        self.view.remote_ids()
    }

    pub fn remote_stream(&self, remote: &ParticipantId) -> Option<RemoteStream<T>> {
        self.view.remote_stream(remote)
    }

    pub fn remote_streams(&self) -> Vec<(ParticipantId, RemoteStream<T>)> {
        self.view.remote_streams()
    }

    /// True once the manager stopped, whether by leave or by losing the relay.
    pub fn is_closed(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }

    /// Resolves when the manager stops on its own, e.g. the relay went away.
    pub async fn closed(&mut self) {
        if let Some(task) = self.task.as_mut() {
            let _ = task.await;
            self.task = None;
        }
    }

    /// Tells the relay we are leaving, closes every link and waits for it.
    pub async fn leave(mut self) {
        if self.commands.send(ManagerCommand::Leave).await.is_err() {
            debug!("Peer manager already stopped");
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        info!("Left room '{}'", self.room);
    }
}

struct Greeting {
    local_id: ParticipantId,
    ice_servers: Vec<IceServerConfig>,
}

/// The relay sends `welcome` then `ice_config` before anything else.
async fn await_welcome(inbound: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Result<Greeting> {
    let local_id = match inbound.recv().await {
        Some(ServerMessage::Welcome { participant_id }) => participant_id,
        Some(other) => {
            return Err(Error::Signaling(format!(
                "expected welcome, got {:?}",
                other
            )));
        }
        None => return Err(Error::ConnectionClosed),
    };

    let ice_servers = match inbound.recv().await {
        Some(ServerMessage::IceConfig { ice_servers }) => ice_servers,
        Some(other) => {
            return Err(Error::Signaling(format!(
                "expected ice_config, got {:?}",
                other
            )));
        }
        None => return Err(Error::ConnectionClosed),
    };

    Ok(Greeting {
        local_id,
        ice_servers,
    })
}
