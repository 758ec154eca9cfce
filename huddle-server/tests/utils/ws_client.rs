use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use huddle_core::{ClientMessage, IceServerConfig, ParticipantId, ServerMessage};
use huddle_server::Relay;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::probe::RECV_TIMEOUT_MS;

/// Starts a relay on an ephemeral localhost port.
pub async fn spawn_relay() -> (SocketAddr, Relay) {
    let relay = Relay::new(vec![IceServerConfig::from_url("stun:stun.example.org:3478")]);
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(huddle_server::serve_on(listener, relay.clone()));

    (addr, relay)
}

pub struct WsTestClient {
    pub id: ParticipantId,
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTestClient {
    /// Opens `/ws` and consumes the greeting.
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let (ws, _) = connect_async(format!("ws://{}/ws", addr))
            .await
            .context("Failed to connect to relay")?;

        let mut client = Self {
            id: ParticipantId::new(),
            ws,
        };

        match client.recv().await? {
            ServerMessage::Welcome { participant_id } => client.id = participant_id,
            other => anyhow::bail!("expected welcome, got {:?}", other),
        }
        match client.recv().await? {
            ServerMessage::IceConfig { .. } => {}
            other => anyhow::bail!("expected ice_config, got {:?}", other),
        }

        Ok(client)
    }

    pub async fn send(&mut self, msg: &ClientMessage) -> Result<()> {
        let json = serde_json::to_string(msg)?;
        self.send_raw(&json).await
    }

    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        self.ws
            .send(Message::Text(text.to_owned().into()))
            .await
            .context("Failed to send frame")
    }

    pub async fn recv(&mut self) -> Result<ServerMessage> {
        loop {
            let frame = tokio::time::timeout(Duration::from_millis(RECV_TIMEOUT_MS), self.ws.next())
                .await
                .context("Timeout waiting for relay frame")?
                .context("Socket closed")??;

            if let Message::Text(text) = frame {
                return serde_json::from_str(&text).context("Relay sent invalid JSON");
            }
        }
    }

    /// True when nothing arrives within a short grace period.
    pub async fn is_quiet(&mut self) -> bool {
        tokio::time::timeout(Duration::from_millis(200), self.ws.next())
            .await
            .is_err()
    }

    pub async fn close(mut self) -> Result<()> {
        self.ws.close(None).await.context("Failed to close socket")
    }
}
