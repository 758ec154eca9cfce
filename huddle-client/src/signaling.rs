use crate::{Error, Result};
use futures::{SinkExt, StreamExt};
use huddle_core::{ClientMessage, NegotiationPayload, ParticipantId, RoomId, ServerMessage};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Cloneable outbound half of the relay connection. The socket closes once
/// every clone is dropped.
#[derive(Clone)]
pub struct Signaler {
    tx: mpsc::UnboundedSender<ClientMessage>,
}

impl Signaler {
    pub fn new(tx: mpsc::UnboundedSender<ClientMessage>) -> Self {
        Self { tx }
    }

    pub fn join(&self, room: RoomId) -> Result<()> {
        self.send(ClientMessage::Join { room })
    }

    pub fn leave(&self) -> Result<()> {
        self.send(ClientMessage::Leave)
    }

    pub fn signal(&self, to: ParticipantId, payload: impl Into<NegotiationPayload>) -> Result<()> {
        let payload = payload.into().to_value()?;
        self.send(ClientMessage::Signal { to, payload })
    }

    fn send(&self, msg: ClientMessage) -> Result<()> {
        self.tx.send(msg).map_err(|_| Error::ConnectionClosed)
    }
}

/// Opens the relay socket and returns its outbound handle and inbound stream.
/// The inbound receiver yields `None` once the socket is gone.
pub async fn connect(url: &str) -> Result<(Signaler, mpsc::UnboundedReceiver<ServerMessage>)> {
    info!("Connecting to relay: {}", url);

    let (ws_stream, _) = connect_async(url).await?;
    let (mut write, mut read) = ws_stream.split();

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientMessage>();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<ServerMessage>();

    tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize client message: {}", e);
                    continue;
                }
            };
            if let Err(e) = write.send(Message::Text(json.into())).await {
                error!("Failed to send to relay: {}", e);
                break;
            }
        }

        let _ = write.close().await;
        debug!("Relay sender task terminated");
    });

    tokio::spawn(async move {
        while let Some(frame) = read.next().await {
            match frame {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(msg) => {
                        if in_tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Invalid frame from relay: {}", e),
                },
                Ok(Message::Close(_)) => {
                    info!("Relay closed the connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Relay socket error: {}", e);
                    break;
                }
            }
        }

        debug!("Relay receiver task terminated");
    });

    Ok((Signaler::new(out_tx), in_rx))
}
