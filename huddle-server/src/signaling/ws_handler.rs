use crate::Relay;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use huddle_core::{ClientMessage, ParticipantId};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub async fn ws_handler(ws: WebSocketUpgrade, State(relay): State<Relay>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, relay))
}

async fn handle_socket(socket: WebSocket, relay: Relay) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let participant_id = relay.connect(tx);
    info!("New WebSocket connection: {}", participant_id);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize relay message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let relay = relay.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(msg) => dispatch(&relay, participant_id, msg),
                        Err(e) => warn!("Invalid frame from {}: {}", participant_id, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    relay.handle_disconnect(participant_id);
    info!("WebSocket disconnected: {}", participant_id);
}

fn dispatch(relay: &Relay, participant_id: ParticipantId, msg: ClientMessage) {
    match msg {
        ClientMessage::Join { room } => relay.handle_join(participant_id, room),
        ClientMessage::Signal { to, payload } => {
            debug!("Signal {} -> {}", participant_id, to);
            relay.handle_signal(participant_id, to, payload);
        }
        ClientMessage::Leave => relay.handle_leave(participant_id),
    }
}
