use huddle_core::{IceServerConfig, ParticipantId, ServerMessage};
use huddle_server::Relay;
use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::Probe;

#[tokio::test]
async fn test_signal_is_delivered_once_with_sender_stamped() {
    init_tracing();
    let relay = Relay::new(vec![IceServerConfig::from_url("stun:stun.example.org:3478")]);
    let mut a = Probe::connect(&relay).await;
    let mut b = Probe::connect(&relay).await;

    let payload = json!({ "description": { "type": "offer", "sdp": "v=0" } });
    relay.handle_signal(a.id, b.id, payload.clone());

    match b.recv().await {
        ServerMessage::Signaled { from, payload: got } => {
            assert_eq!(from, a.id);
            assert_eq!(got, payload);
        }
        other => panic!("expected signaled, got {:?}", other),
    }
    b.assert_silent();
    a.assert_silent();
}

#[tokio::test]
async fn test_signal_payload_is_not_interpreted() {
    init_tracing();
    let relay = Relay::new(Vec::new());
    let a = Probe::connect(&relay).await;
    let mut b = Probe::connect(&relay).await;

    let payload = json!(["not", "a", { "negotiation": "payload" }]);
    relay.handle_signal(a.id, b.id, payload.clone());

    assert_eq!(
        b.recv().await,
        ServerMessage::Signaled { from: a.id, payload }
    );
}

#[tokio::test]
async fn test_signal_does_not_require_shared_room() {
    init_tracing();
    let relay = Relay::new(Vec::new());
    let a = Probe::connect(&relay).await;
    let mut b = Probe::connect(&relay).await;
    relay.handle_join(a.id, "x".into());

    relay.handle_signal(a.id, b.id, json!(1));

    assert!(matches!(b.recv().await, ServerMessage::Signaled { .. }));
}

#[tokio::test]
async fn test_signal_to_unknown_recipient_is_dropped() {
    init_tracing();
    let relay = Relay::new(Vec::new());
    let mut a = Probe::connect(&relay).await;

    relay.handle_signal(a.id, ParticipantId::new(), json!({ "candidate": {} }));

    // nothing bounces back to the sender
    a.assert_silent();
}

#[tokio::test]
async fn test_signal_to_departed_recipient_is_dropped() {
    init_tracing();
    let relay = Relay::new(Vec::new());
    let mut a = Probe::connect(&relay).await;
    let mut b = Probe::connect(&relay).await;

    relay.handle_disconnect(b.id);
    relay.handle_signal(a.id, b.id, json!(1));

    a.assert_silent();
    b.assert_silent();
}

#[tokio::test]
async fn test_signals_from_one_sender_keep_order() {
    init_tracing();
    let relay = Relay::new(Vec::new());
    let a = Probe::connect(&relay).await;
    let mut b = Probe::connect(&relay).await;

    for i in 0..20 {
        relay.handle_signal(a.id, b.id, json!(i));
    }

    for i in 0..20 {
        assert_eq!(
            b.recv().await,
            ServerMessage::Signaled {
                from: a.id,
                payload: json!(i)
            }
        );
    }
}
