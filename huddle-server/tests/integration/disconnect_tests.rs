use huddle_core::RoomId;
use huddle_server::Relay;

use crate::integration::init_tracing;
use crate::utils::Probe;

/// A departure is announced to room-mates only, never to other rooms.
#[tokio::test]
async fn test_left_is_scoped_to_the_departing_room() {
    init_tracing();
    let relay = Relay::new(Vec::new());
    let mut a = Probe::connect(&relay).await;
    let mut b = Probe::connect(&relay).await;
    let mut c = Probe::connect(&relay).await;
    let mut outsider = Probe::connect(&relay).await;
    let mut lobby = Probe::connect(&relay).await;

    relay.handle_join(a.id, "x".into());
    relay.handle_join(b.id, "x".into());
    relay.handle_join(c.id, "x".into());
    relay.handle_join(outsider.id, "y".into());
    for p in [&mut a, &mut b, &mut c, &mut outsider] {
        p.drain();
    }

    relay.handle_disconnect(a.id);

    assert_eq!(b.expect_left().await, a.id);
    assert_eq!(c.expect_left().await, a.id);
    b.assert_silent();
    c.assert_silent();
    outsider.assert_silent();
    lobby.assert_silent();
}

#[tokio::test]
async fn test_disconnected_id_leaves_member_set() {
    init_tracing();
    let relay = Relay::new(Vec::new());
    let a = Probe::connect(&relay).await;
    let b = Probe::connect(&relay).await;
    let room = RoomId::from("42");

    relay.handle_join(a.id, room.clone());
    relay.handle_join(b.id, room.clone());
    relay.handle_disconnect(a.id);

    assert_eq!(relay.members(&room), vec![b.id]);
    assert_eq!(relay.participant_count(), 1);

    relay.handle_disconnect(b.id);
    assert!(relay.members(&room).is_empty());
    assert_eq!(relay.room_count(), 0);
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    init_tracing();
    let relay = Relay::new(Vec::new());
    let a = Probe::connect(&relay).await;
    let mut b = Probe::connect(&relay).await;

    relay.handle_join(a.id, "42".into());
    relay.handle_join(b.id, "42".into());
    b.drain();

    relay.handle_disconnect(a.id);
    relay.handle_disconnect(a.id);

    assert_eq!(b.expect_left().await, a.id);
    b.assert_silent();
}

#[tokio::test]
async fn test_disconnect_outside_any_room_is_quiet() {
    init_tracing();
    let relay = Relay::new(Vec::new());
    let a = Probe::connect(&relay).await;
    let mut b = Probe::connect(&relay).await;
    relay.handle_join(b.id, "42".into());
    b.drain();

    relay.handle_disconnect(a.id);

    b.assert_silent();
    assert_eq!(relay.participant_count(), 1);
}

#[tokio::test]
async fn test_join_after_disconnect_is_ignored() {
    init_tracing();
    let relay = Relay::new(Vec::new());
    let a = Probe::connect(&relay).await;

    relay.handle_disconnect(a.id);
    relay.handle_join(a.id, "42".into());

    assert_eq!(relay.room_count(), 0);
}
