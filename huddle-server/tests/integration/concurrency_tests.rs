use huddle_core::{ParticipantId, RoomId, ServerMessage};
use huddle_server::Relay;
use std::collections::BTreeSet;
use tokio::task::JoinSet;

use crate::integration::init_tracing;
use crate::utils::Probe;

/// Replays what a participant was told about its room and returns who it
/// believes is there. Panics on any message that contradicts earlier ones.
fn replay_view(peer: &mut Probe) -> BTreeSet<ParticipantId> {
    let mut view = BTreeSet::new();
    let mut memberships = 0;

    for msg in peer.drain() {
        match msg {
            ServerMessage::Membership { member_ids, .. } => {
                memberships += 1;
                assert!(view.is_empty(), "membership after other room news");
                view.extend(member_ids);
            }
            ServerMessage::Joined { participant_id } => {
                assert!(view.insert(participant_id), "{} announced twice", participant_id);
            }
            ServerMessage::Left { participant_id } => {
                assert!(view.remove(&participant_id), "left for a stranger {}", participant_id);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    assert!(memberships <= 1, "{} memberships", memberships);
    assert!(!view.contains(&peer.id), "participant told about itself");
    view
}

async fn connect_many(relay: &Relay, n: usize) -> Vec<Probe> {
    let mut peers = Vec::with_capacity(n);
    for _ in 0..n {
        peers.push(Probe::connect(relay).await);
    }
    peers
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_see_each_other_exactly_once() {
    init_tracing();
    let relay = Relay::new(Vec::new());
    let room = RoomId::from("x");
    let mut peers = connect_many(&relay, 16).await;

    let mut joins = JoinSet::new();
    for peer in &peers {
        let (relay, room, id) = (relay.clone(), room.clone(), peer.id);
        joins.spawn(async move { relay.handle_join(id, room) });
    }
    while let Some(res) = joins.join_next().await {
        res.unwrap();
    }

    let everyone: BTreeSet<_> = peers.iter().map(|p| p.id).collect();
    assert_eq!(relay.members(&room).len(), 16);

    for peer in &mut peers {
        let mut expected = everyone.clone();
        expected.remove(&peer.id);
        assert_eq!(replay_view(peer), expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_disconnects_and_joins_stay_room_scoped() {
    init_tracing();
    let relay = Relay::new(Vec::new());
    let (x, y) = (RoomId::from("x"), RoomId::from("y"));

    let mut in_x = connect_many(&relay, 12).await;
    let mut in_y = connect_many(&relay, 8).await;
    let mut newcomers = connect_many(&relay, 4).await;
    for peer in &in_x {
        relay.handle_join(peer.id, x.clone());
    }
    for peer in &in_y {
        relay.handle_join(peer.id, y.clone());
    }

    // Settled views before the churn.
    for peer in in_x.iter_mut().chain(in_y.iter_mut()) {
        replay_view(peer);
    }

    let leaving_x: Vec<_> = in_x.drain(..6).collect();
    let leaving_y: Vec<_> = in_y.drain(..3).collect();

    let mut churn = JoinSet::new();
    for peer in leaving_x.iter().chain(leaving_y.iter()) {
        let (relay, id) = (relay.clone(), peer.id);
        churn.spawn(async move { relay.handle_disconnect(id) });
    }
    for peer in &newcomers {
        let (relay, room, id) = (relay.clone(), x.clone(), peer.id);
        churn.spawn(async move { relay.handle_join(id, room) });
    }
    while let Some(res) = churn.join_next().await {
        res.unwrap();
    }

    let final_x: BTreeSet<_> = relay.members(&x).into_iter().collect();
    let final_y: BTreeSet<_> = relay.members(&y).into_iter().collect();
    assert_eq!(final_x.len(), 6 + 4);
    assert_eq!(final_y.len(), 5);

    // Survivors started from the settled view, so only churn news is left.
    for peer in in_x.iter_mut() {
        let departed: BTreeSet<_> = leaving_x.iter().map(|p| p.id).collect();
        let arrived: BTreeSet<_> = newcomers.iter().map(|p| p.id).collect();
        let mut seen_left = BTreeSet::new();
        let mut seen_joined = BTreeSet::new();
        for msg in peer.drain() {
            match msg {
                ServerMessage::Left { participant_id } => {
                    assert!(seen_left.insert(participant_id));
                }
                ServerMessage::Joined { participant_id } => {
                    assert!(seen_joined.insert(participant_id));
                }
                other => panic!("unexpected message {:?}", other),
            }
        }
        assert_eq!(seen_left, departed, "x member must hear every x departure");
        assert_eq!(seen_joined, arrived);
    }

    for peer in in_y.iter_mut() {
        let departed: BTreeSet<_> = leaving_y.iter().map(|p| p.id).collect();
        let lefts: BTreeSet<_> = peer
            .drain()
            .into_iter()
            .map(|msg| match msg {
                ServerMessage::Left { participant_id } => participant_id,
                other => panic!("unexpected message {:?}", other),
            })
            .collect();
        assert_eq!(lefts, departed, "y member must hear only y departures");
    }

    for peer in newcomers.iter_mut() {
        let mut expected = final_x.clone();
        expected.remove(&peer.id);
        assert_eq!(replay_view(peer), expected);
    }
}
