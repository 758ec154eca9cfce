use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use huddle_core::{IceServerConfig, ParticipantId, RoomId, ServerMessage};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Sending half of one participant's connection.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

struct Participant {
    outbox: Outbox,
    room: Option<RoomId>,
}

struct RelayInner {
    participants: DashMap<ParticipantId, Participant>,
    /// Rooms exist only while they have members. Lock order: a room entry may be
    /// held while reading `participants`, never the other way round.
    rooms: DashMap<RoomId, HashSet<ParticipantId>>,
    ice_servers: Vec<IceServerConfig>,
}

/// Room membership and payload routing for every connected participant.
#[derive(Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

impl Relay {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                participants: DashMap::new(),
                rooms: DashMap::new(),
                ice_servers,
            }),
        }
    }

    pub fn ice_servers(&self) -> &[IceServerConfig] {
        &self.inner.ice_servers
    }

    /// Registers a new connection and greets it with its id and the ICE servers.
    pub fn connect(&self, outbox: Outbox) -> ParticipantId {
        let participant_id = ParticipantId::new();

        let _ = outbox.send(ServerMessage::Welcome { participant_id });
        let _ = outbox.send(ServerMessage::IceConfig {
            ice_servers: self.inner.ice_servers.clone(),
        });

        self.inner
            .participants
            .insert(participant_id, Participant { outbox, room: None });

        info!("Participant {} connected", participant_id);
        participant_id
    }

    /// Puts `participant` into `room`. A participant that is already in a room
    /// (the same one included) leaves it first.
    pub fn handle_join(&self, participant: ParticipantId, room: RoomId) {
        let previous = match self.inner.participants.get_mut(&participant) {
            Some(mut entry) => entry.room.replace(room.clone()),
            None => {
                warn!("Join from unknown participant {}", participant);
                return;
            }
        };

        if let Some(previous) = previous {
            info!(
                "Participant {} re-joining: leaving '{}' first",
                participant, previous
            );
            self.remove_from_room(participant, &previous);
        }

        let mut members = self.inner.rooms.entry(room.clone()).or_default();
        let member_ids: Vec<ParticipantId> = members.iter().copied().collect();
        members.insert(participant);

        self.deliver(
            participant,
            ServerMessage::Membership {
                room: room.clone(),
                member_ids: member_ids.clone(),
            },
        );
        for member in &member_ids {
            self.deliver(
                *member,
                ServerMessage::Joined {
                    participant_id: participant,
                },
            );
        }

        info!(
            "Participant {} joined '{}' ({} already present)",
            participant,
            room,
            member_ids.len()
        );
    }

    /// Forwards an opaque payload. Unknown recipients are a silent drop.
    pub fn handle_signal(&self, sender: ParticipantId, to: ParticipantId, payload: Value) {
        if !self.deliver(
            to,
            ServerMessage::Signaled {
                from: sender,
                payload,
            },
        ) {
            debug!("Dropping signal {} -> {}: recipient not connected", sender, to);
        }
    }

    pub fn handle_leave(&self, participant: ParticipantId) {
        let previous = self
            .inner
            .participants
            .get_mut(&participant)
            .and_then(|mut entry| entry.room.take());

        if let Some(room) = previous {
            self.remove_from_room(participant, &room);
        }
    }

    /// Forgets the connection and tells its room-mates, and only them, that it is
    /// gone. Safe to call more than once.
    pub fn handle_disconnect(&self, participant: ParticipantId) {
        let Some((_, state)) = self.inner.participants.remove(&participant) else {
            return;
        };

        if let Some(room) = state.room {
            self.remove_from_room(participant, &room);
        }

        info!("Participant {} disconnected", participant);
    }

    pub fn members(&self, room: &RoomId) -> Vec<ParticipantId> {
        self.inner
            .rooms
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn room_of(&self, participant: &ParticipantId) -> Option<RoomId> {
        self.inner
            .participants
            .get(participant)
            .and_then(|entry| entry.room.clone())
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }

    pub fn participant_count(&self) -> usize {
        self.inner.participants.len()
    }

    fn remove_from_room(&self, participant: ParticipantId, room: &RoomId) {
        let Entry::Occupied(mut members) = self.inner.rooms.entry(room.clone()) else {
            return;
        };

        if !members.get_mut().remove(&participant) {
            return;
        }

        if members.get().is_empty() {
            members.remove();
            debug!("Room '{}' is empty, dropping it", room);
            return;
        }

        for member in members.get() {
            self.deliver(
                *member,
                ServerMessage::Left {
                    participant_id: participant,
                },
            );
        }

        info!("Participant {} left '{}'", participant, room);
    }

    /// Returns whether the message reached a live outbox.
    fn deliver(&self, to: ParticipantId, msg: ServerMessage) -> bool {
        let Some(entry) = self.inner.participants.get(&to) else {
            return false;
        };
        entry.outbox.send(msg).is_ok()
    }
}
