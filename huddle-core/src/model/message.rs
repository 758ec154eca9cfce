use crate::model::participant::ParticipantId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Public STUN server used when nothing else is configured.
pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Frames a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "snake_case")]
pub enum ClientMessage {
    Join { room: RoomId },
    /// `payload` is forwarded untouched; see `NegotiationPayload` for what
    /// well-behaved peers put in it.
    Signal { to: ParticipantId, payload: Value },
    Leave,
}

/// Frames the relay sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        participant_id: ParticipantId,
    },
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    /// Who was already in `room` when the recipient joined it.
    Membership {
        room: RoomId,
        member_ids: Vec<ParticipantId>,
    },
    Joined {
        participant_id: ParticipantId,
    },
    Signaled {
        from: ParticipantId,
        payload: Value,
    },
    Left {
        participant_id: ParticipantId,
    },
}
