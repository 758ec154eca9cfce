mod message;
mod negotiation;
mod participant;
mod room;

pub use message::{ClientMessage, DEFAULT_STUN_SERVER, IceServerConfig, ServerMessage};
pub use negotiation::{IceCandidate, NegotiationPayload, SdpKind, SessionDescription};
pub use participant::ParticipantId;
pub use room::RoomId;
