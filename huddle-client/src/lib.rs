mod config;
mod error;
mod session;

pub mod connection;
pub mod media;
pub mod peer;
pub mod signaling;

pub use config::*;
pub use error::{Error, Result};
pub use session::Session;

pub use huddle_core::{IceServerConfig, ParticipantId, RoomId};
