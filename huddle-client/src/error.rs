/// Result type alias using the client [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("WebRTC error: {0}")]
    WebRtc(#[from] webrtc::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The relay said something that does not fit the protocol.
    #[error("Signaling error: {0}")]
    Signaling(String),

    #[error("Signaling connection closed")]
    ConnectionClosed,

    #[error("Operation timeout: {0}")]
    Timeout(String),
}
