use thiserror::Error;

/// Caller-facing failures of the connection manager.
#[derive(Debug, Error)]
pub enum LiveError {
    #[error("Failed to connect to {key}'s livestream: {reason}")]
    Connect { key: String, reason: String },

    #[error("Not connected to {0}'s livestream. Use live_connect first.")]
    NotConnected(String),

    #[error("Invalid history kind '{0}' (expected chat, gift, like or roster)")]
    InvalidKind(String),

    /// Internal terminal condition; callers only ever observe the
    /// `NotConnected` that follows it.
    #[error("Max reconnection attempts reached for {0}'s livestream")]
    ReconnectExhausted(String),
}

pub type Result<T> = std::result::Result<T, LiveError>;
