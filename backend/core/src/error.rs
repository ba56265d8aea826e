use thiserror::Error;

use crate::envelope::Action;

/// Top-level error type for the relay core.
///
/// The `Display` text of the router variants is sent verbatim to the client
/// as the payload of an `ERROR` envelope.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Message size exceeds maximum limit of {limit} bytes")]
    FrameTooLarge { limit: usize },

    #[error("Error handling message: {0}")]
    Malformed(String),

    #[error("Channel is required")]
    MissingChannel,

    #[error("Unknown action: {0}")]
    UnknownAction(Action),

    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("send buffer full for connection {0}")]
    SendBufferFull(String),

    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}

impl RelayError {
    /// Wrap an error raised while executing an already validated intent.
    pub fn handling(err: impl std::fmt::Display) -> Self {
        RelayError::Malformed(err.to_string())
    }
}
