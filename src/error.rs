//! Error types for the whiteboard relay
//!
//! Defines application-level errors, per-client send errors and
//! configuration errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// None of these are fatal to the process once it is running: they end
/// one connection, one push, or one ingress request.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal for the connection)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Outbound HTTP error (peer push)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Channel send error (dispatcher queue closed)
    #[error("Channel send error")]
    ChannelSend,

    /// Join path did not carry a room code
    #[error("Invalid join path: {0}")]
    InvalidPath(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Message send errors
///
/// Occurs when delivering to a client's outbound buffer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The client is not draining its buffer fast enough
    #[error("Outbound buffer full")]
    BufferFull,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}
