//! Error types for the chat relay
//!
//! Defines application-level errors and per-session send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Connection errors end a single session; configuration and
/// listener errors are fatal at startup.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (bind failures are fatal, stream failures end a session)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be used
    #[error("configuration error: {0}")]
    Config(String),
}

/// Message send errors
///
/// Occurs when writing to a session whose outbound stream is already closed.
#[derive(Debug, Error)]
pub enum SendError {
    /// The session's outbound channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}
