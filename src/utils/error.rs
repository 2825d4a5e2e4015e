//! The `error` module defines the error type surfaced by the relay's fallible
//! entry points: binding the listener, loading configuration, and the client.
//!
//! Hub operations never fail. Per-connection transport errors are handled
//! by dropping the connection and are not represented here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to bind relay listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid relay url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("envelope codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
