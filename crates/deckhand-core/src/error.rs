//! Crate-level error taxonomy for deckhand.

use crate::config::ConfigError;
use crate::document::HostError;
use crate::publish::TransportError;

/// Errors surfaced by deckhand's public entry points.
///
/// Per-shape, per-slide and per-unit failures are never raised through this
/// type; they are recorded in the reports those operations return.
#[derive(Debug, thiserror::Error)]
pub enum DeckError {
    #[error("document error: {0}")]
    Host(#[from] HostError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for deckhand operations.
pub type Result<T> = std::result::Result<T, DeckError>;
