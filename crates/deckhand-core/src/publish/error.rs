//! Error types for the transport layer.

/// Errors produced while shipping data to, or fetching code from, the backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode backend response: {0}")]
    Decode(String),

    #[error("could not read document file: {0}")]
    Source(String),

    #[error("backend rejected the request: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Source(err.to_string())
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;
