//! Errors reported by a document host or the request queue in front of it.

/// Errors produced while talking to a document host.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    #[error("slide {index} not found")]
    SlideNotFound { index: usize },

    #[error("shape {id} not found on slide {slide}")]
    ShapeNotFound { slide: usize, id: String },

    #[error("shape {id} on slide {slide} is not a group")]
    NotAGroup { slide: usize, id: String },

    #[error("invalid edit of {property} on shape {id}: {reason}")]
    InvalidEdit {
        id: String,
        property: String,
        reason: String,
    },

    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("synchronization failed: {0}")]
    SyncFailed(String),

    #[error("value read before its synchronization point")]
    NotSynced,

    #[error("host returned an unexpected reply: expected {expected}")]
    UnexpectedReply { expected: &'static str },
}

/// Result type for document host operations.
pub type HostResult<T> = std::result::Result<T, HostError>;
