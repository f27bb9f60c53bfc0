//! Error types for fragment dispatch.

use crate::document::HostError;

/// Why a single code unit failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("empty or too short code fragment ({len} chars, minimum {min})")]
    EmptyFragment { len: usize, min: usize },

    #[error("script error on line {line}: {message}")]
    Script { line: usize, message: String },

    #[error("policy denied: {reason}")]
    PolicyDenied { reason: String },

    #[error("document error: {0}")]
    Host(#[from] HostError),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("fragment panicked: {0}")]
    Panicked(String),
}
