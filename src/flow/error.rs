//! Errors raised by the flow core.
//!
//! Recoverable conditions (bad id, missing entry, out-of-order step) are
//! redirects, not errors. What remains here indicates a bug or corrupted
//! storage and should fail the request loudly.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("'{0}' is not a valid flow id")]
    InvalidId(String),

    #[error("failed to encode flow state: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("stored flow state under '{key}' is unreadable: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("flow invariant violated: {0}")]
    Invariant(String),
}

impl FlowError {
    pub fn invariant(message: impl Into<String>) -> Self {
        FlowError::Invariant(message.into())
    }
}
