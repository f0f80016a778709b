//! Summary Core error types.

use thiserror::Error;

use crate::inference::InferenceError;

/// Errors that can occur while compressing a conversation.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// Requested span is outside `[1, total_pairs]`, or there is no dialogue.
    #[error("turn count {requested} is out of range: {total_pairs} dialogue pair(s) available")]
    InvalidRange { requested: usize, total_pairs: usize },

    /// Level field at confirmation time was empty or not a number.
    #[error("compression level must be a number between 0 and 10 (got '{input}')")]
    InvalidLevel { input: String },

    /// The compression backend failed. `detail` is the raw backend error.
    #[error("compression backend failed: {detail}")]
    CompressionBackend { detail: String },

    /// Another compression is still running for this session.
    #[error("a compression is already in progress")]
    CompressionInProgress,

    /// Persistence failed.
    #[error("storage error: {reason}")]
    Storage { reason: String },
}

impl From<rusqlite::Error> for SummaryError {
    fn from(e: rusqlite::Error) -> Self {
        SummaryError::Storage {
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for SummaryError {
    fn from(e: serde_json::Error) -> Self {
        SummaryError::Storage {
            reason: format!("serialization: {e}"),
        }
    }
}

impl From<InferenceError> for SummaryError {
    fn from(e: InferenceError) -> Self {
        SummaryError::CompressionBackend {
            detail: e.to_string(),
        }
    }
}
