//! The compression backend seam.
//!
//! The summarizer only needs text in, text out. Anything that can turn a
//! dialogue payload plus an instruction block into archive text implements
//! [`CompressionBackend`]; [`super::InferenceClient`] is the HTTP one.

use async_trait::async_trait;

use super::errors::InferenceError;

/// Opaque text-in/text-out compression capability.
///
/// One request, one response, no streaming. Implementations must not retry
/// on their own; failures go straight back to the caller.
#[async_trait]
pub trait CompressionBackend: Send + Sync {
    async fn compress(&self, payload: &str, instruction: &str) -> Result<String, InferenceError>;
}
