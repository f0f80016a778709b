//! Inference Client — the compression backend.
//!
//! - `backend`: the `CompressionBackend` trait the summarizer depends on
//! - `client`: OpenAI-compatible HTTP implementation (non-streaming)
//! - `config`: model configuration loading from `_models/config.yaml`
//! - `types`: request/response wire types
//! - `errors`: backend error types
//!
//! The client speaks the OpenAI Chat Completions API, so the archive model is
//! interchangeable via config.

pub mod backend;
pub mod client;
pub mod config;
pub mod errors;
pub mod types;

// Re-exports for convenience
pub use backend::CompressionBackend;
pub use client::InferenceClient;
pub use config::{ModelConfig, ModelsConfig};
pub use errors::InferenceError;
pub use types::{ChatMessage, Role};
