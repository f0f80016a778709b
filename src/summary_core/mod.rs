//! Summary Core — conversation compression and state reconciliation.
//!
//! Submodules:
//! - `level`: Compression level (0–10), clamping, persistence, instruction text
//! - `prompt`: Instruction template, archive markers and section headers
//! - `orchestrator`: Range validation, payload construction, backend call
//! - `reconciler`: Merges an archive with the preserved tail, rebuilds history
//! - `session`: Per-conversation state and the compression trigger guard
//! - `database`: SQLite key/value persistence for store and level
//! - `archive`: Reader for backend-produced archive text
//! - `tokens`: Token estimation for reports and logs
//! - `types`: Turns, store, model-facing history, speaker labels
//! - `errors`: Summary-level error types

pub mod archive;
pub mod database;
pub mod errors;
pub mod level;
pub mod orchestrator;
pub mod prompt;
pub mod reconciler;
pub mod session;
pub mod tokens;
pub mod types;

// Re-exports for convenience
pub use archive::ArchiveDocument;
pub use database::ChatDatabase;
pub use errors::SummaryError;
pub use level::{build_instruction, CompressionLevel, RetentionMode};
pub use orchestrator::{build_payload, plan_compression, request_compression, CompressionPlan};
pub use reconciler::{apply_compression, SummaryStamp, DEFAULT_PRESERVE_TURNS};
pub use session::{ChatSession, CompressionTrigger, TriggerGuard};
pub use types::{
    CharacterInfo, ChatTurn, ConversationStore, HistoryRecord, HistoryRole, ModelHistory,
    TurnRole,
};
