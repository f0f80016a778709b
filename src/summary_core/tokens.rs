//! Token estimation for compression reports and logging.
//!
//! Uses a character-based heuristic calibrated conservatively for LLM
//! tokenizers (~3.2 chars/token; overestimating is safer than the reverse).

use super::types::{ConversationStore, ModelHistory};

/// Average characters per token for prose.
const CHARS_PER_TOKEN: f64 = 3.2;

/// Per-message overhead (role label, formatting tokens).
const MESSAGE_OVERHEAD_TOKENS: u32 = 4;

/// Truncate a string to at most `max_bytes` bytes on a valid UTF-8 char boundary.
pub(crate) fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Estimate the token count for a string of natural language text.
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.len() as f64;
    (chars / CHARS_PER_TOKEN).ceil() as u32
}

/// Estimate the tokens the downstream model will receive for a history.
pub fn estimate_history_tokens(history: &ModelHistory) -> u32 {
    history
        .records
        .iter()
        .map(|r| estimate_tokens(&r.text) + MESSAGE_OVERHEAD_TOKENS)
        .sum()
}

/// Estimate the tokens held in a store's turns.
pub fn estimate_store_tokens(store: &ConversationStore) -> u32 {
    store
        .turns
        .iter()
        .map(|t| estimate_tokens(&t.content) + MESSAGE_OVERHEAD_TOKENS)
        .sum()
}
