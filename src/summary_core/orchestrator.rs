//! Summarization orchestrator — eligibility, request construction and the
//! backend call.
//!
//! The orchestrator never mutates the store. It validates the requested span,
//! flattens the dialogue into a payload, attaches the instruction block, and
//! hands back whatever archive text the backend produced. Merging that text
//! into live state is the reconciler's job.
//!
//! The payload is always the full stored dialogue plus the prior archive; the
//! requested turn count only drives the preview range.

use std::fmt::Write as _;

use crate::inference::CompressionBackend;

use super::errors::SummaryError;
use super::level::{build_instruction, CompressionLevel};
use super::prompt::LATEST_DIALOGUE_TAG;
use super::tokens;
use super::types::{CharacterInfo, ConversationStore};

// ─── Planning ───────────────────────────────────────────────────────────────

/// A validated compression span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionPlan {
    /// Dialogue pairs currently stored.
    pub total_pairs: usize,
    /// Pairs the user asked to compress.
    pub turns_to_compress: usize,
    /// First pair of the presentational range (1-based).
    pub start_pair: usize,
}

impl CompressionPlan {
    /// Human-readable description of the selected range.
    pub fn preview(&self) -> String {
        format!(
            "Compressing {} of {} pairs: pairs {}–{}",
            self.turns_to_compress, self.total_pairs, self.start_pair, self.total_pairs
        )
    }
}

/// Validate `turns_to_compress` against the store and compute the range.
///
/// Fails with `InvalidRange` when there is no complete pair, when the request
/// is zero, or when it exceeds the stored pair count.
pub fn plan_compression(
    store: &ConversationStore,
    turns_to_compress: usize,
) -> Result<CompressionPlan, SummaryError> {
    let total_pairs = store.total_pairs();
    if total_pairs == 0 || turns_to_compress == 0 || turns_to_compress > total_pairs {
        return Err(SummaryError::InvalidRange {
            requested: turns_to_compress,
            total_pairs,
        });
    }

    Ok(CompressionPlan {
        total_pairs,
        turns_to_compress,
        start_pair: (total_pairs - turns_to_compress + 1).max(1),
    })
}

// ─── Payload ────────────────────────────────────────────────────────────────

/// Flatten every stored turn into `"{speaker}: {content}\n\n"` lines, prefixed
/// by the prior archive when one exists.
pub fn build_payload(store: &ConversationStore, character: &CharacterInfo) -> String {
    let mut dialogue = String::new();
    for turn in &store.turns {
        let _ = write!(
            dialogue,
            "{}: {}\n\n",
            character.speaker_label(turn.role),
            turn.content
        );
    }

    match store.current_archive.as_deref() {
        Some(prior) => format!("{prior}\n\n{LATEST_DIALOGUE_TAG}\n{dialogue}"),
        None => dialogue,
    }
}

// ─── Request ────────────────────────────────────────────────────────────────

/// Build and send one compression request; returns the raw archive text.
///
/// Validation happens before anything is sent. Backend failures come back as
/// `CompressionBackend` and are not retried.
pub async fn request_compression(
    store: &ConversationStore,
    character: &CharacterInfo,
    level: CompressionLevel,
    backend: &dyn CompressionBackend,
    turns_to_compress: usize,
) -> Result<String, SummaryError> {
    let plan = plan_compression(store, turns_to_compress)?;

    let payload = build_payload(store, character);
    let instruction = build_instruction(level);

    tracing::info!(
        total_pairs = plan.total_pairs,
        turns_to_compress = plan.turns_to_compress,
        start_pair = plan.start_pair,
        level = level.value(),
        has_prior_archive = store.current_archive.is_some(),
        payload_tokens = tokens::estimate_tokens(&payload),
        "requesting compression"
    );

    let archive = backend.compress(&payload, &instruction).await.map_err(|e| {
        tracing::error!(error = %e, "compression backend failed");
        SummaryError::from(e)
    })?;

    tracing::info!(
        archive_tokens = tokens::estimate_tokens(&archive),
        "compression returned"
    );

    Ok(archive)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
