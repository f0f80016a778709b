//! UI-facing commands for the compression dialog.
//!
//! `open_compression_dialog` fills the dialog; `confirm_compression` runs a
//! compression end to end. Errors cross this boundary as display strings.

use std::sync::Mutex;

use serde::Serialize;
use uuid::Uuid;

use crate::inference::CompressionBackend;
use crate::summary_core::tokens::{estimate_history_tokens, estimate_store_tokens, truncate_utf8};
use crate::summary_core::{
    apply_compression, plan_compression, request_compression, ArchiveDocument, ChatDatabase,
    ChatSession, CompressionLevel, SummaryError, SummaryStamp, DEFAULT_PRESERVE_TURNS,
};
use crate::TokioMutex;

/// Turn count pre-filled in the dialog (capped by what is stored).
const SUGGESTED_TURNS: usize = 20;

/// Archive characters echoed into the log line on success.
const LOG_PREVIEW_BYTES: usize = 120;

// ─── Response Types ─────────────────────────────────────────────────────────

/// Everything the compression dialog shows when it opens.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionDialogInfo {
    pub total_pairs: usize,
    pub suggested_turns: usize,
    pub level: u8,
    pub hint: String,
    pub preview: String,
}

/// Result of a successful compression.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionReport {
    pub request_id: String,
    pub total_pairs: usize,
    /// Dialogue turns kept verbatim ahead of the summary turn.
    pub preserved_turns: usize,
    pub level: u8,
    pub archive_text: String,
    /// Whether the archive carried the expected markers.
    pub archive_recognized: bool,
    pub history_tokens_before: u32,
    pub history_tokens_after: u32,
    pub store_tokens_before: u32,
    pub store_tokens_after: u32,
    pub message: String,
}

// ─── Commands ───────────────────────────────────────────────────────────────

/// Prepare the compression dialog.
///
/// Fails when there is no complete dialogue pair to compress.
pub async fn open_compression_dialog(
    session: &TokioMutex<ChatSession>,
) -> Result<CompressionDialogInfo, String> {
    let session = session.lock().await;
    if session.store().is_empty() {
        return Err("There is no conversation to summarize.".to_string());
    }
    let total_pairs = session.total_pairs();
    if total_pairs == 0 {
        return Err("Not enough conversation to summarize yet.".to_string());
    }

    let suggested_turns = SUGGESTED_TURNS.min(total_pairs);
    Ok(CompressionDialogInfo {
        total_pairs,
        suggested_turns,
        level: session.level().value(),
        hint: range_hint(total_pairs),
        preview: compression_preview(total_pairs, &suggested_turns.to_string()),
    })
}

/// Preview text for whatever is currently typed in the turn field.
pub fn compression_preview(total_pairs: usize, turns_input: &str) -> String {
    let turns = parse_turns(turns_input);
    if turns > 0 && turns <= total_pairs {
        let start_pair = (total_pairs - turns + 1).max(1);
        format!(
            "Example: entering {turns} of {total_pairs} pairs summarizes pairs {start_pair}–{total_pairs}."
        )
    } else {
        format!("Example: {}", range_hint(total_pairs))
    }
}

/// Validate the dialog input, run the compression, and swap in the result.
///
/// On any failure the conversation is left exactly as it was and the trigger
/// is released. A failed save after a successful compression is logged only.
pub async fn confirm_compression(
    session: &TokioMutex<ChatSession>,
    db: &Mutex<ChatDatabase>,
    backend: &dyn CompressionBackend,
    turns_input: &str,
    level_input: &str,
) -> Result<CompressionReport, String> {
    let request_id = Uuid::new_v4().to_string();

    // Validate and snapshot under the lock; the backend call runs without it.
    let (_guard, plan, level, snapshot, character) = {
        let mut session = session.lock().await;

        let level = CompressionLevel::parse_strict(level_input).map_err(|e| {
            tracing::warn!(request_id = %request_id, input = level_input, "rejected compression level");
            e.to_string()
        })?;
        let plan = plan_compression(session.store(), parse_turns(turns_input))
            .map_err(|e| e.to_string())?;
        let guard = session
            .trigger()
            .try_acquire()
            .ok_or_else(|| SummaryError::CompressionInProgress.to_string())?;

        {
            let db = db.lock().map_err(|e| format!("Lock error: {e}"))?;
            session.set_level(level, &db);
        }

        (
            guard,
            plan,
            level,
            session.store().clone(),
            session.character().clone(),
        )
    };

    tracing::info!(
        request_id = %request_id,
        preview = %plan.preview(),
        level = level.value(),
        "compression confirmed"
    );

    let archive = request_compression(
        &snapshot,
        &character,
        level,
        backend,
        plan.turns_to_compress,
    )
    .await
    .map_err(|e| {
        tracing::error!(request_id = %request_id, error = %e, "compression failed");
        e.to_string()
    })?;

    let archive_recognized = match ArchiveDocument::parse(&archive) {
        Some(doc) => {
            if doc.metadata.level.is_some_and(|l| l != level) {
                tracing::warn!(
                    request_id = %request_id,
                    requested = level.value(),
                    recorded = ?doc.metadata.level.map(CompressionLevel::value),
                    "archive records a different level"
                );
            }
            if !doc.is_complete() {
                tracing::warn!(request_id = %request_id, "archive is missing sections");
            }
            true
        }
        None => {
            tracing::warn!(request_id = %request_id, "archive has no start/end markers");
            false
        }
    };

    let mut session = session.lock().await;
    let history_tokens_before = estimate_history_tokens(session.history());
    let store_tokens_before = estimate_store_tokens(session.store());
    let stamp = SummaryStamp {
        total_pairs: plan.total_pairs,
        level,
    };
    let (store, history) =
        apply_compression(session.store(), &archive, stamp, DEFAULT_PRESERVE_TURNS);
    let preserved_turns = store.len() - 1;
    let history_tokens_after = estimate_history_tokens(&history);
    let store_tokens_after = estimate_store_tokens(&store);
    session.replace_state(store, history);

    match db.lock() {
        Ok(db) => session.persist(&db),
        Err(e) => tracing::error!(error = %e, "database lock poisoned, conversation not saved"),
    }

    tracing::info!(
        request_id = %request_id,
        total_pairs = plan.total_pairs,
        preserved_turns,
        history_tokens_before,
        history_tokens_after,
        store_tokens_before,
        store_tokens_after,
        archive_preview = %truncate_utf8(&archive, LOG_PREVIEW_BYTES),
        "compression applied"
    );

    Ok(CompressionReport {
        request_id,
        total_pairs: plan.total_pairs,
        preserved_turns,
        level: level.value(),
        message: format!(
            "Summarized {} pairs (kept the most recent {DEFAULT_PRESERVE_TURNS} pairs).",
            plan.total_pairs
        ),
        archive_text: archive,
        archive_recognized,
        history_tokens_before,
        history_tokens_after,
        store_tokens_before,
        store_tokens_after,
    })
}

/// Store a new level from the level field (lenient: clamped, bad input falls
/// back to the default). Returns the value actually stored.
pub async fn set_compression_level(
    session: &TokioMutex<ChatSession>,
    db: &Mutex<ChatDatabase>,
    raw: &str,
) -> Result<u8, String> {
    let level = CompressionLevel::from_raw(raw);
    let mut session = session.lock().await;
    let db = db.lock().map_err(|e| format!("Lock error: {e}"))?;
    session.set_level(level, &db);
    Ok(level.value())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn range_hint(total_pairs: usize) -> String {
    format!("Enter a number between 1 and {total_pairs}.")
}

/// Parse the turn field from its leading digits (`"3.5"` reads as 3,
/// `"10 pairs"` as 10). No leading digits counts as zero.
fn parse_turns(input: &str) -> usize {
    let digits: String = input
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(0)
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary_core::orchestrator::tests::{store_with_pairs, ScriptedBackend};
    use crate::summary_core::prompt::{ARCHIVE_END_MARKER, ARCHIVE_START_MARKER};
    use crate::summary_core::{CharacterInfo, HistoryRole, TurnRole};

    fn session_with_pairs(pairs: usize) -> TokioMutex<ChatSession> {
        let mut session = ChatSession::new(CharacterInfo::default(), CompressionLevel::default());
        let store = store_with_pairs(pairs);
        for pair in store.turns.chunks(2) {
            session.record_exchange(&pair[0].content, &pair[1].content);
        }
        TokioMutex::new(session)
    }

    fn memory_db() -> Mutex<ChatDatabase> {
        Mutex::new(ChatDatabase::open(":memory:").unwrap())
    }

    #[tokio::test]
    async fn test_open_dialog_empty_store() {
        let session = session_with_pairs(0);
        assert!(open_compression_dialog(&session).await.is_err());
    }

    #[tokio::test]
    async fn test_open_dialog_suggests_capped_turns() {
        let info = open_compression_dialog(&session_with_pairs(7)).await.unwrap();
        assert_eq!(info.total_pairs, 7);
        assert_eq!(info.suggested_turns, 7);
        assert_eq!(info.level, 5);
        assert!(info.preview.contains("pairs 1–7"));

        let info = open_compression_dialog(&session_with_pairs(30)).await.unwrap();
        assert_eq!(info.suggested_turns, 20);
        assert!(info.preview.contains("pairs 11–30"));
    }

    #[test]
    fn test_preview_for_invalid_input_shows_hint() {
        assert_eq!(
            compression_preview(5, "abc"),
            "Example: Enter a number between 1 and 5."
        );
        assert!(compression_preview(5, "6").contains("between 1 and 5"));
        assert!(compression_preview(22, "10").contains("pairs 13–22"));
    }

    #[tokio::test]
    async fn test_set_level_clamps_and_persists() {
        let session = session_with_pairs(1);
        let db = memory_db();
        assert_eq!(set_compression_level(&session, &db, "15").await.unwrap(), 10);
        assert_eq!(set_compression_level(&session, &db, "oops").await.unwrap(), 5);
        assert_eq!(set_compression_level(&session, &db, "2").await.unwrap(), 2);
        assert_eq!(session.lock().await.level().value(), 2);
        assert_eq!(CompressionLevel::load(&db.lock().unwrap()).value(), 2);
    }

    #[test]
    fn test_parse_turns_reads_leading_digits() {
        assert_eq!(parse_turns("3.5"), 3);
        assert_eq!(parse_turns(" 10 "), 10);
        assert_eq!(parse_turns("7 pairs"), 7);
        assert_eq!(parse_turns("abc"), 0);
        assert_eq!(parse_turns("-2"), 0);
        assert_eq!(parse_turns(""), 0);
    }

    #[tokio::test]
    async fn test_confirm_accepts_fractional_turn_input() {
        let session = session_with_pairs(4);
        let backend = ScriptedBackend::replying("A");
        let report = confirm_compression(&session, &memory_db(), &backend, "3.5", "5")
            .await
            .unwrap();
        assert_eq!(report.total_pairs, 4);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_confirm_end_to_end() {
        let session = session_with_pairs(22);
        let db = memory_db();
        let backend = ScriptedBackend::replying("ARCHIVE_X");

        let report = confirm_compression(&session, &db, &backend, "10", "7")
            .await
            .unwrap();
        assert_eq!(report.total_pairs, 22);
        assert_eq!(report.preserved_turns, 40);
        assert_eq!(report.level, 7);
        assert_eq!(report.archive_text, "ARCHIVE_X");
        assert!(!report.archive_recognized);
        assert!(report.history_tokens_after < report.history_tokens_before);
        assert!(report.store_tokens_after < report.store_tokens_before);

        let session = session.lock().await;
        assert_eq!(session.store().len(), 41);
        assert_eq!(session.store().turns[0].role, TurnRole::User);
        assert_eq!(session.store().current_archive.as_deref(), Some("ARCHIVE_X"));
        assert_eq!(session.level().value(), 7);
        assert!(!session.trigger().is_busy());
        let last = session.history().records.last().unwrap();
        assert_eq!(last.role, HistoryRole::Model);
        assert_eq!(last.text, "ARCHIVE_X");

        let db = db.lock().unwrap();
        assert_eq!(db.load_store().unwrap().unwrap(), *session.store());
        assert_eq!(CompressionLevel::load(&db).value(), 7);
    }

    #[tokio::test]
    async fn test_confirm_second_pass_feeds_prior_archive() {
        let session = session_with_pairs(3);
        let db = memory_db();
        let archive = format!("{ARCHIVE_START_MARKER}\n[META]\nlevel:5\n{ARCHIVE_END_MARKER}");
        let backend = ScriptedBackend::replying(&archive);

        let report = confirm_compression(&session, &db, &backend, "3", "5")
            .await
            .unwrap();
        assert!(report.archive_recognized);

        // Store now holds 6 dialogue turns plus the artifact: 3 pairs.
        confirm_compression(&session, &db, &backend, "3", "5")
            .await
            .unwrap();

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].0.starts_with(&format!("{archive}\n\n[LATEST]\n")));
    }

    #[tokio::test]
    async fn test_confirm_rejects_empty_level_without_mutation() {
        let session = session_with_pairs(4);
        let before = session.lock().await.store().clone();
        let db = memory_db();
        let backend = ScriptedBackend::replying("never");

        let err = confirm_compression(&session, &db, &backend, "2", "")
            .await
            .unwrap_err();
        assert!(err.contains("between 0 and 10"));
        assert_eq!(backend.call_count(), 0);
        assert_eq!(session.lock().await.store(), &before);
        assert!(db.lock().unwrap().load_level_raw().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_confirm_rejects_out_of_range_turns() {
        let session = session_with_pairs(1);
        let backend = ScriptedBackend::replying("never");

        let err = confirm_compression(&session, &memory_db(), &backend, "2", "5")
            .await
            .unwrap_err();
        assert!(err.contains("out of range"));

        let err = confirm_compression(&session, &memory_db(), &backend, "", "5")
            .await
            .unwrap_err();
        assert!(err.contains("out of range"));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_confirm_backend_failure_leaves_store_and_releases_trigger() {
        let session = session_with_pairs(5);
        let before = session.lock().await.store().clone();
        let backend = ScriptedBackend::failing("upstream 502");

        let err = confirm_compression(&session, &memory_db(), &backend, "5", "3")
            .await
            .unwrap_err();
        assert!(err.contains("upstream 502"));

        let session = session.lock().await;
        assert_eq!(session.store(), &before);
        assert!(!session.trigger().is_busy());
    }

    #[tokio::test]
    async fn test_confirm_while_busy_is_rejected() {
        let session = session_with_pairs(5);
        let _held = session.lock().await.trigger().try_acquire().unwrap();
        let backend = ScriptedBackend::replying("never");

        let err = confirm_compression(&session, &memory_db(), &backend, "5", "3")
            .await
            .unwrap_err();
        assert!(err.contains("already in progress"));
        assert_eq!(backend.call_count(), 0);
    }
}
