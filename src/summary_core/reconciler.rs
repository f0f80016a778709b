//! Reconciler — merges an archive back into live state.
//!
//! Given the current store and fresh archive text, produces a new store (the
//! preserved tail plus one summary turn) and a model-facing history rebuilt
//! from scratch. Pure: the caller swaps both values in after this returns, so
//! no partial state is ever observable.

use super::level::CompressionLevel;
use super::types::{ChatTurn, ConversationStore, HistoryRecord, HistoryRole, ModelHistory, TurnRole};

/// Pairs kept verbatim after a compression pass.
pub const DEFAULT_PRESERVE_TURNS: usize = 20;

/// Opening user record used when the preserved tail starts with a model turn.
pub const CONVERSATION_START_SENTINEL: &str = "[Conversation start]";

/// User record that precedes the seeded archive.
pub const RECAP_REQUEST: &str = "Please summarize everything so far.";

/// Display metadata stamped onto the summary turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryStamp {
    /// Pairs covered by the archive (always `1..=total_pairs`).
    pub total_pairs: usize,
    pub level: CompressionLevel,
}

impl SummaryStamp {
    /// Wrap archive text for display. The archive itself is left untouched.
    pub fn render(&self, archive_text: &str) -> String {
        format!(
            "📌 **Chat summary (pairs 1–{}, level {})**\n\n{archive_text}",
            self.total_pairs, self.level
        )
    }
}

/// Index where the preserved tail begins.
///
/// Starts `preserve_turn_count * 2` messages from the end and walks forward
/// to the next user turn, so the tail never opens mid-pair. Returns
/// `turns.len()` when no user turn is left.
pub fn preserve_start_index(turns: &[ChatTurn], preserve_turn_count: usize) -> usize {
    let preserve_messages = preserve_turn_count.saturating_mul(2).min(turns.len());
    let mut start = turns.len() - preserve_messages;
    while start < turns.len() && turns[start].role != TurnRole::User {
        start += 1;
    }
    start
}

/// Build the post-compression store and model history.
pub fn apply_compression(
    store: &ConversationStore,
    archive_text: &str,
    stamp: SummaryStamp,
    preserve_turn_count: usize,
) -> (ConversationStore, ModelHistory) {
    let start_index = preserve_start_index(&store.turns, preserve_turn_count);
    let recent = &store.turns[start_index..];

    let mut turns = recent.to_vec();
    turns.push(ChatTurn::summary_artifact(stamp.render(archive_text)));

    let new_store = ConversationStore {
        turns,
        current_archive: Some(archive_text.to_string()),
    };

    let mut history = history_from_turns(recent);
    seed_archive(&mut history, archive_text);

    tracing::debug!(
        start_index,
        preserved = recent.len(),
        history_len = history.len(),
        "reconciled compression"
    );

    (new_store, history)
}

/// Model-facing records for dialogue turns. Artifacts are skipped; a leading
/// model record gets a user sentinel in front of it.
pub(crate) fn history_from_turns(turns: &[ChatTurn]) -> ModelHistory {
    let mut history = ModelHistory::new();
    push_dialogue(&mut history, turns);

    if history.first().is_some_and(|r| r.role == HistoryRole::Model) {
        history
            .records
            .insert(0, HistoryRecord::user(CONVERSATION_START_SENTINEL));
    }
    history
}

/// Rebuild the model history for a stored conversation.
///
/// Matches what `apply_compression` produced and what the chat loop appended
/// since: dialogue up to the latest summary turn, the recap exchange, then
/// the dialogue recorded after it. Without an archive this is plain
/// `history_from_turns`.
pub(crate) fn rebuild_history(store: &ConversationStore) -> ModelHistory {
    let last_artifact = store.turns.iter().rposition(|t| t.is_summary_artifact);
    let (Some(index), Some(archive)) = (last_artifact, store.current_archive.as_deref()) else {
        return history_from_turns(&store.turns);
    };

    let mut history = history_from_turns(&store.turns[..index]);
    seed_archive(&mut history, archive);
    push_dialogue(&mut history, &store.turns[index + 1..]);
    history
}

/// Append dialogue records for `turns`, skipping summary turns.
fn push_dialogue(history: &mut ModelHistory, turns: &[ChatTurn]) {
    for turn in turns {
        match turn.role {
            TurnRole::User => history.push(HistoryRecord::user(turn.content.clone())),
            TurnRole::Agent if !turn.is_summary_artifact => {
                history.push(HistoryRecord::model(turn.content.clone()))
            }
            TurnRole::Agent => {}
        }
    }
}

/// Append the recap exchange so the model sees the archive as its own output.
pub(crate) fn seed_archive(history: &mut ModelHistory, archive_text: &str) {
    history.push(HistoryRecord::user(RECAP_REQUEST));
    history.push(HistoryRecord::model(archive_text));
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary_core::orchestrator::tests::store_with_pairs;

    fn stamp(total_pairs: usize) -> SummaryStamp {
        SummaryStamp {
            total_pairs,
            level: CompressionLevel::default(),
        }
    }

    #[test]
    fn test_end_to_end_twenty_two_pairs() {
        // 44 turns; insert an extra agent turn at index 4 so the walk has to advance.
        let mut store = store_with_pairs(22);
        store.turns[4] = ChatTurn::agent("stray agent turn");
        assert_eq!(store.len(), 44);

        let start = preserve_start_index(&store.turns, 20);
        assert_eq!(start, 6);

        let (new_store, history) = apply_compression(&store, "ARCHIVE_X", stamp(22), 20);
        assert_eq!(new_store.len(), (44 - start) + 1);
        assert_eq!(new_store.current_archive.as_deref(), Some("ARCHIVE_X"));
        assert_eq!(new_store.turns[0].role, TurnRole::User);

        let last = new_store.turns.last().unwrap();
        assert!(last.is_summary_artifact);
        assert_eq!(last.role, TurnRole::Agent);
        assert!(last.content.contains("pairs 1–22, level 5"));
        assert!(last.content.ends_with("ARCHIVE_X"));

        let n = history.len();
        assert_eq!(history.records[n - 2], HistoryRecord::user(RECAP_REQUEST));
        assert_eq!(history.records[n - 1], HistoryRecord::model("ARCHIVE_X"));
    }

    #[test]
    fn test_start_index_on_aligned_store() {
        let store = store_with_pairs(22);
        // 44 - 40 = 4, already a user turn.
        assert_eq!(preserve_start_index(&store.turns, 20), 4);
    }

    #[test]
    fn test_short_store_preserved_whole() {
        let store = store_with_pairs(3);
        let (new_store, history) = apply_compression(&store, "A", stamp(3), 20);
        assert_eq!(new_store.len(), 7);
        // 6 dialogue records + recap + archive
        assert_eq!(history.len(), 8);
        assert_eq!(history.records[0].role, HistoryRole::User);
    }

    #[test]
    fn test_tail_never_starts_on_agent() {
        let mut store = store_with_pairs(4);
        // Misaligned: drop the first user turn so agent turns land on even indices.
        store.turns.remove(0);
        for preserve in 0..6 {
            let (new_store, _) = apply_compression(&store, "A", stamp(3), preserve);
            let tail = &new_store.turns[..new_store.len() - 1];
            if let Some(first) = tail.first() {
                assert_eq!(first.role, TurnRole::User, "preserve={preserve}");
            }
        }
    }

    #[test]
    fn test_no_user_turn_left_gives_empty_tail() {
        let mut store = ConversationStore::new();
        store.push_agent("a");
        store.push_agent("b");
        let (new_store, history) = apply_compression(&store, "A", stamp(1), 20);
        assert_eq!(new_store.len(), 1);
        assert_eq!(history.len(), 2);
        assert_eq!(history.records[0], HistoryRecord::user(RECAP_REQUEST));
    }

    #[test]
    fn test_recompressing_lone_artifact() {
        let mut store = ConversationStore::new();
        store.turns.push(ChatTurn::summary_artifact("old wrapper"));
        store.current_archive = Some("old".into());

        let (new_store, history) = apply_compression(&store, "NEW", stamp(0), 20);
        assert_eq!(new_store.len(), 1);
        assert!(new_store.turns[0].is_summary_artifact);
        assert_eq!(
            history.records,
            vec![HistoryRecord::user(RECAP_REQUEST), HistoryRecord::model("NEW")]
        );
    }

    #[test]
    fn test_artifacts_in_tail_are_skipped_in_history() {
        let mut store = ConversationStore::new();
        store.push_user("u1");
        store.turns.push(ChatTurn::summary_artifact("old archive"));
        store.push_agent("a1");

        let (new_store, history) = apply_compression(&store, "NEW", stamp(1), 20);
        // Store keeps the old artifact verbatim; history drops it.
        assert_eq!(new_store.len(), 4);
        assert_eq!(
            history.records,
            vec![
                HistoryRecord::user("u1"),
                HistoryRecord::model("a1"),
                HistoryRecord::user(RECAP_REQUEST),
                HistoryRecord::model("NEW"),
            ]
        );
    }

    #[test]
    fn test_sentinel_prepended_when_history_opens_on_model() {
        let turns = vec![ChatTurn::agent("greeting"), ChatTurn::user("hi")];
        let history = history_from_turns(&turns);
        assert_eq!(
            history.records[0],
            HistoryRecord::user(CONVERSATION_START_SENTINEL)
        );
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_rebuild_matches_apply_compression() {
        let store = store_with_pairs(25);
        let (new_store, history) = apply_compression(&store, "ARCHIVE", stamp(25), 20);
        assert_eq!(rebuild_history(&new_store), history);
    }

    #[test]
    fn test_rebuild_keeps_archive_after_later_exchanges() {
        let store = store_with_pairs(3);
        let (mut new_store, mut history) = apply_compression(&store, "ARCHIVE", stamp(3), 20);
        new_store.push_user("after");
        new_store.push_agent("reply");
        history.push(HistoryRecord::user("after"));
        history.push(HistoryRecord::model("reply"));

        let rebuilt = rebuild_history(&new_store);
        assert_eq!(rebuilt, history);
        let n = rebuilt.len();
        assert_eq!(rebuilt.records[n - 4], HistoryRecord::user(RECAP_REQUEST));
        assert_eq!(rebuilt.records[n - 3], HistoryRecord::model("ARCHIVE"));
    }

    #[test]
    fn test_rebuild_without_archive_is_plain_history() {
        let mut store = store_with_pairs(2);
        store.turns.push(ChatTurn::summary_artifact("orphan"));
        assert_eq!(rebuild_history(&store), history_from_turns(&store.turns));
        assert_eq!(rebuild_history(&store).len(), 4);
    }

    #[test]
    fn test_original_store_untouched() {
        let store = store_with_pairs(30);
        let before = store.clone();
        let _ = apply_compression(&store, "A", stamp(30), 20);
        assert_eq!(store, before);
    }
}
