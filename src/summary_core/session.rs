//! Chat session context.
//!
//! A `ChatSession` owns everything one conversation needs: the store, the
//! model-facing history, the compression level, the speaker labels, and the
//! trigger that keeps compression requests from overlapping.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::database::ChatDatabase;
use super::errors::SummaryError;
use super::level::CompressionLevel;
use super::reconciler::rebuild_history;
use super::types::{CharacterInfo, ConversationStore, HistoryRecord, ModelHistory};

// ─── Compression Trigger ────────────────────────────────────────────────────

/// Guard flag standing in for the disabled "compress" button.
///
/// Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CompressionTrigger {
    busy: Arc<AtomicBool>,
}

impl CompressionTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the trigger. Returns `None` while another compression holds it.
    pub fn try_acquire(&self) -> Option<TriggerGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TriggerGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Held for the duration of one compression; re-enables the trigger on drop,
/// whether the compression succeeded, failed or panicked.
#[derive(Debug)]
pub struct TriggerGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for TriggerGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

// ─── ChatSession ────────────────────────────────────────────────────────────

/// State of the single active conversation.
#[derive(Debug, Default)]
pub struct ChatSession {
    store: ConversationStore,
    history: ModelHistory,
    level: CompressionLevel,
    character: CharacterInfo,
    trigger: CompressionTrigger,
}

impl ChatSession {
    /// Start an empty session.
    pub fn new(character: CharacterInfo, level: CompressionLevel) -> Self {
        Self {
            character,
            level,
            ..Self::default()
        }
    }

    /// Restore the saved store and level.
    ///
    /// The model history is rebuilt from the loaded turns. When the store
    /// holds a summary turn, the recap exchange is seeded in its place so the
    /// model still sees the archive as its own output, followed by whatever
    /// dialogue was recorded after it.
    pub fn restore(db: &ChatDatabase, character: CharacterInfo) -> Result<Self, SummaryError> {
        let level = CompressionLevel::load(db);
        let store = db.load_store()?.unwrap_or_default();
        let history = rebuild_history(&store);

        tracing::info!(
            turns = store.len(),
            history_len = history.len(),
            level = level.value(),
            has_archive = store.current_archive.is_some(),
            "restored chat session"
        );

        Ok(Self {
            store,
            history,
            level,
            character,
            trigger: CompressionTrigger::new(),
        })
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn history(&self) -> &ModelHistory {
        &self.history
    }

    pub fn level(&self) -> CompressionLevel {
        self.level
    }

    pub fn character(&self) -> &CharacterInfo {
        &self.character
    }

    pub fn trigger(&self) -> &CompressionTrigger {
        &self.trigger
    }

    pub fn total_pairs(&self) -> usize {
        self.store.total_pairs()
    }

    /// Change the level and persist it.
    pub fn set_level(&mut self, level: CompressionLevel, db: &ChatDatabase) {
        self.level = level;
        level.persist(db);
    }

    /// Record a completed exchange in both the store and the history.
    pub fn record_exchange(&mut self, user: &str, agent: &str) {
        self.store.push_user(user);
        self.store.push_agent(agent);
        self.history.push(HistoryRecord::user(user));
        self.history.push(HistoryRecord::model(agent));
    }

    /// Swap in reconciled state in one step.
    pub fn replace_state(&mut self, store: ConversationStore, history: ModelHistory) {
        self.store = store;
        self.history = history;
    }

    /// Save the store. Failures are logged and swallowed: in-memory state
    /// stays authoritative for the session.
    pub fn persist(&self, db: &ChatDatabase) {
        match db.save_store(&self.store) {
            Ok(()) => tracing::debug!(turns = self.store.len(), "saved conversation store"),
            Err(e) => tracing::error!(error = %e, "failed to save conversation store"),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
