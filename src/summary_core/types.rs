//! Shared types for the summary core.
//!
//! Chat turns, the conversation store, the model-facing history and the
//! speaker labels used when a dialogue is flattened into a payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::inference::types::ChatMessage;

// ─── Chat Turns ─────────────────────────────────────────────────────────────

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Agent,
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
    /// Creation time (RFC 3339 on disk).
    pub timestamp: DateTime<Utc>,
    /// Marks a turn that holds a compressed archive rather than dialogue.
    #[serde(default)]
    pub is_summary_artifact: bool,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            is_summary_artifact: false,
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Agent,
            content: content.into(),
            timestamp: Utc::now(),
            is_summary_artifact: false,
        }
    }

    /// An agent turn carrying a rendered archive.
    pub fn summary_artifact(content: impl Into<String>) -> Self {
        Self {
            is_summary_artifact: true,
            ..Self::agent(content)
        }
    }
}

// ─── Conversation Store ─────────────────────────────────────────────────────

/// The live, chronologically ordered conversation plus the latest archive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationStore {
    pub turns: Vec<ChatTurn>,
    /// Most recent archive text, fed back in as context for the next pass.
    #[serde(default)]
    pub current_archive: Option<String>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of dialogue pairs: `floor(len / 2)`.
    pub fn total_pairs(&self) -> usize {
        self.turns.len() / 2
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Record a user turn.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ChatTurn::user(content));
    }

    /// Record an agent reply.
    pub fn push_agent(&mut self, content: impl Into<String>) {
        self.turns.push(ChatTurn::agent(content));
    }
}

// ─── Model-facing History ───────────────────────────────────────────────────

/// Role tag on a model-facing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Model,
}

/// One record of what the downstream model sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub role: HistoryRole,
    pub text: String,
}

impl HistoryRecord {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::Model,
            text: text.into(),
        }
    }
}

/// Ordered records sent to the downstream model. Rebuilt wholesale after
/// each compression, never patched in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelHistory {
    pub records: Vec<HistoryRecord>,
}

impl ModelHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first(&self) -> Option<&HistoryRecord> {
        self.records.first()
    }

    pub fn push(&mut self, record: HistoryRecord) {
        self.records.push(record);
    }

    /// Convert to OpenAI-style messages for the chat model.
    pub fn to_chat_messages(&self) -> Vec<ChatMessage> {
        self.records
            .iter()
            .map(|r| match r.role {
                HistoryRole::User => ChatMessage::user(r.text.clone()),
                HistoryRole::Model => ChatMessage::assistant(r.text.clone()),
            })
            .collect()
    }
}

// ─── Speaker Labels ─────────────────────────────────────────────────────────

const DEFAULT_USER_LABEL: &str = "User";
const DEFAULT_CHARACTER_LABEL: &str = "Character";

/// Persona and character names used as speaker labels in payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterInfo {
    /// The user's persona name.
    #[serde(default)]
    pub profile_name: Option<String>,
    /// The roleplayed character's name.
    #[serde(default)]
    pub name: Option<String>,
}

impl CharacterInfo {
    /// Label for a turn's speaker; blank names fall back to generic labels.
    pub fn speaker_label(&self, role: TurnRole) -> &str {
        let (name, fallback) = match role {
            TurnRole::User => (&self.profile_name, DEFAULT_USER_LABEL),
            TurnRole::Agent => (&self.name, DEFAULT_CHARACTER_LABEL),
        };
        name.as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(fallback)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
