//! Compression level configuration.
//!
//! The level is a small integer in `[0, 10]` owned by the session. Parsing is
//! lenient for programmatic input (anything odd maps to the default) and
//! strict at the confirmation boundary, where an empty field must be fixed by
//! the user instead of silently replaced.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::database::ChatDatabase;
use super::errors::SummaryError;
use super::prompt;

pub const MIN_LEVEL: u8 = 0;
pub const MAX_LEVEL: u8 = 10;
pub const DEFAULT_LEVEL: u8 = 5;

/// How the archive treats older history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionMode {
    /// Keep most history (omission OFF).
    RetainMost,
    /// Let the backend drop or merge stale history (omission ON).
    AllowOmission,
}

impl RetentionMode {
    /// The `ALLOW_OMISSION` switch value written into the instruction.
    pub fn omission_switch(self) -> &'static str {
        match self {
            RetentionMode::RetainMost => "OFF",
            RetentionMode::AllowOmission => "ON",
        }
    }
}

/// Retention mode written into every instruction. Not caller-controlled.
pub const PINNED_RETENTION: RetentionMode = RetentionMode::RetainMost;

/// Compression level in `[0, 10]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", from = "u8")]
pub struct CompressionLevel(u8);

impl Default for CompressionLevel {
    fn default() -> Self {
        Self(DEFAULT_LEVEL)
    }
}

impl From<u8> for CompressionLevel {
    fn from(value: u8) -> Self {
        Self(value.min(MAX_LEVEL))
    }
}

impl From<CompressionLevel> for u8 {
    fn from(level: CompressionLevel) -> Self {
        level.0
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl CompressionLevel {
    pub fn value(self) -> u8 {
        self.0
    }

    /// Clamp a numeric value into range. Non-finite input yields the default;
    /// fractions round to the nearest level.
    pub fn clamped(value: f64) -> Self {
        if !value.is_finite() {
            return Self::default();
        }
        let clamped = value.round().clamp(f64::from(MIN_LEVEL), f64::from(MAX_LEVEL));
        Self(clamped as u8)
    }

    /// Lenient parse: anything non-numeric maps to the default.
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(value) => Self::clamped(value),
            Err(_) => Self::default(),
        }
    }

    /// Strict parse for the confirmation boundary. Numeric input is still
    /// clamped; empty or non-numeric input is rejected.
    pub fn parse_strict(raw: &str) -> Result<Self, SummaryError> {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Self::clamped(value)),
            _ => Err(SummaryError::InvalidLevel {
                input: trimmed.to_string(),
            }),
        }
    }

    /// Read the persisted level, falling back to the default.
    pub fn load(db: &ChatDatabase) -> Self {
        match db.load_level_raw() {
            Ok(Some(raw)) => Self::from_raw(&raw),
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read compression level, using default");
                Self::default()
            }
        }
    }

    /// Clamp `raw`, persist it, and return the stored value.
    ///
    /// A storage failure is logged; the clamped value is returned regardless.
    pub fn set(db: &ChatDatabase, raw: &str) -> Self {
        let level = Self::from_raw(raw);
        level.persist(db);
        level
    }

    /// Persist this level (failures logged, non-fatal).
    pub fn persist(self, db: &ChatDatabase) {
        match db.save_level(self) {
            Ok(()) => tracing::debug!(level = self.0, "saved compression level"),
            Err(e) => tracing::error!(error = %e, level = self.0, "failed to save compression level"),
        }
    }
}

/// Build the instruction block sent with every compression request.
///
/// Only the level varies; the retention mode is always [`PINNED_RETENTION`].
pub fn build_instruction(level: CompressionLevel) -> String {
    prompt::render(level.value(), PINNED_RETENTION.omission_switch())
}

// ─── Tests ──────────────────────────────────────────────────────────────────
