//! Model configuration loading and validation.
//!
//! Reads `_models/config.yaml` and resolves environment variables.
//! Config is the single source of truth for the compression endpoint.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::errors::InferenceError;

/// Environment variable that pins the project root holding `_models/`.
const PROJECT_ROOT_ENV: &str = "ROLEPLAY_ARCHIVE_PROJECT_ROOT";

/// Relative location of the models config under the project root.
const CONFIG_RELATIVE_PATH: &str = "_models/config.yaml";

// ─── Public Types ────────────────────────────────────────────────────────────

/// A single model's runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub display_name: String,
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    pub base_url: String,
    pub temperature: f32,
    #[serde(default)]
    pub top_p: Option<f32>,
    pub max_tokens: u32,
    /// Whole-request timeout. Archives of long sessions take a while to
    /// generate, so the default is generous.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    180
}

/// Top-level model registry (mirrors `_models/config.yaml`).
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    pub active_model: String,
    pub models: HashMap<String, ModelConfig>,
    /// Optional override for the model used to build archives. Falls back to
    /// `active_model` when absent.
    #[serde(default)]
    pub summary_model: Option<String>,
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Resolve a config path relative to the project root.
///
/// Searches upward from `start` for `_models/config.yaml`. Falls back to
/// `ROLEPLAY_ARCHIVE_PROJECT_ROOT` env var if set.
pub fn find_config_path(start: &Path) -> Result<PathBuf, InferenceError> {
    if let Ok(root) = std::env::var(PROJECT_ROOT_ENV) {
        let candidate = PathBuf::from(&root).join(CONFIG_RELATIVE_PATH);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_RELATIVE_PATH);
        if candidate.exists() {
            return Ok(candidate);
        }
        if !dir.pop() {
            break;
        }
    }

    Err(InferenceError::ConfigError {
        reason: format!("could not find {CONFIG_RELATIVE_PATH}"),
    })
}

/// Load and parse the models configuration file.
///
/// Performs environment-variable interpolation on string values matching
/// `${VAR_NAME}` or `${VAR_NAME:-default}`.
pub fn load_models_config(path: &Path) -> Result<ModelsConfig, InferenceError> {
    let raw = std::fs::read_to_string(path).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;

    parse_models_config(&raw)
}

/// Parse config text (after env interpolation).
pub fn parse_models_config(raw: &str) -> Result<ModelsConfig, InferenceError> {
    let interpolated = interpolate_env_vars(raw);

    serde_yaml::from_str(&interpolated).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to parse config: {e}"),
    })
}

/// Resolve the model used for archive generation.
///
/// Returns `(model_key, ModelConfig)`. `summary_model` wins over
/// `active_model` when both are set.
pub fn resolve_summary_model(
    config: &ModelsConfig,
) -> Result<(String, ModelConfig), InferenceError> {
    let key = config
        .summary_model
        .as_deref()
        .unwrap_or(&config.active_model);

    config
        .models
        .get(key)
        .map(|model| (key.to_string(), model.clone()))
        .ok_or_else(|| InferenceError::ConfigError {
            reason: format!("model '{key}' not found in config"),
        })
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr));
        } else {
            result.push(ch);
        }
    }

    result
}

/// Resolve a variable expression like `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str) -> String {
    if let Some(idx) = expr.find(":-") {
        let var_name = &expr[..idx];
        let default = &expr[idx + 2..];
        std::env::var(var_name).unwrap_or_else(|_| expand_tilde(default))
    } else {
        std::env::var(expr).unwrap_or_default()
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
