//! OpenAI-compatible inference client.
//!
//! Sends a single non-streaming chat completion request per archive. The
//! instruction block goes out as the system message, the dialogue payload as
//! the user message.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use super::backend::CompressionBackend;
use super::config::{resolve_summary_model, ModelConfig, ModelsConfig};
use super::errors::InferenceError;
use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ─── InferenceClient ─────────────────────────────────────────────────────────

/// Client for the archive-generating model endpoint.
pub struct InferenceClient {
    http: HttpClient,
    model_key: String,
    model: ModelConfig,
}

impl InferenceClient {
    /// Create a client for the configured summary model.
    ///
    /// Does NOT check connectivity — that happens on the first request.
    pub fn from_config(config: &ModelsConfig) -> Result<Self, InferenceError> {
        let (key, model) = resolve_summary_model(config)?;
        Self::for_model(key, model)
    }

    /// Create a client pinned to one model configuration.
    pub fn for_model(model_key: String, model: ModelConfig) -> Result<Self, InferenceError> {
        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(model.request_timeout_secs))
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: model.base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            model_key,
            model,
        })
    }

    /// The base URL of the model endpoint.
    pub fn base_url(&self) -> &str {
        &self.model.base_url
    }

    /// The display name of the model.
    pub fn model_name(&self) -> &str {
        &self.model.display_name
    }

    /// Build the request body for one archive.
    fn build_request(&self, payload: &str, instruction: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self
                .model
                .model_name
                .clone()
                .unwrap_or_else(|| self.model_key.clone()),
            messages: vec![ChatMessage::system(instruction), ChatMessage::user(payload)],
            temperature: self.model.temperature,
            top_p: self.model.top_p,
            max_tokens: self.model.max_tokens,
            stream: false,
        }
    }

    /// Send a non-streaming chat completion and return the first choice's text.
    pub async fn chat_completion(
        &self,
        body: &ChatCompletionRequest,
    ) -> Result<String, InferenceError> {
        let url = format!("{}/chat/completions", self.model.base_url);

        // Log the request metadata (not the full body — it can be huge)
        tracing::info!(
            url = %url,
            model = %body.model,
            message_count = body.messages.len(),
            max_tokens = body.max_tokens,
            "=== ARCHIVE REQUEST ==="
        );

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout {
                        duration_secs: self.model.request_timeout_secs,
                    }
                } else {
                    InferenceError::ConnectionFailed {
                        endpoint: url.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let body_text = response.text().await.map_err(|e| InferenceError::EmptyResponse {
            reason: format!("failed to read response body: {e}"),
        })?;

        parse_completion_text(&body_text)
    }
}

#[async_trait]
impl CompressionBackend for InferenceClient {
    async fn compress(&self, payload: &str, instruction: &str) -> Result<String, InferenceError> {
        let body = self.build_request(payload, instruction);
        self.chat_completion(&body).await
    }
}

/// Pull the archive text out of a raw completion body.
fn parse_completion_text(body: &str) -> Result<String, InferenceError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::EmptyResponse {
            reason: format!("unparseable response: {e}"),
        })?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| InferenceError::EmptyResponse {
            reason: "no choices in response".into(),
        })?;

    match choice.message.content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(InferenceError::EmptyResponse {
            reason: format!(
                "empty content (finish_reason: {})",
                choice.finish_reason.as_deref().unwrap_or("unknown")
            ),
        }),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
