//! Chat-completions dialog client
//!
//! Sends the conversation history to an OpenAI-compatible endpoint
//! (llama.cpp server, vLLM, ...) and returns the assistant reply.

use crate::config::{Config, GenerationParams};
use crate::conversation::Turn;
use crate::error::RequestFailure;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Reply used when the server answers successfully but without content
pub const NO_RESPONSE: &str = "[No response]";

/// Sends a history to the model and returns the assistant reply.
///
/// Implementations must not retry and must not touch the history; the
/// caller appends both the user and the assistant turn.
#[async_trait]
pub trait DialogClient: Send + Sync {
    async fn complete(&self, history: &[Turn]) -> Result<String, RequestFailure>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    n_predict: u32,
    stream: bool,
    stop: Option<()>,
}

/// reqwest-backed client for `POST {base}/v1/chat/completions`
#[derive(Clone)]
pub struct HttpDialogClient {
    http: reqwest::Client,
    base: String,
    api_key: String,
    model: String,
    params: GenerationParams,
    timeout: Duration,
}

impl HttpDialogClient {
    /// Create new client from config
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            params: config.generation.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    pub fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base)
    }

    pub fn models_url(&self) -> String {
        format!("{}/v1/models", self.base)
    }

    /// Health check - verify the server is reachable and accepts the key
    pub async fn health_check(&self) -> bool {
        match self
            .http
            .get(self.models_url())
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(2))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl DialogClient for HttpDialogClient {
    async fn complete(&self, history: &[Turn]) -> Result<String, RequestFailure> {
        let body = ChatRequest {
            model: &self.model,
            messages: history,
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
            top_p: self.params.top_p,
            n_predict: self.params.n_predict,
            stream: false,
            stop: None,
        };

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            warn!("❌ Chat API Error ({}): {}", status, body_text);
            return Err(RequestFailure::Status(status.as_u16()));
        }

        let body_text = response.text().await?;
        debug!("🧠 Chat raw body: {}", body_text);

        let value: serde_json::Value = serde_json::from_str(&body_text)
            .map_err(|e| RequestFailure::Decode(e.to_string()))?;

        Ok(extract_reply(&value))
    }
}

/// Pull `choices[0].message.content` out of a response body.
pub fn extract_reply(body: &serde_json::Value) -> String {
    body.pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(NO_RESPONSE)
        .to_string()
}
