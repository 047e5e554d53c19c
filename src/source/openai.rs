//! OpenAI-compatible chat completions source.
//!
//! Sends one non-streaming `POST {base}/v1/chat/completions` per message with
//! a system prompt and the user's text, and returns the first choice's
//! content. Any server speaking the Chat Completions dialect works.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{ResponseSource, SourceError};
use crate::config::SourceConfig;

// ── Configuration ─────────────────────────────────────────────

/// Configuration for [`OpenAiSource`].
#[derive(Debug, Clone)]
pub struct OpenAiSourceConfig {
    /// Bearer token. Empty means no `Authorization` header.
    pub api_key: String,
    /// Base URL (defaults to `https://api.openai.com`).
    pub base_url: String,
    pub model: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Client-side bound on one request.
    pub timeout: Duration,
}

impl OpenAiSourceConfig {
    /// Create a config with the given key and model and default tuning.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let defaults = SourceConfig::default();
        Self {
            api_key: api_key.into(),
            base_url: defaults.api_url,
            model: model.into(),
            system_prompt: defaults.system_prompt,
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
            timeout: Duration::from_millis(defaults.timeout_ms),
        }
    }

    /// Build from the `[source]` config section, reading the key from the
    /// configured environment variable.
    pub fn from_source_config(config: &SourceConfig) -> Self {
        Self {
            api_key: config.resolve_api_key(),
            base_url: config.api_url.clone(),
            model: config.api_model.clone(),
            system_prompt: config.system_prompt.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set the client-side request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ── Source ────────────────────────────────────────────────────

/// Reply source backed by an OpenAI-compatible server.
pub struct OpenAiSource {
    config: OpenAiSourceConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSource")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .finish()
    }
}

impl OpenAiSource {
    /// Create a source with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if the model is blank or the HTTP
    /// client cannot be built.
    pub fn new(config: OpenAiSourceConfig) -> Result<Self, SourceError> {
        if config.model.trim().is_empty() {
            return Err(SourceError::Config("model must not be empty".to_owned()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn request_body(&self, message: &str) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": self.config.system_prompt},
                {"role": "user", "content": message},
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "stream": false,
        })
    }

    /// Map an HTTP error status to a [`SourceError`].
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> SourceError {
        let message = extract_error_message(body);
        match status.as_u16() {
            401 | 403 => SourceError::Service(format!("authentication failed: {message}")),
            429 => SourceError::Service(format!("rate limited: {message}")),
            code => SourceError::Service(format!("HTTP {code}: {message}")),
        }
    }
}

/// Extract an error message from an OpenAI error response body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Pull `choices[0].message.content` out of a completion body.
fn extract_reply(body: &serde_json::Value) -> Result<String, SourceError> {
    let content = body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| SourceError::Malformed("completion has no message content".to_owned()))?;
    let content = content.trim();
    if content.is_empty() {
        return Err(SourceError::Malformed("completion content is empty".to_owned()));
    }
    Ok(content.to_owned())
}

#[async_trait]
impl ResponseSource for OpenAiSource {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, message: &str) -> Result<String, SourceError> {
        let mut request = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json");
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request
            .json(&self.request_body(message))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceError::Timeout(format!("no reply within {:?}", self.config.timeout))
                } else {
                    SourceError::Service(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body_text));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout(format!("body not received within {:?}", self.config.timeout))
            } else {
                SourceError::Malformed(format!("invalid completion body: {e}"))
            }
        })?;
        extract_reply(&body)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let source =
            OpenAiSource::new(OpenAiSourceConfig::new("", "m").with_base_url("http://host:1/"))
                .unwrap();
        assert_eq!(source.endpoint(), "http://host:1/v1/chat/completions");
    }

    #[test]
    fn blank_model_is_config_error() {
        let err = OpenAiSource::new(OpenAiSourceConfig::new("k", "  ")).unwrap_err();
        assert_eq!(err.code(), "SOURCE_CONFIG");
    }

    #[test]
    fn request_body_carries_system_and_user_messages() {
        let source = OpenAiSource::new(
            OpenAiSourceConfig::new("k", "gpt-test").with_system_prompt("be kind"),
        )
        .unwrap();
        let body = source.request_body("hello");
        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be kind");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn error_message_prefers_json_error_field() {
        let body = r#"{"error": {"message": "bad key", "type": "auth"}}"#;
        assert_eq!(extract_error_message(body), "bad key");
        assert_eq!(extract_error_message("plain text"), "plain text");
    }

    #[test]
    fn http_statuses_map_to_service_errors() {
        let err = OpenAiSource::map_http_error(reqwest::StatusCode::UNAUTHORIZED, "");
        assert!(err.message().contains("authentication"));
        let err = OpenAiSource::map_http_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert!(err.message().contains("rate limited"));
        let err = OpenAiSource::map_http_error(reqwest::StatusCode::BAD_GATEWAY, "upstream");
        assert_eq!(err.code(), "SOURCE_SERVICE");
        assert!(err.message().contains("502"));
    }

    #[test]
    fn reply_extraction_rejects_missing_or_blank_content() {
        let ok = json!({"choices": [{"message": {"content": "  Hi there. "}}]});
        assert_eq!(extract_reply(&ok).unwrap(), "Hi there.");

        let blank = json!({"choices": [{"message": {"content": "   "}}]});
        assert_eq!(extract_reply(&blank).unwrap_err().code(), "SOURCE_MALFORMED");

        let missing = json!({"choices": []});
        assert_eq!(extract_reply(&missing).unwrap_err().code(), "SOURCE_MALFORMED");
    }

    #[test]
    fn config_reads_source_section() {
        let section = SourceConfig {
            api_url: "http://local:8080".to_owned(),
            api_model: "local-model".to_owned(),
            api_key_env: String::new(),
            timeout_ms: 1_500,
            ..Default::default()
        };
        let config = OpenAiSourceConfig::from_source_config(&section);
        assert_eq!(config.base_url, "http://local:8080");
        assert_eq!(config.model, "local-model");
        assert!(config.api_key.is_empty());
        assert_eq!(config.timeout, Duration::from_millis(1_500));
    }
}
