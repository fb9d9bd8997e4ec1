// SPDX-License-Identifier: MIT OR Apache-2.0
//! cerebras-bridge
//!
//! Adapter for Cerebras inference. The API is Chat-Completions-compatible,
//! so the wire models and streaming client come from `openai-bridge`; this
//! crate adds the Cerebras endpoint, a per-request model override checked
//! against the served model list, and a text-only translation (the endpoint
//! exposes no tools).
#![deny(unsafe_code)]
#![warn(missing_docs)]

use agb_adapter::{Adapter, AdapterError, AdapterIdentity, EventSink};
use agb_core::RunAgentInput;
use agb_core::usage::Usage;
use async_trait::async_trait;
use openai_bridge::client::ChatClient;
use serde_json::json;
use tracing::warn;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.cerebras.ai/v1";

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "CEREBRAS_API_KEY";

/// Environment variable overriding the default model.
pub const MODEL_VAR: &str = "CEREBRAS_MODEL";

/// Models served behind the single Cerebras endpoint.
pub const AVAILABLE_MODELS: [&str; 3] = ["llama-3.3-70b", "llama-3.1-70b", "llama-3.1-8b"];

/// Connection and model settings for the Cerebras adapter.
#[derive(Debug, Clone)]
pub struct CerebrasConfig {
    /// Bearer token for the API.
    pub api_key: String,
    /// API base URL (no trailing slash).
    pub base_url: String,
    /// Model used when the request carries no override.
    pub default_model: String,
    /// Completion token cap per request.
    pub max_tokens: u32,
}

/// Configuration failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The API key environment variable is unset or empty.
    #[error("environment variable {var} is not set")]
    MissingApiKey {
        /// Name of the missing variable.
        var: &'static str,
    },
}

impl CerebrasConfig {
    /// Load key and optional model override from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var(API_KEY_VAR)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey { var: API_KEY_VAR })?;
        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var(MODEL_VAR)
            && !model.is_empty()
        {
            config.default_model = model;
        }
        Ok(config)
    }

    /// Build a config with explicit credentials and defaults elsewhere.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: AVAILABLE_MODELS[0].to_string(),
            max_tokens: 1000,
        }
    }

    /// Override the base URL (used by tests and proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Adapter for Cerebras inference.
pub struct CerebrasAdapter {
    config: CerebrasConfig,
    client: ChatClient,
}

impl CerebrasAdapter {
    /// Build an adapter from configuration.
    pub fn new(config: CerebrasConfig) -> Self {
        let client = ChatClient::new(config.base_url.clone(), config.api_key.clone());
        Self { config, client }
    }

    /// Resolve the per-request model override against the served list,
    /// falling back to the configured default on unknown names.
    fn resolve_model(&self, requested: Option<&str>) -> String {
        match requested {
            Some(m) if AVAILABLE_MODELS.contains(&m) => m.to_string(),
            Some(m) => {
                warn!(model = %m, "unknown model override, using default");
                self.config.default_model.clone()
            }
            None => self.config.default_model.clone(),
        }
    }
}

#[async_trait]
impl Adapter for CerebrasAdapter {
    fn identity(&self) -> AdapterIdentity {
        AdapterIdentity::wrapped("cerebras-raw", self.config.default_model.clone())
    }

    async fn execute(
        &self,
        input: RunAgentInput,
        sink: &mut EventSink,
    ) -> Result<Usage, AdapterError> {
        let model = self.resolve_model(input.model.as_deref());

        let messages: Vec<_> = input
            .messages
            .iter()
            .map(|m| json!({"role": m.role, "content": m.content}))
            .collect();

        let body = json!({
            "model": model,
            "messages": messages,
            "stream": true,
            "max_tokens": self.config.max_tokens,
            "temperature": 0.7,
            "stream_options": {"include_usage": true},
        });

        let mut stream = self.client.stream_chat(&body).await?;
        let mut usage = Usage::default();

        while let Some(chunk) = stream.next_chunk().await {
            let chunk = chunk?;
            if let Some(wire_usage) = chunk.usage {
                usage.merge_max(wire_usage.into());
            }
            for choice in chunk.choices {
                if let Some(content) = choice.delta.content
                    && !content.is_empty()
                {
                    sink.text_delta(&content).await?;
                }
            }
        }

        sink.end_message().await?;
        Ok(usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agb_core::Event;
    use tokio::sync::mpsc;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse_response(payloads: &[&str]) -> ResponseTemplate {
        let mut body = String::new();
        for p in payloads {
            body.push_str("data: ");
            body.push_str(p);
            body.push_str("\n\n");
        }
        body.push_str("data: [DONE]\n\n");
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/event-stream")
            .set_body_string(body)
    }

    async fn run(server: &MockServer, input: RunAgentInput) -> (Usage, Vec<Event>) {
        let config = CerebrasConfig::new("csk-test").with_base_url(server.uri());
        let adapter = CerebrasAdapter::new(config);
        let (tx, mut rx) = mpsc::channel(64);
        let mut sink = EventSink::new(tx);
        let usage = adapter.execute(input, &mut sink).await.unwrap();
        drop(sink);
        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }
        (usage, events)
    }

    #[tokio::test]
    async fn streams_text_without_tools() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(sse_response(&[
                r#"{"choices":[{"delta":{"content":"fast"}}]}"#,
                r#"{"choices":[{"delta":{"content":" inference"}}]}"#,
                r#"{"choices":[],"usage":{"prompt_tokens":4,"completion_tokens":2,"total_tokens":6}}"#,
            ]))
            .mount(&server)
            .await;

        let input = RunAgentInput::single_turn("t", "r", "hello");
        let (usage, events) = run(&server, input).await;
        assert_eq!(usage.total_tokens, 6);
        let kinds: Vec<_> = events.iter().map(Event::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "TEXT_MESSAGE_START",
                "TEXT_MESSAGE_CONTENT",
                "TEXT_MESSAGE_CONTENT",
                "TEXT_MESSAGE_END",
            ]
        );
    }

    #[tokio::test]
    async fn honors_known_model_override() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"model": "llama-3.1-8b"})))
            .respond_with(sse_response(&[r#"{"choices":[{"delta":{"content":"ok"}}]}"#]))
            .mount(&server)
            .await;

        let mut input = RunAgentInput::single_turn("t", "r", "hello");
        input.model = Some("llama-3.1-8b".to_string());
        let (_usage, events) = run(&server, input).await;
        assert!(!events.is_empty());
    }

    #[tokio::test]
    async fn unknown_model_override_falls_back_to_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"model": "llama-3.3-70b"})))
            .respond_with(sse_response(&[r#"{"choices":[{"delta":{"content":"ok"}}]}"#]))
            .mount(&server)
            .await;

        let mut input = RunAgentInput::single_turn("t", "r", "hello");
        input.model = Some("made-up-model".to_string());
        let (_usage, events) = run(&server, input).await;
        assert!(events.iter().any(|e| e.kind() == "TEXT_MESSAGE_CONTENT"));
    }

    #[test]
    fn resolve_model_logic() {
        let adapter = CerebrasAdapter::new(CerebrasConfig::new("k"));
        assert_eq!(adapter.resolve_model(None), "llama-3.3-70b");
        assert_eq!(adapter.resolve_model(Some("llama-3.1-70b")), "llama-3.1-70b");
        assert_eq!(adapter.resolve_model(Some("gpt-5-mini")), "llama-3.3-70b");
    }
}
