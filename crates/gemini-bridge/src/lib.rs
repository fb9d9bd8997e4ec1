// SPDX-License-Identifier: MIT OR Apache-2.0
//! gemini-bridge
//!
//! Wraps the raw Google Gemini `streamGenerateContent` API and translates
//! its part stream into the AG-UI event vocabulary. Gemini delivers
//! function calls as complete parts with no provider id, so the bridge
//! mints a UUID at arrival and emits the whole tool lifecycle in one
//! sequence. When the model requested tools, the bridge performs exactly
//! one follow-up turn with `functionResponse` parts appended.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod wire;

use agb_adapter::{Adapter, AdapterError, AdapterIdentity, EventSink};
use agb_core::RunAgentInput;
use agb_core::usage::Usage;
use async_trait::async_trait;
use client::GeminiClient;
use serde_json::{Value, json};

const SYSTEM_PROMPT: &str = "You are a helpful assistant using the raw Google Gemini API wrapped with the AG-UI protocol. You can tell the current time and do basic math calculations. Be concise and friendly.";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Connection and model settings for the Gemini adapter.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key passed as the `key` query parameter.
    pub api_key: String,
    /// API base URL (no trailing slash).
    pub base_url: String,
    /// Chat model identifier.
    pub model: String,
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

impl GeminiConfig {
    /// Load the key from the environment, defaults for everything else.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var(API_KEY_VAR)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey { var: API_KEY_VAR })?;
        Ok(Self::new(api_key))
    }

    /// Build a config with explicit credentials and defaults elsewhere.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the base URL (used by tests and proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// One executed function call.
#[derive(Debug, Clone)]
struct CompletedCall {
    name: String,
    args: Value,
    result: String,
}

/// Adapter wrapping the raw Gemini API.
pub struct GeminiAdapter {
    config: GeminiConfig,
    client: GeminiClient,
}

impl GeminiAdapter {
    /// Build an adapter from configuration.
    pub fn new(config: GeminiConfig) -> Self {
        let client = GeminiClient::new(&config);
        Self { config, client }
    }

    fn tool_declarations() -> Value {
        let declarations: Vec<Value> = agb_tools::tool_specs()
            .into_iter()
            .map(|spec| {
                json!({
                    "name": spec.name,
                    "description": spec.description,
                    "parameters": spec.parameters,
                })
            })
            .collect();
        json!([{"function_declarations": declarations}])
    }

    fn base_contents(input: &RunAgentInput) -> Vec<Value> {
        input
            .messages
            .iter()
            .map(|m| {
                let role = if m.role == "user" { "user" } else { "model" };
                json!({"role": role, "parts": [{"text": m.content}]})
            })
            .collect()
    }

    /// Stream one turn, forwarding events through the sink.
    ///
    /// Function calls are honored only when `with_tools` is set; each one is
    /// executed synchronously at arrival (the whole call is a single part).
    async fn stream_turn(
        &self,
        contents: &[Value],
        with_tools: bool,
        sink: &mut EventSink,
        usage: &mut Usage,
    ) -> Result<Vec<CompletedCall>, AdapterError> {
        let mut body = json!({
            "system_instruction": {"parts": [{"text": SYSTEM_PROMPT}]},
            "contents": contents,
        });
        if with_tools {
            body["tools"] = Self::tool_declarations();
        }

        let mut stream = self.client.stream_generate(&self.config.model, &body).await?;
        let mut calls = Vec::new();

        while let Some(chunk) = stream.next_chunk().await {
            let chunk = chunk?;
            if let Some(u) = chunk.usage_metadata {
                usage.merge_max(u.into());
            }

            for candidate in chunk.candidates {
                let Some(content) = candidate.content else {
                    continue;
                };
                for part in content.parts {
                    if let Some(fc) = part.function_call {
                        if !with_tools {
                            // One follow-up round only; further tool
                            // requests are dropped rather than looped.
                            tracing::debug!(tool = %fc.name, "ignoring function call in follow-up turn");
                            continue;
                        }
                        // No provider id on Gemini calls; mint one at the
                        // point the complete call arrives.
                        let id = uuid::Uuid::new_v4().to_string();
                        sink.tool_start(&id, &fc.name).await?;
                        let args_json = fc.args.to_string();
                        sink.tool_args(&id, &args_json).await?;
                        sink.tool_end(&id).await?;
                        let result = agb_tools::execute(&fc.name, &fc.args);
                        sink.tool_result(&id, &result).await?;
                        calls.push(CompletedCall {
                            name: fc.name,
                            args: fc.args,
                            result,
                        });
                    }
                    if let Some(text) = part.text
                        && !text.is_empty()
                    {
                        sink.text_delta(&text).await?;
                    }
                }
            }
        }

        Ok(calls)
    }
}

#[async_trait]
impl Adapter for GeminiAdapter {
    fn identity(&self) -> AdapterIdentity {
        AdapterIdentity::wrapped("gemini-raw", self.config.model.clone())
    }

    async fn execute(
        &self,
        input: RunAgentInput,
        sink: &mut EventSink,
    ) -> Result<Usage, AdapterError> {
        let mut contents = Self::base_contents(&input);
        let mut usage = Usage::default();

        let calls = self.stream_turn(&contents, true, sink, &mut usage).await?;

        if !calls.is_empty() {
            let call_parts: Vec<Value> = calls
                .iter()
                .map(|c| json!({"functionCall": {"name": c.name, "args": c.args}}))
                .collect();
            contents.push(json!({"role": "model", "parts": call_parts}));

            let response_parts: Vec<Value> = calls
                .iter()
                .map(|c| {
                    json!({
                        "functionResponse": {
                            "name": c.name,
                            "response": {"result": c.result},
                        }
                    })
                })
                .collect();
            contents.push(json!({"role": "user", "parts": response_parts}));

            self.stream_turn(&contents, false, sink, &mut usage).await?;
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
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse_response(payloads: &[&str]) -> ResponseTemplate {
        let mut body = String::new();
        for p in payloads {
            body.push_str("data: ");
            body.push_str(p);
            body.push_str("\n\n");
        }
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/event-stream")
            .set_body_string(body)
    }

    async fn run_adapter(
        server: &MockServer,
        prompt: &str,
    ) -> (Result<Usage, AdapterError>, Vec<Event>) {
        let config = GeminiConfig::new("test-key").with_base_url(server.uri());
        let adapter = GeminiAdapter::new(config);
        let (tx, mut rx) = mpsc::channel(64);
        let mut sink = EventSink::new(tx);
        let input = RunAgentInput::single_turn("t", "r", prompt);
        let result = adapter.execute(input, &mut sink).await;
        drop(sink);
        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }
        (result, events)
    }

    const MODEL_PATH: &str = "/v1beta/models/gemini-2.5-flash:streamGenerateContent";

    #[tokio::test]
    async fn text_parts_translate_to_message_events() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(query_param("alt", "sse"))
            .and(query_param("key", "test-key"))
            .respond_with(sse_response(&[
                r#"{"candidates":[{"content":{"parts":[{"text":"Hel"}],"role":"model"}}]}"#,
                r#"{"candidates":[{"content":{"parts":[{"text":"lo"}],"role":"model"},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":5,"candidatesTokenCount":3,"totalTokenCount":8}}"#,
            ]))
            .mount(&server)
            .await;

        let (result, events) = run_adapter(&server, "Say hello").await;
        let usage = result.unwrap();
        assert_eq!(usage.total_tokens, 8);

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
        let text = agb_core::assemble_text(&events, events[0].message_id().unwrap());
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn function_call_gets_minted_id_and_follow_up() {
        let server = MockServer::start().await;

        // First turn: one complete function call part.
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(sse_response(&[
                r#"{"candidates":[{"content":{"parts":[{"functionCall":{"name":"calculator","args":{"expression":"42 * 17"}}}]}}]}"#,
            ]))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        // Follow-up turn: the final answer.
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(sse_response(&[
                r#"{"candidates":[{"content":{"parts":[{"text":"That is 714."}],"role":"model"},"finishReason":"STOP"}]}"#,
            ]))
            .mount(&server)
            .await;

        let (result, events) = run_adapter(&server, "Calculate 42 * 17").await;
        result.unwrap();

        let kinds: Vec<_> = events.iter().map(Event::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "TOOL_CALL_START",
                "TOOL_CALL_ARGS",
                "TOOL_CALL_END",
                "TOOL_CALL_RESULT",
                "TEXT_MESSAGE_START",
                "TEXT_MESSAGE_CONTENT",
                "TEXT_MESSAGE_END",
            ]
        );

        // All four tool events share the minted id.
        let id = events[0].tool_call_id().unwrap().to_string();
        assert!(!id.is_empty());
        for ev in &events[..4] {
            assert_eq!(ev.tool_call_id(), Some(id.as_str()));
        }
        match &events[3] {
            Event::ToolCallResult { result, .. } => assert_eq!(result, "42 * 17 = 714"),
            other => panic!("expected TOOL_CALL_RESULT, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn upstream_http_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad key"))
            .mount(&server)
            .await;

        let (result, events) = run_adapter(&server, "hello").await;
        let err = result.unwrap_err();
        assert_eq!(err.code(), "UPSTREAM_ERROR");
        assert!(events.is_empty());
    }
}
