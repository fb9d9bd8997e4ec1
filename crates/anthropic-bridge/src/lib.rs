// SPDX-License-Identifier: MIT OR Apache-2.0
//! anthropic-bridge
//!
//! Wraps the raw Anthropic Messages API and translates its content-block
//! stream into the AG-UI event vocabulary. Text blocks become message
//! deltas, `tool_use` blocks become the tool-call lifecycle (executed
//! synchronously at block stop), and extended-thinking blocks become
//! thinking events. When the model stops for tool use, the bridge performs
//! exactly one follow-up turn with the tool results appended.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod wire;

use agb_adapter::{Adapter, AdapterError, AdapterIdentity, EventSink};
use agb_core::usage::Usage;
use agb_core::{Event, ExtraMap, RunAgentInput};
use async_trait::async_trait;
use client::MessagesClient;
use config::AnthropicConfig;
use serde_json::{Value, json};
use std::collections::HashMap;
use wire::{BlockDelta, ContentBlock, StreamEvent};

const SYSTEM_PROMPT: &str = "You are a helpful assistant using the raw Anthropic Claude API wrapped with the AG-UI protocol. You can tell the current time and do basic math calculations. Be concise and friendly.";

/// State of one content block while it streams.
#[derive(Debug)]
enum OpenBlock {
    Text,
    Thinking,
    Tool {
        id: String,
        name: String,
        args_json: String,
    },
}

/// A completed tool call with its executed result.
#[derive(Debug, Clone)]
struct CompletedCall {
    id: String,
    name: String,
    args_json: String,
    result: String,
}

/// Outcome of streaming one Messages turn.
#[derive(Debug, Default)]
struct TurnOutcome {
    stop_reason: Option<String>,
    assistant_text: String,
    calls: Vec<CompletedCall>,
}

/// Adapter wrapping the raw Anthropic Messages API.
pub struct AnthropicAdapter {
    config: AnthropicConfig,
    client: MessagesClient,
}

impl AnthropicAdapter {
    /// Build an adapter from configuration.
    pub fn new(config: AnthropicConfig) -> Self {
        let client = MessagesClient::new(&config);
        Self { config, client }
    }

    fn tool_declarations() -> Vec<Value> {
        agb_tools::tool_specs()
            .into_iter()
            .map(|spec| {
                json!({
                    "name": spec.name,
                    "description": spec.description,
                    "input_schema": spec.parameters,
                })
            })
            .collect()
    }

    fn base_messages(input: &RunAgentInput) -> Vec<Value> {
        input
            .messages
            .iter()
            .map(|m| json!({"role": m.role, "content": m.content}))
            .collect()
    }

    /// Stream one Messages turn, forwarding events through the sink.
    ///
    /// Tool calls are executed synchronously when their block stops, so
    /// `TOOL_CALL_RESULT` lands between the block's end and the rest of the
    /// stream. The follow-up turn runs with `with_tools = false`.
    async fn stream_turn(
        &self,
        messages: &[Value],
        with_tools: bool,
        sink: &mut EventSink,
        usage: &mut Usage,
    ) -> Result<TurnOutcome, AdapterError> {
        let mut body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "system": SYSTEM_PROMPT,
            "messages": messages,
            "stream": true,
        });
        if with_tools {
            body["tools"] = Value::Array(Self::tool_declarations());
        }

        let mut stream = self.client.stream_messages(&body).await?;
        let mut outcome = TurnOutcome::default();
        let mut open: HashMap<usize, OpenBlock> = HashMap::new();

        while let Some(event) = stream.next_event().await {
            match event? {
                StreamEvent::MessageStart { message } => {
                    if let Some(u) = message.usage {
                        usage.merge_max(u.into());
                    }
                }

                StreamEvent::ContentBlockStart {
                    index,
                    content_block,
                } => match content_block {
                    ContentBlock::Text { .. } => {
                        open.insert(index, OpenBlock::Text);
                    }
                    ContentBlock::Thinking { .. } => {
                        open.insert(index, OpenBlock::Thinking);
                        sink.send(Event::ThinkingStart {
                            extra: ExtraMap::new(),
                        })
                        .await?;
                    }
                    ContentBlock::ToolUse { id, name } => {
                        if with_tools {
                            sink.tool_start(&id, &name).await?;
                        }
                        open.insert(
                            index,
                            OpenBlock::Tool {
                                id,
                                name,
                                args_json: String::new(),
                            },
                        );
                    }
                    ContentBlock::Other => {}
                },

                StreamEvent::ContentBlockDelta { index, delta } => {
                    match (open.get_mut(&index), delta) {
                        (Some(OpenBlock::Text), BlockDelta::TextDelta { text }) => {
                            outcome.assistant_text.push_str(&text);
                            sink.text_delta(&text).await?;
                        }
                        (Some(OpenBlock::Thinking), BlockDelta::ThinkingDelta { thinking }) => {
                            sink.send(Event::ThinkingContent {
                                delta: thinking,
                                extra: ExtraMap::new(),
                            })
                            .await?;
                        }
                        (
                            Some(OpenBlock::Tool { id, args_json, .. }),
                            BlockDelta::InputJsonDelta { partial_json },
                        ) => {
                            args_json.push_str(&partial_json);
                            if with_tools {
                                let id = id.clone();
                                sink.tool_args(&id, &partial_json).await?;
                            }
                        }
                        _ => {}
                    }
                }

                StreamEvent::ContentBlockStop { index } => match open.remove(&index) {
                    Some(OpenBlock::Thinking) => {
                        sink.send(Event::ThinkingEnd {
                            extra: ExtraMap::new(),
                        })
                        .await?;
                    }
                    Some(OpenBlock::Tool {
                        id,
                        name,
                        args_json,
                    }) => {
                        if with_tools {
                            sink.tool_end(&id).await?;
                            let args: Value =
                                serde_json::from_str(&args_json).unwrap_or(json!({}));
                            let result = agb_tools::execute(&name, &args);
                            sink.tool_result(&id, &result).await?;
                            outcome.calls.push(CompletedCall {
                                id,
                                name,
                                args_json,
                                result,
                            });
                        }
                    }
                    _ => {}
                },

                StreamEvent::MessageDelta { delta, usage: u } => {
                    if let Some(u) = u {
                        usage.merge_max(Usage {
                            input_tokens: u.input_tokens,
                            output_tokens: u.output_tokens,
                            total_tokens: 0,
                        });
                        usage.total_tokens = usage.input_tokens + usage.output_tokens;
                    }
                    if delta.stop_reason.is_some() {
                        outcome.stop_reason = delta.stop_reason;
                    }
                }

                StreamEvent::Error { error } => {
                    return Err(AdapterError::Upstream {
                        message: format!("{}: {}", error.kind, error.message),
                    });
                }

                StreamEvent::MessageStop | StreamEvent::Ping | StreamEvent::Unknown => {}
            }
        }

        Ok(outcome)
    }
}

#[async_trait]
impl Adapter for AnthropicAdapter {
    fn identity(&self) -> AdapterIdentity {
        AdapterIdentity::wrapped("anthropic-raw", self.config.model.clone())
    }

    async fn execute(
        &self,
        input: RunAgentInput,
        sink: &mut EventSink,
    ) -> Result<Usage, AdapterError> {
        let mut messages = Self::base_messages(&input);
        let mut usage = Usage::default();

        let outcome = self.stream_turn(&messages, true, sink, &mut usage).await?;

        if outcome.stop_reason.as_deref() == Some("tool_use") && !outcome.calls.is_empty() {
            tracing::debug!(calls = outcome.calls.len(), "running tool follow-up turn");
            // Replay the assistant turn (text + tool_use blocks) and attach
            // one tool_result block per call, then run the follow-up turn.
            let mut assistant_content = Vec::new();
            if !outcome.assistant_text.is_empty() {
                assistant_content.push(json!({"type": "text", "text": outcome.assistant_text}));
            }
            for call in &outcome.calls {
                let args: Value = serde_json::from_str(&call.args_json).unwrap_or(json!({}));
                assistant_content.push(json!({
                    "type": "tool_use",
                    "id": call.id,
                    "name": call.name,
                    "input": args,
                }));
            }
            messages.push(json!({"role": "assistant", "content": assistant_content}));

            let tool_results: Vec<Value> = outcome
                .calls
                .iter()
                .map(|call| {
                    json!({
                        "type": "tool_result",
                        "tool_use_id": call.id,
                        "content": call.result,
                    })
                })
                .collect();
            messages.push(json!({"role": "user", "content": tool_results}));

            self.stream_turn(&messages, false, sink, &mut usage).await?;
        }

        sink.end_message().await?;
        Ok(usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use wiremock::matchers::{body_partial_json, header, method, path};
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
        let config = AnthropicConfig::new("sk-ant-test").with_base_url(server.uri());
        let adapter = AnthropicAdapter::new(config);
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

    #[tokio::test]
    async fn text_blocks_translate_to_message_events() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(sse_response(&[
                r#"{"type":"message_start","message":{"usage":{"input_tokens":25,"output_tokens":1}}}"#,
                r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
                r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}"#,
                r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":" world"}}"#,
                r#"{"type":"content_block_stop","index":0}"#,
                r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":12}}"#,
                r#"{"type":"message_stop"}"#,
            ]))
            .mount(&server)
            .await;

        let (result, events) = run_adapter(&server, "Say hello").await;
        let usage = result.unwrap();
        assert_eq!(usage.input_tokens, 25);
        assert_eq!(usage.output_tokens, 12);
        assert_eq!(usage.total_tokens, 37);

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
    async fn tool_use_executes_between_end_and_result_then_follows_up() {
        let server = MockServer::start().await;

        // First turn: a tool_use block requesting the calculator.
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(sse_response(&[
                r#"{"type":"message_start","message":{"usage":{"input_tokens":30,"output_tokens":1}}}"#,
                r#"{"type":"content_block_start","index":0,"content_block":{"type":"tool_use","id":"toolu_1","name":"calculator","input":{}}}"#,
                r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{\"expression\":"}}"#,
                r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"\"2 + 2\"}"}}"#,
                r#"{"type":"content_block_stop","index":0}"#,
                r#"{"type":"message_delta","delta":{"stop_reason":"tool_use"},"usage":{"output_tokens":20}}"#,
                r#"{"type":"message_stop"}"#,
            ]))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        // Follow-up turn: the final answer.
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(sse_response(&[
                r#"{"type":"message_start","message":{"usage":{"input_tokens":60,"output_tokens":1}}}"#,
                r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
                r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"2 + 2 is 4."}}"#,
                r#"{"type":"content_block_stop","index":0}"#,
                r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":8}}"#,
                r#"{"type":"message_stop"}"#,
            ]))
            .mount(&server)
            .await;

        let (result, events) = run_adapter(&server, "What is 2 + 2?").await;
        result.unwrap();

        let kinds: Vec<_> = events.iter().map(Event::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "TOOL_CALL_START",
                "TOOL_CALL_ARGS",
                "TOOL_CALL_ARGS",
                "TOOL_CALL_END",
                "TOOL_CALL_RESULT",
                "TEXT_MESSAGE_START",
                "TEXT_MESSAGE_CONTENT",
                "TEXT_MESSAGE_END",
            ]
        );

        match &events[4] {
            Event::ToolCallResult { result, .. } => assert_eq!(result, "2 + 2 = 4"),
            other => panic!("expected TOOL_CALL_RESULT, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn thinking_blocks_translate_to_thinking_events() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(sse_response(&[
                r#"{"type":"content_block_start","index":0,"content_block":{"type":"thinking","thinking":""}}"#,
                r#"{"type":"content_block_delta","index":0,"delta":{"type":"thinking_delta","thinking":"x = 7"}}"#,
                r#"{"type":"content_block_stop","index":0}"#,
                r#"{"type":"content_block_start","index":1,"content_block":{"type":"text","text":""}}"#,
                r#"{"type":"content_block_delta","index":1,"delta":{"type":"text_delta","text":"x is 7"}}"#,
                r#"{"type":"content_block_stop","index":1}"#,
                r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"}}"#,
                r#"{"type":"message_stop"}"#,
            ]))
            .mount(&server)
            .await;

        let (result, events) = run_adapter(&server, "Think about x + 5 = 12").await;
        result.unwrap();
        let kinds: Vec<_> = events.iter().map(Event::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "THINKING_START",
                "THINKING_CONTENT",
                "THINKING_END",
                "TEXT_MESSAGE_START",
                "TEXT_MESSAGE_CONTENT",
                "TEXT_MESSAGE_END",
            ]
        );
    }

    #[tokio::test]
    async fn stream_error_event_surfaces_as_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(sse_response(&[
                r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
                r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"partial"}}"#,
                r#"{"type":"error","error":{"type":"overloaded_error","message":"try later"}}"#,
            ]))
            .mount(&server)
            .await;

        let (result, events) = run_adapter(&server, "hello").await;
        let err = result.unwrap_err();
        assert_eq!(err.code(), "UPSTREAM_ERROR");
        assert!(err.to_string().contains("overloaded_error"));
        // Partial text is not retracted.
        assert!(events.iter().any(|e| e.kind() == "TEXT_MESSAGE_CONTENT"));
    }

    use serde_json::json;
}
