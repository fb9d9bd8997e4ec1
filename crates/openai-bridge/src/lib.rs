// SPDX-License-Identifier: MIT OR Apache-2.0
//! openai-bridge
//!
//! Wraps the raw OpenAI Chat Completions API and translates its chunked
//! delta stream into the AG-UI event vocabulary. Tool-call fragments are
//! attached to open calls by chunk `index`; a fragment with no
//! provider-supplied id and no open call at its index is a protocol error,
//! never a guess. When the model requests tools, the bridge executes them
//! and performs exactly one follow-up completion with the results appended.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod wire;

use agb_adapter::{Adapter, AdapterError, AdapterIdentity, EventSink};
use agb_core::RunAgentInput;
use agb_core::usage::Usage;
use async_trait::async_trait;
use client::ChatClient;
use config::OpenAiConfig;
use serde_json::{Value, json};
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are a helpful assistant using the raw OpenAI API wrapped with the AG-UI protocol. You can tell the current time and do basic math calculations. Be concise and friendly.";

/// One tool call accumulated from the delta stream.
#[derive(Debug, Clone)]
struct OpenCall {
    index: usize,
    id: String,
    name: String,
    arguments: String,
}

/// Adapter wrapping the raw OpenAI Chat Completions API.
pub struct OpenAiAdapter {
    config: OpenAiConfig,
    client: ChatClient,
}

impl OpenAiAdapter {
    /// Build an adapter from configuration.
    pub fn new(config: OpenAiConfig) -> Self {
        let client = ChatClient::new(config.base_url.clone(), config.api_key.clone());
        Self { config, client }
    }

    fn tool_declarations() -> Vec<Value> {
        agb_tools::tool_specs()
            .into_iter()
            .map(|spec| {
                json!({
                    "type": "function",
                    "function": {
                        "name": spec.name,
                        "description": spec.description,
                        "parameters": spec.parameters,
                    },
                })
            })
            .collect()
    }

    fn base_messages(input: &RunAgentInput) -> Vec<Value> {
        let mut messages = vec![json!({"role": "system", "content": SYSTEM_PROMPT})];
        for msg in &input.messages {
            messages.push(json!({"role": msg.role, "content": msg.content}));
        }
        messages
    }

    /// Stream one completion, forwarding deltas through the sink.
    ///
    /// Returns the tool calls accumulated over the stream. `with_tools`
    /// controls whether tool fragments are honored; the follow-up round runs
    /// without tools so the model cannot chain further calls.
    async fn stream_round(
        &self,
        messages: &[Value],
        with_tools: bool,
        sink: &mut EventSink,
        usage: &mut Usage,
    ) -> Result<Vec<OpenCall>, AdapterError> {
        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": self.config.max_tokens,
            "stream": true,
            "stream_options": {"include_usage": true},
        });
        if with_tools {
            body["tools"] = Value::Array(Self::tool_declarations());
        }

        let mut stream = self.client.stream_chat(&body).await?;
        let mut calls: Vec<OpenCall> = Vec::new();

        while let Some(chunk) = stream.next_chunk().await {
            let chunk = chunk?;
            if let Some(wire_usage) = chunk.usage {
                usage.merge_max(wire_usage.into());
            }

            for choice in chunk.choices {
                if let Some(fragments) = choice.delta.tool_calls {
                    if !with_tools {
                        // One follow-up round only; further tool requests
                        // are dropped rather than looped.
                        debug!("ignoring tool call fragment in follow-up round");
                        continue;
                    }
                    for fragment in fragments {
                        Self::apply_tool_fragment(&mut calls, fragment, sink).await?;
                    }
                }

                if let Some(content) = choice.delta.content
                    && !content.is_empty()
                {
                    sink.text_delta(&content).await?;
                }
            }
        }

        Ok(calls)
    }

    async fn apply_tool_fragment(
        calls: &mut Vec<OpenCall>,
        fragment: wire::ToolCallDelta,
        sink: &mut EventSink,
    ) -> Result<(), AdapterError> {
        let existing = calls.iter().position(|c| c.index == fragment.index);

        match (&fragment.id, existing) {
            (Some(id), None) => {
                let name = fragment
                    .function
                    .as_ref()
                    .and_then(|f| f.name.clone())
                    .unwrap_or_default();
                sink.tool_start(id, &name).await?;
                let mut call = OpenCall {
                    index: fragment.index,
                    id: id.clone(),
                    name,
                    arguments: String::new(),
                };
                if let Some(args) = fragment.function.as_ref().and_then(|f| f.arguments.clone())
                    && !args.is_empty()
                {
                    sink.tool_args(&call.id, &args).await?;
                    call.arguments.push_str(&args);
                }
                calls.push(call);
            }
            (_, Some(pos)) => {
                let call = &mut calls[pos];
                if let Some(args) = fragment.function.as_ref().and_then(|f| f.arguments.clone())
                    && !args.is_empty()
                {
                    sink.tool_args(&call.id, &args).await?;
                    call.arguments.push_str(&args);
                }
            }
            // No id and nothing open at this index: refusing to guess which
            // call the fragment belongs to is part of the contract.
            (None, None) => return Err(AdapterError::MissingToolCallId),
        }
        Ok(())
    }
}

#[async_trait]
impl Adapter for OpenAiAdapter {
    fn identity(&self) -> AdapterIdentity {
        AdapterIdentity::wrapped("openai-raw", self.config.model.clone())
    }

    async fn execute(
        &self,
        input: RunAgentInput,
        sink: &mut EventSink,
    ) -> Result<Usage, AdapterError> {
        let mut messages = Self::base_messages(&input);
        let mut usage = Usage::default();

        let calls = self.stream_round(&messages, true, sink, &mut usage).await?;

        if !calls.is_empty() {
            // Close every call, execute it, and report the result before the
            // follow-up completion sees any of them.
            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                sink.tool_end(&call.id).await?;
                let args: Value = serde_json::from_str(&call.arguments).unwrap_or(json!({}));
                let result = agb_tools::execute(&call.name, &args);
                sink.tool_result(&call.id, &result).await?;
                results.push(result);
            }

            messages.push(json!({
                "role": "assistant",
                "tool_calls": calls.iter().map(|c| json!({
                    "id": c.id,
                    "type": "function",
                    "function": {"name": c.name, "arguments": c.arguments},
                })).collect::<Vec<_>>(),
            }));
            for (call, result) in calls.iter().zip(&results) {
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": result,
                }));
            }

            self.stream_round(&messages, false, sink, &mut usage).await?;
        }

        sink.end_message().await?;
        Ok(usage)
    }
}
