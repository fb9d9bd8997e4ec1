// SPDX-License-Identifier: MIT OR Apache-2.0
//! agb-adapter-mock
//!
//! A scripted adapter that does not call any real provider. It inspects the
//! latest user prompt and replays a deterministic event sequence covering
//! the protocol surface: plain text, a tool round, a thinking block, or a
//! forced failure. Useful for unit tests and for exercising the benchmark
//! pipeline offline.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use agb_adapter::{Adapter, AdapterError, AdapterIdentity, EventSink};
use agb_core::{Event, ExtraMap, RunAgentInput};
use agb_core::usage::Usage;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Scripted adapter for tests and offline benchmarking.
#[derive(Debug, Clone)]
pub struct MockAdapter {
    /// Pause inserted between events to simulate streaming.
    pub delay: Duration,
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }
}

impl MockAdapter {
    /// A mock that emits events back-to-back.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that pauses between events.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    async fn stream_text(&self, sink: &mut EventSink, text: &str) -> Result<(), AdapterError> {
        // Split into word-sized deltas so consumers see real streaming.
        for word in text.split_inclusive(' ') {
            sink.text_delta(word).await?;
            self.pause().await;
        }
        Ok(())
    }

    async fn tool_round(
        &self,
        sink: &mut EventSink,
        name: &str,
        args: serde_json::Value,
    ) -> Result<String, AdapterError> {
        let id = uuid::Uuid::new_v4().to_string();
        sink.tool_start(&id, name).await?;
        self.pause().await;
        let args_json = args.to_string();
        sink.tool_args(&id, &args_json).await?;
        self.pause().await;
        sink.tool_end(&id).await?;
        let result = agb_tools::execute(name, &args);
        sink.tool_result(&id, &result).await?;
        self.pause().await;
        Ok(result)
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn identity(&self) -> AdapterIdentity {
        AdapterIdentity {
            framework: "mock".to_string(),
            model: "scripted".to_string(),
            native_agui: true,
        }
    }

    async fn execute(
        &self,
        input: RunAgentInput,
        sink: &mut EventSink,
    ) -> Result<Usage, AdapterError> {
        let prompt = input.latest_user_message().unwrap_or_default().to_string();
        let lower = prompt.to_lowercase();

        if lower.contains("fail on purpose") {
            return Err(AdapterError::Upstream {
                message: "mock upstream failure".to_string(),
            });
        }

        if lower.contains("think") {
            sink.send(Event::ThinkingStart {
                extra: ExtraMap::new(),
            })
            .await?;
            sink.send(Event::ThinkingContent {
                delta: "Working through the steps.".to_string(),
                extra: ExtraMap::new(),
            })
            .await?;
            sink.send(Event::ThinkingEnd {
                extra: ExtraMap::new(),
            })
            .await?;
        }

        if lower.contains("approval") {
            sink.send(Event::HumanInputRequested {
                question: "Do you approve this action?".to_string(),
                extra: ExtraMap::new(),
            })
            .await?;
            // The scripted human always approves.
            sink.send(Event::HumanInputReceived {
                response: json!({"approved": true, "message": "Yes, proceed"}),
                extra: ExtraMap::new(),
            })
            .await?;
        }

        if lower.contains("function") || lower.contains("code") {
            let artifact_id = uuid::Uuid::new_v4().to_string();
            sink.send(Event::ArtifactStart {
                artifact_id: artifact_id.clone(),
                title: Some("add.py".to_string()),
                extra: ExtraMap::new(),
            })
            .await?;
            sink.send(Event::ArtifactContent {
                artifact_id: artifact_id.clone(),
                delta: "def add(a, b):\n    return a + b\n".to_string(),
                extra: ExtraMap::new(),
            })
            .await?;
            sink.send(Event::ArtifactEnd {
                artifact_id,
                extra: ExtraMap::new(),
            })
            .await?;
        }

        let mut tool_summary = None;
        if lower.contains("time") {
            let result = self
                .tool_round(sink, agb_tools::TOOL_CURRENT_TIME, json!({}))
                .await?;
            tool_summary = Some(format!("The current time is {result}."));
        } else if let Some(expr) = extract_expression(&prompt) {
            let result = self
                .tool_round(
                    sink,
                    agb_tools::TOOL_CALCULATOR,
                    json!({ "expression": expr }),
                )
                .await?;
            tool_summary = Some(result);
        }

        let reply = tool_summary.unwrap_or_else(|| {
            "Hello! I am a scripted adapter used for testing the protocol pipeline.".to_string()
        });
        self.stream_text(sink, &reply).await?;
        sink.end_message().await?;

        sink.send(Event::StateSnapshot {
            state: json!({ "turns": input.messages.len() }),
            extra: ExtraMap::new(),
        })
        .await?;

        // Deterministic usage figure, reported the way real bridges do.
        Ok(Usage {
            input_tokens: (prompt.len() / 4) as u64,
            output_tokens: (reply.len() / 4) as u64,
            total_tokens: ((prompt.len() + reply.len()) / 4) as u64,
        })
    }
}

/// Pull the first arithmetic-looking span out of a prompt, e.g.
/// `"Calculate 42 * 17 using the calculator"` yields `"42 * 17"`.
fn extract_expression(prompt: &str) -> Option<String> {
    let allowed = |c: char| c.is_ascii_digit() || "+-*/.() ".contains(c);
    let mut best: Option<&str> = None;
    let mut start = None;
    for (i, c) in prompt.char_indices() {
        if allowed(c) {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s) = start.take() {
            consider_span(&prompt[s..i], &mut best);
        }
    }
    if let Some(s) = start {
        consider_span(&prompt[s..], &mut best);
    }
    best.map(str::to_string)
}

fn consider_span<'a>(span: &'a str, best: &mut Option<&'a str>) {
    // Sentence punctuation is in the allowed set; strip it off the edges.
    let span = span.trim().trim_end_matches('.').trim_end();
    if span_has_operator(span) && best.is_none_or(|b| span.len() > b.len()) {
        *best = Some(span);
    }
}

fn span_has_operator(span: &str) -> bool {
    span.chars().any(|c| c.is_ascii_digit()) && span.chars().any(|c| "+-*/".contains(c))
}
