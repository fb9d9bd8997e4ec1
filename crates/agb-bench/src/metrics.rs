// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-test metrics derived from a collected event stream.
//!
//! [`TestMetrics`] is the exact shape persisted as `metadata.json` and
//! consumed downstream by the aggregator and the replay utility.

use agb_core::feature::{Feature, FeatureSet};
use agb_core::usage::Usage;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Timing checkpoints, all in milliseconds from request start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    /// Wall clock at stream completion.
    pub total_time_ms: f64,
    /// Wall clock at the first non-empty network chunk.
    pub time_to_first_event_ms: f64,
    /// Wall clock at the first `TEXT_MESSAGE_CONTENT` event.
    pub time_to_first_content_ms: f64,
    /// Same as total; kept for artifact compatibility.
    pub time_to_complete_ms: f64,
}

/// Tool-call counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolStats {
    /// Number of `TOOL_CALL_START` events.
    pub tool_calls: u32,
    /// Total milliseconds between each call's START and RESULT.
    pub tool_call_time_ms: f64,
}

/// Response text statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseStats {
    /// Characters of assembled response text.
    pub chars: usize,
    /// Rough token estimate (`chars / 4`).
    pub tokens_approx: usize,
    /// The assembled final text.
    pub final_text: String,
}

/// Event-stream summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventStats {
    /// Total events observed.
    pub total_events: usize,
    /// Sorted set of observed event kinds.
    pub event_types: Vec<String>,
}

/// Detected protocol features.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Thinking events observed.
    pub has_thinking: bool,
    /// Artifact events observed.
    pub has_artifacts: bool,
    /// Human-input events observed.
    pub has_hitl: bool,
    /// Snapshot events observed.
    pub has_state: bool,
    /// Error events observed.
    pub has_errors: bool,
    /// Multi-turn context retention detected.
    pub context_retained: bool,
}

/// Everything recorded about one (agent, prompt, repetition) test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestMetrics {
    /// Agent name.
    pub agent: String,
    /// Repetition number, 1-based.
    pub run_number: u32,
    /// Prompt name.
    pub prompt_type: String,
    /// Prompt text (first turn for multi-turn tests).
    pub prompt: String,
    /// Whether the request streamed to completion.
    pub success: bool,
    /// Transport or protocol failure description.
    pub error: Option<String>,
    /// Number of turns executed (1 except for multi-turn tests).
    pub turn_count: u32,
    /// Timing checkpoints.
    pub timing: Timing,
    /// Tool counters.
    pub tools: ToolStats,
    /// Response statistics.
    pub response: ResponseStats,
    /// Token usage harvested from events.
    pub tokens: Usage,
    /// Event summary.
    pub events: EventStats,
    /// Detected features.
    pub features: FeatureFlags,
}

impl TestMetrics {
    /// Derive the event-dependent portions from a collected stream.
    ///
    /// Timing is measured by the driver while streaming; everything an
    /// event can tell us (final text, tool counts, usage, features) is
    /// recomputed here from the raw values.
    pub fn absorb_events(&mut self, events: &[Value]) {
        self.events.total_events = events.len();

        let kinds: BTreeSet<String> = events
            .iter()
            .filter_map(|e| e.get("type").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        self.events.event_types = kinds.iter().cloned().collect();

        self.response.final_text = extract_final_text(events);
        self.response.chars = self.response.final_text.chars().count();
        self.response.tokens_approx = self.response.chars / 4;

        self.tools.tool_calls = events
            .iter()
            .filter(|e| e.get("type").and_then(Value::as_str) == Some("TOOL_CALL_START"))
            .count() as u32;

        for event in events {
            if let Some(map) = event.as_object() {
                for key in ["usage", "usage_metadata"] {
                    if let Some(u) = map.get(key)
                        && let Ok(u) = serde_json::from_value::<Usage>(u.clone())
                    {
                        self.tokens.merge_max(u);
                    }
                }
            }
        }

        let feature_set =
            FeatureSet::from_kinds(self.events.event_types.iter().map(String::as_str));
        self.features.has_thinking = feature_set.supports(Feature::Thinking);
        self.features.has_artifacts = feature_set.supports(Feature::Artifacts);
        self.features.has_hitl = feature_set.supports(Feature::Hitl);
        self.features.has_state = feature_set.supports(Feature::State);
        self.features.has_errors = feature_set.supports(Feature::Errors);
    }
}

/// Assemble the response text from a raw event stream: concatenated
/// `TEXT_MESSAGE_CONTENT` deltas, or the last assistant message of a
/// `MESSAGES_SNAPSHOT` when a framework streams snapshots instead.
pub fn extract_final_text(events: &[Value]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for event in events {
        match event.get("type").and_then(Value::as_str) {
            Some("TEXT_MESSAGE_CONTENT") => {
                if let Some(delta) = event.get("delta").and_then(Value::as_str) {
                    parts.push(delta.to_string());
                }
            }
            Some("MESSAGES_SNAPSHOT") => {
                if let Some(messages) = event.get("messages").and_then(Value::as_array) {
                    for msg in messages.iter().rev() {
                        if msg.get("role").and_then(Value::as_str) == Some("assistant")
                            && let Some(content) = msg.get("content").and_then(Value::as_str)
                            && !content.is_empty()
                        {
                            return content.to_string();
                        }
                    }
                }
            }
            _ => {}
        }
    }
    parts.concat()
}
