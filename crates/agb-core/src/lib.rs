// SPDX-License-Identifier: MIT OR Apache-2.0
//! agb-core
//!
//! The stable wire contract for agui-bench: the AG-UI event vocabulary,
//! the run-input envelope, ordering validation, and feature detection.
//!
//! If you only take one dependency, take this one.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod feature;
pub mod usage;
pub mod validate;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Protocol version string reported by adapter service cards.
pub const PROTOCOL_VERSION: &str = "ag-ui/v1";

/// Open map of framework-specific payload fields carried alongside the
/// contractual fields of an event.
///
/// Only the named fields of each [`Event`] variant are guaranteed by the
/// contract; everything else an upstream framework attaches survives
/// round-trips through here.
pub type ExtraMap = BTreeMap<String, serde_json::Value>;

/// A single AG-UI protocol event.
///
/// Serialized with `#[serde(tag = "type")]` using SCREAMING_SNAKE wire tags
/// (`RUN_STARTED`, `TEXT_MESSAGE_CONTENT`, ...). Field casing follows the
/// wire contract: lifecycle events use snake_case correlation keys, tool
/// events use the camelCase `toolCallId`/`toolCallName` keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    /// First event of every run.
    RunStarted {
        /// Conversation correlation key.
        thread_id: String,
        /// Run correlation key.
        run_id: String,
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// Successful terminal event.
    RunFinished {
        /// Conversation correlation key.
        thread_id: String,
        /// Run correlation key.
        run_id: String,
        /// Framework-specific extras (token usage lands here).
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// Failed terminal event. Partial text already streamed is not retracted.
    RunError {
        /// Human-readable failure description.
        message: String,
        /// Coarse machine-readable error code.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// Opens a streamed assistant message.
    TextMessageStart {
        /// Ties together one START/CONTENT*/END run of deltas.
        message_id: String,
        /// Message author role.
        #[serde(default = "default_role")]
        role: String,
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// One incremental text fragment of an open message.
    TextMessageContent {
        /// Owning message identifier.
        message_id: String,
        /// Text fragment.
        delta: String,
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// Closes a streamed assistant message.
    TextMessageEnd {
        /// Owning message identifier.
        message_id: String,
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// Opens a tool invocation.
    ToolCallStart {
        /// Ties together one START/ARGS*/END/RESULT tool lifecycle.
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        /// Name of the invoked tool.
        #[serde(rename = "toolCallName")]
        tool_call_name: String,
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// One incremental fragment of a tool call's JSON arguments.
    ToolCallArgs {
        /// Owning tool-call identifier.
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        /// Argument JSON fragment.
        delta: String,
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// Closes a tool call's argument stream. Execution happens between this
    /// event and the matching result.
    ToolCallEnd {
        /// Owning tool-call identifier.
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// Result of an executed tool call. Always follows the matching END.
    ToolCallResult {
        /// Owning tool-call identifier.
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        /// Tool output, including tool-level error strings.
        result: String,
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// Opens a reasoning block.
    ThinkingStart {
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// One incremental reasoning fragment.
    ThinkingContent {
        /// Reasoning text fragment.
        delta: String,
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// Closes a reasoning block.
    ThinkingEnd {
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// Opens a generated artifact (e.g. a code block).
    ArtifactStart {
        /// Artifact correlation key.
        artifact_id: String,
        /// Optional artifact title.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// One incremental artifact fragment.
    ArtifactContent {
        /// Owning artifact identifier.
        artifact_id: String,
        /// Artifact content fragment.
        delta: String,
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// Closes a generated artifact.
    ArtifactEnd {
        /// Owning artifact identifier.
        artifact_id: String,
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// Full-state snapshot from frameworks that do not stream fine-grained
    /// deltas.
    StateSnapshot {
        /// Opaque framework state.
        state: serde_json::Value,
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// Complete message-list snapshot.
    MessagesSnapshot {
        /// Messages in conversation order.
        messages: Vec<serde_json::Value>,
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// The agent asks for human input before proceeding.
    HumanInputRequested {
        /// Question put to the human.
        question: String,
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },

    /// A human response was delivered back to the agent.
    HumanInputReceived {
        /// The human's answer payload.
        response: serde_json::Value,
        /// Framework-specific extras.
        #[serde(flatten)]
        extra: ExtraMap,
    },
}

fn default_role() -> String {
    "assistant".to_string()
}

/// Every wire tag in the vocabulary, in report order.
pub const ALL_EVENT_KINDS: [&str; 20] = [
    "RUN_STARTED",
    "RUN_FINISHED",
    "RUN_ERROR",
    "TEXT_MESSAGE_START",
    "TEXT_MESSAGE_CONTENT",
    "TEXT_MESSAGE_END",
    "TOOL_CALL_START",
    "TOOL_CALL_ARGS",
    "TOOL_CALL_END",
    "TOOL_CALL_RESULT",
    "THINKING_START",
    "THINKING_CONTENT",
    "THINKING_END",
    "ARTIFACT_START",
    "ARTIFACT_CONTENT",
    "ARTIFACT_END",
    "STATE_SNAPSHOT",
    "MESSAGES_SNAPSHOT",
    "HUMAN_INPUT_REQUESTED",
    "HUMAN_INPUT_RECEIVED",
];

impl Event {
    /// Wire tag of this event (`"RUN_STARTED"`, `"TEXT_MESSAGE_CONTENT"`, ...).
    pub fn kind(&self) -> &'static str {
        match self {
            Event::RunStarted { .. } => "RUN_STARTED",
            Event::RunFinished { .. } => "RUN_FINISHED",
            Event::RunError { .. } => "RUN_ERROR",
            Event::TextMessageStart { .. } => "TEXT_MESSAGE_START",
            Event::TextMessageContent { .. } => "TEXT_MESSAGE_CONTENT",
            Event::TextMessageEnd { .. } => "TEXT_MESSAGE_END",
            Event::ToolCallStart { .. } => "TOOL_CALL_START",
            Event::ToolCallArgs { .. } => "TOOL_CALL_ARGS",
            Event::ToolCallEnd { .. } => "TOOL_CALL_END",
            Event::ToolCallResult { .. } => "TOOL_CALL_RESULT",
            Event::ThinkingStart { .. } => "THINKING_START",
            Event::ThinkingContent { .. } => "THINKING_CONTENT",
            Event::ThinkingEnd { .. } => "THINKING_END",
            Event::ArtifactStart { .. } => "ARTIFACT_START",
            Event::ArtifactContent { .. } => "ARTIFACT_CONTENT",
            Event::ArtifactEnd { .. } => "ARTIFACT_END",
            Event::StateSnapshot { .. } => "STATE_SNAPSHOT",
            Event::MessagesSnapshot { .. } => "MESSAGES_SNAPSHOT",
            Event::HumanInputRequested { .. } => "HUMAN_INPUT_REQUESTED",
            Event::HumanInputReceived { .. } => "HUMAN_INPUT_RECEIVED",
        }
    }

    /// Returns `true` for `RUN_FINISHED` and `RUN_ERROR`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::RunFinished { .. } | Event::RunError { .. })
    }

    /// The `message_id` this event belongs to, if it is a text event.
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Event::TextMessageStart { message_id, .. }
            | Event::TextMessageContent { message_id, .. }
            | Event::TextMessageEnd { message_id, .. } => Some(message_id),
            _ => None,
        }
    }

    /// The `toolCallId` this event belongs to, if it is a tool event.
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Event::ToolCallStart { tool_call_id, .. }
            | Event::ToolCallArgs { tool_call_id, .. }
            | Event::ToolCallEnd { tool_call_id, .. }
            | Event::ToolCallResult { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }

    /// Shorthand constructor for `RUN_STARTED`.
    pub fn run_started(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Event::RunStarted {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            extra: ExtraMap::new(),
        }
    }

    /// Shorthand constructor for `RUN_FINISHED`.
    pub fn run_finished(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Event::RunFinished {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            extra: ExtraMap::new(),
        }
    }

    /// Shorthand constructor for `RUN_ERROR`.
    pub fn run_error(message: impl Into<String>, code: Option<String>) -> Self {
        Event::RunError {
            message: message.into(),
            code,
            extra: ExtraMap::new(),
        }
    }
}

/// Concatenate all `TEXT_MESSAGE_CONTENT` deltas for `message_id`.
///
/// Replaying the same stored sequence always reproduces the same string.
pub fn assemble_text(events: &[Event], message_id: &str) -> String {
    events
        .iter()
        .filter_map(|ev| match ev {
            Event::TextMessageContent {
                message_id: id,
                delta,
                ..
            } if id == message_id => Some(delta.as_str()),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Run input envelope
// ---------------------------------------------------------------------------

/// One message of the request conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InputMessage {
    /// Optional client-assigned message identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Author role (`user`, `assistant`, `system`, ...).
    pub role: String,
    /// Message text.
    pub content: String,
}

impl InputMessage {
    /// Build a user message without a client id.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: None,
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Build an assistant message without a client id.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: None,
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// The AG-UI-shaped request body accepted by every adapter endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunAgentInput {
    /// Conversation correlation key.
    pub thread_id: String,
    /// Run correlation key.
    pub run_id: String,
    /// Conversation history, oldest first.
    #[serde(default)]
    pub messages: Vec<InputMessage>,
    /// Opaque client state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
    /// Client-declared tool schemas (unused by the in-repo adapters, which
    /// declare their own uniform tool surface).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<serde_json::Value>>,
    /// Additional context items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<serde_json::Value>>,
    /// Opaque forwarded properties.
    #[serde(rename = "forwardedProps", default, skip_serializing_if = "Option::is_none")]
    pub forwarded_props: Option<serde_json::Value>,
    /// Per-request model override, honored by adapters that serve several
    /// models behind one endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl RunAgentInput {
    /// Build a minimal single-turn input.
    pub fn single_turn(
        thread_id: impl Into<String>,
        run_id: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            messages: vec![InputMessage::user(prompt)],
            state: None,
            tools: None,
            context: None,
            forwarded_props: None,
            model: None,
        }
    }

    /// The content of the most recent `user` message, if any.
    pub fn latest_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_started_wire_shape() {
        let ev = Event::run_started("t1", "r1");
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "RUN_STARTED");
        assert_eq!(v["thread_id"], "t1");
        assert_eq!(v["run_id"], "r1");
    }

    #[test]
    fn tool_events_use_camel_case_keys() {
        let ev = Event::ToolCallStart {
            tool_call_id: "tc-1".into(),
            tool_call_name: "calculator".into(),
            extra: ExtraMap::new(),
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "TOOL_CALL_START");
        assert_eq!(v["toolCallId"], "tc-1");
        assert_eq!(v["toolCallName"], "calculator");
        assert!(v.get("tool_call_id").is_none());
    }

    #[test]
    fn text_content_roundtrip() {
        let ev = Event::TextMessageContent {
            message_id: "m1".into(),
            delta: "hello".into(),
            extra: ExtraMap::new(),
        };
        let json = serde_json::to_string(&ev).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);
    }

    #[test]
    fn extra_fields_survive_roundtrip() {
        let raw = json!({
            "type": "RUN_FINISHED",
            "thread_id": "t",
            "run_id": "r",
            "usage": {"input_tokens": 10, "output_tokens": 5},
        });
        let ev: Event = serde_json::from_value(raw).unwrap();
        match &ev {
            Event::RunFinished { extra, .. } => {
                assert_eq!(extra["usage"]["input_tokens"], 10);
            }
            other => panic!("wrong variant: {other:?}"),
        }
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["usage"]["output_tokens"], 5);
    }

    #[test]
    fn empty_extra_is_omitted() {
        let ev = Event::run_finished("t", "r");
        let json = serde_json::to_string(&ev).unwrap();
        assert!(!json.contains("extra"));
    }

    #[test]
    fn text_message_start_defaults_role() {
        let ev: Event =
            serde_json::from_value(json!({"type": "TEXT_MESSAGE_START", "message_id": "m"}))
                .unwrap();
        match ev {
            Event::TextMessageStart { role, .. } => assert_eq!(role, "assistant"),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn kind_matches_wire_tag_for_all_variants() {
        let samples = vec![
            Event::run_started("t", "r"),
            Event::run_finished("t", "r"),
            Event::run_error("boom", None),
            Event::TextMessageStart {
                message_id: "m".into(),
                role: "assistant".into(),
                extra: ExtraMap::new(),
            },
            Event::ToolCallResult {
                tool_call_id: "tc".into(),
                result: "4".into(),
                extra: ExtraMap::new(),
            },
            Event::ThinkingContent {
                delta: "hm".into(),
                extra: ExtraMap::new(),
            },
            Event::StateSnapshot {
                state: json!({}),
                extra: ExtraMap::new(),
            },
        ];
        for ev in samples {
            let v = serde_json::to_value(&ev).unwrap();
            assert_eq!(v["type"], ev.kind());
            assert!(ALL_EVENT_KINDS.contains(&ev.kind()));
        }
    }

    #[test]
    fn terminal_detection() {
        assert!(Event::run_finished("t", "r").is_terminal());
        assert!(Event::run_error("x", None).is_terminal());
        assert!(!Event::run_started("t", "r").is_terminal());
    }

    #[test]
    fn assemble_text_filters_by_message_id() {
        let events = vec![
            Event::TextMessageContent {
                message_id: "a".into(),
                delta: "foo".into(),
                extra: ExtraMap::new(),
            },
            Event::TextMessageContent {
                message_id: "b".into(),
                delta: "nope".into(),
                extra: ExtraMap::new(),
            },
            Event::TextMessageContent {
                message_id: "a".into(),
                delta: "bar".into(),
                extra: ExtraMap::new(),
            },
        ];
        assert_eq!(assemble_text(&events, "a"), "foobar");
        assert_eq!(assemble_text(&events, "b"), "nope");
        assert_eq!(assemble_text(&events, "c"), "");
    }

    #[test]
    fn run_input_accepts_minimal_body() {
        let input: RunAgentInput = serde_json::from_value(json!({
            "thread_id": "t",
            "run_id": "r",
            "messages": [{"id": "msg-1", "role": "user", "content": "hi"}],
        }))
        .unwrap();
        assert_eq!(input.latest_user_message(), Some("hi"));
        assert!(input.state.is_none());
        assert!(input.model.is_none());
    }

    #[test]
    fn run_input_forwarded_props_key_is_camel_case() {
        let input: RunAgentInput = serde_json::from_value(json!({
            "thread_id": "t",
            "run_id": "r",
            "messages": [],
            "forwardedProps": {"k": 1},
        }))
        .unwrap();
        assert_eq!(input.forwarded_props.unwrap()["k"], 1);
    }

    #[test]
    fn latest_user_message_skips_assistant_turns() {
        let input = RunAgentInput {
            messages: vec![
                InputMessage::user("first"),
                InputMessage::assistant("reply"),
                InputMessage::user("second"),
            ],
            ..RunAgentInput::single_turn("t", "r", "ignored")
        };
        assert_eq!(input.latest_user_message(), Some("second"));
    }
}
