// SPDX-License-Identifier: MIT OR Apache-2.0
//! Serde models of the Anthropic Messages streaming wire format.
//!
//! The stream is a sequence of typed SSE events: a message envelope opens,
//! content blocks start/delta/stop by index, a message delta carries the
//! stop reason and output usage, and the envelope closes. Unknown event and
//! block types decode to catch-all variants so new server features do not
//! break the translator.

use serde::Deserialize;

/// One `data:` payload of a Messages stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Opens the message envelope; carries prompt-side usage.
    MessageStart {
        /// Envelope metadata.
        message: MessageStart,
    },
    /// Opens one content block.
    ContentBlockStart {
        /// Block position within the message.
        index: usize,
        /// Kind and identity of the block.
        content_block: ContentBlock,
    },
    /// Incremental payload for an open block.
    ContentBlockDelta {
        /// Owning block position.
        index: usize,
        /// The fragment.
        delta: BlockDelta,
    },
    /// Closes one content block.
    ContentBlockStop {
        /// Owning block position.
        index: usize,
    },
    /// Message-level delta: stop reason and output usage.
    MessageDelta {
        /// Stop reason wrapper.
        delta: MessageDeltaBody,
        /// Cumulative output usage.
        #[serde(default)]
        usage: Option<WireUsage>,
    },
    /// Closes the message envelope.
    MessageStop,
    /// Keep-alive.
    Ping,
    /// Server-reported stream error.
    Error {
        /// Error payload.
        error: ApiError,
    },
    /// Any event type this translator does not know.
    #[serde(other)]
    Unknown,
}

/// Envelope metadata from `message_start`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageStart {
    /// Prompt-side usage.
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

/// One content block kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain assistant text.
    Text {
        /// Initial text (empty on streamed blocks).
        #[serde(default)]
        text: String,
    },
    /// A tool invocation; arguments stream as `input_json_delta` fragments.
    ToolUse {
        /// Provider-assigned tool-call id.
        id: String,
        /// Tool name.
        name: String,
    },
    /// Extended-thinking block.
    Thinking {
        /// Initial thinking text.
        #[serde(default)]
        thinking: String,
    },
    /// Any block type this translator does not know.
    #[serde(other)]
    Other,
}

/// One block-level fragment.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    /// Text fragment.
    TextDelta {
        /// The fragment.
        text: String,
    },
    /// Tool-argument JSON fragment.
    InputJsonDelta {
        /// The fragment.
        partial_json: String,
    },
    /// Thinking fragment.
    ThinkingDelta {
        /// The fragment.
        thinking: String,
    },
    /// Any delta type this translator does not know.
    #[serde(other)]
    Other,
}

/// Stop-reason wrapper from `message_delta`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageDeltaBody {
    /// `"end_turn"`, `"tool_use"`, `"max_tokens"`, ...
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// Token usage block.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct WireUsage {
    /// Prompt-side tokens.
    #[serde(default)]
    pub input_tokens: u64,
    /// Completion-side tokens.
    #[serde(default)]
    pub output_tokens: u64,
}

impl From<WireUsage> for agb_core::usage::Usage {
    fn from(w: WireUsage) -> Self {
        Self {
            input_tokens: w.input_tokens,
            output_tokens: w.output_tokens,
            total_tokens: w.input_tokens + w.output_tokens,
        }
    }
}

/// Error payload of an `error` stream event.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    /// Provider error type slug.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}
