// SPDX-License-Identifier: MIT OR Apache-2.0
//! Serde models of the Chat Completions streaming wire format.
//!
//! Only the fields the translator reads are modelled; everything else is
//! ignored by serde. The same chunk shapes are served by OpenAI-compatible
//! providers (Cerebras reuses this module).

use serde::Deserialize;

/// One `data:` payload of a streaming chat completion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionChunk {
    /// Streamed choices; in practice a single entry.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Cumulative usage, present on the final chunk when
    /// `stream_options.include_usage` is set.
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

/// One choice of a chunk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    /// Incremental message delta.
    #[serde(default)]
    pub delta: ChunkDelta,
    /// Set on the last content chunk (`"stop"`, `"tool_calls"`, ...).
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental message payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    /// Text fragment.
    #[serde(default)]
    pub content: Option<String>,
    /// Tool-call fragments, attached to open calls by `index`.
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// One tool-call fragment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCallDelta {
    /// Position of the call in the assistant turn. Follow-up fragments for
    /// the same call repeat the index but omit the id.
    #[serde(default)]
    pub index: usize,
    /// Provider-assigned call id; present only on the first fragment.
    #[serde(default)]
    pub id: Option<String>,
    /// Function name/argument fragments.
    #[serde(default)]
    pub function: Option<FunctionDelta>,
}

/// Function payload of a tool-call fragment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionDelta {
    /// Function name; present only on the first fragment.
    #[serde(default)]
    pub name: Option<String>,
    /// Argument JSON fragment.
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Token usage block.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct WireUsage {
    /// Prompt-side tokens.
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Completion-side tokens.
    #[serde(default)]
    pub completion_tokens: u64,
    /// Reported total.
    #[serde(default)]
    pub total_tokens: u64,
}

impl From<WireUsage> for agb_core::usage::Usage {
    fn from(w: WireUsage) -> Self {
        Self {
            input_tokens: w.prompt_tokens,
            output_tokens: w.completion_tokens,
            total_tokens: w.total_tokens,
        }
    }
}
