// SPDX-License-Identifier: MIT OR Apache-2.0
//! Serde models of the Gemini `streamGenerateContent` wire format.
//!
//! Gemini streams whole parts, not field-level deltas: text arrives in
//! fragments, but a function call arrives as one complete part with its
//! arguments already parsed. There is no provider-assigned call id.

use serde::Deserialize;

/// One `data:` payload of a `streamGenerateContent?alt=sse` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentChunk {
    /// Streamed candidates; in practice a single entry.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Cumulative usage counters.
    #[serde(rename = "usageMetadata", default)]
    pub usage_metadata: Option<UsageMetadata>,
}

/// One candidate of a chunk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    /// Incremental content.
    #[serde(default)]
    pub content: Option<Content>,
    /// Set on the last chunk (`"STOP"`, `"MAX_TOKENS"`, ...).
    #[serde(rename = "finishReason", default)]
    pub finish_reason: Option<String>,
}

/// Content payload of a candidate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Content {
    /// Parts in arrival order.
    #[serde(default)]
    pub parts: Vec<Part>,
    /// `"model"` on responses.
    #[serde(default)]
    pub role: Option<String>,
}

/// One content part: text fragment or a complete function call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Part {
    /// Text fragment.
    #[serde(default)]
    pub text: Option<String>,
    /// Complete function call.
    #[serde(rename = "functionCall", default)]
    pub function_call: Option<FunctionCall>,
}

/// A complete function call part.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    /// Tool name.
    pub name: String,
    /// Already-parsed arguments object.
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Token usage counters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct UsageMetadata {
    /// Prompt-side tokens.
    #[serde(rename = "promptTokenCount", default)]
    pub prompt_token_count: u64,
    /// Completion-side tokens.
    #[serde(rename = "candidatesTokenCount", default)]
    pub candidates_token_count: u64,
    /// Reported total.
    #[serde(rename = "totalTokenCount", default)]
    pub total_token_count: u64,
}

impl From<UsageMetadata> for agb_core::usage::Usage {
    fn from(u: UsageMetadata) -> Self {
        Self {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_chunk() {
        let chunk: GenerateContentChunk = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello"}],"role":"model"},"index":0}]}"#,
        )
        .unwrap();
        let part = &chunk.candidates[0].content.as_ref().unwrap().parts[0];
        assert_eq!(part.text.as_deref(), Some("Hello"));
        assert!(part.function_call.is_none());
    }

    #[test]
    fn parses_function_call_part() {
        let chunk: GenerateContentChunk = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"functionCall":{"name":"calculator","args":{"expression":"2 + 2"}}}]}}]}"#,
        )
        .unwrap();
        let fc = chunk.candidates[0].content.as_ref().unwrap().parts[0]
            .function_call
            .as_ref()
            .unwrap();
        assert_eq!(fc.name, "calculator");
        assert_eq!(fc.args["expression"], "2 + 2");
    }

    #[test]
    fn parses_usage_metadata() {
        let chunk: GenerateContentChunk = serde_json::from_str(
            r#"{"candidates":[{"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":7,"candidatesTokenCount":11,"totalTokenCount":18}}"#,
        )
        .unwrap();
        let usage: agb_core::usage::Usage = chunk.usage_metadata.unwrap().into();
        assert_eq!(usage.input_tokens, 7);
        assert_eq!(usage.output_tokens, 11);
        assert_eq!(usage.total_tokens, 18);
        assert_eq!(
            chunk.candidates[0].finish_reason.as_deref(),
            Some("STOP")
        );
    }
}
