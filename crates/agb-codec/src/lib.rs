// SPDX-License-Identifier: MIT OR Apache-2.0
//! agb-codec
//!
//! Wire codecs for the AG-UI event stream: `data: <json>\n\n` SSE framing,
//! an incremental frame decoder for byte-chunked HTTP bodies, and the JSONL
//! format used by persisted `response.jsonl` artifacts.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use agb_core::Event;

/// Errors from strict decoding paths.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A frame payload was not valid JSON for the event vocabulary.
    #[error("invalid event payload: {0}")]
    InvalidEvent(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode one event as an SSE frame: `data: <json>\n\n`.
pub fn encode_frame(event: &Event) -> Result<String, CodecError> {
    let json = serde_json::to_string(event)?;
    Ok(format!("data: {json}\n\n"))
}

/// Encode a batch of events as a full SSE body.
pub fn encode_body(events: &[Event]) -> Result<String, CodecError> {
    let mut out = String::new();
    for ev in events {
        out.push_str(&encode_frame(ev)?);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Incremental decoding
// ---------------------------------------------------------------------------

/// Incremental SSE scanner.
///
/// Feed body chunks as they arrive; complete `data:` payloads come back as
/// soon as their terminating newline is seen, even when a frame is split
/// across chunk boundaries. Comment lines (`:`), `event:`/`id:` lines, CRLF
/// endings, and the OpenAI-style `[DONE]` sentinel are tolerated and
/// dropped.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: String,
}

impl FrameDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of body text; returns every payload completed by it.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        let mut payloads = Vec::new();

        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(payload) = data_payload(line) {
                payloads.push(payload.to_string());
            }
        }

        payloads
    }

    /// Flush any trailing line that never received its newline.
    ///
    /// Call once after the body ends; well-formed streams return nothing.
    pub fn finish(mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        let line = line.trim_end_matches(['\n', '\r']);
        data_payload(line).map(str::to_string)
    }
}

fn data_payload(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("data:")?;
    let rest = rest.strip_prefix(' ').unwrap_or(rest);
    if rest.is_empty() || rest == "[DONE]" {
        return None;
    }
    Some(rest)
}

// ---------------------------------------------------------------------------
// Batch decoding
// ---------------------------------------------------------------------------

/// Lenient batch decode: every `data:` payload that parses as JSON, as raw
/// values. Malformed payloads are skipped, matching how the benchmark driver
/// must tolerate foreign agents' streams.
pub fn decode_values(body: &str) -> Vec<serde_json::Value> {
    body.lines()
        .filter_map(data_payload)
        .filter_map(|payload| serde_json::from_str(payload).ok())
        .collect()
}

/// Strict batch decode into the typed event vocabulary.
///
/// Fails on the first payload that does not match the vocabulary; use
/// [`decode_values`] when foreign event kinds must survive.
pub fn decode_events(body: &str) -> Result<Vec<Event>, CodecError> {
    body.lines()
        .filter_map(data_payload)
        .map(|payload| serde_json::from_str(payload).map_err(CodecError::from))
        .collect()
}

// ---------------------------------------------------------------------------
// JSONL artifacts
// ---------------------------------------------------------------------------

/// Render events as JSONL (one JSON object per line, not SSE-framed) — the
/// `response.jsonl` artifact format.
pub fn to_jsonl(events: &[serde_json::Value]) -> String {
    let mut out = String::new();
    for ev in events {
        out.push_str(&ev.to_string());
        out.push('\n');
    }
    out
}

/// Parse a JSONL artifact back into raw values, skipping blank and
/// malformed lines.
pub fn from_jsonl(text: &str) -> Vec<serde_json::Value> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect()
}
