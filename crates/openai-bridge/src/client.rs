// SPDX-License-Identifier: MIT OR Apache-2.0
//! Streaming HTTP client for Chat-Completions-compatible endpoints.

use crate::wire::ChatCompletionChunk;
use agb_adapter::AdapterError;
use agb_codec::FrameDecoder;
use futures::StreamExt;
use std::collections::VecDeque;

/// Thin streaming client over `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ChatClient {
    /// Build a client for the given endpoint and bearer token.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Issue a streaming chat request and return the decoded chunk stream.
    pub async fn stream_chat(
        &self,
        body: &serde_json::Value,
    ) -> Result<ChunkStream, AdapterError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AdapterError::Upstream {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AdapterError::Upstream {
                message: format!("{status}: {detail}"),
            });
        }

        Ok(ChunkStream::new(response))
    }
}

/// Pull-based stream of decoded [`ChatCompletionChunk`]s.
pub struct ChunkStream {
    bytes: futures::stream::BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    decoder: FrameDecoder,
    pending: VecDeque<String>,
    done: bool,
}

impl ChunkStream {
    fn new(response: reqwest::Response) -> Self {
        Self {
            bytes: response.bytes_stream().boxed(),
            decoder: FrameDecoder::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Next decoded chunk, or `None` when the body ends.
    pub async fn next_chunk(&mut self) -> Option<Result<ChatCompletionChunk, AdapterError>> {
        loop {
            if let Some(payload) = self.pending.pop_front() {
                return Some(
                    serde_json::from_str(&payload)
                        .map_err(|e| AdapterError::Decode(e.to_string())),
                );
            }
            if self.done {
                return None;
            }
            match self.bytes.next().await {
                Some(Ok(bytes)) => {
                    let text = String::from_utf8_lossy(&bytes);
                    self.pending.extend(self.decoder.feed(&text));
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(AdapterError::Upstream {
                        message: e.to_string(),
                    }));
                }
                None => {
                    self.done = true;
                    if let Some(rest) = std::mem::take(&mut self.decoder).finish() {
                        self.pending.push_back(rest);
                    }
                }
            }
        }
    }
}
