// SPDX-License-Identifier: MIT OR Apache-2.0
//! Streaming HTTP client for the Messages API.

use crate::config::{API_VERSION, AnthropicConfig};
use crate::wire::StreamEvent;
use agb_adapter::AdapterError;
use agb_codec::FrameDecoder;
use futures::StreamExt;
use std::collections::VecDeque;

/// Thin streaming client over `POST {base_url}/v1/messages`.
#[derive(Debug, Clone)]
pub struct MessagesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MessagesClient {
    /// Build a client from adapter configuration.
    pub fn new(config: &AnthropicConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Issue a streaming messages request and return the decoded event stream.
    pub async fn stream_messages(
        &self,
        body: &serde_json::Value,
    ) -> Result<EventStream, AdapterError> {
        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
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

        Ok(EventStream::new(response))
    }
}

/// Pull-based stream of decoded [`StreamEvent`]s.
pub struct EventStream {
    bytes: futures::stream::BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    decoder: FrameDecoder,
    pending: VecDeque<String>,
    done: bool,
}

impl EventStream {
    fn new(response: reqwest::Response) -> Self {
        Self {
            bytes: response.bytes_stream().boxed(),
            decoder: FrameDecoder::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Next decoded event, or `None` when the body ends.
    pub async fn next_event(&mut self) -> Option<Result<StreamEvent, AdapterError>> {
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
