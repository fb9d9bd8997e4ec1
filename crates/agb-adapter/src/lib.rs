// SPDX-License-Identifier: MIT OR Apache-2.0
//! agb-adapter
//!
//! The seam between the HTTP host and the per-provider bridges: the
//! [`Adapter`] trait, the adapter error taxonomy, and [`EventSink`] — the
//! emission helper every bridge streams through.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use agb_core::usage::Usage;
use agb_core::{Event, ExtraMap, RunAgentInput};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Identity card an adapter reports on its health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterIdentity {
    /// Framework slug (`"anthropic-raw"`, `"openai-raw"`, ...).
    pub framework: String,
    /// Model identifier the adapter is configured for.
    pub model: String,
    /// Whether the wrapped framework speaks the protocol natively, as
    /// opposed to this adapter synthesizing the events.
    pub native_agui: bool,
}

impl AdapterIdentity {
    /// Build an identity for a wrapped (non-native) adapter.
    pub fn wrapped(framework: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            framework: framework.into(),
            model: model.into(),
            native_agui: false,
        }
    }
}

/// Errors surfaced by a bridge while executing one run.
///
/// Every variant maps to a `RUN_ERROR` event with a coarse code; the stream
/// still terminates cleanly afterwards.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The wrapped provider call failed (HTTP error, API error payload).
    #[error("upstream provider error: {message}")]
    Upstream {
        /// Provider-reported failure description.
        message: String,
    },

    /// The provider stream could not be decoded.
    #[error("failed to decode provider stream: {0}")]
    Decode(String),

    /// A tool-call fragment arrived without a provider-supplied identifier
    /// and no open call to attach to. Guessing an id is not allowed.
    #[error("tool call fragment without a provider-supplied id")]
    MissingToolCallId,

    /// The request cannot be served (e.g. no user message present).
    #[error("invalid run input: {0}")]
    InvalidInput(String),

    /// The event channel closed while streaming (client went away).
    #[error("event channel closed")]
    ChannelClosed,
}

impl AdapterError {
    /// Coarse machine-readable code carried on the `RUN_ERROR` event.
    pub fn code(&self) -> &'static str {
        match self {
            AdapterError::Upstream { .. } => "UPSTREAM_ERROR",
            AdapterError::Decode(_) => "DECODE_ERROR",
            AdapterError::MissingToolCallId => "MISSING_TOOL_CALL_ID",
            AdapterError::InvalidInput(_) => "INVALID_INPUT",
            AdapterError::ChannelClosed => "CHANNEL_CLOSED",
        }
    }
}

/// One framework wrapper: executes a single user turn and streams protocol
/// events into the provided sink.
///
/// Implementations emit only content events (text, tool, thinking, state);
/// lifecycle framing (`RUN_STARTED` / `RUN_FINISHED` / `RUN_ERROR`) is owned
/// by the HTTP host so the framing invariant holds for every adapter. The
/// returned [`Usage`] is attached to `RUN_FINISHED` by the host.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Identity reported on the health endpoint.
    fn identity(&self) -> AdapterIdentity;

    /// Execute one run, streaming events through `sink`.
    async fn execute(
        &self,
        input: RunAgentInput,
        sink: &mut EventSink,
    ) -> Result<Usage, AdapterError>;
}

// ---------------------------------------------------------------------------
// EventSink
// ---------------------------------------------------------------------------

/// Emission helper wrapping the event channel.
///
/// Tracks the current assistant message so bridges can push raw text deltas
/// without repeating the lazy-START bookkeeping every provider translation
/// needs: the first delta opens the message, `end_message` closes it, and a
/// follow-up round keeps streaming into the same message id.
pub struct EventSink {
    tx: mpsc::Sender<Event>,
    message_id: String,
    message_open: bool,
}

impl EventSink {
    /// Wrap a channel sender, minting a fresh message id.
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self {
            tx,
            message_id: uuid::Uuid::new_v4().to_string(),
            message_open: false,
        }
    }

    /// The message id used for this run's assistant text.
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Send an already-built event.
    pub async fn send(&mut self, event: Event) -> Result<(), AdapterError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| AdapterError::ChannelClosed)
    }

    /// Stream one text fragment, opening the message on first use.
    pub async fn text_delta(&mut self, delta: &str) -> Result<(), AdapterError> {
        if !self.message_open {
            self.send(Event::TextMessageStart {
                message_id: self.message_id.clone(),
                role: "assistant".to_string(),
                extra: ExtraMap::new(),
            })
            .await?;
            self.message_open = true;
        }
        self.send(Event::TextMessageContent {
            message_id: self.message_id.clone(),
            delta: delta.to_string(),
            extra: ExtraMap::new(),
        })
        .await
    }

    /// Close the assistant message if any delta was streamed.
    pub async fn end_message(&mut self) -> Result<(), AdapterError> {
        if self.message_open {
            self.message_open = false;
            self.send(Event::TextMessageEnd {
                message_id: self.message_id.clone(),
                extra: ExtraMap::new(),
            })
            .await?;
        }
        Ok(())
    }

    /// Open a tool call.
    pub async fn tool_start(&mut self, id: &str, name: &str) -> Result<(), AdapterError> {
        self.send(Event::ToolCallStart {
            tool_call_id: id.to_string(),
            tool_call_name: name.to_string(),
            extra: ExtraMap::new(),
        })
        .await
    }

    /// Stream a tool argument fragment.
    pub async fn tool_args(&mut self, id: &str, delta: &str) -> Result<(), AdapterError> {
        self.send(Event::ToolCallArgs {
            tool_call_id: id.to_string(),
            delta: delta.to_string(),
            extra: ExtraMap::new(),
        })
        .await
    }

    /// Close a tool call's argument stream.
    pub async fn tool_end(&mut self, id: &str) -> Result<(), AdapterError> {
        self.send(Event::ToolCallEnd {
            tool_call_id: id.to_string(),
            extra: ExtraMap::new(),
        })
        .await
    }

    /// Report an executed tool call's result.
    pub async fn tool_result(&mut self, id: &str, result: &str) -> Result<(), AdapterError> {
        self.send(Event::ToolCallResult {
            tool_call_id: id.to_string(),
            result: result.to_string(),
            extra: ExtraMap::new(),
        })
        .await
    }
}
