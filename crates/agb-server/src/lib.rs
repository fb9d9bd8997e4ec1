// SPDX-License-Identifier: MIT OR Apache-2.0
//! agb-server
//!
//! The HTTP host shared by every adapter: `POST /agent` streams AG-UI
//! events as Server-Sent Events, `GET /health` reports readiness, and
//! `GET /` returns the service card.
//!
//! Lifecycle framing is owned here, not by the adapters: the host emits
//! `RUN_STARTED` before the adapter runs, `RUN_ERROR` if it fails, and
//! `RUN_FINISHED` (with token usage attached) when it succeeds — so every
//! stream satisfies the single-start / single-terminal invariant by
//! construction.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use agb_adapter::{Adapter, EventSink};
use agb_core::{Event, ExtraMap, RunAgentInput};
use axum::extract::State;
use axum::http::header;
use axum::response::sse::{Event as SseEvent, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};

/// Size of the per-run event channel between adapter and response stream.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Shared state of one adapter service.
pub struct AgentService {
    /// The wrapped adapter.
    pub adapter: Arc<dyn Adapter>,
    /// Port the service listens on (reported on `/health`).
    pub port: u16,
}

/// Response body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `"healthy"` once the service accepts requests.
    pub status: String,
    /// Framework slug of the wrapped adapter.
    pub framework: String,
    /// Configured model identifier.
    pub model: String,
    /// Listening port.
    pub port: u16,
    /// Path of the run endpoint.
    pub agui_endpoint: String,
    /// Whether the wrapped framework speaks the protocol natively.
    pub native_agui: bool,
}

/// Build the Axum router for one adapter service.
pub fn build_router(service: Arc<AgentService>) -> Router {
    Router::new()
        .route("/agent", post(run_agent))
        .route("/health", get(health))
        .route("/", get(root))
        .with_state(service)
}

/// Bind and serve until the process is stopped.
pub async fn serve(service: Arc<AgentService>, addr: SocketAddr) -> std::io::Result<()> {
    let identity = service.adapter.identity();
    let app = build_router(service);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        framework = %identity.framework,
        model = %identity.model,
        %addr,
        "adapter listening"
    );
    axum::serve(listener, app).await
}

async fn run_agent(
    State(service): State<Arc<AgentService>>,
    Json(input): Json<RunAgentInput>,
) -> impl IntoResponse {
    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAPACITY);
    let adapter = Arc::clone(&service.adapter);
    let thread_id = input.thread_id.clone();
    let run_id = input.run_id.clone();

    tokio::spawn(async move {
        // A send fails only when the client disconnected; nothing useful is
        // left to do in that case.
        if tx
            .send(Event::run_started(thread_id.clone(), run_id.clone()))
            .await
            .is_err()
        {
            return;
        }

        let mut sink = EventSink::new(tx.clone());
        match adapter.execute(input, &mut sink).await {
            Ok(usage) => {
                let mut extra = ExtraMap::new();
                if !usage.is_empty() {
                    usage.attach(&mut extra);
                }
                let _ = tx
                    .send(Event::RunFinished {
                        thread_id,
                        run_id,
                        extra,
                    })
                    .await;
            }
            Err(err) => {
                error!(run_id = %run_id, error = %err, "adapter run failed");
                let _ = tx
                    .send(Event::run_error(
                        err.to_string(),
                        Some(err.code().to_string()),
                    ))
                    .await;
            }
        }
    });

    let stream = ReceiverStream::new(rx).filter_map(|event| {
        serde_json::to_string(&event)
            .ok()
            .map(|json| Ok::<_, Infallible>(SseEvent::default().data(json)))
    });

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Sse::new(stream),
    )
}

async fn health(State(service): State<Arc<AgentService>>) -> Json<HealthResponse> {
    let identity = service.adapter.identity();
    Json(HealthResponse {
        status: "healthy".to_string(),
        framework: identity.framework,
        model: identity.model,
        port: service.port,
        agui_endpoint: "/agent".to_string(),
        native_agui: identity.native_agui,
    })
}

async fn root(State(service): State<Arc<AgentService>>) -> impl IntoResponse {
    let identity = service.adapter.identity();
    Json(json!({
        "name": format!("{} AG-UI Agent", identity.framework),
        "framework": identity.framework,
        "protocol_version": agb_core::PROTOCOL_VERSION,
        "agui_endpoint": "POST /agent",
        "health_endpoint": "GET /health",
        "native_agui": identity.native_agui,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agb_adapter_mock::MockAdapter;
    use agb_core::validate::check_run;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_router() -> Router {
        build_router(Arc::new(AgentService {
            adapter: Arc::new(MockAdapter::new()),
            port: 7770,
        }))
    }

    fn agent_request(prompt: &str) -> Request<Body> {
        let input = RunAgentInput::single_turn("thread-1", "run-1", prompt);
        Request::builder()
            .method("POST")
            .uri("/agent")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&input).unwrap()))
            .unwrap()
    }

    async fn run_and_decode(prompt: &str) -> Vec<Event> {
        let response = test_router().oneshot(agent_request(prompt)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("text/event-stream"));
        assert_eq!(response.headers().get("cache-control").unwrap(), "no-cache");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        agb_codec::decode_events(&text).unwrap()
    }

    #[tokio::test]
    async fn successful_run_is_framed_started_finished() {
        let events = run_and_decode("Say hello").await;
        assert_eq!(events.first().unwrap().kind(), "RUN_STARTED");
        assert_eq!(events.last().unwrap().kind(), "RUN_FINISHED");
        assert!(check_run(&events).is_empty());

        // Host attaches usage to RUN_FINISHED.
        match events.last().unwrap() {
            Event::RunFinished { extra, .. } => {
                assert!(agb_core::usage::Usage::from_extra(extra).is_some());
            }
            other => panic!("expected RUN_FINISHED, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_run_ends_with_run_error_only() {
        let events = run_and_decode("please fail on purpose").await;
        assert_eq!(events.first().unwrap().kind(), "RUN_STARTED");
        assert_eq!(events.last().unwrap().kind(), "RUN_ERROR");
        // Exactly one terminal event, no RUN_FINISHED after the error.
        assert_eq!(
            events.iter().filter(|e| e.is_terminal()).count(),
            1,
        );
        match events.last().unwrap() {
            Event::RunError { code, .. } => {
                assert_eq!(code.as_deref(), Some("UPSTREAM_ERROR"));
            }
            other => panic!("expected RUN_ERROR, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn tool_prompt_streams_full_tool_lifecycle() {
        let events = run_and_decode("Calculate 42 * 17 with the calculator").await;
        let kinds: Vec<_> = events.iter().map(Event::kind).collect();
        for expected in [
            "TOOL_CALL_START",
            "TOOL_CALL_ARGS",
            "TOOL_CALL_END",
            "TOOL_CALL_RESULT",
        ] {
            assert!(kinds.contains(&expected), "missing {expected}");
        }
        assert!(check_run(&events).is_empty());
    }

    #[tokio::test]
    async fn health_reports_identity() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["framework"], "mock");
        assert_eq!(health["port"], 7770);
        assert_eq!(health["agui_endpoint"], "/agent");
    }

    #[tokio::test]
    async fn root_returns_service_card() {
        let response = test_router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let card: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(card["agui_endpoint"], "POST /agent");
        assert_eq!(card["protocol_version"], agb_core::PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/agent")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"not\": \"a run input\"}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
