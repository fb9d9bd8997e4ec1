// SPDX-License-Identifier: MIT OR Apache-2.0
//! Whole-pipeline test: serve a scripted adapter over HTTP, benchmark it,
//! aggregate the artifacts, and replay one test — all in-process.

use agb_bench::config::{AgentEndpoint, AgentKind, BenchConfig, PricingTable, PromptKind, PromptSpec};
use agb_bench::Driver;
use agb_server::AgentService;
use std::net::SocketAddr;
use std::sync::Arc;

async fn spawn_mock_service() -> SocketAddr {
    let service = Arc::new(AgentService {
        adapter: Arc::new(agb_adapter_mock::MockAdapter::new()),
        port: 0,
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = agb_server::build_router(service);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn endpoint(addr: SocketAddr) -> AgentEndpoint {
    AgentEndpoint {
        name: "mock".to_string(),
        url: format!("http://{addr}/agent"),
        health: format!("http://{addr}/health"),
        port: addr.port(),
        kind: AgentKind::Native,
        framework: "mock".to_string(),
        model: "mock".to_string(),
        model_id: "scripted".to_string(),
        model_override: None,
    }
}

fn prompts() -> Vec<PromptSpec> {
    vec![
        PromptSpec {
            name: "simple".to_string(),
            kind: PromptKind::Single,
            prompt: "Say hello and introduce yourself.".to_string(),
            turns: Vec::new(),
            validates: vec!["TEXT_MESSAGE_CONTENT".to_string()],
            expect_tools: 0,
            expect_error: false,
        },
        PromptSpec {
            name: "tool_calc".to_string(),
            kind: PromptKind::Single,
            prompt: "Calculate 42 * 17 using the calculator tool.".to_string(),
            turns: Vec::new(),
            validates: vec!["TOOL_CALL_RESULT".to_string()],
            expect_tools: 1,
            expect_error: false,
        },
    ]
}

#[tokio::test]
async fn benchmark_aggregate_replay_round_trip() {
    let addr = spawn_mock_service().await;
    let tmp = tempfile::tempdir().unwrap();

    let config = BenchConfig {
        num_runs: 2,
        request_timeout_secs: 30,
        health_timeout_secs: 5,
        output_root: tmp.path().join("benchmark-runs"),
        agents: vec![endpoint(addr)],
        prompts: prompts(),
        pricing: PricingTable::builtin(),
    };

    // Drive the suite over real HTTP.
    let report = Driver::new(config.clone()).run().await.unwrap();
    let metrics = &report.metrics["mock"];
    assert_eq!(metrics.len(), 4); // 2 prompts × 2 repetitions
    assert!(metrics.iter().all(|m| m.success));

    // Ordering invariants hold for every persisted stream.
    for m in metrics {
        let dir = report
            .run_dir
            .join("mock")
            .join(format!("run{}-{}", m.run_number, m.prompt_type));
        let jsonl = std::fs::read_to_string(dir.join("response.jsonl")).unwrap();
        let events: Vec<agb_core::Event> = agb_codec::from_jsonl(&jsonl)
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect();
        assert!(agb_core::validate::check_run(&events).is_empty());
        assert_eq!(events.first().unwrap().kind(), "RUN_STARTED");
        assert!(events.last().unwrap().is_terminal());
    }

    // Tool prompt actually exercised the calculator.
    let calc = metrics
        .iter()
        .find(|m| m.prompt_type == "tool_calc")
        .unwrap();
    assert_eq!(calc.tools.tool_calls, 1);
    assert!(calc.response.final_text.contains("714"));

    // Aggregate and render.
    let out_dir = tmp.path().join("reports");
    let written = agb_report::generate_reports(&report.run_dir, &out_dir, &config).unwrap();
    assert_eq!(written.len(), 5);
    let summary = std::fs::read_to_string(out_dir.join("BENCHMARK-SUMMARY.md")).unwrap();
    assert!(summary.contains("**Overall Success Rate:** 100.0%"));

    // Replay one test directory.
    let mut replay_out = Vec::new();
    agb_replay::replay_path(
        &report.run_dir.join("mock").join("run1-tool_calc"),
        &mut replay_out,
    )
    .unwrap();
    let replay_text = String::from_utf8(replay_out).unwrap();
    assert!(replay_text.contains("TOOL_CALL_RESULT"));
    assert!(!replay_text.contains("Warning: streamed text differs"));
}

#[tokio::test]
async fn failed_agent_recorded_without_aborting_suite() {
    let addr = spawn_mock_service().await;
    let tmp = tempfile::tempdir().unwrap();

    let mut failing = prompts();
    failing[0].prompt = "please fail on purpose".to_string();
    failing.truncate(1);

    let config = BenchConfig {
        num_runs: 1,
        request_timeout_secs: 30,
        health_timeout_secs: 5,
        output_root: tmp.path().join("benchmark-runs"),
        agents: vec![endpoint(addr)],
        prompts: failing,
        pricing: PricingTable::builtin(),
    };

    let report = Driver::new(config).run().await.unwrap();
    let metrics = &report.metrics["mock"][0];

    // Transport succeeded; the run ended in RUN_ERROR, which shows up as an
    // error event, not a driver failure.
    assert!(metrics.success);
    assert!(metrics.features.has_errors);
    assert!(
        metrics
            .events
            .event_types
            .contains(&"RUN_ERROR".to_string())
    );
}
