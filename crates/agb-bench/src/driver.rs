// SPDX-License-Identifier: MIT OR Apache-2.0
//! Suite execution.
//!
//! One repetition launches every (agent × prompt) pair as a concurrent
//! task and waits for all of them before the next repetition starts. A
//! failed or timed-out test is recorded and persisted like any other;
//! nothing aborts the suite except zero healthy agents at the gate.

use crate::artifact;
use crate::config::{AgentEndpoint, BenchConfig, PromptKind, PromptSpec};
use crate::metrics::TestMetrics;
use crate::probe;
use agb_codec::FrameDecoder;
use anyhow::{Context, bail};
use futures::StreamExt;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Outcome of a whole benchmark run.
#[derive(Debug)]
pub struct RunReport {
    /// Timestamped artifact directory.
    pub run_dir: PathBuf,
    /// Run directory timestamp.
    pub timestamp: String,
    /// Collected metrics per agent, in completion order per agent.
    pub metrics: BTreeMap<String, Vec<TestMetrics>>,
}

/// The benchmark driver.
pub struct Driver {
    config: Arc<BenchConfig>,
    client: reqwest::Client,
}

impl Driver {
    /// Build a driver over an immutable configuration.
    pub fn new(config: BenchConfig) -> Self {
        Self {
            config: Arc::new(config),
            client: reqwest::Client::new(),
        }
    }

    /// Execute the full suite and persist all artifacts.
    pub async fn run(&self) -> anyhow::Result<RunReport> {
        let now = chrono::Local::now();
        let timestamp = now.format("%Y%m%d-%H%M%S").to_string();
        let run_dir = artifact::init_run_dir(&self.config, &timestamp, &now.to_rfc3339())
            .context("create run directory")?;
        info!(run_dir = %run_dir.display(), "benchmark run starting");

        let healthy = probe::healthy_agents(
            &self.client,
            &self.config.agents,
            self.config.health_timeout(),
        )
        .await;
        if healthy.is_empty() {
            bail!("no agents are healthy; aborting benchmark run");
        }
        info!(
            healthy = healthy.len(),
            configured = self.config.agents.len(),
            "health gate passed"
        );

        let mut all_metrics: BTreeMap<String, Vec<TestMetrics>> = healthy
            .iter()
            .map(|a| (a.name.clone(), Vec::new()))
            .collect();

        for rep in 1..=self.config.num_runs {
            info!(rep, total = self.config.num_runs, "repetition starting");
            let mut tasks = JoinSet::new();
            for agent in &healthy {
                for prompt in &self.config.prompts {
                    let client = self.client.clone();
                    let agent = agent.clone();
                    let prompt = prompt.clone();
                    let run_dir = run_dir.clone();
                    let timeout = self.config.request_timeout();
                    tasks.spawn(async move {
                        execute_test(client, agent, prompt, run_dir, rep, timeout).await
                    });
                }
            }

            // Join barrier: the repetition ends only when every task has
            // completed or failed.
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(metrics) => {
                        all_metrics
                            .entry(metrics.agent.clone())
                            .or_default()
                            .push(metrics);
                    }
                    Err(err) => warn!(error = %err, "benchmark task panicked"),
                }
            }
        }

        let summary = build_summary(&timestamp, &all_metrics, &healthy);
        artifact::save_summary(&run_dir, &summary).context("write summary")?;

        Ok(RunReport {
            run_dir,
            timestamp,
            metrics: all_metrics,
        })
    }
}

/// Execute one (agent, prompt, repetition) test and persist its artifacts.
pub async fn execute_test(
    client: reqwest::Client,
    agent: AgentEndpoint,
    prompt: PromptSpec,
    run_dir: PathBuf,
    run_number: u32,
    timeout: Duration,
) -> TestMetrics {
    let mut metrics = TestMetrics {
        agent: agent.name.clone(),
        run_number,
        prompt_type: prompt.name.clone(),
        prompt: first_prompt_text(&prompt),
        turn_count: 1,
        ..TestMetrics::default()
    };

    let (request, events) = match prompt.kind {
        PromptKind::Single | PromptKind::Hitl => {
            run_single_turn(&client, &agent, &prompt, timeout, &mut metrics).await
        }
        PromptKind::Multi => run_multi_turn(&client, &agent, &prompt, timeout, &mut metrics).await,
    };

    metrics.absorb_events(&events);
    if prompt.kind == PromptKind::Multi {
        metrics.features.context_retained = context_retained(&metrics.response.final_text);
    }

    if let Err(err) = artifact::save_test(&run_dir, &request, &events, &metrics) {
        warn!(agent = %metrics.agent, prompt = %metrics.prompt_type, error = %err,
              "failed to persist test artifacts");
    }

    metrics
}

fn first_prompt_text(prompt: &PromptSpec) -> String {
    match prompt.kind {
        PromptKind::Multi => prompt.turns.first().cloned().unwrap_or_default(),
        _ => prompt.prompt.clone(),
    }
}

fn request_body(agent: &AgentEndpoint, thread_id: &str, run_id: &str, messages: Value) -> Value {
    let mut body = json!({
        "thread_id": thread_id,
        "run_id": run_id,
        "messages": messages,
        "state": {},
        "tools": [],
        "context": [],
        "forwardedProps": {},
    });
    if let Some(model) = &agent.model_override {
        body["model"] = json!(model);
    }
    body
}

async fn run_single_turn(
    client: &reqwest::Client,
    agent: &AgentEndpoint,
    prompt: &PromptSpec,
    timeout: Duration,
    metrics: &mut TestMetrics,
) -> (Value, Vec<Value>) {
    let request = request_body(
        agent,
        &format!("test-thread-{}", agent.name),
        &format!("test-run-{}-{}", agent.name, prompt.name),
        json!([{"id": "msg-1", "role": "user", "content": prompt.prompt}]),
    );

    match stream_request(client, &agent.url, &request, timeout).await {
        Ok(outcome) => {
            metrics.success = true;
            metrics.timing.total_time_ms = outcome.total_ms;
            metrics.timing.time_to_first_event_ms = outcome.ttfb_ms.unwrap_or(0.0);
            metrics.timing.time_to_first_content_ms = outcome.ttfc_ms.unwrap_or(0.0);
            metrics.timing.time_to_complete_ms = outcome.total_ms;
            metrics.tools.tool_call_time_ms = outcome.tool_time_ms;
            (request, outcome.events)
        }
        Err(err) => {
            metrics.success = false;
            metrics.error = Some(err.to_string());
            (request, Vec::new())
        }
    }
}

async fn run_multi_turn(
    client: &reqwest::Client,
    agent: &AgentEndpoint,
    prompt: &PromptSpec,
    timeout: Duration,
    metrics: &mut TestMetrics,
) -> (Value, Vec<Value>) {
    let thread_id = format!("test-thread-{}-multi", agent.name);
    let mut all_events = Vec::new();
    let mut first_request = Value::Null;
    metrics.turn_count = prompt.turns.len() as u32;

    for (turn_index, _) in prompt.turns.iter().enumerate() {
        let turn_number = turn_index + 1;
        let messages: Vec<Value> = prompt.turns[..turn_number]
            .iter()
            .enumerate()
            .map(|(i, content)| {
                json!({"id": format!("msg-{}", i + 1), "role": "user", "content": content})
            })
            .collect();
        let request = request_body(
            agent,
            &thread_id,
            &format!("test-run-{}-turn{turn_number}", agent.name),
            Value::Array(messages),
        );
        if turn_number == 1 {
            first_request = request.clone();
        }

        match stream_request(client, &agent.url, &request, timeout).await {
            Ok(outcome) => {
                metrics.timing.total_time_ms += outcome.total_ms;
                if turn_number == 1 {
                    metrics.timing.time_to_first_event_ms = outcome.ttfb_ms.unwrap_or(0.0);
                    metrics.timing.time_to_first_content_ms = outcome.ttfc_ms.unwrap_or(0.0);
                }
                metrics.tools.tool_call_time_ms += outcome.tool_time_ms;
                all_events.extend(outcome.events);
                metrics.success = true;
            }
            Err(err) => {
                // A failed turn fails the whole test; earlier turns' events
                // are still persisted.
                metrics.success = false;
                metrics.error = Some(err.to_string());
                break;
            }
        }
    }

    metrics.timing.time_to_complete_ms = metrics.timing.total_time_ms;
    (first_request, all_events)
}

/// Heuristic from the memory prompt: turn two should mention the language
/// named in turn one.
fn context_retained(final_text: &str) -> bool {
    final_text.to_lowercase().contains("python")
}

/// Everything measured while streaming one request.
struct StreamOutcome {
    events: Vec<Value>,
    total_ms: f64,
    ttfb_ms: Option<f64>,
    ttfc_ms: Option<f64>,
    tool_time_ms: f64,
}

/// POST the request and consume the SSE body, measuring checkpoints live.
async fn stream_request(
    client: &reqwest::Client,
    url: &str,
    body: &Value,
    timeout: Duration,
) -> anyhow::Result<StreamOutcome> {
    let started = Instant::now();
    let work = async {
        let response = client
            .post(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(body)
            .send()
            .await
            .context("send request")?;
        let response = response.error_for_status().context("agent status")?;

        let mut bytes = response.bytes_stream();
        let mut decoder = FrameDecoder::new();
        let mut events: Vec<Value> = Vec::new();
        let mut ttfb_ms = None;
        let mut ttfc_ms = None;
        let mut tool_time_ms = 0.0;
        let mut tool_started_at: Option<Instant> = None;

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.context("read stream chunk")?;
            let text = String::from_utf8_lossy(&chunk);
            if ttfb_ms.is_none() && !text.trim().is_empty() {
                ttfb_ms = Some(started.elapsed().as_secs_f64() * 1000.0);
            }
            for payload in decoder.feed(&text) {
                let Ok(event) = serde_json::from_str::<Value>(&payload) else {
                    continue;
                };
                match event.get("type").and_then(Value::as_str) {
                    Some("TEXT_MESSAGE_CONTENT") if ttfc_ms.is_none() => {
                        ttfc_ms = Some(started.elapsed().as_secs_f64() * 1000.0);
                    }
                    Some("TOOL_CALL_START") => {
                        tool_started_at = Some(Instant::now());
                    }
                    Some("TOOL_CALL_RESULT") => {
                        if let Some(t0) = tool_started_at.take() {
                            tool_time_ms += t0.elapsed().as_secs_f64() * 1000.0;
                        }
                    }
                    _ => {}
                }
                events.push(event);
            }
        }

        Ok::<_, anyhow::Error>(StreamOutcome {
            events,
            total_ms: 0.0,
            ttfb_ms,
            ttfc_ms,
            tool_time_ms,
        })
    };

    let mut outcome = tokio::time::timeout(timeout, work)
        .await
        .map_err(|_| anyhow::anyhow!("request timed out after {}s", timeout.as_secs()))??;
    outcome.total_ms = started.elapsed().as_secs_f64() * 1000.0;
    Ok(outcome)
}

fn median(values: &mut Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Build the run-level `summary.json` payload.
pub fn build_summary(
    timestamp: &str,
    all_metrics: &BTreeMap<String, Vec<TestMetrics>>,
    agents: &[AgentEndpoint],
) -> Value {
    let total_tests: usize = all_metrics.values().map(Vec::len).sum();
    let successful: usize = all_metrics
        .values()
        .flatten()
        .filter(|m| m.success)
        .count();

    let agent_by_name: BTreeMap<&str, &AgentEndpoint> =
        agents.iter().map(|a| (a.name.as_str(), a)).collect();

    // Median total time per agent, successful tests only.
    let mut medians: BTreeMap<&str, f64> = BTreeMap::new();
    let mut all_results = serde_json::Map::new();
    for (name, metrics) in all_metrics {
        let ok: Vec<&TestMetrics> = metrics.iter().filter(|m| m.success).collect();
        if ok.is_empty() {
            continue;
        }
        let med = median(&mut ok.iter().map(|m| m.timing.total_time_ms).collect());
        let ttfb = median(
            &mut ok
                .iter()
                .map(|m| m.timing.time_to_first_event_ms)
                .collect(),
        );
        let ttfc = median(
            &mut ok
                .iter()
                .map(|m| m.timing.time_to_first_content_ms)
                .collect(),
        );
        medians.insert(name.as_str(), med);

        let endpoint = agent_by_name.get(name.as_str());
        all_results.insert(
            name.clone(),
            json!({
                "framework": endpoint.map(|a| a.framework.clone()).unwrap_or_default(),
                "model": endpoint.map(|a| a.model.clone()).unwrap_or_default(),
                "model_id": endpoint.map(|a| a.model_id.clone()).unwrap_or_default(),
                "median_time_ms": med,
                "median_ttfb_ms": ttfb,
                "median_ttfc_ms": ttfc,
                "tests_passed": ok.len(),
                "tests_total": metrics.len(),
            }),
        );
    }

    // Fastest per model family.
    let mut fastest_by_model = serde_json::Map::new();
    let model_keys: std::collections::BTreeSet<&str> =
        agents.iter().map(|a| a.model.as_str()).collect();
    for model in model_keys {
        let best = medians
            .iter()
            .filter(|(name, _)| {
                agent_by_name
                    .get(*name)
                    .is_some_and(|a| a.model == model)
            })
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal));
        if let Some((name, med)) = best {
            let framework = agent_by_name
                .get(name)
                .map(|a| a.framework.clone())
                .unwrap_or_default();
            fastest_by_model.insert(
                model.to_string(),
                json!({"name": name, "framework": framework, "time_ms": med}),
            );
        }
    }

    let overall = |pick_max: bool| -> Value {
        let chosen = if pick_max {
            medians
                .iter()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        } else {
            medians
                .iter()
                .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        };
        match chosen {
            Some((name, med)) => {
                let endpoint = agent_by_name.get(name);
                json!({
                    "name": name,
                    "time_ms": med,
                    "framework": endpoint.map(|a| a.framework.clone()),
                    "model": endpoint.map(|a| a.model.clone()),
                })
            }
            None => json!({"name": null, "time_ms": null}),
        }
    };

    json!({
        "timestamp": timestamp,
        "analysis": {
            "total_tests": total_tests,
            "successful": successful,
            "failed": total_tests - successful,
        },
        "fastest_by_model": fastest_by_model,
        "overall_fastest": overall(false),
        "overall_slowest": overall(true),
        "all_results": all_results,
    })
}
