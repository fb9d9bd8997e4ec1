// SPDX-License-Identifier: MIT OR Apache-2.0
//! agb-replay
//!
//! Reconstructs a readable, strictly ordered timeline from persisted test
//! data. Accepts a single test directory, an agent directory, or a whole
//! run directory, and writes to any sink so tests can capture the output.
//!
//! When the text assembled from `TEXT_MESSAGE_CONTENT` deltas differs from
//! the final text recorded in metadata, a non-fatal warning is printed:
//! that divergence is a known signal of framework-specific snapshot/delta
//! inconsistencies, not a failure of the stored data.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use agb_bench::TestMetrics;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Replay failures.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// The path is neither a test, agent, nor run directory.
    #[error("unrecognized path: {path}")]
    UnknownPath {
        /// Requested path.
        path: String,
    },
    /// A required artifact is missing or unreadable.
    #[error("missing artifact {name} in {path}")]
    MissingArtifact {
        /// Artifact file name.
        name: &'static str,
        /// Test directory.
        path: String,
    },
    /// Output sink failure.
    #[error("write failure: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed artifact content.
    #[error("malformed artifact: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Dispatch on the path kind: test directory (has `request.json`), run
/// directory (has `run-metadata.json`), otherwise an agent directory.
pub fn replay_path(path: &Path, out: &mut dyn Write) -> Result<(), ReplayError> {
    if path.join("request.json").exists() {
        replay_test(path, out)
    } else if path.join("run-metadata.json").exists() {
        analyze_run(path, out)
    } else if path.is_dir() {
        replay_agent(path, out)
    } else {
        Err(ReplayError::UnknownPath {
            path: path.display().to_string(),
        })
    }
}

/// Replay one persisted test directory.
pub fn replay_test(test_dir: &Path, out: &mut dyn Write) -> Result<(), ReplayError> {
    let dir_name = test_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("test");
    writeln!(out, "{}", "=".repeat(78))?;
    writeln!(out, "REPLAYING: {dir_name}")?;
    writeln!(out, "{}", "=".repeat(78))?;

    let read = |name: &'static str| -> Result<String, ReplayError> {
        fs::read_to_string(test_dir.join(name)).map_err(|_| ReplayError::MissingArtifact {
            name,
            path: test_dir.display().to_string(),
        })
    };

    let request: Value = serde_json::from_str(&read("request.json")?)?;
    let metadata: TestMetrics = serde_json::from_str(&read("metadata.json")?)?;
    let events = agb_codec::from_jsonl(&read("response.jsonl")?);

    writeln!(out, "\nTest Info:")?;
    writeln!(out, "  Agent: {}", metadata.agent)?;
    writeln!(out, "  Run: #{}", metadata.run_number)?;
    writeln!(out, "  Type: {}", metadata.prompt_type)?;
    writeln!(
        out,
        "  Success: {}",
        if metadata.success { "yes" } else { "NO" }
    )?;
    if let Some(error) = &metadata.error {
        writeln!(out, "  Error: {error}")?;
    }

    writeln!(out, "\nRequest:")?;
    writeln!(out, "  Prompt: {:?}", metadata.prompt)?;
    if let Some(thread_id) = request.get("thread_id").and_then(Value::as_str) {
        writeln!(out, "  Thread ID: {thread_id}")?;
    }
    if let Some(run_id) = request.get("run_id").and_then(Value::as_str) {
        writeln!(out, "  Run ID: {run_id}")?;
    }

    writeln!(out, "\nTiming:")?;
    writeln!(
        out,
        "  Total Time: {:.2}ms",
        metadata.timing.total_time_ms
    )?;
    writeln!(
        out,
        "  Time to First Event: {:.2}ms",
        metadata.timing.time_to_first_event_ms
    )?;
    writeln!(
        out,
        "  Time to First Content: {:.2}ms",
        metadata.timing.time_to_first_content_ms
    )?;

    writeln!(out, "\nTools:")?;
    writeln!(out, "  Tool Calls: {}", metadata.tools.tool_calls)?;
    if metadata.tools.tool_calls > 0 {
        writeln!(
            out,
            "  Tool Time: {:.2}ms",
            metadata.tools.tool_call_time_ms
        )?;
    }

    writeln!(out, "\nResponse Stats:")?;
    writeln!(out, "  Characters: {}", metadata.response.chars)?;
    writeln!(out, "  Tokens (approx): {}", metadata.response.tokens_approx)?;

    writeln!(out, "\nEvents ({} total):", metadata.events.total_events)?;
    writeln!(out, "  Types: {}", metadata.events.event_types.join(", "))?;

    writeln!(out, "\nStreaming Events:")?;
    writeln!(out, "  {}", "-".repeat(76))?;

    let mut text_buffer = String::new();
    for (i, event) in events.iter().enumerate() {
        let n = i + 1;
        let kind = event.get("type").and_then(Value::as_str).unwrap_or("UNKNOWN");
        match kind {
            "TEXT_MESSAGE_CONTENT" => {
                let delta = event.get("delta").and_then(Value::as_str).unwrap_or("");
                text_buffer.push_str(delta);
                writeln!(out, "  [{n:3}] {kind:<25} -> {delta:?}")?;
            }
            "TOOL_CALL_START" => {
                let name = event
                    .get("toolCallName")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                let id = event
                    .get("toolCallId")
                    .and_then(Value::as_str)
                    .unwrap_or("N/A");
                writeln!(out, "  [{n:3}] {kind:<25} -> {name} (id: {id})")?;
            }
            "TOOL_CALL_ARGS" => {
                let delta = event.get("delta").and_then(Value::as_str).unwrap_or("");
                writeln!(out, "  [{n:3}] {kind:<25} -> {delta}")?;
            }
            "TOOL_CALL_RESULT" => {
                let result = event.get("result").and_then(Value::as_str).unwrap_or("");
                let preview: String = result.chars().take(60).collect();
                writeln!(out, "  [{n:3}] {kind:<25} -> {preview}")?;
            }
            "MESSAGES_SNAPSHOT" => {
                let count = event
                    .get("messages")
                    .and_then(Value::as_array)
                    .map(Vec::len)
                    .unwrap_or(0);
                writeln!(out, "  [{n:3}] {kind:<25} -> {count} messages")?;
            }
            "RUN_ERROR" => {
                let message = event.get("message").and_then(Value::as_str).unwrap_or("");
                writeln!(out, "  [{n:3}] {kind:<25} -> {message}")?;
            }
            _ => {
                writeln!(out, "  [{n:3}] {kind}")?;
            }
        }
    }
    writeln!(out, "  {}", "-".repeat(76))?;

    writeln!(out, "\nFinal Response:")?;
    if metadata.response.final_text.is_empty() {
        writeln!(out, "  (no text response)")?;
    } else {
        writeln!(out, "  {:?}", metadata.response.final_text)?;
    }

    // Known divergence signal, not a failure of this utility.
    if !text_buffer.is_empty() && text_buffer != metadata.response.final_text {
        writeln!(out, "\nWarning: streamed text differs from final response")?;
        writeln!(out, "  Streamed: {text_buffer:?}")?;
        writeln!(out, "  Final: {:?}", metadata.response.final_text)?;
    }

    Ok(())
}

/// Replay every test of one agent directory.
pub fn replay_agent(agent_dir: &Path, out: &mut dyn Write) -> Result<(), ReplayError> {
    let name = agent_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("agent");
    let mut test_dirs: Vec<_> = fs::read_dir(agent_dir)
        .map_err(|_| ReplayError::UnknownPath {
            path: agent_dir.display().to_string(),
        })?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    test_dirs.sort();

    writeln!(out, "{}", "=".repeat(78))?;
    writeln!(out, "Agent: {name}")?;
    writeln!(out, "{}", "=".repeat(78))?;
    writeln!(out, "\nFound {} test runs\n", test_dirs.len())?;

    for test_dir in test_dirs {
        replay_test(&test_dir, out)?;
    }
    Ok(())
}

/// Summarize a whole run directory from its run-level artifacts.
pub fn analyze_run(run_dir: &Path, out: &mut dyn Write) -> Result<(), ReplayError> {
    writeln!(out, "{}", "=".repeat(78))?;
    writeln!(out, "BENCHMARK RUN ANALYSIS")?;
    writeln!(out, "{}", "=".repeat(78))?;

    if let Ok(text) = fs::read_to_string(run_dir.join("run-metadata.json")) {
        let metadata: Value = serde_json::from_str(&text)?;
        writeln!(
            out,
            "\nRun Time: {}",
            metadata.get("timestamp").and_then(Value::as_str).unwrap_or("?")
        )?;
        if let Some(num_runs) = metadata.get("num_runs").and_then(Value::as_u64) {
            writeln!(out, "  Runs per test: {num_runs}")?;
        }
    }

    if let Ok(text) = fs::read_to_string(run_dir.join("summary.json")) {
        let summary: Value = serde_json::from_str(&text)?;
        if let Some(analysis) = summary.get("analysis") {
            writeln!(out, "\nResults:")?;
            let total = analysis.get("total_tests").and_then(Value::as_u64).unwrap_or(0);
            let ok = analysis.get("successful").and_then(Value::as_u64).unwrap_or(0);
            writeln!(out, "  Total Tests: {total}")?;
            if total > 0 {
                writeln!(
                    out,
                    "  Successful: {ok} ({:.1}%)",
                    ok as f64 / total as f64 * 100.0
                )?;
            }
            writeln!(
                out,
                "  Failed: {}",
                analysis.get("failed").and_then(Value::as_u64).unwrap_or(0)
            )?;
        }
        if let Some(fastest) = summary.get("overall_fastest")
            && let Some(name) = fastest.get("name").and_then(Value::as_str)
        {
            writeln!(out, "\nOverall Fastest:")?;
            writeln!(
                out,
                "  {name} ({:.0}ms)",
                fastest.get("time_ms").and_then(Value::as_f64).unwrap_or(0.0)
            )?;
        }
    }

    let mut agent_dirs: Vec<_> = fs::read_dir(run_dir)
        .map_err(|_| ReplayError::UnknownPath {
            path: run_dir.display().to_string(),
        })?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    agent_dirs.sort();

    writeln!(out, "\nAgent Data ({} agents):", agent_dirs.len())?;
    for agent_dir in agent_dirs {
        let tests = fs::read_dir(&agent_dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|e| e.path().is_dir())
                    .count()
            })
            .unwrap_or(0);
        writeln!(
            out,
            "  {:<30} {tests} tests",
            agent_dir
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("?")
        )?;
    }

    Ok(())
}
