// SPDX-License-Identifier: MIT OR Apache-2.0
//! Artifact persistence.
//!
//! Layout per run:
//! `benchmark-runs/<timestamp>/<agent>/run<N>-<prompt>/{request.json,
//! response.jsonl, metadata.json}` plus run-level `run-metadata.json` and
//! `summary.json`. Every test, successful or not, is persisted; artifacts
//! are immutable after write.

use crate::config::BenchConfig;
use crate::metrics::TestMetrics;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Filesystem failure.
    #[error("artifact io failure at {path}: {reason}")]
    Io {
        /// Offending path.
        path: String,
        /// Underlying failure.
        reason: String,
    },
    /// Serialization failure.
    #[error("artifact encode failure: {0}")]
    Encode(#[from] serde_json::Error),
}

fn io_err(path: &Path, e: std::io::Error) -> ArtifactError {
    ArtifactError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// Run-level metadata written before any test executes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Run directory timestamp (`%Y%m%d-%H%M%S`).
    pub timestamp: String,
    /// ISO start time.
    pub start_time: String,
    /// Repetitions per test.
    pub num_runs: u32,
    /// Number of configured agents.
    pub total_agents: usize,
    /// Prompt names in table order.
    pub prompt_names: Vec<String>,
}

/// Directory of one test execution: `<agent>/run<N>-<prompt>`.
pub fn test_dir(run_dir: &Path, agent: &str, run_number: u32, prompt: &str) -> PathBuf {
    run_dir.join(agent).join(format!("run{run_number}-{prompt}"))
}

/// Persist the three per-test artifacts.
pub fn save_test(
    run_dir: &Path,
    request: &Value,
    events: &[Value],
    metrics: &TestMetrics,
) -> Result<PathBuf, ArtifactError> {
    let dir = test_dir(
        run_dir,
        &metrics.agent,
        metrics.run_number,
        &metrics.prompt_type,
    );
    fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;

    let request_path = dir.join("request.json");
    fs::write(&request_path, serde_json::to_vec_pretty(request)?)
        .map_err(|e| io_err(&request_path, e))?;

    let response_path = dir.join("response.jsonl");
    fs::write(&response_path, agb_codec::to_jsonl(events))
        .map_err(|e| io_err(&response_path, e))?;

    let metadata_path = dir.join("metadata.json");
    fs::write(&metadata_path, serde_json::to_vec_pretty(metrics)?)
        .map_err(|e| io_err(&metadata_path, e))?;

    Ok(dir)
}

/// Create the timestamped run directory and write `run-metadata.json`.
pub fn init_run_dir(
    config: &BenchConfig,
    timestamp: &str,
    start_time: &str,
) -> Result<PathBuf, ArtifactError> {
    let run_dir = config.output_root.join(timestamp);
    fs::create_dir_all(&run_dir).map_err(|e| io_err(&run_dir, e))?;

    let metadata = RunMetadata {
        timestamp: timestamp.to_string(),
        start_time: start_time.to_string(),
        num_runs: config.num_runs,
        total_agents: config.agents.len(),
        prompt_names: config.prompts.iter().map(|p| p.name.clone()).collect(),
    };
    let path = run_dir.join("run-metadata.json");
    fs::write(&path, serde_json::to_vec_pretty(&metadata)?).map_err(|e| io_err(&path, e))?;

    Ok(run_dir)
}

/// Write the run-level `summary.json`.
pub fn save_summary(run_dir: &Path, summary: &Value) -> Result<(), ArtifactError> {
    let path = run_dir.join("summary.json");
    fs::write(&path, serde_json::to_vec_pretty(summary)?).map_err(|e| io_err(&path, e))
}
