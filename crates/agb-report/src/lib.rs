// SPDX-License-Identifier: MIT OR Apache-2.0
//! agb-report
//!
//! The result aggregator and report generator: loads a benchmark run
//! directory, recomputes every statistic from the stored artifacts, and
//! renders the comparison matrices as markdown. Nothing is stored
//! incrementally; rerunning over the same directory reproduces the same
//! numbers.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod load;
pub mod render;
pub mod stats;

use agb_bench::BenchConfig;
use std::path::{Path, PathBuf};
use tracing::info;

pub use load::{AgentResults, LoadError, TestRecord, latest_run_dir, load_run_dir};
pub use stats::{AgentStats, CostBreakdown, agent_stats, cost_breakdown, feature_matrix, ranking};

/// Report-generation failures.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Loading the run directory failed.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// Writing an output file failed.
    #[error("failed to write {path}: {reason}")]
    Write {
        /// Offending path.
        path: String,
        /// Underlying failure.
        reason: String,
    },
    /// Serializing the feature matrix failed.
    #[error("failed to encode feature matrix: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Generate every report for one run directory.
///
/// Markdown lands in `out_dir`; `feature-matrix.json` lands inside the run
/// directory next to the artifacts it was derived from. Returns the paths
/// written.
pub fn generate_reports(
    run_dir: &Path,
    out_dir: &Path,
    config: &BenchConfig,
) -> Result<Vec<PathBuf>, ReportError> {
    let results = load_run_dir(run_dir)?;
    info!(agents = results.len(), run_dir = %run_dir.display(), "loaded benchmark results");

    let stats = agent_stats(&results);
    let costs = cost_breakdown(&results, &config.agents, &config.pricing);

    let write = |path: PathBuf, content: String| -> Result<PathBuf, ReportError> {
        std::fs::write(&path, content).map_err(|e| ReportError::Write {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        info!(path = %path.display(), "report written");
        Ok(path)
    };

    std::fs::create_dir_all(out_dir).map_err(|e| ReportError::Write {
        path: out_dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut written = vec![
        write(
            out_dir.join("EVENT-COVERAGE-MATRIX.md"),
            render::event_coverage_matrix(&results),
        )?,
        write(
            out_dir.join("FRAMEWORK-COMPARISON-MATRIX.md"),
            render::framework_comparison(&results, &stats),
        )?,
        write(
            out_dir.join("EVENT-TYPE-ANALYSIS.md"),
            render::event_type_analysis(&results),
        )?,
        write(
            out_dir.join("BENCHMARK-SUMMARY.md"),
            render::summary_report(&results, &stats, &config.agents, &costs),
        )?,
    ];

    let matrix = feature_matrix(&results, &stats);
    written.push(write(
        run_dir.join("feature-matrix.json"),
        serde_json::to_string_pretty(&matrix)?,
    )?);

    Ok(written)
}
