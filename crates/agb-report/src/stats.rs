// SPDX-License-Identifier: MIT OR Apache-2.0
//! Aggregate statistics over reconstructed test records.
//!
//! Everything here is recomputed from the loaded artifacts on every
//! invocation; nothing is stored incrementally. Failed tests count in
//! success-rate denominators and nowhere else.

use crate::load::AgentResults;
use agb_bench::config::{AgentEndpoint, PricingTable};
use agb_core::feature::FeatureSet;
use serde::Serialize;
use std::collections::BTreeMap;

/// Median of an unsorted sample; 0 for an empty one.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Arithmetic mean; 0 for an empty sample.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Performance summary of one agent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentStats {
    /// Tests attempted.
    pub tests_count: usize,
    /// Tests that streamed to completion.
    pub passed_count: usize,
    /// `passed / attempted` as a percentage.
    pub success_rate: f64,
    /// Median total latency over successful tests.
    pub median_time_ms: f64,
    /// Mean total latency over successful tests.
    pub mean_time_ms: f64,
    /// Median time to first network chunk.
    pub median_ttfb_ms: f64,
    /// Median time to first content event.
    pub median_ttfc_ms: f64,
    /// Median streamed-text throughput in characters per second.
    pub throughput_cps: f64,
    /// Total tool calls across successful tests.
    pub tool_calls_total: u64,
}

impl AgentStats {
    /// Compute stats from one agent's records.
    pub fn from_results(results: &AgentResults) -> Self {
        let tests_count = results.tests.len();
        let successful = results.successful();
        let passed_count = successful.len();

        let times: Vec<f64> = successful.iter().map(|m| m.timing.total_time_ms).collect();
        let ttfb: Vec<f64> = successful
            .iter()
            .map(|m| m.timing.time_to_first_event_ms)
            .collect();
        let ttfc: Vec<f64> = successful
            .iter()
            .map(|m| m.timing.time_to_first_content_ms)
            .collect();
        let throughputs: Vec<f64> = successful
            .iter()
            .filter(|m| m.timing.total_time_ms > 0.0 && m.response.chars > 0)
            .map(|m| m.response.chars as f64 / (m.timing.total_time_ms / 1000.0))
            .collect();

        Self {
            tests_count,
            passed_count,
            success_rate: if tests_count == 0 {
                0.0
            } else {
                passed_count as f64 / tests_count as f64 * 100.0
            },
            median_time_ms: median(&times),
            mean_time_ms: mean(&times),
            median_ttfb_ms: median(&ttfb),
            median_ttfc_ms: median(&ttfc),
            throughput_cps: median(&throughputs),
            tool_calls_total: successful.iter().map(|m| m.tools.tool_calls as u64).sum(),
        }
    }
}

/// Compute stats for every agent.
pub fn agent_stats(results: &BTreeMap<String, AgentResults>) -> BTreeMap<String, AgentStats> {
    results
        .iter()
        .map(|(name, r)| (name.clone(), AgentStats::from_results(r)))
        .collect()
}

/// Agents ranked fastest-first by median latency; agents with zero
/// successful tests are excluded entirely.
pub fn ranking(stats: &BTreeMap<String, AgentStats>) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = stats
        .iter()
        .filter(|(_, s)| s.passed_count > 0)
        .map(|(name, s)| (name.clone(), s.median_time_ms))
        .collect();
    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

/// Fastest agent per grouping key (model family or framework), derived
/// from the endpoint table.
pub fn fastest_by<F>(
    stats: &BTreeMap<String, AgentStats>,
    agents: &[AgentEndpoint],
    key: F,
) -> BTreeMap<String, (String, f64)>
where
    F: Fn(&AgentEndpoint) -> &str,
{
    let mut best: BTreeMap<String, (String, f64)> = BTreeMap::new();
    for agent in agents {
        let Some(s) = stats.get(&agent.name) else {
            continue;
        };
        if s.passed_count == 0 {
            continue;
        }
        let group = key(agent).to_string();
        match best.get(&group) {
            Some((_, t)) if *t <= s.median_time_ms => {}
            _ => {
                best.insert(group, (agent.name.clone(), s.median_time_ms));
            }
        }
    }
    best
}

/// Cost accumulation line.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CostLine {
    /// Tests with token data.
    pub tests: usize,
    /// Input tokens summed.
    pub input_tokens: u64,
    /// Output tokens summed.
    pub output_tokens: u64,
    /// USD cost from the pricing table.
    pub cost_usd: f64,
}

/// Cost breakdown: per model id, and per framework with a nested per-model
/// split.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CostBreakdown {
    /// Per-model totals.
    pub by_model: BTreeMap<String, CostLine>,
    /// Per-framework totals.
    pub by_framework: BTreeMap<String, CostLine>,
    /// Grand total.
    pub total: CostLine,
}

/// Accumulate cost across all successful tests that reported usage.
///
/// The model id for pricing comes from the endpoint table, keyed by agent
/// name; artifacts do not carry it.
pub fn cost_breakdown(
    results: &BTreeMap<String, AgentResults>,
    agents: &[AgentEndpoint],
    pricing: &PricingTable,
) -> CostBreakdown {
    let by_name: BTreeMap<&str, &AgentEndpoint> =
        agents.iter().map(|a| (a.name.as_str(), a)).collect();
    let mut breakdown = CostBreakdown::default();

    for (agent_name, agent_results) in results {
        let Some(endpoint) = by_name.get(agent_name.as_str()) else {
            continue;
        };
        for metadata in agent_results.successful() {
            if metadata.tokens.input_tokens == 0 && metadata.tokens.output_tokens == 0 {
                continue;
            }
            let cost = pricing.cost(
                &endpoint.model_id,
                metadata.tokens.input_tokens,
                metadata.tokens.output_tokens,
            );
            for line in [
                breakdown.by_model.entry(endpoint.model_id.clone()).or_default(),
                breakdown
                    .by_framework
                    .entry(endpoint.framework.clone())
                    .or_default(),
                &mut breakdown.total,
            ] {
                line.tests += 1;
                line.input_tokens += metadata.tokens.input_tokens;
                line.output_tokens += metadata.tokens.output_tokens;
                line.cost_usd += cost;
            }
        }
    }

    breakdown
}

/// Per-agent feature detection plus success rate, the `feature-matrix.json`
/// payload.
pub fn feature_matrix(
    results: &BTreeMap<String, AgentResults>,
    stats: &BTreeMap<String, AgentStats>,
) -> BTreeMap<String, serde_json::Value> {
    results
        .iter()
        .map(|(name, agent_results)| {
            let kinds = agent_results.event_types();
            let features = FeatureSet::from_kinds(kinds.iter().map(String::as_str));
            let mut entry = serde_json::Map::new();
            for feature in agb_core::feature::Feature::ALL {
                entry.insert(
                    feature.label().to_string(),
                    serde_json::Value::Bool(features.supports(feature)),
                );
            }
            entry.insert(
                "success_rate".to_string(),
                serde_json::json!(stats.get(name).map(|s| s.success_rate).unwrap_or(0.0)),
            );
            (name.clone(), serde_json::Value::Object(entry))
        })
        .collect()
}
