// SPDX-License-Identifier: MIT OR Apache-2.0
//! Markdown report rendering.
//!
//! Human-readable output only; nothing here is re-consumed
//! programmatically. Cell markers follow the original matrices (a check or
//! a cross per agent/event intersection).

use crate::load::AgentResults;
use crate::stats::{AgentStats, CostBreakdown, mean, median, ranking};
use agb_core::feature::Feature;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

const SUPPORTED: &str = "✅";
const UNSUPPORTED: &str = "❌";

fn generated_header(title: &str) -> String {
    format!(
        "# {title}\n\n**Generated:** {}\n\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}

/// `EVENT-COVERAGE-MATRIX.md`: every vocabulary event × every agent.
pub fn event_coverage_matrix(results: &BTreeMap<String, AgentResults>) -> String {
    let agents: Vec<&String> = results.keys().collect();
    let agent_events: BTreeMap<&String, BTreeSet<String>> = results
        .iter()
        .map(|(name, r)| (name, r.event_types()))
        .collect();

    let mut out = generated_header("AG-UI Event Coverage Matrix");
    let _ = writeln!(out, "**Total Agents:** {}", agents.len());
    let _ = writeln!(
        out,
        "**Vocabulary Events:** {}\n",
        agb_core::ALL_EVENT_KINDS.len()
    );
    out.push_str("## All Agents × All Events\n\n");

    out.push_str("| Event Type |");
    for agent in &agents {
        let _ = write!(out, " {agent} |");
    }
    out.push('\n');
    out.push_str("|------------|");
    for _ in &agents {
        out.push_str("----|");
    }
    out.push('\n');

    for kind in agb_core::ALL_EVENT_KINDS {
        let _ = write!(out, "| **{kind}** |");
        for agent in &agents {
            let seen = agent_events
                .get(*agent)
                .is_some_and(|kinds| kinds.contains(kind));
            let _ = write!(out, " {} |", if seen { SUPPORTED } else { UNSUPPORTED });
        }
        out.push('\n');
    }

    // Coverage buckets.
    let mut high = Vec::new();
    let mut medium = Vec::new();
    let mut low = Vec::new();
    for kind in agb_core::ALL_EVENT_KINDS {
        let count = agents
            .iter()
            .filter(|a| agent_events.get(**a).is_some_and(|k| k.contains(kind)))
            .count();
        let pct = if agents.is_empty() {
            0.0
        } else {
            count as f64 / agents.len() as f64 * 100.0
        };
        let line = format!("- {kind}: {count}/{} ({pct:.0}%)", agents.len());
        if pct >= 80.0 {
            high.push(line);
        } else if pct >= 20.0 {
            medium.push(line);
        } else {
            low.push(line);
        }
    }

    out.push_str("\n## Event Coverage Statistics\n\n");
    let _ = writeln!(out, "**High Coverage (>=80%):** {}", high.len());
    for line in &high {
        out.push_str(line);
        out.push('\n');
    }
    let _ = writeln!(out, "\n**Medium Coverage (20-80%):** {}", medium.len());
    for line in &medium {
        out.push_str(line);
        out.push('\n');
    }
    let _ = writeln!(out, "\n**Low Coverage (<20%):** {}", low.len());
    for line in &low {
        out.push_str(line);
        out.push('\n');
    }

    out
}

/// `FRAMEWORK-COMPARISON-MATRIX.md`: performance and feature support.
pub fn framework_comparison(
    results: &BTreeMap<String, AgentResults>,
    stats: &BTreeMap<String, AgentStats>,
) -> String {
    let mut out = generated_header("Framework Capabilities Comparison");

    out.push_str("## Framework Performance Matrix\n\n");
    out.push_str(
        "| Agent | Tests | Success | Median Time (ms) | Throughput (c/s) | Tool Calls |\n",
    );
    out.push_str(
        "|-------|-------|---------|------------------|------------------|------------|\n",
    );

    // Success rate first, then speed.
    let mut ordered: Vec<(&String, &AgentStats)> = stats.iter().collect();
    ordered.sort_by(|a, b| {
        b.1.success_rate
            .partial_cmp(&a.1.success_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.1.median_time_ms
                    .partial_cmp(&b.1.median_time_ms)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    for (agent, s) in &ordered {
        let _ = writeln!(
            out,
            "| {agent} | {} | {:.0}% | {:.0} | {:.0} | {} |",
            s.tests_count, s.success_rate, s.median_time_ms, s.throughput_cps, s.tool_calls_total,
        );
    }

    out.push_str("\n## Feature Support Matrix\n\n");
    out.push_str("| Agent |");
    for feature in Feature::ALL {
        let _ = write!(out, " {} |", feature.label());
    }
    out.push_str("\n|-------|");
    for _ in Feature::ALL {
        out.push_str("----|");
    }
    out.push('\n');

    for (agent, agent_results) in results {
        let kinds = agent_results.event_types();
        let features =
            agb_core::feature::FeatureSet::from_kinds(kinds.iter().map(String::as_str));
        let _ = write!(out, "| {agent} |");
        for feature in Feature::ALL {
            let _ = write!(
                out,
                " {} |",
                if features.supports(feature) {
                    SUPPORTED
                } else {
                    UNSUPPORTED
                }
            );
        }
        out.push('\n');
    }

    out
}

/// `EVENT-TYPE-ANALYSIS.md`: per-kind coverage plus category grouping.
pub fn event_type_analysis(results: &BTreeMap<String, AgentResults>) -> String {
    let total_agents = results.len();
    let mut out = generated_header("Event Type Analysis");

    // Occurrences across all tests, coverage across agents.
    let mut coverage: BTreeMap<String, BTreeSet<&String>> = BTreeMap::new();
    let mut occurrences: BTreeMap<String, usize> = BTreeMap::new();
    for (agent, agent_results) in results {
        for test in agent_results.tests.values() {
            for kind in &test.event_types {
                coverage.entry(kind.clone()).or_default().insert(agent);
                *occurrences.entry(kind.clone()).or_insert(0) += 1;
            }
        }
    }

    out.push_str("## Event Coverage by Type\n\n");
    out.push_str("| Event Type | Agents | Coverage | Occurrences |\n");
    out.push_str("|------------|--------|----------|-------------|\n");
    for (kind, agents) in &coverage {
        let pct = agents.len() as f64 / total_agents.max(1) as f64 * 100.0;
        let _ = writeln!(
            out,
            "| {kind} | {}/{total_agents} | {pct:.0}% | {} |",
            agents.len(),
            occurrences.get(kind).copied().unwrap_or(0),
        );
    }

    let categories: [(&str, &[&str]); 7] = [
        ("Lifecycle", &["RUN_STARTED", "RUN_FINISHED", "RUN_ERROR"]),
        (
            "Text Streaming",
            &[
                "TEXT_MESSAGE_START",
                "TEXT_MESSAGE_CONTENT",
                "TEXT_MESSAGE_END",
            ],
        ),
        (
            "Thinking",
            &["THINKING_START", "THINKING_CONTENT", "THINKING_END"],
        ),
        (
            "Tools",
            &[
                "TOOL_CALL_START",
                "TOOL_CALL_ARGS",
                "TOOL_CALL_END",
                "TOOL_CALL_RESULT",
            ],
        ),
        (
            "Artifacts",
            &["ARTIFACT_START", "ARTIFACT_CONTENT", "ARTIFACT_END"],
        ),
        ("State", &["STATE_SNAPSHOT", "MESSAGES_SNAPSHOT"]),
        (
            "Human Input",
            &["HUMAN_INPUT_REQUESTED", "HUMAN_INPUT_RECEIVED"],
        ),
    ];

    out.push_str("\n## Events by Category\n\n");
    for (category, kinds) in categories {
        let _ = writeln!(out, "### {category}");
        for kind in kinds {
            if let Some(agents) = coverage.get(*kind) {
                let pct = agents.len() as f64 / total_agents.max(1) as f64 * 100.0;
                let _ = writeln!(out, "- **{kind}**: {pct:.0}% ({} agents)", agents.len());
            }
        }
        out.push('\n');
    }

    out
}

/// `BENCHMARK-SUMMARY.md`: overall statistics, performance, rankings, and
/// the cost breakdown.
pub fn summary_report(
    results: &BTreeMap<String, AgentResults>,
    stats: &BTreeMap<String, AgentStats>,
    agents: &[agb_bench::AgentEndpoint],
    costs: &CostBreakdown,
) -> String {
    let total_agents = results.len();
    let total_tests: usize = results.values().map(|r| r.tests.len()).sum();
    let successful: usize = results.values().map(|r| r.successful().len()).sum();

    let mut out = generated_header("Benchmark Summary Report");

    out.push_str("## Overall Statistics\n\n");
    let _ = writeln!(out, "- **Total Agents:** {total_agents}");
    let _ = writeln!(out, "- **Total Tests:** {total_tests}");
    let _ = writeln!(
        out,
        "- **Overall Success Rate:** {:.1}%\n",
        if total_tests == 0 {
            0.0
        } else {
            successful as f64 / total_tests as f64 * 100.0
        }
    );

    let all_times: Vec<f64> = results
        .values()
        .flat_map(|r| r.successful())
        .map(|m| m.timing.total_time_ms)
        .collect();
    out.push_str("## Performance Metrics\n\n");
    if !all_times.is_empty() {
        let fastest = all_times.iter().cloned().fold(f64::INFINITY, f64::min);
        let slowest = all_times.iter().cloned().fold(0.0f64, f64::max);
        let _ = writeln!(out, "- **Fastest Test:** {fastest:.0}ms");
        let _ = writeln!(out, "- **Slowest Test:** {slowest:.0}ms");
        let _ = writeln!(out, "- **Median Response Time:** {:.0}ms", median(&all_times));
        let _ = writeln!(out, "- **Average Response Time:** {:.0}ms\n", mean(&all_times));
    }

    let observed: BTreeSet<String> = results.values().flat_map(|r| r.event_types()).collect();
    let known = observed
        .iter()
        .filter(|k| agb_core::ALL_EVENT_KINDS.contains(&k.as_str()))
        .count();
    out.push_str("## Event Coverage\n\n");
    let _ = writeln!(out, "- **Unique Event Types Captured:** {}", observed.len());
    let _ = writeln!(
        out,
        "- **Vocabulary Coverage:** {:.1}%\n",
        known as f64 / agb_core::ALL_EVENT_KINDS.len() as f64 * 100.0
    );

    out.push_str("## Top Performers\n\n");
    let ranked = ranking(stats);
    out.push_str("**Fastest Agents:**\n");
    for (agent, time) in ranked.iter().take(5) {
        let _ = writeln!(out, "- {agent}: {time:.0}ms");
    }

    let mut by_throughput: Vec<(&String, &AgentStats)> = stats
        .iter()
        .filter(|(_, s)| s.throughput_cps > 0.0)
        .collect();
    by_throughput.sort_by(|a, b| {
        b.1.throughput_cps
            .partial_cmp(&a.1.throughput_cps)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    out.push_str("\n**Fastest Streaming:**\n");
    for (agent, s) in by_throughput.iter().take(5) {
        let _ = writeln!(out, "- {agent}: {:.0} chars/sec", s.throughput_cps);
    }

    out.push_str("\n**Fastest by Model:**\n");
    for (model, (agent, time)) in crate::stats::fastest_by(stats, agents, |a| &a.model) {
        let _ = writeln!(out, "- {model}: {agent} ({time:.0}ms)");
    }
    out.push_str("\n**Fastest by Framework:**\n");
    for (framework, (agent, time)) in crate::stats::fastest_by(stats, agents, |a| &a.framework) {
        let _ = writeln!(out, "- {framework}: {agent} ({time:.0}ms)");
    }

    out.push_str("\n## Cost Breakdown\n\n");
    out.push_str("| Model | Tests | Input Tokens | Output Tokens | Total Cost |\n");
    out.push_str("|-------|-------|--------------|---------------|------------|\n");
    for (model, line) in &costs.by_model {
        let _ = writeln!(
            out,
            "| {model} | {} | {} | {} | ${:.6} |",
            line.tests, line.input_tokens, line.output_tokens, line.cost_usd,
        );
    }
    let _ = writeln!(
        out,
        "\n**Total benchmark cost:** ${:.6} ({} input / {} output tokens)",
        costs.total.cost_usd, costs.total.input_tokens, costs.total.output_tokens,
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::TestRecord;
    use crate::stats::agent_stats;
    use agb_bench::TestMetrics;

    fn results_with_kinds(kinds: &[&str]) -> BTreeMap<String, AgentResults> {
        let mut metadata = TestMetrics {
            agent: "agent".into(),
            success: true,
            ..TestMetrics::default()
        };
        metadata.timing.total_time_ms = 150.0;
        metadata.response.chars = 300;
        let record = TestRecord {
            test_name: "run1-simple".to_string(),
            metadata,
            events: vec![],
            event_types: kinds.iter().map(|s| s.to_string()).collect(),
        };
        let mut agent = AgentResults::default();
        agent.tests.insert(record.test_name.clone(), record);
        let mut all = BTreeMap::new();
        all.insert("agent".to_string(), agent);
        all
    }

    #[test]
    fn coverage_matrix_marks_seen_events() {
        let results = results_with_kinds(&["RUN_STARTED", "RUN_FINISHED"]);
        let md = event_coverage_matrix(&results);
        assert!(md.contains("| **RUN_STARTED** | ✅ |"));
        assert!(md.contains("| **THINKING_START** | ❌ |"));
        assert!(md.contains("**Total Agents:** 1"));
    }

    #[test]
    fn comparison_matrix_contains_performance_row() {
        let results =
            results_with_kinds(&["RUN_STARTED", "RUN_FINISHED", "TEXT_MESSAGE_CONTENT"]);
        let stats = agent_stats(&results);
        let md = framework_comparison(&results, &stats);
        assert!(md.contains("| agent | 1 | 100% | 150 | 2000 | 0 |"));
        // Streaming feature detected from the kinds.
        assert!(md.contains("streaming"));
    }

    #[test]
    fn analysis_groups_by_category() {
        let results = results_with_kinds(&["RUN_STARTED", "TOOL_CALL_START"]);
        let md = event_type_analysis(&results);
        assert!(md.contains("### Lifecycle"));
        assert!(md.contains("### Tools"));
        assert!(md.contains("| RUN_STARTED | 1/1 | 100% | 1 |"));
    }

    #[test]
    fn summary_reports_rates_rankings_and_costs() {
        let results = results_with_kinds(&["RUN_STARTED", "RUN_FINISHED"]);
        let stats = agent_stats(&results);
        let costs = CostBreakdown::default();
        let agents = vec![agb_bench::AgentEndpoint {
            name: "agent".to_string(),
            url: String::new(),
            health: String::new(),
            port: 0,
            kind: agb_bench::config::AgentKind::Raw,
            framework: "mock-fw".to_string(),
            model: "claude".to_string(),
            model_id: "m".to_string(),
            model_override: None,
        }];
        let md = summary_report(&results, &stats, &agents, &costs);
        assert!(md.contains("**Total Tests:** 1"));
        assert!(md.contains("**Overall Success Rate:** 100.0%"));
        assert!(md.contains("- agent: 150ms"));
        assert!(md.contains("- claude: agent (150ms)"));
        assert!(md.contains("- mock-fw: agent (150ms)"));
    }
}
