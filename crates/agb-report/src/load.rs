// SPDX-License-Identifier: MIT OR Apache-2.0
//! Run-directory loading.
//!
//! Rebuilds per-agent test records from persisted artifacts. Malformed or
//! missing artifacts are skipped with a logged warning; they never abort
//! the batch.

use agb_bench::TestMetrics;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Loading failures that abort the whole batch (only the run directory
/// itself being unreadable qualifies).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The run directory cannot be read at all.
    #[error("cannot read run directory {path}: {reason}")]
    RunDir {
        /// Requested path.
        path: String,
        /// Underlying failure.
        reason: String,
    },
    /// The run directory contains no loadable test records.
    #[error("no test records found under {path}")]
    Empty {
        /// Requested path.
        path: String,
    },
}

/// One reconstructed test execution.
#[derive(Debug, Clone)]
pub struct TestRecord {
    /// Test directory name (`run<N>-<prompt>`).
    pub test_name: String,
    /// Parsed `metadata.json`.
    pub metadata: TestMetrics,
    /// Parsed `response.jsonl` events (raw values).
    pub events: Vec<Value>,
    /// Union of event kinds from metadata and the event stream.
    pub event_types: BTreeSet<String>,
}

/// All reconstructed tests of one agent.
#[derive(Debug, Clone, Default)]
pub struct AgentResults {
    /// Test records keyed by test directory name.
    pub tests: BTreeMap<String, TestRecord>,
}

impl AgentResults {
    /// Union of event kinds across every test.
    pub fn event_types(&self) -> BTreeSet<String> {
        self.tests
            .values()
            .flat_map(|t| t.event_types.iter().cloned())
            .collect()
    }

    /// Metadata of tests that streamed to completion.
    pub fn successful(&self) -> Vec<&TestMetrics> {
        self.tests
            .values()
            .filter(|t| t.metadata.success)
            .map(|t| &t.metadata)
            .collect()
    }
}

/// Load every agent's records from a benchmark run directory.
pub fn load_run_dir(run_dir: &Path) -> Result<BTreeMap<String, AgentResults>, LoadError> {
    let entries = fs::read_dir(run_dir).map_err(|e| LoadError::RunDir {
        path: run_dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut results: BTreeMap<String, AgentResults> = BTreeMap::new();

    let mut agent_dirs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    agent_dirs.sort();

    for agent_dir in agent_dirs {
        let Some(agent_name) = agent_dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let mut agent = AgentResults::default();

        let Ok(test_entries) = fs::read_dir(&agent_dir) else {
            warn!(agent = %agent_name, "unreadable agent directory, skipping");
            continue;
        };
        let mut test_dirs: Vec<PathBuf> = test_entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.is_dir()
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with("run") && n.contains('-'))
            })
            .collect();
        test_dirs.sort();

        for test_dir in test_dirs {
            match load_test_dir(&test_dir) {
                Some(record) => {
                    agent.tests.insert(record.test_name.clone(), record);
                }
                None => {
                    warn!(path = %test_dir.display(), "skipping malformed test directory");
                }
            }
        }

        if !agent.tests.is_empty() {
            results.insert(agent_name.to_string(), agent);
        }
    }

    if results.is_empty() {
        return Err(LoadError::Empty {
            path: run_dir.display().to_string(),
        });
    }
    Ok(results)
}

/// Load one test directory; `None` when `metadata.json` is absent or
/// unparseable.
pub fn load_test_dir(test_dir: &Path) -> Option<TestRecord> {
    let test_name = test_dir.file_name()?.to_str()?.to_string();

    let metadata_text = fs::read_to_string(test_dir.join("metadata.json")).ok()?;
    let metadata: TestMetrics = serde_json::from_str(&metadata_text).ok()?;

    // The event stream is optional; a missing file leaves an empty vec.
    let events = fs::read_to_string(test_dir.join("response.jsonl"))
        .map(|text| agb_codec::from_jsonl(&text))
        .unwrap_or_default();

    let mut event_types: BTreeSet<String> = metadata.events.event_types.iter().cloned().collect();
    event_types.extend(
        events
            .iter()
            .filter_map(|e| e.get("type").and_then(Value::as_str))
            .map(str::to_string),
    );

    Some(TestRecord {
        test_name,
        metadata,
        events,
        event_types,
    })
}

/// Most recent run directory under the artifact root, by name ordering
/// (names are `%Y%m%d-%H%M%S` timestamps).
pub fn latest_run_dir(root: &Path) -> Option<PathBuf> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)
        .ok()?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs.pop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_test(
        run_dir: &Path,
        agent: &str,
        test: &str,
        success: bool,
        events: &[Value],
    ) {
        let dir = run_dir.join(agent).join(test);
        fs::create_dir_all(&dir).unwrap();
        let mut metadata = TestMetrics {
            agent: agent.to_string(),
            prompt_type: "simple".to_string(),
            success,
            turn_count: 1,
            ..TestMetrics::default()
        };
        metadata.absorb_events(events);
        fs::write(
            dir.join("metadata.json"),
            serde_json::to_vec_pretty(&metadata).unwrap(),
        )
        .unwrap();
        fs::write(dir.join("response.jsonl"), agb_codec::to_jsonl(events)).unwrap();
        fs::write(dir.join("request.json"), "{}").unwrap();
    }

    fn sample_events() -> Vec<Value> {
        vec![
            json!({"type": "RUN_STARTED", "thread_id": "t", "run_id": "r"}),
            json!({"type": "TEXT_MESSAGE_CONTENT", "message_id": "m", "delta": "hi"}),
            json!({"type": "RUN_FINISHED", "thread_id": "t", "run_id": "r"}),
        ]
    }

    #[test]
    fn loads_agents_and_tests() {
        let tmp = tempfile::tempdir().unwrap();
        write_test(tmp.path(), "alpha", "run1-simple", true, &sample_events());
        write_test(tmp.path(), "alpha", "run2-simple", true, &sample_events());
        write_test(tmp.path(), "beta", "run1-simple", false, &[]);

        let results = load_run_dir(tmp.path()).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results["alpha"].tests.len(), 2);
        assert!(
            results["alpha"]
                .event_types()
                .contains("TEXT_MESSAGE_CONTENT")
        );
        assert_eq!(results["alpha"].successful().len(), 2);
        assert!(results["beta"].successful().is_empty());
    }

    #[test]
    fn malformed_metadata_skipped_with_warning() {
        let tmp = tempfile::tempdir().unwrap();
        write_test(tmp.path(), "alpha", "run1-simple", true, &sample_events());

        let broken = tmp.path().join("alpha").join("run2-simple");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join("metadata.json"), "not json").unwrap();

        let results = load_run_dir(tmp.path()).unwrap();
        assert_eq!(results["alpha"].tests.len(), 1);
    }

    #[test]
    fn missing_response_jsonl_yields_empty_events() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("alpha").join("run1-simple");
        fs::create_dir_all(&dir).unwrap();
        let metadata = TestMetrics {
            agent: "alpha".to_string(),
            success: true,
            ..TestMetrics::default()
        };
        fs::write(
            dir.join("metadata.json"),
            serde_json::to_vec(&metadata).unwrap(),
        )
        .unwrap();

        let record = load_test_dir(&dir).unwrap();
        assert!(record.events.is_empty());
    }

    #[test]
    fn empty_run_dir_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_run_dir(tmp.path()),
            Err(LoadError::Empty { .. })
        ));
    }

    #[test]
    fn latest_run_dir_picks_newest_timestamp() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("20260806-110000")).unwrap();
        fs::create_dir(tmp.path().join("20260807-090000")).unwrap();
        fs::create_dir(tmp.path().join("20260805-230000")).unwrap();

        let latest = latest_run_dir(tmp.path()).unwrap();
        assert!(latest.ends_with("20260807-090000"));
    }
}
