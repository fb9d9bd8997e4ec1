// SPDX-License-Identifier: MIT OR Apache-2.0
//! Feature detection over observed event-kind sets.
//!
//! A feature is "supported" when the agent's observed event-type set
//! intersects that feature's defining event kinds. This is a pure
//! set-membership test; no payload inspection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A protocol capability detectable from an agent's event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Lifecycle framing plus incremental text deltas.
    Streaming,
    /// Tool-call lifecycle events.
    ToolCalling,
    /// Reasoning/thinking blocks.
    Thinking,
    /// Artifact generation blocks.
    Artifacts,
    /// Human-in-the-loop input requests.
    Hitl,
    /// State or message-list snapshots.
    State,
    /// Error surfacing.
    Errors,
}

impl Feature {
    /// Every feature, in report order.
    pub const ALL: [Feature; 7] = [
        Feature::Streaming,
        Feature::ToolCalling,
        Feature::Thinking,
        Feature::Artifacts,
        Feature::Hitl,
        Feature::State,
        Feature::Errors,
    ];

    /// The event kinds whose presence marks this feature as supported.
    pub fn defining_kinds(self) -> &'static [&'static str] {
        match self {
            Feature::Streaming => &["RUN_STARTED", "RUN_FINISHED", "TEXT_MESSAGE_CONTENT"],
            Feature::ToolCalling => &["TOOL_CALL_START", "TOOL_CALL_END", "TOOL_CALL_RESULT"],
            Feature::Thinking => &["THINKING_START", "THINKING_CONTENT", "THINKING_END"],
            Feature::Artifacts => &["ARTIFACT_START", "ARTIFACT_CONTENT", "ARTIFACT_END"],
            Feature::Hitl => &["HUMAN_INPUT_REQUESTED", "HUMAN_INPUT_RECEIVED"],
            Feature::State => &["STATE_SNAPSHOT", "MESSAGES_SNAPSHOT"],
            Feature::Errors => &["RUN_ERROR"],
        }
    }

    /// Stable label used in reports and JSON output.
    pub fn label(self) -> &'static str {
        match self {
            Feature::Streaming => "streaming",
            Feature::ToolCalling => "tool_calling",
            Feature::Thinking => "thinking",
            Feature::Artifacts => "artifacts",
            Feature::Hitl => "hitl",
            Feature::State => "state",
            Feature::Errors => "errors",
        }
    }
}

/// The set of features detected for one agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    supported: BTreeSet<Feature>,
}

impl FeatureSet {
    /// Detect features from a set of observed event-kind names.
    pub fn from_kinds<'a, I>(kinds: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let seen: BTreeSet<&str> = kinds.into_iter().collect();
        let supported = Feature::ALL
            .into_iter()
            .filter(|f| f.defining_kinds().iter().any(|k| seen.contains(k)))
            .collect();
        Self { supported }
    }

    /// Returns `true` if the feature was detected.
    pub fn supports(&self, feature: Feature) -> bool {
        self.supported.contains(&feature)
    }

    /// Iterate over the detected features in report order.
    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        self.supported.iter().copied()
    }

    /// Number of detected features.
    pub fn len(&self) -> usize {
        self.supported.len()
    }

    /// Whether no feature was detected.
    pub fn is_empty(&self) -> bool {
        self.supported.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaming_detected_from_lifecycle() {
        let fs = FeatureSet::from_kinds(["RUN_STARTED", "RUN_FINISHED"]);
        assert!(fs.supports(Feature::Streaming));
        assert!(!fs.supports(Feature::ToolCalling));
    }

    #[test]
    fn thinking_detected_from_any_member() {
        // Any single defining kind is enough.
        let fs = FeatureSet::from_kinds(["THINKING_CONTENT"]);
        assert!(fs.supports(Feature::Thinking));
    }

    #[test]
    fn tool_calling_detected() {
        let fs = FeatureSet::from_kinds(["TOOL_CALL_START", "TOOL_CALL_ARGS"]);
        assert!(fs.supports(Feature::ToolCalling));
    }

    #[test]
    fn errors_detected_from_run_error() {
        let fs = FeatureSet::from_kinds(["RUN_STARTED", "RUN_ERROR"]);
        assert!(fs.supports(Feature::Errors));
    }

    #[test]
    fn empty_kind_set_supports_nothing() {
        let fs = FeatureSet::from_kinds([]);
        assert!(fs.is_empty());
        for f in Feature::ALL {
            assert!(!fs.supports(f));
        }
    }

    #[test]
    fn unknown_kinds_ignored() {
        let fs = FeatureSet::from_kinds(["SOMETHING_CUSTOM", "STATE_SNAPSHOT"]);
        assert_eq!(fs.len(), 1);
        assert!(fs.supports(Feature::State));
    }

    #[test]
    fn feature_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Feature::ToolCalling).unwrap(),
            "\"tool_calling\""
        );
    }
}
