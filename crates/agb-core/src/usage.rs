// SPDX-License-Identifier: MIT OR Apache-2.0
//! Normalized token usage counters.

use crate::ExtraMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Best-effort normalized token counters across providers.
///
/// Bridges attach this under the `usage` key of `RUN_FINISHED`; different
/// upstream frameworks report usage in different places, so consumers merge
/// with [`Usage::merge_max`] rather than overwrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Usage {
    /// Prompt-side tokens.
    #[serde(default)]
    pub input_tokens: u64,
    /// Completion-side tokens.
    #[serde(default)]
    pub output_tokens: u64,
    /// Provider-reported total, when present.
    #[serde(default)]
    pub total_tokens: u64,
}

impl Usage {
    /// Returns `true` if no counter was reported.
    pub fn is_empty(&self) -> bool {
        self.input_tokens == 0 && self.output_tokens == 0 && self.total_tokens == 0
    }

    /// Field-wise maximum of `self` and `other`.
    ///
    /// Providers repeat cumulative usage across stream chunks; taking the
    /// maximum per field yields the final figure regardless of which chunk
    /// carried it.
    pub fn merge_max(&mut self, other: Usage) {
        self.input_tokens = self.input_tokens.max(other.input_tokens);
        self.output_tokens = self.output_tokens.max(other.output_tokens);
        self.total_tokens = self.total_tokens.max(other.total_tokens);
    }

    /// Attach this usage to an event's extra map under the `usage` key.
    pub fn attach(&self, extra: &mut ExtraMap) {
        if let Ok(v) = serde_json::to_value(self) {
            extra.insert("usage".to_string(), v);
        }
    }

    /// Read usage back out of an event's extra map, accepting both the
    /// `usage` key written by the in-repo bridges and the `usage_metadata`
    /// key used by some wrapped frameworks.
    pub fn from_extra(extra: &ExtraMap) -> Option<Usage> {
        let v = extra.get("usage").or_else(|| extra.get("usage_metadata"))?;
        serde_json::from_value(v.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_takes_field_wise_max() {
        let mut a = Usage {
            input_tokens: 100,
            output_tokens: 0,
            total_tokens: 0,
        };
        a.merge_max(Usage {
            input_tokens: 80,
            output_tokens: 40,
            total_tokens: 140,
        });
        assert_eq!(a.input_tokens, 100);
        assert_eq!(a.output_tokens, 40);
        assert_eq!(a.total_tokens, 140);
    }

    #[test]
    fn attach_and_read_back() {
        let usage = Usage {
            input_tokens: 12,
            output_tokens: 7,
            total_tokens: 19,
        };
        let mut extra = ExtraMap::new();
        usage.attach(&mut extra);
        assert_eq!(Usage::from_extra(&extra), Some(usage));
    }

    #[test]
    fn reads_usage_metadata_alias() {
        let mut extra = ExtraMap::new();
        extra.insert(
            "usage_metadata".to_string(),
            json!({"input_tokens": 5, "output_tokens": 2}),
        );
        let usage = Usage::from_extra(&extra).unwrap();
        assert_eq!(usage.input_tokens, 5);
        assert_eq!(usage.output_tokens, 2);
        assert_eq!(usage.total_tokens, 0);
    }

    #[test]
    fn missing_key_yields_none() {
        assert!(Usage::from_extra(&ExtraMap::new()).is_none());
    }

    #[test]
    fn empty_detection() {
        assert!(Usage::default().is_empty());
        assert!(
            !Usage {
                input_tokens: 1,
                ..Usage::default()
            }
            .is_empty()
        );
    }
}
