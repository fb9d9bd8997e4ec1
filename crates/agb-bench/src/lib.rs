// SPDX-License-Identifier: MIT OR Apache-2.0
//! agb-bench
//!
//! The benchmark driver: given an agent endpoint table and a prompt table,
//! it health-gates the fleet, runs every (agent × prompt × repetition)
//! combination concurrently, measures latency checkpoints while streaming,
//! and persists immutable per-test artifacts for the aggregator and the
//! replay utility.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod artifact;
pub mod config;
pub mod driver;
pub mod metrics;
pub mod probe;

pub use config::{AgentEndpoint, BenchConfig, PricingTable, PromptKind, PromptSpec};
pub use driver::{Driver, RunReport};
pub use metrics::TestMetrics;
