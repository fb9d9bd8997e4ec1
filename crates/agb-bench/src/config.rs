// SPDX-License-Identifier: MIT OR Apache-2.0
//! Benchmark configuration: the agent endpoint table, the prompt table, and
//! the pricing table.
//!
//! Everything is an explicit immutable struct passed into the driver.
//! Built-in defaults cover the in-repo adapter fleet; a TOML file can
//! replace any table to benchmark externally hosted agents through the same
//! wire contract.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How an agent integrates with the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// The framework emits protocol events itself.
    Native,
    /// A wrapper translates the framework's stream.
    Wrapped,
    /// A raw provider SDK with a hand-built wrapper.
    Raw,
}

/// One benchmarked agent endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEndpoint {
    /// Unique agent name; also the artifact directory name.
    pub name: String,
    /// Run endpoint URL.
    pub url: String,
    /// Health endpoint URL.
    pub health: String,
    /// Listening port; agents sharing a port are health-checked once.
    pub port: u16,
    /// Integration kind.
    #[serde(rename = "type")]
    pub kind: AgentKind,
    /// Framework slug (groups multi-model entries).
    pub framework: String,
    /// Model family key (`claude`, `openai`, `gemini`, `cerebras`).
    pub model: String,
    /// Concrete model identifier used for pricing.
    pub model_id: String,
    /// Model override sent in the request body, for endpoints serving
    /// several models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,
}

/// Kind of test a prompt drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// One request, one response.
    #[default]
    Single,
    /// Sequential turns accumulating message history on one thread.
    Multi,
    /// Single turn watched for human-input requests.
    Hitl,
}

/// One benchmark prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSpec {
    /// Prompt name; also part of the artifact directory name.
    pub name: String,
    /// Test kind.
    #[serde(rename = "type", default)]
    pub kind: PromptKind,
    /// The prompt text (single/hitl kinds).
    #[serde(default)]
    pub prompt: String,
    /// Turn texts (multi kind).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub turns: Vec<String>,
    /// Event kinds this prompt is meant to exercise.
    #[serde(default)]
    pub validates: Vec<String>,
    /// Expected number of tool calls, when the prompt targets tools.
    #[serde(default)]
    pub expect_tools: u32,
    /// Whether the prompt deliberately provokes an error.
    #[serde(default)]
    pub expect_error: bool,
}

/// Published per-token prices for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    /// USD per one million input tokens.
    pub input: f64,
    /// USD per one million output tokens.
    pub output: f64,
}

/// Pricing lookup keyed on model id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingTable(pub BTreeMap<String, ModelPrice>);

impl PricingTable {
    /// The published prices for the benchmarked models.
    pub fn builtin() -> Self {
        let mut table = BTreeMap::new();
        table.insert(
            "claude-haiku-4-5-20251001".to_string(),
            ModelPrice {
                input: 0.80,
                output: 4.00,
            },
        );
        table.insert(
            "gpt-5-mini".to_string(),
            ModelPrice {
                input: 0.150,
                output: 0.600,
            },
        );
        table.insert(
            "gemini-2.5-flash".to_string(),
            ModelPrice {
                input: 0.075,
                output: 0.30,
            },
        );
        table.insert(
            "llama-3.3-70b".to_string(),
            ModelPrice {
                input: 0.60,
                output: 0.60,
            },
        );
        table.insert(
            "llama-3.1-70b".to_string(),
            ModelPrice {
                input: 0.60,
                output: 0.60,
            },
        );
        table.insert(
            "llama-3.1-8b".to_string(),
            ModelPrice {
                input: 0.10,
                output: 0.10,
            },
        );
        Self(table)
    }

    /// Cost in USD for the given token counts; unknown models cost zero.
    pub fn cost(&self, model_id: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        match self.0.get(model_id) {
            Some(price) => {
                (input_tokens as f64 / 1_000_000.0) * price.input
                    + (output_tokens as f64 / 1_000_000.0) * price.output
            }
            None => 0.0,
        }
    }
}

/// Complete benchmark configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Repetitions per (agent, prompt) pair.
    pub num_runs: u32,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Health-check timeout in seconds.
    pub health_timeout_secs: u64,
    /// Root directory for run artifacts.
    pub output_root: PathBuf,
    /// Agents under test.
    pub agents: Vec<AgentEndpoint>,
    /// Prompt table.
    pub prompts: Vec<PromptSpec>,
    /// Pricing table.
    #[serde(default)]
    pub pricing: PricingTable,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            num_runs: 3,
            request_timeout_secs: 120,
            health_timeout_secs: 5,
            output_root: PathBuf::from("benchmark-runs"),
            agents: default_agents(),
            prompts: default_prompts(),
            pricing: PricingTable::builtin(),
        }
    }
}

impl BenchConfig {
    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Health-check timeout.
    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    /// Load a config from TOML, filling unspecified tables from defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&text)
    }

    /// Parse a TOML overlay over the defaults.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let overlay: ConfigOverlay = toml::from_str(text).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        let defaults = Self::default();
        let config = Self {
            num_runs: overlay.num_runs.unwrap_or(defaults.num_runs),
            request_timeout_secs: overlay
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            health_timeout_secs: overlay
                .health_timeout_secs
                .unwrap_or(defaults.health_timeout_secs),
            output_root: overlay.output_root.unwrap_or(defaults.output_root),
            agents: overlay.agents.unwrap_or(defaults.agents),
            prompts: overlay.prompts.unwrap_or(defaults.prompts),
            pricing: overlay.pricing.unwrap_or(defaults.pricing),
        };
        config.validate()?;
        Ok(config)
    }

    /// Semantic checks: non-empty tables, unique agent names, positive runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut reasons = Vec::new();
        if self.num_runs == 0 {
            reasons.push("num_runs must be at least 1".to_string());
        }
        if self.agents.is_empty() {
            reasons.push("agent table is empty".to_string());
        }
        if self.prompts.is_empty() {
            reasons.push("prompt table is empty".to_string());
        }
        let mut seen = std::collections::BTreeSet::new();
        for agent in &self.agents {
            if !seen.insert(agent.name.as_str()) {
                reasons.push(format!("duplicate agent name: {}", agent.name));
            }
        }
        for prompt in &self.prompts {
            if prompt.kind == PromptKind::Multi && prompt.turns.len() < 2 {
                reasons.push(format!("multi prompt {} needs at least 2 turns", prompt.name));
            }
        }
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { reasons })
        }
    }
}

/// Partial TOML shape merged over the defaults.
#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    num_runs: Option<u32>,
    request_timeout_secs: Option<u64>,
    health_timeout_secs: Option<u64>,
    output_root: Option<PathBuf>,
    agents: Option<Vec<AgentEndpoint>>,
    prompts: Option<Vec<PromptSpec>>,
    pricing: Option<PricingTable>,
}

/// Configuration failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {reason}")]
    Io {
        /// Requested path.
        path: String,
        /// Underlying failure.
        reason: String,
    },
    /// The file is not valid TOML for the overlay shape.
    #[error("failed to parse config: {reason}")]
    Parse {
        /// Parser failure detail.
        reason: String,
    },
    /// Semantic validation failed.
    #[error("invalid config: {reasons:?}")]
    Invalid {
        /// Every problem found.
        reasons: Vec<String>,
    },
}

fn agent(
    name: &str,
    port: u16,
    kind: AgentKind,
    framework: &str,
    model: &str,
    model_id: &str,
) -> AgentEndpoint {
    AgentEndpoint {
        name: name.to_string(),
        url: format!("http://localhost:{port}/agent"),
        health: format!("http://localhost:{port}/health"),
        port,
        kind,
        framework: framework.to_string(),
        model: model.to_string(),
        model_id: model_id.to_string(),
        model_override: None,
    }
}

/// The in-repo adapter fleet.
pub fn default_agents() -> Vec<AgentEndpoint> {
    let mut agents = vec![
        agent("mock", 7770, AgentKind::Native, "mock", "mock", "scripted"),
        agent(
            "openai-raw",
            7775,
            AgentKind::Raw,
            "openai-raw",
            "openai",
            "gpt-5-mini",
        ),
        agent(
            "anthropic-raw",
            7776,
            AgentKind::Raw,
            "anthropic-raw",
            "claude",
            "claude-haiku-4-5-20251001",
        ),
        agent(
            "gemini-raw",
            7777,
            AgentKind::Raw,
            "gemini-raw",
            "gemini",
            "gemini-2.5-flash",
        ),
    ];
    for model_id in ["llama-3.3-70b", "llama-3.1-70b", "llama-3.1-8b"] {
        let mut a = agent(
            &format!("cerebras-{model_id}"),
            7778,
            AgentKind::Raw,
            "cerebras-raw",
            "cerebras",
            model_id,
        );
        a.model_override = Some(model_id.to_string());
        agents.push(a);
    }
    agents
}

fn single(name: &str, prompt: &str, validates: &[&str]) -> PromptSpec {
    PromptSpec {
        name: name.to_string(),
        kind: PromptKind::Single,
        prompt: prompt.to_string(),
        turns: Vec::new(),
        validates: validates.iter().map(|s| s.to_string()).collect(),
        expect_tools: 0,
        expect_error: false,
    }
}

/// The unified prompt table: objective tasks that exercise specific
/// protocol features without biasing toward any framework.
pub fn default_prompts() -> Vec<PromptSpec> {
    let mut prompts = vec![
        single(
            "simple",
            "Say hello and introduce yourself briefly in 2-3 sentences.",
            &["TEXT_MESSAGE_CONTENT", "RUN_STARTED", "RUN_FINISHED"],
        ),
        {
            let mut p = single(
                "tool_time",
                "What is the current time? Use the time tool to check.",
                &[
                    "TOOL_CALL_START",
                    "TOOL_CALL_ARGS",
                    "TOOL_CALL_END",
                    "TOOL_CALL_RESULT",
                ],
            );
            p.expect_tools = 1;
            p
        },
        {
            let mut p = single(
                "tool_calc",
                "Calculate 42 * 17 using the calculator tool and tell me the result.",
                &[
                    "TOOL_CALL_START",
                    "TOOL_CALL_ARGS",
                    "TOOL_CALL_END",
                    "TOOL_CALL_RESULT",
                ],
            );
            p.expect_tools = 1;
            p
        },
        PromptSpec {
            name: "multi_turn_memory".to_string(),
            kind: PromptKind::Multi,
            prompt: String::new(),
            turns: vec![
                "My favorite programming language is Python. Remember this.".to_string(),
                "What is my favorite programming language?".to_string(),
            ],
            validates: vec![
                "MESSAGES_SNAPSHOT".to_string(),
                "STATE_SNAPSHOT".to_string(),
            ],
            expect_tools: 0,
            expect_error: false,
        },
        single(
            "thinking",
            "Think step-by-step: If x + 5 = 12, what is x? Show your reasoning process.",
            &["THINKING_START", "THINKING_CONTENT", "THINKING_END"],
        ),
        single(
            "artifact",
            "Create a simple Python function that adds two numbers. Return it as code.",
            &["ARTIFACT_START", "ARTIFACT_CONTENT", "ARTIFACT_END"],
        ),
        PromptSpec {
            name: "hitl_approval".to_string(),
            kind: PromptKind::Hitl,
            prompt: "I need to delete important data. You must ask for my approval before proceeding.".to_string(),
            turns: Vec::new(),
            validates: vec![
                "HUMAN_INPUT_REQUESTED".to_string(),
                "HUMAN_INPUT_RECEIVED".to_string(),
            ],
            expect_tools: 0,
            expect_error: false,
        },
        {
            let mut p = single(
                "error_handling",
                "Use the 'nonexistent_tool' to do something.",
                &["RUN_ERROR"],
            );
            p.expect_error = true;
            p
        },
        {
            let mut p = single(
                "multi_tool",
                "First get the current time, then calculate 10 + 20.",
                &["TOOL_CALL_START", "TOOL_CALL_END"],
            );
            p.expect_tools = 2;
            p
        },
    ];
    prompts.shrink_to_fit();
    prompts
}
