// SPDX-License-Identifier: MIT OR Apache-2.0
//! agb-tools
//!
//! The two tool capabilities exposed uniformly by every adapter for
//! comparability: a clock reader and a restricted arithmetic evaluator.
//!
//! Tool failures are normal result strings, never errors — an agent asking
//! for `1 / 0` gets `"Error: division by zero"` back as the tool result.
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod calc;

pub use calc::evaluate;

use serde_json::{Value, json};

/// Wire name of the clock tool.
pub const TOOL_CURRENT_TIME: &str = "get_current_time";

/// Wire name of the calculator tool.
pub const TOOL_CALCULATOR: &str = "calculator";

/// A tool declaration shared by every adapter: name, description, and the
/// JSON schema of its arguments object.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Tool name as exposed to the model.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

/// The uniform tool table.
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: TOOL_CURRENT_TIME,
            description: "Get the current date and time",
            parameters: json!({
                "type": "object",
                "properties": {},
                "required": [],
            }),
        },
        ToolSpec {
            name: TOOL_CALCULATOR,
            description: "Evaluate a mathematical expression",
            parameters: json!({
                "type": "object",
                "properties": {
                    "expression": {
                        "type": "string",
                        "description": "A math expression like '2 + 2' or '10 * 5'",
                    }
                },
                "required": ["expression"],
            }),
        },
    ]
}

/// The current local time, formatted as `%Y-%m-%d %H:%M:%S`.
pub fn current_time() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Execute a tool by name against its JSON arguments.
///
/// Unknown tool names and malformed arguments come back as result strings so
/// the calling bridge can forward them as `TOOL_CALL_RESULT` payloads.
pub fn execute(name: &str, args: &Value) -> String {
    match name {
        TOOL_CURRENT_TIME => current_time(),
        TOOL_CALCULATOR => {
            let expression = args
                .get("expression")
                .and_then(Value::as_str)
                .unwrap_or_default();
            evaluate(expression)
        }
        _ => "Unknown tool".to_string(),
    }
}
