// SPDX-License-Identifier: MIT OR Apache-2.0
//! Adapter configuration.

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-5-mini";

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Connection and model settings for the OpenAI adapter.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Bearer token for the API.
    pub api_key: String,
    /// API base URL (no trailing slash).
    pub base_url: String,
    /// Chat model identifier.
    pub model: String,
    /// Completion token cap per request.
    pub max_tokens: u32,
}

/// Configuration failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The API key environment variable is unset or empty.
    #[error("environment variable {var} is not set")]
    MissingApiKey {
        /// Name of the missing variable.
        var: &'static str,
    },
}

impl OpenAiConfig {
    /// Load the key from the environment, defaults for everything else.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var(API_KEY_VAR)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey { var: API_KEY_VAR })?;
        Ok(Self::new(api_key))
    }

    /// Build a config with explicit credentials and defaults elsewhere.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1024,
        }
    }

    /// Override the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the base URL (used by tests and proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}
