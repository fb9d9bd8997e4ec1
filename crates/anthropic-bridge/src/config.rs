// SPDX-License-Identifier: MIT OR Apache-2.0
//! Adapter configuration.

/// Default chat model.
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// API version header value sent with every request.
pub const API_VERSION: &str = "2023-06-01";

/// Connection and model settings for the Anthropic adapter.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key sent in the `x-api-key` header.
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

impl AnthropicConfig {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = AnthropicConfig::new("sk-ant");
        assert_eq!(cfg.model, DEFAULT_MODEL);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn base_url_trailing_slash_stripped() {
        let cfg = AnthropicConfig::new("k").with_base_url("http://127.0.0.1:8080/");
        assert_eq!(cfg.base_url, "http://127.0.0.1:8080");
    }
}
