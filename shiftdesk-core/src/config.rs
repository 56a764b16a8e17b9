//! Configuration types

use crate::{ConfigError, ContextWindow};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// RETRY
// ============================================================================

/// Stage token the caller routes to when tool calling is exhausted.
pub const DEFAULT_FALLBACK_STAGE: &str = "planner";

/// Exponential backoff applied before an attempt that follows a transport failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackoffConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
    pub multiplier: f64,
}

impl BackoffConfig {
    /// Delay before the attempt following the `failures`-th consecutive
    /// transport failure (1-based).
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16) as i32;
        let scaled = self.initial_ms as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(scaled.min(self.max_ms as f64) as u64)
    }
}

/// Retry configuration for tool calling and structured generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_retries: u32,
    /// History window supplied to each attempt
    #[serde(default)]
    pub context_window: ContextWindow,
    /// Stage named in the exhaustion report
    #[serde(default = "default_fallback_stage")]
    pub fallback_stage: String,
    /// Upper bound on a single model call
    #[serde(default)]
    pub attempt_timeout_ms: Option<u64>,
    /// Backoff after transport failures; `None` re-prompts immediately
    #[serde(default)]
    pub transport_backoff: Option<BackoffConfig>,
}

fn default_fallback_stage() -> String {
    DEFAULT_FALLBACK_STAGE.to_string()
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            context_window: ContextWindow::tool_caller(),
            fallback_stage: default_fallback_stage(),
            attempt_timeout_ms: None,
            transport_backoff: None,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_transport_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.transport_backoff = Some(backoff);
        self
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(invalid("retry.max_retries", "must be > 0"));
        }
        if self.context_window.max_messages == 0 {
            return Err(invalid("retry.context_window.max_messages", "must be > 0"));
        }
        if self.fallback_stage.trim().is_empty() {
            return Err(invalid("retry.fallback_stage", "must not be empty"));
        }
        if self.attempt_timeout_ms == Some(0) {
            return Err(invalid("retry.attempt_timeout_ms", "must be > 0"));
        }
        if let Some(backoff) = &self.transport_backoff {
            if backoff.initial_ms == 0 {
                return Err(invalid("retry.transport_backoff.initial_ms", "must be > 0"));
            }
            if backoff.max_ms < backoff.initial_ms {
                return Err(invalid(
                    "retry.transport_backoff.max_ms",
                    "must be >= initial_ms",
                ));
            }
            if backoff.multiplier < 1.0 {
                return Err(invalid("retry.transport_backoff.multiplier", "must be >= 1.0"));
            }
        }
        Ok(())
    }
}

// ============================================================================
// PROVIDER
// ============================================================================

/// Hosted model API family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// OpenAI chat completions, or any compatible endpoint
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
}

/// LLM provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub provider_type: ProviderKind,
    pub model: String,
    /// Base URL override, e.g. for OpenAI-compatible gateways
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub requests_per_minute: u32,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(invalid("provider.model", "must not be empty"));
        }
        if self.api_key_env.trim().is_empty() {
            return Err(invalid("provider.api_key_env", "must not be empty"));
        }
        if self.requests_per_minute == 0 {
            return Err(invalid("provider.requests_per_minute", "must be > 0"));
        }
        if let Some(endpoint) = &self.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(invalid("provider.endpoint", "must be an http(s) url"));
            }
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(invalid("provider.temperature", "must be within 0.0..=2.0"));
            }
        }
        if matches!(self.max_tokens, Some(n) if n <= 0) {
            return Err(invalid("provider.max_tokens", "must be > 0"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> ProviderConfig {
        ProviderConfig {
            provider_type: ProviderKind::OpenAi,
            model: "gpt-4o-mini".to_string(),
            endpoint: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            requests_per_minute: 60,
            temperature: Some(0.2),
            max_tokens: None,
        }
    }

    #[test]
    fn test_default_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.context_window.max_messages, 5);
        assert_eq!(config.fallback_stage, "planner");
        assert!(config.transport_backoff.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_retry_config_rejects_zero_attempts() {
        let err = RetryConfig::default().with_max_retries(0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "retry.max_retries"));
    }

    #[test]
    fn test_backoff_validation() {
        let config = RetryConfig::default().with_transport_backoff(BackoffConfig {
            initial_ms: 100,
            max_ms: 50,
            multiplier: 2.0,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backoff_delay_grows_and_caps() {
        let backoff = BackoffConfig {
            initial_ms: 100,
            max_ms: 350,
            multiplier: 2.0,
        };
        assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(350));
        assert_eq!(backoff.delay_for(40), Duration::from_millis(350));
    }

    #[test]
    fn test_retry_config_from_toml_like_json_uses_defaults() {
        let config: RetryConfig = serde_json::from_str(r#"{"max_retries": 4}"#).unwrap();
        assert_eq!(config.max_retries, 4);
        assert_eq!(config.fallback_stage, "planner");
        assert_eq!(config.context_window, ContextWindow::tool_caller());
    }

    #[test]
    fn test_provider_config_validation() {
        assert!(provider().validate().is_ok());

        let mut bad = provider();
        bad.endpoint = Some("ftp://example.com".to_string());
        assert!(bad.validate().is_err());

        let mut bad = provider();
        bad.requests_per_minute = 0;
        assert!(bad.validate().is_err());

        let mut bad = provider();
        bad.temperature = Some(3.5);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_provider_kind_serde() {
        let kind: ProviderKind = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(kind, ProviderKind::OpenAi);
        let kind: ProviderKind = serde_json::from_str("\"anthropic\"").unwrap();
        assert_eq!(kind, ProviderKind::Anthropic);
    }
}
