//! LLM provider implementations
//!
//! Concrete [`LanguageModel`](crate::LanguageModel) adapters for hosted chat
//! APIs, plus the shared error helpers they use.

pub mod anthropic;
pub mod openai;

pub use anthropic::{AnthropicClient, AnthropicModel};
pub use openai::{OpenAIChatModel, OpenAIClient};

use crate::LanguageModel;
use shiftdesk_core::{LlmError, ProviderConfig, ProviderKind, ShiftdeskError};
use std::sync::Arc;

pub(crate) fn request_failed(provider: &str, status: i32, message: impl Into<String>) -> ShiftdeskError {
    ShiftdeskError::Llm(LlmError::RequestFailed {
        provider: provider.to_string(),
        status,
        message: message.into(),
    })
}

pub(crate) fn rate_limited(provider: &str, retry_after_ms: i64) -> ShiftdeskError {
    ShiftdeskError::Llm(LlmError::RateLimited {
        provider: provider.to_string(),
        retry_after_ms,
    })
}

pub(crate) fn invalid_response(provider: &str, reason: impl Into<String>) -> ShiftdeskError {
    ShiftdeskError::Llm(LlmError::InvalidResponse {
        provider: provider.to_string(),
        reason: reason.into(),
    })
}

pub(crate) fn timed_out(provider: &str, timeout_ms: u64) -> ShiftdeskError {
    ShiftdeskError::Llm(LlmError::Timeout {
        provider: provider.to_string(),
        timeout_ms,
    })
}

pub(crate) fn parse_retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<i64> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<f64>().ok())
        .map(|seconds| (seconds * 1000.0) as i64)
}

/// Build the model described by `config`.
///
/// # Arguments
/// * `config` - Validated provider configuration
/// * `api_key` - Key read from the environment variable named in `config`
pub fn build_model(config: &ProviderConfig, api_key: impl Into<String>) -> Arc<dyn LanguageModel> {
    match config.provider_type {
        ProviderKind::OpenAi => {
            let mut client = OpenAIClient::new(api_key, config.requests_per_minute);
            if let Some(endpoint) = &config.endpoint {
                client = client.with_base_url(endpoint.clone());
            }
            Arc::new(
                OpenAIChatModel::new(client, config.model.clone())
                    .with_temperature(config.temperature)
                    .with_max_tokens(config.max_tokens),
            )
        }
        ProviderKind::Anthropic => {
            let mut client = AnthropicClient::new(api_key, config.requests_per_minute);
            if let Some(endpoint) = &config.endpoint {
                client = client.with_base_url(endpoint.clone());
            }
            let mut model = AnthropicModel::new(client, config.model.clone())
                .with_temperature(config.temperature);
            if let Some(max_tokens) = config.max_tokens {
                model = model.with_max_tokens(max_tokens);
            }
            Arc::new(model)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after_ms(&headers), None);
        headers.insert("retry-after", HeaderValue::from_static("1.5"));
        assert_eq!(parse_retry_after_ms(&headers), Some(1500));
    }

    #[test]
    fn test_build_model_uses_configured_model_id() {
        let config = ProviderConfig {
            provider_type: ProviderKind::Anthropic,
            model: "claude-3-5-haiku-latest".to_string(),
            endpoint: None,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            requests_per_minute: 50,
            temperature: None,
            max_tokens: Some(512),
        };
        let model = build_model(&config, "test-key");
        assert_eq!(model.model_id(), "claude-3-5-haiku-latest");

        let config = ProviderConfig {
            provider_type: ProviderKind::OpenAi,
            model: "gpt-4o-mini".to_string(),
            ..config
        };
        assert_eq!(build_model(&config, "test-key").model_id(), "gpt-4o-mini");
    }
}
