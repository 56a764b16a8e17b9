//! Anthropic HTTP client with rate limiting

use super::types::ApiError;
use crate::providers::{invalid_response, parse_retry_after_ms, rate_limited, request_failed, timed_out};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shiftdesk_core::ShiftdeskResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

const PROVIDER: &str = "anthropic";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Anthropic API client with rate limiting.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    request_timeout: Duration,
    rate_limiter: Arc<Semaphore>,
    last_request: Arc<AtomicU64>,
    min_request_interval_ms: u64,
    start_time: Instant,
}

impl AnthropicClient {
    /// Create a new Anthropic client.
    ///
    /// # Arguments
    /// * `api_key` - Anthropic API key
    /// * `requests_per_minute` - Maximum requests per minute
    pub fn new(api_key: impl Into<String>, requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        let min_interval_ms = (60_000 / rpm as u64).max(10);

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            rate_limiter: Arc::new(Semaphore::new(rpm as usize)),
            last_request: Arc::new(AtomicU64::new(0)),
            min_request_interval_ms: min_interval_ms,
            start_time: Instant::now(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make an API request with automatic rate limiting.
    pub async fn request<Req: Serialize, Res: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Req,
    ) -> ShiftdeskResult<Res> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| request_failed(PROVIDER, 0, format!("Rate limiter error: {}", e)))?;

        // Enforce minimum interval between requests
        let now_ms = self.start_time.elapsed().as_millis() as u64;
        let last_ms = self.last_request.load(Ordering::Relaxed);
        let elapsed = now_ms.saturating_sub(last_ms);

        if last_ms > 0 && elapsed < self.min_request_interval_ms {
            let wait_ms = self.min_request_interval_ms - elapsed;
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
        }

        self.last_request
            .store(self.start_time.elapsed().as_millis() as u64, Ordering::Relaxed);

        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .timeout(self.request_timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    timed_out(PROVIDER, self.request_timeout.as_millis() as u64)
                } else {
                    request_failed(PROVIDER, 0, format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        let retry_after_ms = parse_retry_after_ms(response.headers()).unwrap_or(0);

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| invalid_response(PROVIDER, format!("Failed to parse response: {}", e)))
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let error_msg = match serde_json::from_str::<ApiError>(&error_text) {
                Ok(api_error) => format!("{}: {}", api_error.error.r#type, api_error.error.message),
                Err(_) => error_text,
            };

            Err(match status {
                StatusCode::TOO_MANY_REQUESTS => rate_limited(PROVIDER, retry_after_ms),
                _ => request_failed(PROVIDER, status.as_u16() as i32, error_msg),
            })
        }
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_api_key() {
        let client = AnthropicClient::new("sk-ant-secret", 50);
        let debug = format!("{:?}", client);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-ant-secret"));
        assert!(debug.contains("api.anthropic.com"));
    }
}
