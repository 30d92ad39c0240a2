//! OpenAI client configuration with sensible defaults.

use crate::error::{ReelError, Result};
use async_openai::{config::OpenAIConfig, Client};
use backoff::exponential::ExponentialBackoffBuilder;
use backoff::SystemClock;
use std::time::Duration;

/// Default timeout for OpenAI API requests (2 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Create an OpenAI client with configured timeout.
///
/// The API key is read from `OPENAI_API_KEY` when the first request is made.
pub fn create_client() -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    create_client_with_config(OpenAIConfig::default(), timeout)
}

/// Create a client for an explicit config (API base, key).
///
/// The client's built-in rate-limit backoff is disabled: every failure is
/// returned on the first response so that `retry::retry` alone decides.
pub fn create_client_with_config(config: OpenAIConfig, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ReelError::Config(format!("Failed to create HTTP client: {}", e)))?;
    let single_attempt = ExponentialBackoffBuilder::<SystemClock>::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build();

    Ok(Client::with_config(config)
        .with_http_client(http_client)
        .with_backoff(single_attempt))
}

/// Check if the OpenAI API key is configured.
pub fn is_api_key_configured() -> bool {
    std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.trim().is_empty())
}
