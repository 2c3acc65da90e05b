/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for the supported LLM providers:
 * - OpenAI: chat completions API
 * - Anthropic: messages API
 * - Ollama: local LLM server
 * - Mock: deterministic provider for tests and dry runs
 *
 * Clients share rate limiting, status classification and the optional
 * client-side retry policy defined here.
 */

use async_trait::async_trait;
use log::warn;
use reqwest::StatusCode;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::errors::ProviderError;

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably in the translation service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;
}

/// Enforces a minimum interval between requests of one client
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Option<Duration>,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter for `rate_limit` requests per minute, `None` or 0 disables it
    pub fn new(rate_limit: Option<u32>) -> Self {
        let min_interval = rate_limit
            .filter(|rpm| *rpm > 0)
            .map(|rpm| Duration::from_millis(60_000 / rpm as u64));
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Option<Duration> {
        self.min_interval
    }

    /// Wait until the next request is allowed and record it
    pub async fn acquire(&self) {
        let Some(interval) = self.min_interval else {
            return;
        };

        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let next_allowed = previous + interval;
            let now = Instant::now();
            if next_allowed > now {
                tokio::time::sleep(next_allowed - now).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Client-side retry settings, no retries by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,

    /// Base backoff, doubled after each failed attempt
    pub backoff_base_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            max_retries,
            backoff_base_ms,
        }
    }

    /// Transient failures are worth another attempt, client errors are not
    pub fn is_retryable(error: &ProviderError) -> bool {
        match error {
            ProviderError::ConnectionError(_) | ProviderError::RateLimitExceeded(_) => true,
            ProviderError::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    /// Backoff before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(1u64 << shift))
    }

    /// Run `operation` until it succeeds, fails permanently or retries run out
    pub async fn run<T, F, Fut>(&self, provider_name: &str, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries && Self::is_retryable(&e) => {
                    attempt += 1;
                    warn!(
                        "{} request failed: {} - retrying ({}/{})",
                        provider_name, e, attempt, self.max_retries
                    );
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Map a non-success HTTP status to a provider error
pub fn classify_status(status: StatusCode, body: String) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(body),
        429 => ProviderError::RateLimitExceeded(body),
        code => ProviderError::ApiError {
            status_code: code,
            message: body,
        },
    }
}

/// Map a transport failure to a provider error
pub fn classify_request_error(provider_name: &str, error: reqwest::Error) -> ProviderError {
    if error.is_timeout() || error.is_connect() {
        ProviderError::ConnectionError(format!("{}: {}", provider_name, error))
    } else {
        ProviderError::RequestFailed(format!("{}: {}", provider_name, error))
    }
}

/// Build an HTTP client with the given request timeout
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    build_client(reqwest::Client::builder().timeout(Duration::from_secs(timeout_secs.max(1))))
}

/// Build a client, falling back to reqwest's defaults (and their timeouts) when the builder fails
fn build_client(builder: reqwest::ClientBuilder) -> reqwest::Client {
    builder.build().unwrap_or_else(|e| {
        warn!("Cannot build configured HTTP client, using defaults without request timeout: {}", e);
        reqwest::Client::new()
    })
}

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;
