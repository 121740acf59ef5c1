//! HTTP fetcher implementation
//!
//! This module handles every request the harvester makes:
//! - Building the HTTP client with the client-level timeout
//! - Waiting on the shared rate limiter before a URL is fetched
//! - Bounded retries with exponential backoff between attempts
//! - Classifying failed attempts so the last concrete cause is reported
//!
//! # Retry Logic
//!
//! | Step | Behaviour |
//! |------|-----------|
//! | Rate limiter wait | Once per URL, 5s deadline. Expiry fails the URL without using an attempt |
//! | Attempt | Up to `max_retries` attempts, each under a 5s deadline |
//! | Failed attempt | Transport error, non-2xx status, body read error, or timeout |
//! | Backoff | `2^attempt` seconds between attempts (1s, 2s, 4s, ...), none after the last |
//! | Exhausted | `RetriesExhausted` carrying the last attempt's error |

use crate::harvest::limiter::RateLimiter;
use crate::ConfigError;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Deadline for obtaining a rate limiter token
pub const RATE_LIMIT_WAIT: Duration = Duration::from_secs(5);

/// Deadline for a single request attempt, body included
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Overall timeout configured on the HTTP client
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay after the first failed attempt; doubles after each further failure
pub const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Why a single request attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("received non-success status code {0}")]
    Status(u16),

    #[error("error reading response body: {0}")]
    BodyRead(String),
}

/// Terminal outcome of fetching one URL
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("rate limiter wait for {url} exceeded {deadline:?}")]
    RateLimitExceeded { url: String, deadline: Duration },

    #[error("giving up on {url} after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        last: AttemptError,
    },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::RateLimitExceeded { url, .. } => url,
            FetchError::RetriesExhausted { url, .. } => url,
        }
    }
}

/// Performs a single GET attempt
///
/// Implemented by [`HttpTransport`] for real traffic; tests substitute
/// scripted transports.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>, AttemptError>;
}

/// Builds the HTTP client used by [`HttpTransport`]
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("sumi-harvest/", env!("CARGO_PKG_VERSION")))
        .timeout(CLIENT_TIMEOUT)
        .connect_timeout(ATTEMPT_TIMEOUT)
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Transport`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Vec<u8>, AttemptError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AttemptError::Timeout(CLIENT_TIMEOUT)
            } else if e.is_connect() {
                AttemptError::Network(format!("connection failed: {}", e))
            } else {
                AttemptError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AttemptError::BodyRead(e.to_string()))?;

        Ok(body.to_vec())
    }
}

/// Timing and retry budget for [`ContentFetcher`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Number of request attempts per URL (at least 1)
    pub max_retries: u32,

    /// How long to wait for a rate limiter token
    pub rate_limit_wait: Duration,

    /// Deadline for each individual attempt
    pub attempt_timeout: Duration,

    /// Delay after the first failed attempt
    pub backoff_base: Duration,
}

impl FetchPolicy {
    /// Policy with the standard timings and the given retry budget
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            rate_limit_wait: RATE_LIMIT_WAIT,
            attempt_timeout: ATTEMPT_TIMEOUT,
            backoff_base: BACKOFF_BASE,
        }
    }

    /// Delay before the attempt following the failed attempt `attempt` (0-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Fetches URLs through the shared rate limiter with bounded retries
pub struct ContentFetcher<T: Transport> {
    transport: T,
    limiter: Arc<RateLimiter>,
    policy: FetchPolicy,
}

impl<T: Transport> ContentFetcher<T> {
    /// Creates a fetcher. A policy with `max_retries < 1` is rejected.
    pub fn new(
        transport: T,
        limiter: Arc<RateLimiter>,
        policy: FetchPolicy,
    ) -> Result<Self, ConfigError> {
        if policy.max_retries < 1 {
            return Err(ConfigError::Validation(format!(
                "max_retries must be >= 1, got {}",
                policy.max_retries
            )));
        }

        Ok(Self {
            transport,
            limiter,
            policy,
        })
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Fetches `url`, returning the response body
    ///
    /// Waits once on the rate limiter, then makes up to `max_retries`
    /// attempts. The first successful attempt returns immediately.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.limiter
            .wait(self.policy.rate_limit_wait)
            .await
            .map_err(|_| FetchError::RateLimitExceeded {
                url: url.to_string(),
                deadline: self.policy.rate_limit_wait,
            })?;

        let mut attempt = 0;
        loop {
            let error = match tokio::time::timeout(
                self.policy.attempt_timeout,
                self.transport.get(url),
            )
            .await
            {
                Ok(Ok(body)) => {
                    if attempt > 0 {
                        tracing::debug!("Fetched {} on attempt {}", url, attempt + 1);
                    }
                    return Ok(body);
                }
                Ok(Err(e)) => e,
                Err(_) => AttemptError::Timeout(self.policy.attempt_timeout),
            };

            attempt += 1;
            if attempt >= self.policy.max_retries {
                return Err(FetchError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    last: error,
                });
            }

            let delay = self.policy.backoff_delay(attempt - 1);
            tracing::debug!(
                "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                attempt,
                self.policy.max_retries,
                url,
                error,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}
