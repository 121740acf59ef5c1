//! Harvest pipeline
//!
//! This module contains the concurrent pipeline:
//! - Deterministic work-item generation
//! - A global token-bucket rate limiter
//! - HTTP fetching with bounded retries and exponential backoff
//! - Fetch and process worker pools joined over hand-off queues
//! - The set of URLs that failed permanently
//! - Overall run coordination

mod coordinator;
mod failures;
mod fetcher;
mod limiter;
mod source;
mod worker;

pub use coordinator::Harvester;
pub use failures::FailureSet;
pub use fetcher::{
    build_http_client, AttemptError, ContentFetcher, FetchError, FetchPolicy, HttpTransport,
    Transport, ATTEMPT_TIMEOUT, BACKOFF_BASE, CLIENT_TIMEOUT, RATE_LIMIT_WAIT,
};
pub use limiter::{RateLimitExceeded, RateLimiter};
pub use source::{generate_urls, UrlSource};
pub use worker::{FetchWorkerStats, ProcessWorkerStats};

/// A successfully fetched page body, owned by whichever stage holds it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedContent {
    pub url: String,
    pub body: Vec<u8>,
}
