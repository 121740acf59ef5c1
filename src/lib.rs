//! Sumi-Harvest: a bounded, rate-limited content harvester
//!
//! This crate fetches a fixed set of URLs through a three-stage pipeline
//! (URL generation, rate-limited fetching with retries, field extraction),
//! records URLs that could not be fetched, and reports on the run.

pub mod config;
pub mod extract;
pub mod harvest;
pub mod output;

use thiserror::Error;

/// Main error type for Sumi-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("{stage} worker panicked: {message}")]
    WorkerPanicked { stage: &'static str, message: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Sumi-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::{Category, CategoryType, Config, DataField, FieldSelector};
pub use extract::{extract_html, extract_json, ExtractError};
pub use harvest::{
    ContentFetcher, FailureSet, FetchError, FetchPolicy, FetchedContent, Harvester, RateLimiter,
};
pub use output::{FieldSink, HarvestReport};
