//! Configuration module for Sumi-Harvest
//!
//! This module handles loading, parsing, and validating harvest configuration
//! files. Files ending in `.toml` are parsed as TOML; anything else is parsed
//! as JSON.
//!
//! # Example
//!
//! ```no_run
//! use sumi_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.json")).unwrap();
//! println!("Harvesting {} links", config.link_count);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Category, CategoryType, Config, DataField, FieldSelector, DEFAULT_BASE_URL};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config, ConfigFormat,
};
pub use validation::validate;
pub(crate) use validation::validate_rate_limit;
