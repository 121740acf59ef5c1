//! Field extraction
//!
//! This module turns fetched bodies into named values:
//! - CSS selector evaluation over HTML documents
//! - Dot-path evaluation over JSON documents
//! - Applying configured categories to a fetched item

mod html;
mod json;
mod rules;

pub use html::extract_html;
pub use json::extract_json;
pub use rules::{process_content, ProcessOutcome};

use crate::config::CategoryType;
use thiserror::Error;

/// Errors local to a single field extraction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("json path is empty")]
    EmptyPath,

    #[error("json path not found: {0}")]
    PathNotFound(String),

    #[error("invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("field '{field}' cannot be extracted from a {expected} category")]
    SelectorMismatch {
        field: String,
        expected: CategoryType,
    },
}
