//! Field sink trait and bundled implementations
//!
//! A [`FieldSink`] receives every value the process stage extracts. It is the
//! place to add persistence without touching the pipeline itself.

use std::sync::{Mutex, PoisonError};

/// Receives extracted field values
///
/// Called concurrently from every process worker, so implementations must be
/// internally synchronized. Sinks cannot fail the pipeline; an implementation
/// that writes somewhere fallible should log its own errors.
pub trait FieldSink: Send + Sync {
    fn on_field_extracted(&self, url: &str, category_id: &str, field_name: &str, value: &str);
}

/// Writes each extracted field as a structured log event
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

impl FieldSink for LoggingSink {
    fn on_field_extracted(&self, url: &str, category_id: &str, field_name: &str, value: &str) {
        tracing::info!(
            url = url,
            category = category_id,
            field = field_name,
            "[process] {}: {}",
            field_name,
            value
        );
    }
}

/// One extracted value, as recorded by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedField {
    pub url: String,
    pub category_id: String,
    pub field_name: String,
    pub value: String,
}

/// Keeps every extracted field in memory, in arrival order
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<ExtractedField>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn records(&self) -> Vec<ExtractedField> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FieldSink for MemorySink {
    fn on_field_extracted(&self, url: &str, category_id: &str, field_name: &str, value: &str) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ExtractedField {
                url: url.to_string(),
                category_id: category_id.to_string(),
                field_name: field_name.to_string(),
                value: value.to_string(),
            });
    }
}
