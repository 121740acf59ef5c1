//! Output module for extracted fields and run reports
//!
//! This module handles:
//! - The sink interface extracted field values are handed to
//! - Logging and in-memory sink implementations
//! - The end-of-run report and its console rendering

pub mod stats;
mod traits;

pub use stats::{print_report, HarvestReport};
pub use traits::{ExtractedField, FieldSink, LoggingSink, MemorySink};
