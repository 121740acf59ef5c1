//! End-of-run report
//!
//! This module provides the summary a harvest run returns and the console
//! rendering printed by the binary.

use chrono::{DateTime, Utc};

/// Outcome of a completed harvest run
#[derive(Debug, Clone)]
pub struct HarvestReport {
    /// Configured number of work items
    pub total: usize,

    /// Work items actually emitted by the URL source
    pub generated: usize,

    /// Items that reached the process stage
    pub delivered: usize,

    /// URLs that failed permanently, sorted
    pub failed_urls: Vec<String>,

    /// Field values handed to the sink
    pub fields_extracted: usize,

    /// Field extractions that failed
    pub field_errors: usize,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl HarvestReport {
    /// Whether every work item ended up either delivered or failed, never both
    pub fn is_consistent(&self) -> bool {
        self.generated == self.total && self.delivered + self.failed_urls.len() == self.total
    }

    /// Wall-clock duration of the run
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Percentage of work items delivered
    pub fn success_rate(&self) -> f64 {
        if self.total > 0 {
            (self.delivered as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Prints the report to stdout in a formatted manner
pub fn print_report(report: &HarvestReport) {
    println!("=== Harvest Report ===\n");

    println!("Overview:");
    println!("  Work items: {}", report.total);
    println!("  Delivered: {}", report.delivered);
    println!("  Failed: {}", report.failed_urls.len());
    println!("  Fields extracted: {}", report.fields_extracted);
    println!("  Field errors: {}", report.field_errors);
    println!(
        "  Duration: {:.1}s",
        report.duration().num_milliseconds() as f64 / 1000.0
    );
    println!();

    if report.failed_urls.is_empty() {
        println!("No failed URLs");
    } else {
        println!("Failed URLs ({}):", report.failed_urls.len());
        for url in &report.failed_urls {
            println!("  - {}", url);
        }
    }
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} work items delivered)",
        report.success_rate(),
        report.delivered,
        report.total
    );
}
