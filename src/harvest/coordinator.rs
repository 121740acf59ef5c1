//! Harvest coordinator - wires the pipeline and runs it to completion
//!
//! Start and shutdown order:
//! 1. The URL source task, writing into a queue sized to the whole workload
//! 2. The fetch pool, reading that queue
//! 3. The process pool, reading the (still open) fetched-content queue
//! 4. Join the fetch pool, then close the fetched-content queue
//! 5. Join the URL source and the process pool
//!
//! The fetched-content queue is closed by dropping the coordinator's sender,
//! which is the last one alive once every fetch worker has returned. Process
//! workers therefore only see the end of their queue after all fetches are done.

use crate::config::{validate, Category, Config};
use crate::harvest::failures::FailureSet;
use crate::harvest::fetcher::{ContentFetcher, FetchPolicy, HttpTransport, Transport};
use crate::harvest::limiter::RateLimiter;
use crate::harvest::source::UrlSource;
use crate::harvest::worker::{
    fetch_worker, process_worker, FetchWorkerStats, ProcessWorkerStats,
};
use crate::harvest::FetchedContent;
use crate::output::{FieldSink, HarvestReport, LoggingSink};
use crate::HarvestError;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinError, JoinHandle};

/// Runs the harvest pipeline for one configuration
pub struct Harvester<T: Transport = HttpTransport> {
    config: Arc<Config>,
    categories: Arc<[Category]>,
    fetcher: Arc<ContentFetcher<T>>,
    sink: Arc<dyn FieldSink>,
}

impl Harvester<HttpTransport> {
    /// Creates a harvester that fetches over HTTP with the standard timings
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let transport = HttpTransport::new()?;
        let policy = FetchPolicy::new(config.max_retries);
        Self::with_transport(config, transport, policy)
    }
}

impl<T: Transport + 'static> Harvester<T> {
    /// Creates a harvester with a custom transport and fetch policy
    ///
    /// The configuration is validated here as well, so hand-built configs get
    /// the same startup checks as loaded ones. The attempt budget always comes
    /// from `config.max_retries`; the policy only supplies timings.
    pub fn with_transport(
        config: Config,
        transport: T,
        policy: FetchPolicy,
    ) -> Result<Self, HarvestError> {
        validate(&config)?;

        if policy.max_retries != config.max_retries {
            tracing::debug!(
                "Overriding policy max_retries {} with configured {}",
                policy.max_retries,
                config.max_retries
            );
        }
        let policy = FetchPolicy {
            max_retries: config.max_retries,
            ..policy
        };

        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit_per_second,
            config.burst_limit,
        )?);
        let fetcher = ContentFetcher::new(transport, limiter, policy)?;
        let categories: Arc<[Category]> = config.categories.clone().into();

        Ok(Self {
            config: Arc::new(config),
            categories,
            fetcher: Arc::new(fetcher),
            sink: Arc::new(LoggingSink),
        })
    }

    /// Replaces the default logging sink for extracted fields
    pub fn with_sink(mut self, sink: Arc<dyn FieldSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs every work item through the pipeline and reports the outcome
    ///
    /// Per-URL and per-field failures never fail the run; only a panicking
    /// worker does, after all pools have been joined. Each call starts with an
    /// empty failure set, so repeated runs report independently.
    pub async fn run(&self) -> Result<HarvestReport, HarvestError> {
        let started_at = Utc::now();
        let total = self.config.link_count;
        // Channels need a non-zero capacity even for an empty workload
        let capacity = total.max(1);
        let failures = Arc::new(FailureSet::new());

        tracing::info!(
            "Starting harvest: {} work items, {} fetch workers, {} process workers",
            total,
            self.config.fetch_worker_count,
            self.config.process_worker_count
        );

        let (url_tx, url_rx) = mpsc::channel::<String>(capacity);
        let (content_tx, content_rx) = mpsc::channel::<FetchedContent>(capacity);
        let url_rx = Arc::new(Mutex::new(url_rx));
        let content_rx = Arc::new(Mutex::new(content_rx));

        // 1. Producer
        let source = UrlSource::new(&self.config.base_url, total);
        let producer = tokio::spawn(source.run(url_tx));

        // 2. Fetch pool
        let fetchers: Vec<JoinHandle<FetchWorkerStats>> = (0..self.config.fetch_worker_count)
            .map(|id| {
                tokio::spawn(fetch_worker(
                    id,
                    Arc::clone(&self.fetcher),
                    Arc::clone(&url_rx),
                    content_tx.clone(),
                    Arc::clone(&failures),
                ))
            })
            .collect();

        // 3. Process pool
        let processors: Vec<JoinHandle<ProcessWorkerStats>> = (0..self.config.process_worker_count)
            .map(|id| {
                tokio::spawn(process_worker(
                    id,
                    Arc::clone(&self.categories),
                    Arc::clone(&content_rx),
                    Arc::clone(&self.sink),
                ))
            })
            .collect();

        let mut first_panic: Option<HarvestError> = None;

        // 4. Join fetchers, then close the output queue
        let mut fetch_stats = FetchWorkerStats::default();
        for handle in fetchers {
            match handle.await {
                Ok(stats) => fetch_stats += stats,
                Err(e) => record_panic(&mut first_panic, "fetch", e),
            }
        }
        drop(content_tx);
        tracing::info!(
            "Fetch stage finished ({} fetched, {} failed), closing content queue",
            fetch_stats.fetched,
            fetch_stats.failed
        );

        // 5. Join producer and processors
        let generated = match producer.await {
            Ok(sent) => sent,
            Err(e) => {
                record_panic(&mut first_panic, "url source", e);
                0
            }
        };

        let mut process_stats = ProcessWorkerStats::default();
        for handle in processors {
            match handle.await {
                Ok(stats) => process_stats += stats,
                Err(e) => record_panic(&mut first_panic, "process", e),
            }
        }
        tracing::info!(
            "Process stage finished ({} items, {} fields extracted, {} field errors)",
            process_stats.processed,
            process_stats.fields_extracted,
            process_stats.field_errors
        );

        if let Some(err) = first_panic {
            tracing::error!("Harvest aborted: {}", err);
            return Err(err);
        }

        let report = HarvestReport {
            total,
            generated,
            delivered: process_stats.processed,
            failed_urls: failures.urls(),
            fields_extracted: process_stats.fields_extracted,
            field_errors: process_stats.field_errors,
            started_at,
            finished_at: Utc::now(),
        };

        if !report.is_consistent() {
            tracing::warn!(
                "Outcome mismatch: {} delivered + {} failed != {} work items",
                report.delivered,
                report.failed_urls.len(),
                report.total
            );
        }

        tracing::info!(
            "Harvest complete: {} delivered, {} failed",
            report.delivered,
            report.failed_urls.len()
        );

        Ok(report)
    }
}

/// Keeps the first worker panic; later ones are only logged
fn record_panic(slot: &mut Option<HarvestError>, stage: &'static str, error: JoinError) {
    tracing::error!("{} worker terminated abnormally: {}", stage, error);
    if slot.is_none() {
        *slot = Some(HarvestError::WorkerPanicked {
            stage,
            message: error.to_string(),
        });
    }
}
