//! Fetch and process worker loops
//!
//! Workers of one pool share a single receiver behind an async mutex; the lock
//! is held only while waiting for the next item, so each item is handed to
//! exactly one worker.

use crate::config::Category;
use crate::extract::process_content;
use crate::harvest::failures::FailureSet;
use crate::harvest::fetcher::{ContentFetcher, Transport};
use crate::harvest::FetchedContent;
use crate::output::FieldSink;
use std::ops::AddAssign;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Multi-consumer end of a hand-off queue
pub(crate) type SharedReceiver<T> = Arc<Mutex<mpsc::Receiver<T>>>;

/// Takes the next item, or `None` once the queue is closed and drained
async fn next_item<T>(queue: &SharedReceiver<T>) -> Option<T> {
    queue.lock().await.recv().await
}

/// Counters returned by a fetch worker when its input is exhausted
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchWorkerStats {
    /// URLs handed to the process stage
    pub fetched: usize,
    /// URLs recorded in the failure set
    pub failed: usize,
}

impl AddAssign for FetchWorkerStats {
    fn add_assign(&mut self, other: Self) {
        self.fetched += other.fetched;
        self.failed += other.failed;
    }
}

/// Counters returned by a process worker when its input is exhausted
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessWorkerStats {
    /// Fetched items received from the fetch stage
    pub processed: usize,
    pub fields_extracted: usize,
    pub field_errors: usize,
}

impl AddAssign for ProcessWorkerStats {
    fn add_assign(&mut self, other: Self) {
        self.processed += other.processed;
        self.fields_extracted += other.fields_extracted;
        self.field_errors += other.field_errors;
    }
}

/// Drains `urls`, fetching each one and routing it to `output` or `failures`
///
/// A failed URL never stops the worker.
pub(crate) async fn fetch_worker<T: Transport>(
    id: usize,
    fetcher: Arc<ContentFetcher<T>>,
    urls: SharedReceiver<String>,
    output: mpsc::Sender<FetchedContent>,
    failures: Arc<FailureSet>,
) -> FetchWorkerStats {
    let mut stats = FetchWorkerStats::default();

    while let Some(url) = next_item(&urls).await {
        tracing::debug!("[fetch-{}] Fetching URL: {}", id, url);

        match fetcher.fetch(&url).await {
            Ok(body) => {
                let size = body.len();
                // Blocks while the output queue is full
                if let Err(mpsc::error::SendError(content)) =
                    output.send(FetchedContent { url, body }).await
                {
                    // Every process worker is gone; the item can no longer be delivered
                    tracing::error!(
                        "[fetch-{}] Output queue closed, recording {} as failed",
                        id,
                        content.url
                    );
                    failures.add(content.url);
                    stats.failed += 1;
                    continue;
                }
                tracing::debug!("[fetch-{}] Fetched {} bytes", id, size);
                stats.fetched += 1;
            }
            Err(e) => {
                tracing::warn!("[fetch-{}] Error fetching URL {}: {}", id, url, e);
                failures.add(url);
                stats.failed += 1;
            }
        }
    }

    tracing::debug!(
        "[fetch-{}] Input exhausted ({} fetched, {} failed)",
        id,
        stats.fetched,
        stats.failed
    );
    stats
}

/// Drains `input`, running extraction rules over each fetched item
pub(crate) async fn process_worker(
    id: usize,
    categories: Arc<[Category]>,
    input: SharedReceiver<FetchedContent>,
    sink: Arc<dyn FieldSink>,
) -> ProcessWorkerStats {
    let mut stats = ProcessWorkerStats::default();

    while let Some(content) = next_item(&input).await {
        tracing::debug!("[process-{}] Processing URL: {}", id, content.url);

        let outcome = process_content(&categories, &content, sink.as_ref());
        stats.processed += 1;
        stats.fields_extracted += outcome.extracted;
        stats.field_errors += outcome.errors;
    }

    tracing::debug!(
        "[process-{}] Input exhausted ({} items processed)",
        id,
        stats.processed
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CategoryType, DataField, FieldSelector};
    use crate::harvest::fetcher::{AttemptError, FetchPolicy};
    use crate::harvest::limiter::RateLimiter;
    use crate::output::MemorySink;
    use async_trait::async_trait;

    /// Fails every URL containing "bad", echoes the URL otherwise
    struct EchoTransport;

    #[async_trait]
    impl Transport for EchoTransport {
        async fn get(&self, url: &str) -> Result<Vec<u8>, AttemptError> {
            if url.contains("bad") {
                Err(AttemptError::Status(404))
            } else {
                Ok(url.as_bytes().to_vec())
            }
        }
    }

    fn shared<T>(rx: mpsc::Receiver<T>) -> SharedReceiver<T> {
        Arc::new(Mutex::new(rx))
    }

    #[tokio::test]
    async fn test_fetch_worker_routes_success_and_failure() {
        let limiter = Arc::new(RateLimiter::new(1000.0, 100).unwrap());
        let fetcher =
            Arc::new(ContentFetcher::new(EchoTransport, limiter, FetchPolicy::new(1)).unwrap());
        let failures = Arc::new(FailureSet::new());

        let (url_tx, url_rx) = mpsc::channel(3);
        let (out_tx, mut out_rx) = mpsc::channel(3);
        for url in ["http://a/good.html", "http://a/bad.html", "http://a/fine.json"] {
            url_tx.send(url.to_string()).await.unwrap();
        }
        drop(url_tx);

        let stats = fetch_worker(0, fetcher, shared(url_rx), out_tx, Arc::clone(&failures)).await;

        assert_eq!(stats, FetchWorkerStats { fetched: 2, failed: 1 });
        assert_eq!(failures.urls(), vec!["http://a/bad.html"]);

        let mut delivered = Vec::new();
        while let Some(content) = out_rx.recv().await {
            delivered.push(content.url);
        }
        assert_eq!(delivered, vec!["http://a/good.html", "http://a/fine.json"]);
    }

    #[tokio::test]
    async fn test_fetch_worker_records_undeliverable_items() {
        let limiter = Arc::new(RateLimiter::new(1000.0, 100).unwrap());
        let fetcher =
            Arc::new(ContentFetcher::new(EchoTransport, limiter, FetchPolicy::new(1)).unwrap());
        let failures = Arc::new(FailureSet::new());

        let (url_tx, url_rx) = mpsc::channel(1);
        let (out_tx, out_rx) = mpsc::channel(1);
        drop(out_rx);
        url_tx.send("http://a/good.html".to_string()).await.unwrap();
        drop(url_tx);

        let stats = fetch_worker(0, fetcher, shared(url_rx), out_tx, Arc::clone(&failures)).await;

        assert_eq!(stats, FetchWorkerStats { fetched: 0, failed: 1 });
        assert!(failures.contains("http://a/good.html"));
    }

    #[tokio::test]
    async fn test_process_worker_drains_queue() {
        let categories: Arc<[Category]> = vec![Category {
            id: "productPage".to_string(),
            name: "product".to_string(),
            path: "/product-{slug}.html".to_string(),
            kind: CategoryType::Html,
            data_fields: vec![DataField {
                field_name: "heading".to_string(),
                selector: FieldSelector::Css {
                    selector: "h1".to_string(),
                    attribute: None,
                },
            }],
        }]
        .into();
        let sink = Arc::new(MemorySink::new());

        let (tx, rx) = mpsc::channel(2);
        for i in 0..2 {
            tx.send(FetchedContent {
                url: format!("http://a/product-{}.html", i),
                body: format!("<h1>Product {}</h1>", i).into_bytes(),
            })
            .await
            .unwrap();
        }
        drop(tx);

        let stats = process_worker(0, categories, shared(rx), sink.clone()).await;

        assert_eq!(
            stats,
            ProcessWorkerStats {
                processed: 2,
                fields_extracted: 2,
                field_errors: 0,
            }
        );
        let mut values: Vec<String> = sink.records().into_iter().map(|r| r.value).collect();
        values.sort();
        assert_eq!(values, vec!["Product 0", "Product 1"]);
    }
}
