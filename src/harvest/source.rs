//! Work-item source
//!
//! Produces the fixed, reproducible sequence of URLs a run harvests. Even
//! indices map to product pages, odd indices to entity documents:
//!
//! ```text
//! {base}/product-0.html
//! {base}/entity-1-11.json      (for a count of 10)
//! {base}/product-2.html
//! ...
//! ```

use tokio::sync::mpsc;

/// Builds the URL for work item `index` out of `count`
fn work_item_url(base_url: &str, index: usize, count: usize) -> String {
    if index % 2 == 0 {
        format!("{}/product-{}.html", base_url, index)
    } else {
        format!("{}/entity-{}-{}.json", base_url, index, index + count)
    }
}

/// Returns the complete work-item sequence for `count` items
///
/// # Example
///
/// ```
/// use sumi_harvest::harvest::generate_urls;
///
/// let urls = generate_urls("http://example.com", 2);
/// assert_eq!(urls, vec![
///     "http://example.com/product-0.html".to_string(),
///     "http://example.com/entity-1-3.json".to_string(),
/// ]);
/// ```
pub fn generate_urls(base_url: &str, count: usize) -> Vec<String> {
    let base_url = base_url.trim_end_matches('/');
    (0..count)
        .map(|index| work_item_url(base_url, index, count))
        .collect()
}

/// Producer task feeding the fetch stage
#[derive(Debug, Clone)]
pub struct UrlSource {
    base_url: String,
    count: usize,
}

impl UrlSource {
    pub fn new(base_url: &str, count: usize) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            count,
        }
    }

    /// Number of work items this source emits
    pub fn count(&self) -> usize {
        self.count
    }

    /// Sends every work item into `output`, then closes it by dropping the sender.
    ///
    /// Returns the number of items sent. Sending only stops early if every
    /// receiver is gone.
    pub async fn run(self, output: mpsc::Sender<String>) -> usize {
        tracing::info!("Starting URL generation ({} work items)", self.count);

        let mut sent = 0;
        for index in 0..self.count {
            let url = work_item_url(&self.base_url, index, self.count);
            tracing::debug!("Generated URL: {}", url);
            if output.send(url).await.is_err() {
                tracing::warn!(
                    "URL queue closed by consumers after {} of {} items",
                    sent,
                    self.count
                );
                break;
            }
            sent += 1;
        }

        tracing::info!("Finished generating URLs, closing queue");
        sent
    }
}
