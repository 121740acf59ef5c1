use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// URLs that could not be fetched
///
/// Insert-only and safe to share between workers. Entries are never removed;
/// contents are meant to be read after the fetch pool has finished.
#[derive(Debug, Default)]
pub struct FailureSet {
    urls: Mutex<HashSet<String>>,
}

impl FailureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failed URL. Returns `false` if it was already recorded.
    pub fn add(&self, url: impl Into<String>) -> bool {
        self.lock().insert(url.into())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.lock().contains(url)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of the recorded URLs, sorted for stable reporting
    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.lock().iter().cloned().collect();
        urls.sort();
        urls
    }

    // A panic elsewhere while holding the lock cannot leave the set half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.urls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
