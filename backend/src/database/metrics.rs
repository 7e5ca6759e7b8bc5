//! Request-scoped storage call statistics.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Snapshot of the storage calls issued while serving one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub query_count: u32,
    pub max_time_ms: u64,
    pub max_query: Option<String>,
}

/// Handle to the statistics of a single request.
///
/// Created once per request and passed down to every storage handle the
/// request opens. Clones share the same counters so concurrent
/// sub-operations of the same request record into one place.
#[derive(Debug, Clone, Default)]
pub struct RequestMetrics {
    inner: Arc<Mutex<QueryStats>>,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one storage call and its latency.
    pub fn record(&self, query: &str, elapsed: Duration) {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let mut stats = self.lock();

        stats.query_count += 1;
        if stats.max_query.is_none() || elapsed_ms > stats.max_time_ms {
            stats.max_time_ms = elapsed_ms;
            stats.max_query = Some(query.to_string());
        }
    }

    pub fn snapshot(&self) -> QueryStats {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, QueryStats> {
        // Counters stay meaningful even if a recording thread panicked.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
