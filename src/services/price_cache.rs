use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::errors::AppError;
use crate::models::TimeSeriesTable;

/// A fetched table and when it was fetched.
#[derive(Debug, Clone)]
pub struct CachedSeries {
    pub table: Arc<TimeSeriesTable>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheStats {
    lookups: AtomicU64,
    fetches: AtomicU64,
}

/// Thread-safe per-ticker memo of downloaded price history.
///
/// Each ticker maps to a `OnceCell`, so concurrent requests for the same
/// uncached ticker share a single fetch. Failed fetches leave the cell empty
/// and the next request tries again. Without a TTL entries live until they
/// are invalidated or the process exits.
#[derive(Clone)]
pub struct PriceCache {
    entries: Arc<DashMap<String, Arc<OnceCell<CachedSeries>>>>,
    ttl: Option<Duration>,
    stats: Arc<CacheStats>,
}

impl PriceCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
            stats: Arc::new(CacheStats::default()),
        }
    }

    fn cell_for(&self, ticker: &str) -> Arc<OnceCell<CachedSeries>> {
        self.entries
            .entry(ticker.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    fn is_fresh(&self, entry: &CachedSeries, now: DateTime<Utc>) -> bool {
        match self.ttl {
            Some(ttl) => now < entry.fetched_at + ttl,
            None => true,
        }
    }

    /// Return the cached table for `ticker`, running `fetch` only when there
    /// is no fresh entry.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        ticker: &str,
        now: DateTime<Utc>,
        fetch: F,
    ) -> Result<Arc<TimeSeriesTable>, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TimeSeriesTable, AppError>>,
    {
        self.stats.lookups.fetch_add(1, Ordering::Relaxed);

        let cell = self.cell_for(ticker);
        let expired = match cell.get() {
            Some(entry) if self.is_fresh(entry, now) => {
                debug!("Cache hit for {} (fetched at {})", ticker, entry.fetched_at);
                return Ok(entry.table.clone());
            }
            Some(_) => true,
            None => false,
        };

        let cell = if expired {
            debug!("Cache entry for {} expired, refetching", ticker);
            // Only drop the cell we looked at; a concurrent refresh may have replaced it
            self.entries.remove_if(ticker, |_, current| Arc::ptr_eq(current, &cell));
            self.cell_for(ticker)
        } else {
            cell
        };

        let result = cell
            .get_or_try_init(|| async {
                self.stats.fetches.fetch_add(1, Ordering::Relaxed);
                let table = fetch().await?;
                Ok::<_, AppError>(CachedSeries {
                    table: Arc::new(table),
                    fetched_at: now,
                })
            })
            .await;

        match result {
            Ok(entry) => Ok(entry.table.clone()),
            Err(e) => {
                // Don't keep empty cells around for tickers that failed
                self.entries
                    .remove_if(ticker, |_, current| Arc::ptr_eq(current, &cell) && !current.initialized());
                Err(e)
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, ticker: &str) -> Option<CachedSeries> {
        self.entries.get(ticker).and_then(|cell| cell.value().get().cloned())
    }

    /// Drop the entry for `ticker`. Returns whether a table was cached.
    pub fn invalidate(&self, ticker: &str) -> bool {
        self.entries
            .remove(ticker)
            .map(|(_, cell)| cell.initialized())
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of tickers with a cached table.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value().initialized()).count()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of times a fetch was started.
    pub fn fetch_count(&self) -> u64 {
        self.stats.fetches.load(Ordering::Relaxed)
    }

    pub fn hit_count(&self) -> u64 {
        self.stats
            .lookups
            .load(Ordering::Relaxed)
            .saturating_sub(self.fetch_count())
    }
}
