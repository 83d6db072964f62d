use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info};

use crate::errors::AppError;
use crate::external::price_provider::PriceProvider;
use crate::models::TimeSeriesTable;
use crate::services::clock::Clock;
use crate::services::price_cache::PriceCache;

/// Loads daily history for a ticker from `start` through today, memoized
/// per ticker.
///
/// The fetch window is fixed at construction, so the ticker alone is the
/// cache key. Tickers are not validated here; whatever the caller passes goes
/// to the provider.
pub struct PriceLoader {
    provider: Arc<dyn PriceProvider>,
    cache: PriceCache,
    clock: Arc<dyn Clock>,
    start: NaiveDate,
}

impl PriceLoader {
    pub fn new(
        provider: Arc<dyn PriceProvider>,
        cache: PriceCache,
        clock: Arc<dyn Clock>,
        start: NaiveDate,
    ) -> Self {
        Self {
            provider,
            cache,
            clock,
            start,
        }
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    pub async fn load(&self, ticker: &str) -> Result<Arc<TimeSeriesTable>, AppError> {
        let now = self.clock.now();
        self.cache
            .get_or_fetch(ticker, now, || self.fetch(ticker, now.date_naive()))
            .await
    }

    async fn fetch(&self, ticker: &str, today: NaiveDate) -> Result<TimeSeriesTable, AppError> {
        info!(
            "Fetching {} from {} provider ({} to {})",
            ticker,
            self.provider.name(),
            self.start,
            today
        );

        let bars = self
            .provider
            .fetch_daily_history(ticker, self.start, today)
            .await
            .map_err(|e| {
                error!("✗ Failed to fetch price data for {}: {}", ticker, e);
                AppError::from(e)
            })?;

        let table = TimeSeriesTable::from_bars(ticker, bars);
        if table.is_empty() {
            error!("✗ No price data returned for {}", ticker);
            return Err(AppError::Fetch(format!(
                "no price data returned for {} between {} and {}",
                ticker, self.start, today
            )));
        }

        info!(
            "✓ Loaded {} rows for {} ({} to {})",
            table.len(),
            ticker,
            table.first_date().unwrap_or(self.start),
            table.last_date().unwrap_or(today)
        );
        Ok(table)
    }

    pub fn invalidate(&self, ticker: &str) -> bool {
        self.cache.invalidate(ticker)
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::price_provider::PriceProviderError;
    use crate::models::DailyBar;
    use crate::services::clock::FixedClock;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Records every request and serves bars (out of order, with a duplicate)
    /// for the business days in range.
    struct RecordingProvider {
        calls: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
        delay: Option<Duration>,
    }

    impl RecordingProvider {
        fn new() -> Self {
            Self { calls: Mutex::new(Vec::new()), delay: None }
        }

        fn with_delay(delay: Duration) -> Self {
            Self { calls: Mutex::new(Vec::new()), delay: Some(delay) }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl PriceProvider for RecordingProvider {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn fetch_daily_history(
            &self,
            ticker: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<DailyBar>, PriceProviderError> {
            self.calls.lock().push((ticker.to_string(), start, end));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if ticker == "UNKNOWN" {
                return Ok(Vec::new());
            }
            if ticker == "OFFLINE" {
                return Err(PriceProviderError::Network("connection refused".into()));
            }

            let mut bars = crate::external::mock_provider::generate_bars(ticker, start, end);
            bars.reverse();
            if let Some(first) = bars.first().cloned() {
                bars.push(first);
            }
            Ok(bars)
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn loader(provider: Arc<RecordingProvider>) -> PriceLoader {
        PriceLoader::new(
            provider,
            PriceCache::new(None),
            Arc::new(FixedClock::at_date(date(2020, 3, 31))),
            date(2020, 1, 1),
        )
    }

    #[tokio::test]
    async fn test_repeat_ticker_hits_cache() {
        let provider = Arc::new(RecordingProvider::new());
        let loader = loader(provider.clone());

        loader.load("^NDX").await.unwrap();
        loader.load("^NDX").await.unwrap();
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_two_tickers_interleaved_fetch_twice() {
        let provider = Arc::new(RecordingProvider::new());
        let loader = loader(provider.clone());

        loader.load("^NDX").await.unwrap();
        loader.load("^NDX").await.unwrap();
        loader.load("^NSEI").await.unwrap();
        loader.load("^NDX").await.unwrap();

        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_window_is_start_through_today() {
        let provider = Arc::new(RecordingProvider::new());
        let loader = loader(provider.clone());

        loader.load("^NSEI").await.unwrap();
        let calls = provider.calls.lock().clone();
        assert_eq!(calls, vec![("^NSEI".to_string(), date(2020, 1, 1), date(2020, 3, 31))]);
    }

    #[tokio::test]
    async fn test_output_is_sorted_without_duplicates() {
        let provider = Arc::new(RecordingProvider::new());
        let loader = loader(provider);

        let table = loader.load("^NDXT").await.unwrap();
        let dates = table.dates();
        assert!(!dates.is_empty());
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(table.ticker(), "^NDXT");
    }

    #[tokio::test]
    async fn test_empty_result_is_fetch_error_and_not_cached() {
        let provider = Arc::new(RecordingProvider::new());
        let loader = loader(provider.clone());

        assert!(matches!(loader.load("UNKNOWN").await, Err(AppError::Fetch(_))));
        assert!(matches!(loader.load("UNKNOWN").await, Err(AppError::Fetch(_))));
        assert_eq!(provider.call_count(), 2);
        assert!(loader.cache().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let provider = Arc::new(RecordingProvider::new());
        let loader = loader(provider);

        let err = loader.load("OFFLINE").await.unwrap_err();
        assert!(matches!(err, AppError::Fetch(ref msg) if msg.contains("connection refused")));
    }

    #[tokio::test]
    async fn test_invalidate_refetches() {
        let provider = Arc::new(RecordingProvider::new());
        let loader = loader(provider.clone());

        loader.load("^CNXIT").await.unwrap();
        assert!(loader.invalidate("^CNXIT"));
        loader.load("^CNXIT").await.unwrap();
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_fetch() {
        let provider = Arc::new(RecordingProvider::with_delay(Duration::from_millis(50)));
        let loader = Arc::new(loader(provider.clone()));

        let loads = (0..8).map(|_| {
            let loader = loader.clone();
            async move { loader.load("^NDX").await }
        });
        let results = futures::future::join_all(loads).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(provider.call_count(), 1);
    }
}
