use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::DailyBar;

#[derive(Debug, Error)]
pub enum PriceProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no data found for ticker")]
    NotFound,

    #[error("rate limited")]
    RateLimited,
}

/// Source of daily OHLCV history.
///
/// Implementations return bars in ascending date order restricted to
/// `[start, end]`. Symbols are passed through untouched; an unknown symbol is
/// reported by the upstream source, not validated here.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, PriceProviderError>;
}
