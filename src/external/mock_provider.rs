use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::external::price_provider::{PriceProvider, PriceProviderError};
use crate::models::DailyBar;

/// Deterministic random-walk prices on weekdays, seeded from the ticker.
///
/// Useful for demos and for running the dashboard without network access.
pub struct MockPriceProvider;

fn seed_for(ticker: &str) -> u64 {
    ticker
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |acc, b| (acc ^ b as u64).wrapping_mul(0x0100_0000_01b3))
}

pub fn generate_bars(ticker: &str, start: NaiveDate, end: NaiveDate) -> Vec<DailyBar> {
    let seed = seed_for(ticker);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut current = 1_000.0 + (seed % 9_000) as f64;

    let mut bars = Vec::new();
    let mut date = start;
    while date <= end {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            let open = current;
            current *= 1.0 + (rng.random::<f64>() - 0.5) * 0.02;
            let spread = current * rng.random::<f64>() * 0.005;

            bars.push(DailyBar {
                date,
                open,
                high: open.max(current) + spread,
                low: open.min(current) - spread,
                close: current,
                volume: rng.random_range(1_000_000.0..5_000_000.0_f64).round(),
            });
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    bars
}

#[async_trait]
impl PriceProvider for MockPriceProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, PriceProviderError> {
        let bars = generate_bars(ticker, start, end);
        if bars.is_empty() {
            return Err(PriceProviderError::NotFound);
        }
        Ok(bars)
    }
}
