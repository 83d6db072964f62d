use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::DailyBar;

/// Daily history for one ticker.
///
/// Always sorted ascending by date with at most one bar per date, whatever
/// order the source delivered rows in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesTable {
    ticker: String,
    bars: Vec<DailyBar>,
}

impl TimeSeriesTable {
    /// Normalize raw provider rows: drop non-finite closes, sort by date and
    /// keep the first row seen for each date.
    pub fn from_bars(ticker: impl Into<String>, bars: Vec<DailyBar>) -> Self {
        let mut seen = HashSet::new();
        let mut bars: Vec<DailyBar> = bars
            .into_iter()
            .filter(|b| b.close.is_finite())
            .filter(|b| seen.insert(b.date))
            .collect();

        // Stable, so equal dates cannot reorder (and there are none left)
        bars.sort_by_key(|b| b.date);

        Self {
            ticker: ticker.into(),
            bars,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Last `n` bars (all of them when `n` exceeds the length).
    pub fn tail(&self, n: usize) -> &[DailyBar] {
        &self.bars[self.bars.len().saturating_sub(n)..]
    }
}
