use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::DailyBar;

/// Share of rows that go to the training partition.
pub const TRAIN_FRACTION: f64 = 0.8;

/// How forecast rows are paired with the held-out test rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Last `len(test)` rows of the whole forecast, row for row. When the
    /// horizon is non-zero these rows are future dates, not the test dates.
    #[default]
    Positional,
    /// Forecast row with the same date as each test row.
    ByDate,
}

impl Alignment {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "positional" => Some(Alignment::Positional),
            "by_date" | "date" => Some(Alignment::ByDate),
            _ => None,
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alignment::Positional => write!(f, "positional"),
            Alignment::ByDate => write!(f, "by-date"),
        }
    }
}

/// Row-position split of a table into leading train and trailing test rows.
#[derive(Debug, Clone, Copy)]
pub struct TrainTestSplit<'a> {
    pub train: &'a [DailyBar],
    pub test: &'a [DailyBar],
}

impl<'a> TrainTestSplit<'a> {
    /// `floor(0.8 * N)` rows for training, the rest for testing.
    pub fn new(bars: &'a [DailyBar]) -> Self {
        let train_size = (bars.len() as f64 * TRAIN_FRACTION).floor() as usize;
        let (train, test) = bars.split_at(train_size);
        Self { train, test }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRow {
    pub date: NaiveDate,
    pub close: f64,
    pub forecast: f64,
    /// Date of the forecast row that was paired with this test row.
    pub forecast_ds: NaiveDate,
}

impl EvaluationRow {
    pub fn absolute_error(&self) -> f64 {
        (self.forecast - self.close).abs()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSlice {
    pub alignment: Alignment,
    pub train_len: usize,
    pub rows: Vec<EvaluationRow>,
}

/// Accuracy metric that may be undefined for degenerate inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Metric {
    Available { value: f64 },
    Unavailable { reason: String },
}

impl Metric {
    #[cfg(test)]
    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Available { value } => Some(*value),
            Metric::Unavailable { .. } => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Available { value } => write!(f, "{:.2}", value),
            Metric::Unavailable { reason } => write!(f, "unavailable ({})", reason),
        }
    }
}
