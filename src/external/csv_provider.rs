use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::warn;

use crate::external::price_provider::{PriceProvider, PriceProviderError};
use crate::models::DailyBar;

/// Offline provider reading `<dir>/<ticker>.csv` files in Yahoo Finance's
/// download format.
pub struct CsvPriceProvider {
    dir: PathBuf,
}

impl CsvPriceProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Open")]
    open: String,
    #[serde(rename = "High")]
    high: String,
    #[serde(rename = "Low")]
    low: String,
    #[serde(rename = "Close")]
    close: String,
    #[serde(rename = "Volume", default)]
    volume: String,
}

// Yahoo writes "null" for missing cells
fn parse_cell(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("null") {
        return None;
    }
    value.parse::<f64>().ok()
}

fn parse_rows(
    content: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DailyBar>, PriceProviderError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut bars = Vec::new();
    for (line_num, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|e| {
            PriceProviderError::Parse(format!("line {}: bad date '{}': {}", line_num + 2, row.date, e))
        })?;

        if date < start || date > end {
            continue;
        }

        let Some(close) = parse_cell(&row.close) else {
            warn!("Skipping {} with no close price", date);
            continue;
        };

        bars.push(DailyBar {
            date,
            open: parse_cell(&row.open).unwrap_or(close),
            high: parse_cell(&row.high).unwrap_or(close),
            low: parse_cell(&row.low).unwrap_or(close),
            close,
            volume: parse_cell(&row.volume).unwrap_or(0.0),
        });
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

#[async_trait]
impl PriceProvider for CsvPriceProvider {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn fetch_daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, PriceProviderError> {
        let path = self.dir.join(format!("{}.csv", ticker));

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PriceProviderError::NotFound);
            }
            Err(e) => {
                return Err(PriceProviderError::BadResponse(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        parse_rows(&content, start, end)
    }
}
