use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::external::price_provider::{PriceProvider, PriceProviderError};
use crate::models::DailyBar;

const CHART_ENDPOINT: &str = "https://query1.finance.yahoo.com/v8/finance/chart/";

/// Yahoo Finance chart API provider.
///
/// No API key required. Index symbols such as `^NDX` are percent-encoded into
/// the request path.
pub struct YahooProvider {
    client: reqwest::Client,
}

impl YahooProvider {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (compatible; IndexForecast/0.1)")
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    fn chart_url(ticker: &str) -> Result<Url, PriceProviderError> {
        let symbol: String = url::form_urlencoded::byte_serialize(ticker.as_bytes()).collect();
        Url::parse(&format!("{}{}", CHART_ENDPOINT, symbol))
            .map_err(|e| PriceProviderError::BadResponse(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    meta: Option<YahooMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct YahooQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn parse_chart_response(
    body: YahooChartResponse,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DailyBar>, PriceProviderError> {
    if let Some(error) = body.chart.error {
        if error.description.contains("No data found") {
            return Err(PriceProviderError::NotFound);
        }
        return Err(PriceProviderError::BadResponse(error.description));
    }

    let result = body
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.swap_remove(0)) })
        .ok_or(PriceProviderError::NotFound)?;

    // A valid symbol with nothing in range comes back without timestamps
    let timestamps = result.timestamp.unwrap_or_default();
    let offset = result.meta.and_then(|m| m.gmtoffset).unwrap_or(0);

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| PriceProviderError::BadResponse("No quote data in response".into()))?;

    if quote.close.len() != timestamps.len() {
        return Err(PriceProviderError::Parse(
            "Timestamp and close price arrays have different lengths".into(),
        ));
    }

    let value_at = |column: &[Option<f64>], i: usize| column.get(i).copied().flatten();

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        // Skip null closes (holidays, partial sessions)
        let Some(close) = value_at(&quote.close, i) else {
            continue;
        };

        // Exchange-local calendar day
        let date = chrono::DateTime::from_timestamp(ts + offset, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| PriceProviderError::Parse(format!("bad timestamp {}", ts)))?;

        if date < start || date > end {
            continue;
        }

        bars.push(DailyBar {
            date,
            open: value_at(&quote.open, i).unwrap_or(close),
            high: value_at(&quote.high, i).unwrap_or(close),
            low: value_at(&quote.low, i).unwrap_or(close),
            close,
            volume: value_at(&quote.volume, i).unwrap_or(0.0),
        });
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

#[async_trait]
impl PriceProvider for YahooProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, PriceProviderError> {
        let url = Self::chart_url(ticker)?;

        // period2 is exclusive, so ask for the day after `end`
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = end
            .succ_opt()
            .unwrap_or(end)
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();

        debug!("GET {} period1={} period2={}", url, period1, period2);

        let resp = self
            .client
            .get(url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PriceProviderError::RateLimited);
        }

        // Yahoo reports unknown symbols as 404 with a JSON error body
        let body: YahooChartResponse = resp
            .json()
            .await
            .map_err(|e| PriceProviderError::Parse(format!("HTTP {}: {}", status, e)))?;

        parse_chart_response(body, start, end)
    }
}
