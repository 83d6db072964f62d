use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;

use crate::errors::AppError;
use crate::models::{Alignment, ForecastMethod};

pub const MIN_FORECAST_MONTHS: u32 = 1;
pub const MAX_FORECAST_MONTHS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Yahoo,
    Csv,
    Mock,
}

impl ProviderKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "yahoo" | "yahoofinance" => Some(ProviderKind::Yahoo),
            "csv" => Some(ProviderKind::Csv),
            "mock" => Some(ProviderKind::Mock),
            _ => None,
        }
    }
}

/// Runtime settings, read from the environment after `.env` is loaded.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderKind,
    pub csv_data_dir: Option<PathBuf>,
    pub history_start: NaiveDate,
    /// Pins "today" for reproducible runs.
    pub as_of_date: Option<NaiveDate>,
    pub default_index: String,
    pub forecast_months: u32,
    pub forecast_method: ForecastMethod,
    pub alignment: Alignment,
    pub cache_ttl: Option<chrono::Duration>,
    pub http_timeout: Duration,
    pub chart_output_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        // Blank values count as unset
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let provider = match get("PRICE_PROVIDER") {
            Some(value) => ProviderKind::parse(&value).ok_or_else(|| {
                AppError::Config(format!(
                    "Invalid PRICE_PROVIDER: {}. Must be 'yahoo', 'csv', or 'mock'",
                    value
                ))
            })?,
            None => ProviderKind::Yahoo,
        };

        let history_start = match get("HISTORY_START") {
            Some(value) => parse_date("HISTORY_START", &value)?,
            None => default_history_start(),
        };

        let as_of_date = get("AS_OF_DATE")
            .map(|value| parse_date("AS_OF_DATE", &value))
            .transpose()?;

        let forecast_months = match get("FORECAST_MONTHS") {
            Some(value) => value.parse::<u32>().map_err(|_| {
                AppError::Config(format!("FORECAST_MONTHS must be a whole number, got '{}'", value))
            })?,
            None => 1,
        };

        let forecast_method = match get("FORECAST_METHOD") {
            Some(value) => ForecastMethod::parse(&value).ok_or_else(|| {
                AppError::Config(format!(
                    "Invalid FORECAST_METHOD: {}. Must be 'additive_seasonal' or 'linear_trend'",
                    value
                ))
            })?,
            None => ForecastMethod::AdditiveSeasonal,
        };

        let alignment = match get("EVALUATION_ALIGNMENT") {
            Some(value) => Alignment::parse(&value).ok_or_else(|| {
                AppError::Config(format!(
                    "Invalid EVALUATION_ALIGNMENT: {}. Must be 'positional' or 'by_date'",
                    value
                ))
            })?,
            None => Alignment::default(),
        };

        let cache_ttl = get("CACHE_TTL_HOURS")
            .map(|value| {
                value
                    .parse::<i64>()
                    .ok()
                    .filter(|hours| *hours > 0)
                    .map(chrono::Duration::hours)
                    .ok_or_else(|| {
                        AppError::Config(format!(
                            "CACHE_TTL_HOURS must be a positive number of hours, got '{}'",
                            value
                        ))
                    })
            })
            .transpose()?;

        let http_timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    AppError::Config(format!("HTTP_TIMEOUT_SECS must be positive, got '{}'", value))
                })?,
            None => Duration::from_secs(30),
        };

        let config = Self {
            provider,
            csv_data_dir: get("CSV_DATA_DIR").map(PathBuf::from),
            history_start,
            as_of_date,
            default_index: get("DEFAULT_INDEX").unwrap_or_else(|| "Nasdaq Index".to_string()),
            forecast_months,
            forecast_method,
            alignment,
            cache_ttl,
            http_timeout,
            chart_output_dir: get("CHART_OUTPUT_DIR").map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.provider == ProviderKind::Csv && self.csv_data_dir.is_none() {
            return Err(AppError::Config(
                "PRICE_PROVIDER is 'csv' but CSV_DATA_DIR is not set".to_string(),
            ));
        }

        if !(MIN_FORECAST_MONTHS..=MAX_FORECAST_MONTHS).contains(&self.forecast_months) {
            return Err(AppError::Config(format!(
                "FORECAST_MONTHS must be between {} and {}, got {}",
                MIN_FORECAST_MONTHS, MAX_FORECAST_MONTHS, self.forecast_months
            )));
        }

        if let Some(as_of) = self.as_of_date {
            if as_of < self.history_start {
                return Err(AppError::Config(format!(
                    "AS_OF_DATE {} is before HISTORY_START {}",
                    as_of, self.history_start
                )));
            }
        }

        Ok(())
    }
}

fn default_history_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2017, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| AppError::Config(format!("{} must be YYYY-MM-DD, got '{}': {}", key, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.provider, ProviderKind::Yahoo);
        assert_eq!(config.history_start, NaiveDate::from_ymd_opt(2017, 1, 1).unwrap());
        assert_eq!(config.as_of_date, None);
        assert_eq!(config.default_index, "Nasdaq Index");
        assert_eq!(config.forecast_months, 1);
        assert_eq!(config.forecast_method, ForecastMethod::AdditiveSeasonal);
        assert_eq!(config.alignment, Alignment::Positional);
        assert_eq!(config.cache_ttl, None);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert!(config.chart_output_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PRICE_PROVIDER", "MOCK"),
            ("HISTORY_START", "2019-06-01"),
            ("AS_OF_DATE", "2024-01-31"),
            ("DEFAULT_INDEX", "Nifty Index"),
            ("FORECAST_MONTHS", "6"),
            ("FORECAST_METHOD", "linear_trend"),
            ("EVALUATION_ALIGNMENT", "by_date"),
            ("CACHE_TTL_HOURS", "12"),
            ("HTTP_TIMEOUT_SECS", "5"),
            ("CHART_OUTPUT_DIR", "/tmp/charts"),
        ])
        .unwrap();

        assert_eq!(config.provider, ProviderKind::Mock);
        assert_eq!(config.history_start, NaiveDate::from_ymd_opt(2019, 6, 1).unwrap());
        assert_eq!(config.as_of_date, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(config.default_index, "Nifty Index");
        assert_eq!(config.forecast_months, 6);
        assert_eq!(config.forecast_method, ForecastMethod::LinearTrend);
        assert_eq!(config.alignment, Alignment::ByDate);
        assert_eq!(config.cache_ttl, Some(chrono::Duration::hours(12)));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.chart_output_dir, Some(PathBuf::from("/tmp/charts")));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = config(&[("PRICE_PROVIDER", "  "), ("FORECAST_MONTHS", "")]).unwrap();
        assert_eq!(config.provider, ProviderKind::Yahoo);
        assert_eq!(config.forecast_months, 1);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for pairs in [
            vec![("PRICE_PROVIDER", "bloomberg")],
            vec![("HISTORY_START", "01/01/2017")],
            vec![("FORECAST_MONTHS", "13")],
            vec![("FORECAST_MONTHS", "0")],
            vec![("FORECAST_MONTHS", "two")],
            vec![("FORECAST_METHOD", "arima")],
            vec![("EVALUATION_ALIGNMENT", "nearest")],
            vec![("CACHE_TTL_HOURS", "-1")],
            vec![("HTTP_TIMEOUT_SECS", "0")],
            vec![("PRICE_PROVIDER", "csv")],
            vec![("AS_OF_DATE", "2016-12-31")],
        ] {
            assert!(
                matches!(config(&pairs), Err(AppError::Config(_))),
                "expected config error for {:?}",
                pairs
            );
        }
    }

    #[test]
    fn test_csv_provider_with_dir() {
        let config = config(&[("PRICE_PROVIDER", "csv"), ("CSV_DATA_DIR", "./data")]).unwrap();
        assert_eq!(config.provider, ProviderKind::Csv);
        assert_eq!(config.csv_data_dir, Some(PathBuf::from("./data")));
    }
}
