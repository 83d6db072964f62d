use std::sync::Arc;

use tracing::info;

use crate::config::{AppConfig, ProviderKind};
use crate::errors::AppError;
use crate::external::csv_provider::CsvPriceProvider;
use crate::external::mock_provider::MockPriceProvider;
use crate::external::price_provider::PriceProvider;
use crate::external::yahoo::YahooProvider;
use crate::models::IndexCatalog;
use crate::services::clock::{Clock, FixedClock, SystemClock};
use crate::services::forecasting_service::forecaster_for;
use crate::services::price_cache::PriceCache;
use crate::services::price_service::PriceLoader;
use crate::state::AppState;

pub fn create_provider(config: &AppConfig) -> Result<Arc<dyn PriceProvider>, AppError> {
    let provider: Arc<dyn PriceProvider> = match config.provider {
        ProviderKind::Yahoo => {
            info!("📊 Using price provider: Yahoo Finance");
            Arc::new(YahooProvider::new(config.http_timeout))
        }
        ProviderKind::Csv => {
            let dir = config.csv_data_dir.clone().ok_or_else(|| {
                AppError::Config("PRICE_PROVIDER is 'csv' but CSV_DATA_DIR is not set".to_string())
            })?;
            info!("📊 Using price provider: CSV files in {}", dir.display());
            Arc::new(CsvPriceProvider::new(dir))
        }
        ProviderKind::Mock => {
            info!("📊 Using price provider: deterministic mock data");
            Arc::new(MockPriceProvider)
        }
    };
    Ok(provider)
}

pub fn create_clock(config: &AppConfig) -> Arc<dyn Clock> {
    match config.as_of_date {
        Some(date) => {
            info!("🕒 Clock pinned to {}", date);
            Arc::new(FixedClock::at_date(date))
        }
        None => Arc::new(SystemClock),
    }
}

pub fn create_app(config: AppConfig) -> Result<AppState, AppError> {
    let provider = create_provider(&config)?;
    let loader = PriceLoader::new(
        provider,
        PriceCache::new(config.cache_ttl),
        create_clock(&config),
        config.history_start,
    );

    Ok(AppState {
        loader: Arc::new(loader),
        forecaster: forecaster_for(config.forecast_method),
        catalog: IndexCatalog::default(),
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| map.get(key).cloned()).unwrap()
    }

    #[test]
    fn test_provider_selection() {
        assert_eq!(create_provider(&config(&[])).unwrap().name(), "yahoo");
        assert_eq!(
            create_provider(&config(&[("PRICE_PROVIDER", "mock")])).unwrap().name(),
            "mock"
        );
        assert_eq!(
            create_provider(&config(&[("PRICE_PROVIDER", "csv"), ("CSV_DATA_DIR", "/data")]))
                .unwrap()
                .name(),
            "csv"
        );
    }

    #[test]
    fn test_as_of_date_pins_clock() {
        let clock = create_clock(&config(&[("AS_OF_DATE", "2023-03-15")]));
        assert_eq!(clock.now().date_naive(), NaiveDate::from_ymd_opt(2023, 3, 15).unwrap());
    }

    #[tokio::test]
    async fn test_app_loads_from_mock_provider() {
        let state = create_app(config(&[
            ("PRICE_PROVIDER", "mock"),
            ("HISTORY_START", "2023-01-01"),
            ("AS_OF_DATE", "2023-06-30"),
        ]))
        .unwrap();

        let table = state.loader.load("^NDX").await.unwrap();
        assert_eq!(table.first_date(), NaiveDate::from_ymd_opt(2023, 1, 2));
        assert!(table.last_date().unwrap() <= NaiveDate::from_ymd_opt(2023, 6, 30).unwrap());
        assert_eq!(state.forecaster.method(), crate::models::ForecastMethod::AdditiveSeasonal);
    }
}
