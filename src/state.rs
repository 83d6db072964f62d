use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::IndexCatalog;
use crate::services::forecasting_service::Forecaster;
use crate::services::price_service::PriceLoader;

/// Process-wide dependencies shared by every dashboard run.
#[derive(Clone)]
pub struct AppState {
    pub loader: Arc<PriceLoader>,
    pub forecaster: Arc<dyn Forecaster>,
    pub catalog: IndexCatalog,
    pub config: AppConfig,
}
