pub mod clock;
pub mod evaluation_service;
pub mod forecasting_service;
pub mod pipeline_service;
pub mod price_cache;
pub mod price_service;
