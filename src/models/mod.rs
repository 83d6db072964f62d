mod price_point;
mod time_series;
pub mod evaluation;
pub mod forecast;
pub mod index_catalog;

pub use price_point::DailyBar;
pub use time_series::TimeSeriesTable;
pub use evaluation::{Alignment, EvaluationRow, EvaluationSlice, Metric, TrainTestSplit};
pub use forecast::{Forecast, ForecastMethod, ForecastPoint, ModelSeries};
pub use index_catalog::{IndexCatalog, IndexOption};
