use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::TimeSeriesTable;

/// One observation in the model's input schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPoint {
    pub ds: NaiveDate,
    pub y: f64,
}

/// (date, close) projection of a price table renamed to the model's
/// `ds` / `y` fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSeries {
    pub points: Vec<ModelPoint>,
}

impl ModelSeries {
    pub fn from_table(table: &TimeSeriesTable) -> Self {
        Self {
            points: table
                .bars()
                .iter()
                .map(|b| ModelPoint { ds: b.date, y: b.close })
                .collect(),
        }
    }

    /// Back to (date, close) pairs.
    #[cfg(test)]
    pub fn to_date_close(&self) -> Vec<(NaiveDate, f64)> {
        self.points.iter().map(|p| (p.ds, p.y)).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.ds).collect()
    }
}

/// Single row of a forecast, with the additive components that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub ds: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    pub trend: f64,
    pub weekly: f64,
    pub yearly: f64,
}

/// Forecast over the training dates followed by the future horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    pub method: ForecastMethod,
    pub interval_width: f64,
    pub points: Vec<ForecastPoint>,
}

impl Forecast {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn yhat(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.yhat).collect()
    }

    pub fn tail(&self, n: usize) -> &[ForecastPoint] {
        &self.points[self.points.len().saturating_sub(n)..]
    }
}

/// Forecasting methodology used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    AdditiveSeasonal,
    LinearTrend,
}

impl ForecastMethod {
    pub fn description(&self) -> &'static str {
        match self {
            ForecastMethod::AdditiveSeasonal => {
                "Piecewise-linear trend with weekly and yearly seasonality"
            }
            ForecastMethod::LinearTrend => {
                "Linear trend extrapolation based on historical closes"
            }
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "additive_seasonal" | "additive" => Some(ForecastMethod::AdditiveSeasonal),
            "linear_trend" | "linear" => Some(ForecastMethod::LinearTrend),
            _ => None,
        }
    }
}
