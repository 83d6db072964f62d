/// Forecasting capability used by the dashboard pipeline.
///
/// The pipeline only relies on `Forecaster::fit` and `FittedModel::predict`;
/// the models here are the built-in implementations behind that seam.
use std::f64::consts::PI;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use ndarray::{Array1, Array2};
use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::{Forecast, ForecastMethod, ForecastPoint, ModelSeries};

/// Fewest non-null observations any model will fit on.
pub const MIN_FIT_POINTS: usize = 2;

/// Coverage of `yhat_lower..yhat_upper`.
pub const INTERVAL_WIDTH: f64 = 0.8;

// Standard normal quantile for the 80% two-sided interval
const Z_INTERVAL: f64 = 1.281_551_565_544_600_4;

const WEEKLY_PERIOD_DAYS: f64 = 7.0;
const YEARLY_PERIOD_DAYS: f64 = 365.25;

pub trait Forecaster: Send + Sync {
    fn method(&self) -> ForecastMethod;

    fn fit(&self, series: &ModelSeries) -> Result<Box<dyn FittedModel>, AppError>;
}

pub trait FittedModel: Send + Sync {
    /// One forecast row per requested date, in the order given.
    fn predict(&self, dates: &[NaiveDate]) -> Result<Forecast, AppError>;
}

pub fn forecaster_for(method: ForecastMethod) -> Arc<dyn Forecaster> {
    match method {
        ForecastMethod::AdditiveSeasonal => Arc::new(AdditiveSeasonalForecaster::default()),
        ForecastMethod::LinearTrend => Arc::new(LinearTrendForecaster),
    }
}

/// Every history date followed by `periods` consecutive calendar days after
/// the last one.
pub fn make_future_dates(history: &[NaiveDate], periods: u32) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(history.len() + periods as usize);
    dates.extend_from_slice(history);

    if let Some(last) = history.last() {
        dates.extend((1..=periods as i64).map(|day| *last + Duration::days(day)));
    }
    dates
}

/// Reject series a model cannot be fitted on.
pub fn validate_series(series: &ModelSeries) -> Result<(), AppError> {
    if series.len() < MIN_FIT_POINTS {
        return Err(AppError::Fit(format!(
            "Insufficient data for forecasting. Need at least {} data points, got {}",
            MIN_FIT_POINTS,
            series.len()
        )));
    }

    if let Some(bad) = series.points.iter().find(|p| !p.y.is_finite()) {
        return Err(AppError::Fit(format!("non-finite value on {}", bad.ds)));
    }

    if let Some(pair) = series.points.windows(2).find(|w| w[1].ds <= w[0].ds) {
        return Err(AppError::Fit(format!(
            "timestamps must be strictly increasing ({} followed by {})",
            pair[0].ds, pair[1].ds
        )));
    }

    Ok(())
}

/// Maps dates onto `[0, 1]` across the fitted history.
#[derive(Debug, Clone, Copy)]
struct TimeScale {
    start: NaiveDate,
    span_days: f64,
}

impl TimeScale {
    fn new(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            start: first,
            span_days: ((last - first).num_days() as f64).max(1.0),
        }
    }

    fn t(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64 / self.span_days
    }
}

/// Interval growth past the end of history, treating the residual as a
/// random walk between observations.
#[derive(Debug, Clone, Copy)]
struct Uncertainty {
    residual_std: f64,
    step_std: f64,
    obs_per_day: f64,
    last_date: NaiveDate,
}

impl Uncertainty {
    fn from_residuals(residuals: &[f64], scale: &TimeScale, last_date: NaiveDate) -> Self {
        let steps: Vec<f64> = residuals.windows(2).map(|w| w[1] - w[0]).collect();
        Self {
            residual_std: std_dev(residuals),
            step_std: std_dev(&steps),
            obs_per_day: (residuals.len().saturating_sub(1)) as f64 / scale.span_days,
            last_date,
        }
    }

    fn half_width(&self, date: NaiveDate) -> f64 {
        let days_ahead = (date - self.last_date).num_days().max(0) as f64;
        let steps = days_ahead * self.obs_per_day;
        Z_INTERVAL * (self.residual_std.powi(2) + self.step_std.powi(2) * steps).sqrt()
    }
}

/// Population standard deviation
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

// ============================================================================
// ADDITIVE TREND + SEASONALITY
// ============================================================================

/// Piecewise-linear trend plus Fourier seasonalities, fitted by penalized
/// least squares on max-scaled values.
#[derive(Debug, Clone)]
pub struct AdditiveSeasonalForecaster {
    pub n_changepoints: usize,
    /// Share of history in which changepoints may be placed.
    pub changepoint_range: f64,
    pub weekly_order: usize,
    pub yearly_order: usize,
    pub changepoint_penalty: f64,
    pub seasonality_penalty: f64,
}

impl Default for AdditiveSeasonalForecaster {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            weekly_order: 3,
            yearly_order: 10,
            changepoint_penalty: 0.4,
            seasonality_penalty: 1e-5,
        }
    }
}

impl AdditiveSeasonalForecaster {
    /// Changepoints sit on observed dates, evenly spaced over the first
    /// `changepoint_range` of history and never on the first point.
    fn changepoints(&self, series: &ModelSeries, scale: &TimeScale) -> Vec<f64> {
        let hist_size = (series.len() as f64 * self.changepoint_range).floor() as usize;
        let count = self.n_changepoints.min(hist_size.saturating_sub(1));
        if count == 0 {
            return Vec::new();
        }

        (1..=count)
            .map(|i| {
                let idx = (i as f64 * (hist_size - 1) as f64 / count as f64).round() as usize;
                scale.t(series.points[idx].ds)
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
struct FeatureLayout {
    changepoints: Vec<f64>,
    weekly_order: usize,
    yearly_order: usize,
}

impl FeatureLayout {
    fn width(&self) -> usize {
        2 + self.changepoints.len() + 2 * self.weekly_order + 2 * self.yearly_order
    }

    fn weekly_offset(&self) -> usize {
        2 + self.changepoints.len()
    }

    fn yearly_offset(&self) -> usize {
        self.weekly_offset() + 2 * self.weekly_order
    }

    fn row(&self, date: NaiveDate, scale: &TimeScale) -> Vec<f64> {
        let t = scale.t(date);
        let mut row = Vec::with_capacity(self.width());
        row.push(1.0);
        row.push(t);
        row.extend(self.changepoints.iter().map(|c| (t - c).max(0.0)));
        push_fourier(&mut row, date, WEEKLY_PERIOD_DAYS, self.weekly_order);
        push_fourier(&mut row, date, YEARLY_PERIOD_DAYS, self.yearly_order);
        row
    }
}

fn push_fourier(row: &mut Vec<f64>, date: NaiveDate, period: f64, order: usize) {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
    let x = (date - epoch).num_days() as f64;
    for k in 1..=order {
        let angle = 2.0 * PI * k as f64 * x / period;
        row.push(angle.sin());
        row.push(angle.cos());
    }
}

/// Solve `a x = b` for symmetric positive definite `a` by Cholesky
/// factorization. `None` when `a` is not positive definite.
fn solve_spd(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[[i, i]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }

    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }

    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }

    Some(x)
}

impl Forecaster for AdditiveSeasonalForecaster {
    fn method(&self) -> ForecastMethod {
        ForecastMethod::AdditiveSeasonal
    }

    fn fit(&self, series: &ModelSeries) -> Result<Box<dyn FittedModel>, AppError> {
        validate_series(series)?;

        let first = series.points[0].ds;
        let last = series.points[series.len() - 1].ds;
        let scale = TimeScale::new(first, last);
        let history_days = (last - first).num_days();

        // Seasonalities need enough history to be identifiable
        let layout = FeatureLayout {
            changepoints: self.changepoints(series, &scale),
            weekly_order: if history_days >= 14 { self.weekly_order } else { 0 },
            yearly_order: if history_days >= 730 { self.yearly_order } else { 0 },
        };

        let y_scale = series
            .points
            .iter()
            .map(|p| p.y.abs())
            .fold(0.0_f64, f64::max);
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };

        let n = series.len();
        let width = layout.width();
        let mut design = Array2::<f64>::zeros((n, width));
        let mut target = Array1::<f64>::zeros(n);
        for (i, point) in series.points.iter().enumerate() {
            for (j, value) in layout.row(point.ds, &scale).into_iter().enumerate() {
                design[[i, j]] = value;
            }
            target[i] = point.y / y_scale;
        }

        let mut normal = design.t().dot(&design);
        let rhs = design.t().dot(&target);
        for j in 0..width {
            let penalty = if j < 2 {
                1e-10
            } else if j < layout.weekly_offset() {
                self.changepoint_penalty
            } else {
                self.seasonality_penalty
            };
            normal[[j, j]] += penalty;
        }

        let coefficients = solve_spd(&normal, &rhs)
            .ok_or_else(|| AppError::Fit("design matrix is not positive definite".to_string()))?;

        let fitted = design.dot(&coefficients);
        let residuals: Vec<f64> = series
            .points
            .iter()
            .zip(fitted.iter())
            .map(|(p, f)| p.y - f * y_scale)
            .collect();

        info!(
            "Fitted additive model on {} points ({} changepoints, weekly order {}, yearly order {})",
            n,
            layout.changepoints.len(),
            layout.weekly_order,
            layout.yearly_order
        );

        Ok(Box::new(AdditiveSeasonalModel {
            uncertainty: Uncertainty::from_residuals(&residuals, &scale, last),
            layout,
            scale,
            y_scale,
            coefficients: coefficients.to_vec(),
        }))
    }
}

struct AdditiveSeasonalModel {
    layout: FeatureLayout,
    scale: TimeScale,
    y_scale: f64,
    coefficients: Vec<f64>,
    uncertainty: Uncertainty,
}

impl FittedModel for AdditiveSeasonalModel {
    fn predict(&self, dates: &[NaiveDate]) -> Result<Forecast, AppError> {
        let weekly_at = self.layout.weekly_offset();
        let yearly_at = self.layout.yearly_offset();

        let points = dates
            .iter()
            .map(|&ds| {
                let row = self.layout.row(ds, &self.scale);
                let part = |range: std::ops::Range<usize>| -> f64 {
                    range.map(|j| row[j] * self.coefficients[j]).sum::<f64>() * self.y_scale
                };

                let trend = part(0..weekly_at);
                let weekly = part(weekly_at..yearly_at);
                let yearly = part(yearly_at..self.layout.width());
                let yhat = trend + weekly + yearly;
                let half_width = self.uncertainty.half_width(ds);

                ForecastPoint {
                    ds,
                    yhat,
                    yhat_lower: yhat - half_width,
                    yhat_upper: yhat + half_width,
                    trend,
                    weekly,
                    yearly,
                }
            })
            .collect();

        Ok(Forecast {
            method: ForecastMethod::AdditiveSeasonal,
            interval_width: INTERVAL_WIDTH,
            points,
        })
    }
}

// ============================================================================
// LINEAR TREND
// ============================================================================

/// Ordinary least-squares line through the closes, in calendar days.
pub struct LinearTrendForecaster;

impl Forecaster for LinearTrendForecaster {
    fn method(&self) -> ForecastMethod {
        ForecastMethod::LinearTrend
    }

    fn fit(&self, series: &ModelSeries) -> Result<Box<dyn FittedModel>, AppError> {
        validate_series(series)?;

        let first = series.points[0].ds;
        let last = series.points[series.len() - 1].ds;
        let n = series.len() as f64;

        let xs: Vec<f64> = series
            .points
            .iter()
            .map(|p| (p.ds - first).num_days() as f64)
            .collect();
        let x_mean = xs.iter().sum::<f64>() / n;
        let y_mean = series.points.iter().map(|p| p.y).sum::<f64>() / n;

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (x, p) in xs.iter().zip(series.points.iter()) {
            numerator += (x - x_mean) * (p.y - y_mean);
            denominator += (x - x_mean) * (x - x_mean);
        }

        let slope = if denominator > 0.0 { numerator / denominator } else { 0.0 };
        let intercept = y_mean - slope * x_mean;

        let residuals: Vec<f64> = xs
            .iter()
            .zip(series.points.iter())
            .map(|(x, p)| p.y - (slope * x + intercept))
            .collect();

        debug!("Linear trend fit: slope {:.6}/day, intercept {:.4}", slope, intercept);

        let scale = TimeScale::new(first, last);
        Ok(Box::new(LinearTrendModel {
            origin: first,
            slope,
            intercept,
            uncertainty: Uncertainty::from_residuals(&residuals, &scale, last),
        }))
    }
}

struct LinearTrendModel {
    origin: NaiveDate,
    slope: f64,
    intercept: f64,
    uncertainty: Uncertainty,
}

impl FittedModel for LinearTrendModel {
    fn predict(&self, dates: &[NaiveDate]) -> Result<Forecast, AppError> {
        let points = dates
            .iter()
            .map(|&ds| {
                let x = (ds - self.origin).num_days() as f64;
                let yhat = self.intercept + self.slope * x;
                let half_width = self.uncertainty.half_width(ds);
                ForecastPoint {
                    ds,
                    yhat,
                    yhat_lower: yhat - half_width,
                    yhat_upper: yhat + half_width,
                    trend: yhat,
                    weekly: 0.0,
                    yearly: 0.0,
                }
            })
            .collect();

        Ok(Forecast {
            method: ForecastMethod::LinearTrend,
            interval_width: INTERVAL_WIDTH,
            points,
        })
    }
}
