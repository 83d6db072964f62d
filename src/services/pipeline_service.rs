use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::{Alignment, EvaluationSlice, Forecast, Metric, ModelSeries, TimeSeriesTable};
use crate::services::evaluation_service::{evaluate, mean_absolute_error};
use crate::services::forecasting_service::{make_future_dates, Forecaster};

/// Everything one dashboard run displays.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub series: ModelSeries,
    pub forecast: Forecast,
    pub evaluation: EvaluationSlice,
    pub mae: Metric,
}

/// Fit on the full table, forecast `horizon_days` past its end and score the
/// forecast against the trailing 20% of rows.
///
/// The model is fitted on every row, test rows included, so the metric is an
/// in-sample fit measure under `Alignment::ByDate`.
pub fn run(
    table: &TimeSeriesTable,
    horizon_days: u32,
    forecaster: &dyn Forecaster,
    alignment: Alignment,
) -> Result<PipelineOutput, AppError> {
    let series = ModelSeries::from_table(table);
    if series.is_empty() {
        return Err(AppError::Fit(format!("no rows to fit for {}", table.ticker())));
    }

    let model = forecaster.fit(&series)?;

    let dates = make_future_dates(&series.dates(), horizon_days);
    let forecast = model.predict(&dates)?;
    info!(
        "Forecast for {}: {} rows ({} history + {} days, {})",
        table.ticker(),
        forecast.len(),
        series.len(),
        horizon_days,
        forecaster.method().description()
    );

    let evaluation = evaluate(table, &forecast, alignment)?;
    let mae = mean_absolute_error(&evaluation);
    info!("MAE for {} over {} test rows: {}", table.ticker(), evaluation.rows.len(), mae);

    Ok(PipelineOutput {
        series,
        forecast,
        evaluation,
        mae,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyBar, ForecastMethod, ForecastPoint};
    use crate::services::forecasting_service::{forecaster_for, FittedModel};
    use chrono::{Datelike, Duration, NaiveDate, Weekday};

    /// Predicts the fitted close on history dates and the last close after.
    struct EchoForecaster;

    struct EchoModel {
        history: ModelSeries,
    }

    impl Forecaster for EchoForecaster {
        fn method(&self) -> ForecastMethod {
            ForecastMethod::LinearTrend
        }

        fn fit(&self, series: &ModelSeries) -> Result<Box<dyn FittedModel>, AppError> {
            Ok(Box::new(EchoModel { history: series.clone() }))
        }
    }

    impl FittedModel for EchoModel {
        fn predict(&self, dates: &[NaiveDate]) -> Result<Forecast, AppError> {
            let last = self.history.points.last().map(|p| p.y).unwrap_or(0.0);
            let points = dates
                .iter()
                .map(|&ds| {
                    let y = self
                        .history
                        .points
                        .iter()
                        .find(|p| p.ds == ds)
                        .map(|p| p.y)
                        .unwrap_or(last);
                    ForecastPoint {
                        ds,
                        yhat: y,
                        yhat_lower: y,
                        yhat_upper: y,
                        trend: y,
                        weekly: 0.0,
                        yearly: 0.0,
                    }
                })
                .collect();
            Ok(Forecast {
                method: ForecastMethod::LinearTrend,
                interval_width: 0.8,
                points,
            })
        }
    }

    /// `n` business days starting at `start`, closes 100, 101, ...
    fn business_days(start: NaiveDate, n: usize) -> TimeSeriesTable {
        let mut bars = Vec::new();
        let mut day = start;
        while bars.len() < n {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                bars.push(DailyBar::flat(day, 100.0 + bars.len() as f64));
            }
            day += Duration::days(1);
        }
        TimeSeriesTable::from_bars("^NDX", bars)
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    #[test]
    fn test_ten_rows_zero_horizon() {
        let table = business_days(start(), 10);
        let forecaster = forecaster_for(ForecastMethod::AdditiveSeasonal);

        let output = run(&table, 0, forecaster.as_ref(), Alignment::Positional).unwrap();

        assert_eq!(output.evaluation.train_len, 8);
        assert_eq!(output.evaluation.rows.len(), 2);
        assert_eq!(output.forecast.len(), 10);
        assert!(output.mae.value().unwrap() >= 0.0);
        // Zero horizon: positional rows are the test dates themselves
        for row in &output.evaluation.rows {
            assert_eq!(row.date, row.forecast_ds);
        }
    }

    #[test]
    fn test_forecast_covers_history_then_horizon() {
        let table = business_days(start(), 40);
        for method in [ForecastMethod::AdditiveSeasonal, ForecastMethod::LinearTrend] {
            let forecaster = forecaster_for(method);
            let output = run(&table, 30, forecaster.as_ref(), Alignment::Positional).unwrap();

            assert_eq!(output.forecast.len(), 70);
            let dates: Vec<NaiveDate> =
                output.forecast.points.iter().map(|p| p.ds).collect();
            assert_eq!(&dates[..40], &table.dates()[..]);
            assert_eq!(dates[40], table.last_date().unwrap() + Duration::days(1));
            assert_eq!(dates[69], table.last_date().unwrap() + Duration::days(30));
        }
    }

    #[test]
    fn test_exact_forecast_scores_zero() {
        let table = business_days(start(), 25);
        let output = run(&table, 0, &EchoForecaster, Alignment::Positional).unwrap();
        assert_eq!(output.mae, Metric::Available { value: 0.0 });
    }

    #[test]
    fn test_positional_with_horizon_pairs_future_rows() {
        let table = business_days(start(), 10);
        let output = run(&table, 5, &EchoForecaster, Alignment::Positional).unwrap();

        // Last two forecast rows are future days, all echoing the last close
        for row in &output.evaluation.rows {
            assert!(row.forecast_ds > table.last_date().unwrap());
            assert_eq!(row.forecast, 109.0);
        }
        // |108 - 109| and |109 - 109|
        assert_eq!(output.mae, Metric::Available { value: 0.5 });
    }

    #[test]
    fn test_by_date_pairs_each_row_with_its_own_date() {
        let table = business_days(start(), 10);
        let output = run(&table, 5, &EchoForecaster, Alignment::ByDate).unwrap();

        for row in &output.evaluation.rows {
            assert_eq!(row.date, row.forecast_ds);
        }
        assert_eq!(output.mae, Metric::Available { value: 0.0 });
    }

    #[test]
    fn test_empty_table_is_fit_error() {
        let table = TimeSeriesTable::from_bars("^NDX", Vec::new());
        let forecaster = forecaster_for(ForecastMethod::AdditiveSeasonal);
        let err = run(&table, 30, forecaster.as_ref(), Alignment::Positional).unwrap_err();
        assert!(matches!(err, AppError::Fit(_)));
    }

    #[test]
    fn test_single_row_is_fit_error() {
        let table = business_days(start(), 1);
        let forecaster = forecaster_for(ForecastMethod::LinearTrend);
        let err = run(&table, 30, forecaster.as_ref(), Alignment::Positional).unwrap_err();
        assert!(matches!(err, AppError::Fit(_)));
    }

    #[test]
    fn test_series_round_trips_to_date_close() {
        let table = business_days(start(), 12);
        let output = run(&table, 0, &EchoForecaster, Alignment::Positional).unwrap();

        let expected: Vec<(NaiveDate, f64)> =
            table.bars().iter().map(|b| (b.date, b.close)).collect();
        assert_eq!(output.series.to_date_close(), expected);
    }
}
