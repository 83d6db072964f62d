use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::models::{
    Alignment, EvaluationRow, EvaluationSlice, Forecast, ForecastPoint, Metric, TimeSeriesTable,
    TrainTestSplit,
};

/// Pair each held-out test row of `table` with a forecast value.
pub fn evaluate(
    table: &TimeSeriesTable,
    forecast: &Forecast,
    alignment: Alignment,
) -> Result<EvaluationSlice, AppError> {
    if forecast.is_empty() {
        return Err(AppError::Evaluation("forecast has no rows".to_string()));
    }
    let split = TrainTestSplit::new(table.bars());

    let rows = match alignment {
        Alignment::Positional => {
            if forecast.len() < split.test.len() {
                return Err(AppError::Evaluation(format!(
                    "forecast has {} rows but the test partition needs {}",
                    forecast.len(),
                    split.test.len()
                )));
            }
            split
                .test
                .iter()
                .zip(forecast.tail(split.test.len()))
                .map(|(bar, point)| row(bar.date, bar.close, point))
                .collect::<Vec<_>>()
        }
        Alignment::ByDate => {
            let by_date: HashMap<NaiveDate, &ForecastPoint> =
                forecast.points.iter().map(|p| (p.ds, p)).collect();

            split
                .test
                .iter()
                .map(|bar| {
                    by_date
                        .get(&bar.date)
                        .map(|point| row(bar.date, bar.close, point))
                        .ok_or_else(|| {
                            AppError::Evaluation(format!("no forecast row for test date {}", bar.date))
                        })
                })
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    debug!(
        "Evaluation slice: {} train rows, {} test rows ({} alignment)",
        split.train.len(),
        rows.len(),
        alignment
    );

    Ok(EvaluationSlice {
        alignment,
        train_len: split.train.len(),
        rows,
    })
}

fn row(date: NaiveDate, close: f64, point: &ForecastPoint) -> EvaluationRow {
    EvaluationRow {
        date,
        close,
        forecast: point.yhat,
        forecast_ds: point.ds,
    }
}

/// Mean of `|forecast - close|` over the slice.
pub fn mean_absolute_error(slice: &EvaluationSlice) -> Metric {
    if slice.rows.is_empty() {
        warn!("MAE unavailable: empty test partition");
        return Metric::Unavailable {
            reason: "empty test partition".to_string(),
        };
    }

    let total: f64 = slice.rows.iter().map(EvaluationRow::absolute_error).sum();
    let value = total / slice.rows.len() as f64;

    if !value.is_finite() {
        return Metric::Unavailable {
            reason: "non-finite forecast values".to_string(),
        };
    }

    Metric::Available { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyBar, ForecastMethod};
    use chrono::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table(closes: &[f64]) -> TimeSeriesTable {
        let start = date(2020, 1, 1);
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| DailyBar::flat(start + Duration::days(i as i64), c))
            .collect();
        TimeSeriesTable::from_bars("TEST", bars)
    }

    fn forecast(start: NaiveDate, values: &[f64]) -> Forecast {
        Forecast {
            method: ForecastMethod::LinearTrend,
            interval_width: 0.8,
            points: values
                .iter()
                .enumerate()
                .map(|(i, &v)| ForecastPoint {
                    ds: start + Duration::days(i as i64),
                    yhat: v,
                    yhat_lower: v,
                    yhat_upper: v,
                    trend: v,
                    weekly: 0.0,
                    yearly: 0.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_positional_uses_forecast_tail() {
        let table = table(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        // 5 history rows + 2 future rows
        let forecast = forecast(date(2020, 1, 1), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);

        let slice = evaluate(&table, &forecast, Alignment::Positional).unwrap();
        assert_eq!(slice.train_len, 4);
        assert_eq!(slice.rows.len(), 1);
        assert_eq!(slice.rows[0].date, date(2020, 1, 5));
        assert_eq!(slice.rows[0].forecast, 7.0);
        assert_eq!(slice.rows[0].forecast_ds, date(2020, 1, 7));
        assert_eq!(mean_absolute_error(&slice), Metric::Available { value: 2.0 });
    }

    #[test]
    fn test_by_date_pairs_same_dates() {
        let table = table(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let forecast = forecast(date(2020, 1, 1), &[1.0, 2.0, 3.0, 4.0, 5.5, 6.0, 7.0]);

        let slice = evaluate(&table, &forecast, Alignment::ByDate).unwrap();
        assert_eq!(slice.rows.len(), 1);
        assert_eq!(slice.rows[0].forecast_ds, slice.rows[0].date);
        assert_eq!(slice.rows[0].forecast, 5.5);
        assert_eq!(mean_absolute_error(&slice), Metric::Available { value: 0.5 });
    }

    #[test]
    fn test_by_date_missing_date_is_evaluation_error() {
        let table = table(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let forecast = forecast(date(2021, 1, 1), &[1.0, 2.0, 3.0, 4.0, 5.0]);

        let err = evaluate(&table, &forecast, Alignment::ByDate).unwrap_err();
        assert!(matches!(err, AppError::Evaluation(_)));
    }

    #[test]
    fn test_empty_forecast_is_evaluation_error() {
        let table = table(&[1.0, 2.0, 3.0]);
        for alignment in [Alignment::Positional, Alignment::ByDate] {
            let err = evaluate(&table, &forecast(date(2020, 1, 1), &[]), alignment).unwrap_err();
            assert!(matches!(err, AppError::Evaluation(_)));
        }
    }

    #[test]
    fn test_short_forecast_is_evaluation_error() {
        let table = table(&[1.0; 10]);
        let forecast = forecast(date(2020, 1, 1), &[1.0]);

        let err = evaluate(&table, &forecast, Alignment::Positional).unwrap_err();
        assert!(matches!(err, AppError::Evaluation(_)));
    }

    #[test]
    fn test_mae_is_zero_for_exact_forecast_and_never_negative() {
        let closes = [10.0, 11.0, 9.0, 12.0, 13.0, 8.0, 7.0, 14.0, 15.0, 16.0];
        let table = table(&closes);

        let exact = evaluate(&table, &forecast(date(2020, 1, 1), &closes), Alignment::Positional)
            .unwrap();
        assert_eq!(mean_absolute_error(&exact), Metric::Available { value: 0.0 });

        let shifted: Vec<f64> = closes.iter().map(|c| c - 3.0).collect();
        let off = evaluate(&table, &forecast(date(2020, 1, 1), &shifted), Alignment::Positional)
            .unwrap();
        let mae = mean_absolute_error(&off).value().unwrap();
        assert!(mae >= 0.0);
        assert!((mae - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_test_partition_is_unavailable() {
        let slice = EvaluationSlice {
            alignment: Alignment::Positional,
            train_len: 0,
            rows: Vec::new(),
        };
        assert!(matches!(mean_absolute_error(&slice), Metric::Unavailable { .. }));
    }
}
