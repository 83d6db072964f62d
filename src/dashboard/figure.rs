use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Forecast, ModelSeries, TimeSeriesTable};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub name: String,
    pub x: Vec<NaiveDate>,
    pub y: Vec<f64>,
}

/// Shaded interval between two curves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Band {
    pub name: String,
    pub x: Vec<NaiveDate>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Renderer-agnostic line chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub title: String,
    pub traces: Vec<Trace>,
    pub bands: Vec<Band>,
    pub range_slider: bool,
}

impl Figure {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            traces: Vec::new(),
            bands: Vec::new(),
            range_slider: false,
        }
    }

    #[cfg(test)]
    pub fn trace(&self, name: &str) -> Option<&Trace> {
        self.traces.iter().find(|t| t.name == name)
    }

    /// Lowercase, hyphen-separated title for file names.
    pub fn slug(&self) -> String {
        let mut slug = String::new();
        for c in self.title.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.ends_with('-') && !slug.is_empty() {
                slug.push('-');
            }
        }
        slug.trim_end_matches('-').to_string()
    }
}

/// Open and close over time, with a range slider.
pub fn raw_data_figure(table: &TimeSeriesTable) -> Figure {
    let dates = table.dates();
    let mut figure = Figure::new("Time Series data with Rangeslider");
    figure.traces.push(Trace {
        name: "stock_open".to_string(),
        x: dates.clone(),
        y: table.opens(),
    });
    figure.traces.push(Trace {
        name: "stock_close".to_string(),
        x: dates,
        y: table.closes(),
    });
    figure.range_slider = true;
    figure
}

/// Observed values, point forecast, the model components and the
/// uncertainty band. Seasonal components the model did not fit are omitted.
pub fn forecast_figure(series: &ModelSeries, forecast: &Forecast, months: u32) -> Figure {
    let dates: Vec<NaiveDate> = forecast.points.iter().map(|p| p.ds).collect();
    let mut figure = Figure::new(format!("Forecast plot for {} month(s)", months));

    figure.traces.push(Trace {
        name: "actual".to_string(),
        x: series.dates(),
        y: series.points.iter().map(|p| p.y).collect(),
    });
    figure.traces.push(Trace {
        name: "yhat".to_string(),
        x: dates.clone(),
        y: forecast.yhat(),
    });
    figure.traces.push(Trace {
        name: "trend".to_string(),
        x: dates.clone(),
        y: forecast.points.iter().map(|p| p.trend).collect(),
    });
    for (name, values) in [
        ("weekly", forecast.points.iter().map(|p| p.weekly).collect::<Vec<f64>>()),
        ("yearly", forecast.points.iter().map(|p| p.yearly).collect()),
    ] {
        if values.iter().any(|v| *v != 0.0) {
            figure.traces.push(Trace {
                name: name.to_string(),
                x: dates.clone(),
                y: values,
            });
        }
    }
    figure.bands.push(Band {
        name: format!("{:.0}% interval", forecast.interval_width * 100.0),
        x: dates,
        lower: forecast.points.iter().map(|p| p.yhat_lower).collect(),
        upper: forecast.points.iter().map(|p| p.yhat_upper).collect(),
    });
    figure.range_slider = true;
    figure
}
