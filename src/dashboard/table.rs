use chrono::NaiveDate;
use tabled::builder::Builder;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Style};

use crate::models::{DailyBar, ForecastPoint};

/// Plain-text table with a header row; cells are preformatted strings.
#[derive(Debug, Clone, PartialEq)]
pub struct TextTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn from_bars(bars: &[DailyBar]) -> Self {
        let mut table = Self::new(&["Date", "Open", "High", "Low", "Close", "Volume"]);
        for bar in bars {
            table.push_row(vec![
                format_date(bar.date),
                format_number(bar.open),
                format_number(bar.high),
                format_number(bar.low),
                format_number(bar.close),
                format!("{:.0}", bar.volume),
            ]);
        }
        table
    }

    pub fn from_forecast(points: &[ForecastPoint]) -> Self {
        let mut table = Self::new(&["ds", "yhat", "yhat_lower", "yhat_upper", "trend", "weekly", "yearly"]);
        for p in points {
            table.push_row(vec![
                format_date(p.ds),
                format_number(p.yhat),
                format_number(p.yhat_lower),
                format_number(p.yhat_upper),
                format_number(p.trend),
                format_number(p.weekly),
                format_number(p.yearly),
            ]);
        }
        table
    }

    /// Bordered table, numeric columns right-aligned.
    pub fn render(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(&self.headers);
        for row in &self.rows {
            builder.push_record(row);
        }

        let mut table = builder.build();
        table.with(Style::rounded());
        table.modify(Columns::new(1..), Alignment::right());
        table.to_string()
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn format_number(value: f64) -> String {
    format!("{:.2}", value)
}
