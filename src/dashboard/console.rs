use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::dashboard::figure::{Figure, Trace};
use crate::dashboard::surface::DisplaySurface;
use crate::dashboard::table::TextTable;
use crate::errors::AppError;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const SPARK_WIDTH: usize = 60;

/// Terminal rendering: text tables and one sparkline per chart trace.
/// Charts are also written as JSON figures when `chart_dir` is set.
pub struct ConsoleSurface<W: Write> {
    out: W,
    chart_dir: Option<PathBuf>,
}

impl<W: Write> ConsoleSurface<W> {
    pub fn new(out: W, chart_dir: Option<PathBuf>) -> Self {
        Self { out, chart_dir }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_figure(&self, figure: &Figure) -> Result<Option<PathBuf>, AppError> {
        let Some(dir) = &self.chart_dir else {
            return Ok(None);
        };

        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", figure.slug()));
        std::fs::write(&path, serde_json::to_vec_pretty(figure)?)?;
        info!("Wrote chart {}", path.display());
        Ok(Some(path))
    }
}

/// Bucket-average `values` down to at most `width` points and map each onto
/// eight block levels.
pub fn sparkline(values: &[f64], width: usize) -> String {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || width == 0 {
        return String::new();
    }

    let buckets = finite.len().min(width);
    let averaged: Vec<f64> = (0..buckets)
        .map(|b| {
            let from = b * finite.len() / buckets;
            let to = ((b + 1) * finite.len() / buckets).max(from + 1);
            finite[from..to].iter().sum::<f64>() / (to - from) as f64
        })
        .collect();

    let min = averaged.iter().copied().fold(f64::INFINITY, f64::min);
    let max = averaged.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    averaged
        .iter()
        .map(|v| {
            if range <= 0.0 {
                return SPARK_LEVELS[0];
            }
            let level = ((v - min) / range * (SPARK_LEVELS.len() - 1) as f64).round() as usize;
            SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
        })
        .collect()
}

fn trace_summary(trace: &Trace) -> String {
    let range = match (trace.x.first(), trace.x.last()) {
        (Some(first), Some(last)) => format!("{} .. {}", first, last),
        _ => "no data".to_string(),
    };
    let last = trace.y.last().map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string());
    format!(
        "  {:<12} {}  [{}, last {}]",
        trace.name,
        sparkline(&trace.y, SPARK_WIDTH),
        range,
        last
    )
}

impl<W: Write> DisplaySurface for ConsoleSurface<W> {
    fn title(&mut self, text: &str) -> Result<(), AppError> {
        writeln!(self.out, "\n{}\n{}", text, "=".repeat(text.chars().count()))?;
        Ok(())
    }

    fn subheader(&mut self, text: &str) -> Result<(), AppError> {
        writeln!(self.out, "\n{}\n{}", text, "-".repeat(text.chars().count()))?;
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), AppError> {
        writeln!(self.out, "{}", text)?;
        Ok(())
    }

    fn table(&mut self, table: &TextTable) -> Result<(), AppError> {
        writeln!(self.out, "{}", table.render())?;
        Ok(())
    }

    fn chart(&mut self, figure: &Figure) -> Result<(), AppError> {
        writeln!(self.out, "\n[{}]", figure.title)?;
        for trace in &figure.traces {
            writeln!(self.out, "{}", trace_summary(trace))?;
        }
        for band in &figure.bands {
            if let (Some(lower), Some(upper)) = (band.lower.last(), band.upper.last()) {
                writeln!(self.out, "  {:<12} last [{:.2}, {:.2}]", band.name, lower, upper)?;
            }
        }

        if let Some(path) = self.write_figure(figure)? {
            writeln!(self.out, "  (figure saved to {})", path.display())?;
        } else {
            debug!("Chart output disabled; skipping figure file for {}", figure.title);
        }
        self.out.flush()?;
        Ok(())
    }

    fn error(&mut self, message: &str) -> Result<(), AppError> {
        writeln!(self.out, "Error: {}", message)?;
        self.out.flush()?;
        Ok(())
    }
}
