use std::sync::Arc;

use tracing::{error, info};

use crate::config::{MAX_FORECAST_MONTHS, MIN_FORECAST_MONTHS};
use crate::dashboard::figure::{forecast_figure, raw_data_figure};
use crate::dashboard::surface::DisplaySurface;
use crate::dashboard::table::TextTable;
use crate::errors::AppError;
use crate::models::{Alignment, IndexOption, TimeSeriesTable};
use crate::services::pipeline_service::{self, PipelineOutput};
use crate::state::AppState;

/// Rows shown in the raw and forecast tables.
pub const PREVIEW_ROWS: usize = 5;

/// Forecast horizon in months; one month is 30 calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastHorizon {
    months: u32,
}

impl ForecastHorizon {
    pub fn from_months(months: u32) -> Result<Self, AppError> {
        if !(MIN_FORECAST_MONTHS..=MAX_FORECAST_MONTHS).contains(&months) {
            return Err(AppError::Validation(format!(
                "months of prediction must be between {} and {}, got {}",
                MIN_FORECAST_MONTHS, MAX_FORECAST_MONTHS, months
            )));
        }
        Ok(Self { months })
    }

    pub fn months(&self) -> u32 {
        self.months
    }

    pub fn days(&self) -> u32 {
        self.months * 30
    }
}

/// Everything computed for one run, ready to render.
pub struct DashboardView {
    pub option: IndexOption,
    pub horizon: ForecastHorizon,
    pub table: Arc<TimeSeriesTable>,
    pub output: PipelineOutput,
}

/// Current selections plus the shared application state.
pub struct DashboardSession {
    state: AppState,
    selected: IndexOption,
    horizon: ForecastHorizon,
    alignment: Alignment,
}

impl DashboardSession {
    pub fn new(state: AppState) -> Result<Self, AppError> {
        let selected = state
            .catalog
            .find(&state.config.default_index)
            .cloned()
            .ok_or_else(|| {
                AppError::Config(format!(
                    "DEFAULT_INDEX '{}' is not one of: {}",
                    state.config.default_index,
                    state.catalog.names().join(", ")
                ))
            })?;
        let horizon = ForecastHorizon::from_months(state.config.forecast_months)?;
        let alignment = state.config.alignment;

        Ok(Self {
            state,
            selected,
            horizon,
            alignment,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn selected(&self) -> &IndexOption {
        &self.selected
    }

    pub fn horizon(&self) -> ForecastHorizon {
        self.horizon
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub fn select_index(&mut self, query: &str) -> Result<&IndexOption, AppError> {
        let option = self.state.catalog.find(query).cloned().ok_or_else(|| {
            AppError::Validation(format!(
                "unknown index '{}'; choose one of: {}",
                query,
                self.state.catalog.names().join(", ")
            ))
        })?;
        self.selected = option;
        Ok(&self.selected)
    }

    pub fn set_months(&mut self, months: u32) -> Result<(), AppError> {
        self.horizon = ForecastHorizon::from_months(months)?;
        Ok(())
    }

    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.alignment = alignment;
    }

    /// Drop the cached history for the selected index.
    pub fn refresh(&self) -> bool {
        self.state.loader.invalidate(&self.selected.ticker)
    }

    /// Drop every cached series. Returns a summary of what the cache held.
    pub fn clear_cache(&self) -> String {
        let cache = self.state.loader.cache();
        let summary = format!(
            "Cleared {} cached series ({} fetches, {} cache hits so far)",
            cache.len(),
            cache.fetch_count(),
            cache.hit_count()
        );
        self.state.loader.clear();
        summary
    }

    /// Load, fit, forecast and evaluate for the current selections.
    pub async fn compute(&self) -> Result<DashboardView, AppError> {
        let table = self.state.loader.load(&self.selected.ticker).await?;
        let output = pipeline_service::run(
            &table,
            self.horizon.days(),
            self.state.forecaster.as_ref(),
            self.alignment,
        )?;

        Ok(DashboardView {
            option: self.selected.clone(),
            horizon: self.horizon,
            table,
            output,
        })
    }

    /// Compute, then draw. A failed computation draws only the error line;
    /// the returned error is reserved for the surface itself failing.
    pub async fn run<S: DisplaySurface + ?Sized>(&self, surface: &mut S) -> Result<(), AppError> {
        match self.compute().await {
            Ok(view) => {
                info!(
                    "Rendering {} ({}) with {} month(s) horizon",
                    view.option.name, view.option.ticker, view.horizon.months()
                );
                render(&view, surface)
            }
            Err(e) => {
                error!("Dashboard run for {} failed: {}", self.selected.ticker, e);
                surface.error(&e.to_string())
            }
        }
    }
}

pub fn render<S: DisplaySurface + ?Sized>(view: &DashboardView, surface: &mut S) -> Result<(), AppError> {
    surface.title("Index Forecasting")?;
    surface.text(&format!(
        "Select dataset for prediction: {} ({})",
        view.option.name, view.option.ticker
    ))?;
    surface.text(&format!("Months of prediction: {}", view.horizon.months()))?;
    surface.text("Loading data... done!")?;

    surface.subheader("Raw data")?;
    surface.table(&TextTable::from_bars(view.table.tail(PREVIEW_ROWS)))?;
    surface.chart(&raw_data_figure(&view.table))?;

    surface.subheader("Forecast data")?;
    surface.table(&TextTable::from_forecast(view.output.forecast.tail(PREVIEW_ROWS)))?;
    surface.text(&format!("Forecast plot for {} month(s)", view.horizon.months()))?;
    surface.chart(&forecast_figure(
        &view.output.series,
        &view.output.forecast,
        view.horizon.months(),
    ))?;

    surface.subheader("Model Accuracy Metrics")?;
    surface.text(&format!("Mean Absolute Error (MAE): {}", view.output.mae))?;
    Ok(())
}
