use crate::dashboard::figure::Figure;
use crate::dashboard::table::TextTable;
use crate::errors::AppError;

/// Where a dashboard run is drawn. Calls arrive in display order.
pub trait DisplaySurface {
    fn title(&mut self, text: &str) -> Result<(), AppError>;

    fn subheader(&mut self, text: &str) -> Result<(), AppError>;

    fn text(&mut self, text: &str) -> Result<(), AppError>;

    fn table(&mut self, table: &TextTable) -> Result<(), AppError>;

    fn chart(&mut self, figure: &Figure) -> Result<(), AppError>;

    fn error(&mut self, message: &str) -> Result<(), AppError>;
}
