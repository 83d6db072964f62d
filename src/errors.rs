use thiserror::Error;

use crate::external::price_provider::PriceProviderError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Fetch error: {0}")]
    Fetch(String),
    #[error("Fit error: {0}")]
    Fit(String),
    #[error("Evaluation error: {0}")]
    Evaluation(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PriceProviderError> for AppError {
    fn from(value: PriceProviderError) -> Self {
        AppError::Fetch(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::Io(std::io::Error::other(value))
    }
}
