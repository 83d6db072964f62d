pub mod csv_provider;
pub mod mock_provider;
pub mod price_provider;
pub mod yahoo;
