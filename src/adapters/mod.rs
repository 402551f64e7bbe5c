pub mod forecast_service;
pub mod normalize;

pub use forecast_service::{ForecastSource, HttpForecastSource};
