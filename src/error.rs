use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("request to forecasting service failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("forecasting service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("unsupported horizon of {0} days (expected 14, 28, 30 or 90)")]
    InvalidHorizon(u32),

    #[error("unknown grouping mode: {0}")]
    InvalidGrouping(String),

    #[error("unknown role: {0}")]
    InvalidRole(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("no such node: {0}")]
    UnknownNode(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("session is not allowed to {0}")]
    Forbidden(String),
}

pub type Result<T> = std::result::Result<T, Error>;
