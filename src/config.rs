use crate::api::lib::horizon_from_days;
use crate::core_logic::models::Horizon;
use crate::error::{Error, Result};
use crate::session::{Role, Session};
use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api";
pub const DEFAULT_PORT: u16 = 8001;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub session: Session,
    pub default_horizon: Horizon,
    pub request_timeout: Duration,
    pub port: u16,
}

impl Config {
    /// Loads `.env` if present, then reads the environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_number = |key: &str, default: u64| -> Result<u64> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| Error::Config(format!("{} must be a number, got {:?}", key, raw))),
                None => Ok(default),
            }
        };

        let role = match lookup("FORECAST_ROLE") {
            Some(raw) => raw.parse::<Role>()?,
            None => Role::Analyst,
        };
        let session = Session {
            username: lookup("FORECAST_USER"),
            role,
            token: lookup("FORECAST_API_TOKEN").filter(|token| !token.is_empty()),
        };

        let days = parse_number("FORECAST_DEFAULT_DAYS", Horizon::default().days() as u64)?;
        let port = parse_number("PORT", DEFAULT_PORT as u64)?;

        Ok(Config {
            api_url: lookup("FORECAST_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            session,
            default_horizon: horizon_from_days(days as u32)?,
            request_timeout: Duration::from_secs(parse_number("FORECAST_TIMEOUT_SECS", 30)?),
            port: u16::try_from(port)
                .map_err(|_| Error::Config(format!("PORT out of range: {}", port)))?,
        })
    }
}
