use crate::adapters::normalize::normalize_forecast;
use crate::api::lib::formula_token;
use crate::api::models::{AreasResponse, FormulasResponse, ServiceErrorBody};
use crate::config::Config;
use crate::core_logic::models::{ForecastSeries, Horizon};
use crate::error::{Error, Result};
use crate::session::Session;
use async_trait::async_trait;
use serde_json::Value;

/// Where forecasts and their metadata come from.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn areas(&self) -> Result<Vec<String>>;

    /// Formulas with sales data, optionally restricted to one area.
    async fn formulas(&self, area: Option<&str>) -> Result<Vec<String>>;

    /// One round-trip per call; no retries.
    async fn forecast(&self, area: &str, formula: &str, horizon: Horizon) -> Result<ForecastSeries>;
}

pub struct HttpForecastSource {
    client: reqwest::Client,
    base_url: String,
    session: Session,
}

impl HttpForecastSource {
    pub fn new(base_url: impl Into<String>, session: Session) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, session)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        session: Session,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, &config.api_url, config.session.clone()))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("GET {} {:?}", url, query);

        let mut request = self.client.get(&url).query(query);
        if let Some(token) = &self.session.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body: ServiceErrorBody = response.json().await.unwrap_or_default();
            let message = match (body.error, body.hint) {
                (Some(error), Some(hint)) => format!("{} ({})", error, hint),
                (Some(error), None) => error,
                _ => status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            };
            return Err(Error::Service {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl ForecastSource for HttpForecastSource {
    async fn areas(&self) -> Result<Vec<String>> {
        let body = self.get_json("/forecast/metadata/areas", &[]).await?;
        let response: AreasResponse = serde_json::from_value(body)?;
        Ok(response.areas)
    }

    async fn formulas(&self, area: Option<&str>) -> Result<Vec<String>> {
        let query: Vec<(&str, String)> = area
            .map(|area| vec![("area", area.to_string())])
            .unwrap_or_default();
        let body = self.get_json("/forecast/metadata/formulas", &query).await?;
        let response: FormulasResponse = serde_json::from_value(body)?;
        Ok(response.formulas)
    }

    async fn forecast(
        &self,
        area: &str,
        formula: &str,
        horizon: Horizon,
    ) -> Result<ForecastSeries> {
        let query = [
            ("area", area.to_string()),
            ("formula", formula_token(formula)),
            ("days", horizon.days().to_string()),
        ];
        let body = self.get_json("/forecast", &query).await?;
        Ok(normalize_forecast(&body, area, formula, horizon))
    }
}
