use crate::core_logic::chart::ChartTick;
use crate::core_logic::models::TimeSeriesPoint;
use serde::{Deserialize, Deserializer, Serialize};

/// Reads a missing or `null` list as empty.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct AreasResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub areas: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct FormulasResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub formulas: Vec<String>,
}

/// Error body the forecasting service sends with non-2xx statuses.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SummaryParameters {
    /// `area` or `formula`.
    pub mode: String,
    pub name: String,
    pub days: Option<u32>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ForecastParameters {
    pub area: String,
    pub formula: String,
    pub days: Option<u32>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ChartParameters {
    pub area: String,
    pub formula: String,
    pub days: Option<u32>,
    pub x: Option<f64>,
    pub historical: Option<bool>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ChartReply {
    pub area: String,
    pub formula: String,
    pub showing_historical: bool,
    pub point_count: usize,
    pub nearest: Option<TimeSeriesPoint>,
    pub path: String,
    pub ticks: Vec<ChartTick>,
}
