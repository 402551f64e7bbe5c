use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One day of historical sales or forecasted demand.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Forecast length requested from the forecasting service.
#[derive(
    Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
pub enum Horizon {
    Days14,
    #[default]
    Days28,
    Days30,
    Days90,
}

impl Horizon {
    pub const ALL: [Horizon; 4] = [
        Horizon::Days14,
        Horizon::Days28,
        Horizon::Days30,
        Horizon::Days90,
    ];

    pub fn days(self) -> u32 {
        match self {
            Horizon::Days14 => 14,
            Horizon::Days28 => 28,
            Horizon::Days30 => 30,
            Horizon::Days90 => 90,
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} days", self.days())
    }
}

/// Extra fields the service reports alongside a forecast. All optional.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ForecastSummary {
    pub avg_daily: Option<f64>,
    pub forecast_start: Option<NaiveDate>,
    pub forecast_end: Option<NaiveDate>,
    pub medicines_count: Option<u32>,
    pub medicines: Vec<String>,
}

/// A forecast for one (area, formula, horizon) triple. Built once per fetch
/// and replaced, never mutated, when the horizon changes.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ForecastSeries {
    pub area_name: String,
    pub formula_name: String,
    pub horizon: Horizon,
    pub historical: Vec<TimeSeriesPoint>,
    pub forecast: Vec<TimeSeriesPoint>,
    pub total_forecast: f64,
    pub summary: ForecastSummary,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    pub forecast_average: f64,
    pub prior_year_average: f64,
    pub absolute_delta: f64,
    pub percent_delta: f64,
    pub is_increase: bool,
    pub has_prior_year_data: bool,
    pub forecast_window_label: String,
    pub prior_year_window_label: String,
}

impl ComparisonResult {
    /// Delta as the dashboard badge shows it, e.g. `↗ 27.3%`.
    pub fn percent_label(&self) -> String {
        let arrow = if self.is_increase { '↗' } else { '↘' };
        format!("{} {:.1}%", arrow, self.percent_delta.abs())
    }
}

/// A fetched leaf of the aggregation tree.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LeafResult {
    pub series: ForecastSeries,
    pub comparison: Option<ComparisonResult>,
}
