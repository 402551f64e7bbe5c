//! In-memory `ForecastSource` used by the unit tests.

use crate::adapters::ForecastSource;
use crate::core_logic::models::{ForecastSeries, ForecastSummary, Horizon, TimeSeriesPoint};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{Duration as DateDuration, NaiveDate};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Pair = (String, String);

#[derive(Default)]
pub struct MockSource {
    areas: Vec<String>,
    formulas: Vec<String>,
    area_formulas: HashMap<String, Vec<String>>,
    failing_area_lookups: HashSet<String>,
    fail_areas: bool,
    daily: HashMap<Pair, f64>,
    failing: HashSet<Pair>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, String, Horizon)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

fn pair(area: &str, formula: &str) -> Pair {
    (area.to_string(), formula.to_string())
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|name| name.to_string()).collect()
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_areas(mut self, areas: &[&str]) -> Self {
        self.areas = names(areas);
        self
    }

    pub fn with_formulas(mut self, formulas: &[&str]) -> Self {
        self.formulas = names(formulas);
        self
    }

    pub fn with_area_formulas(mut self, area: &str, formulas: &[&str]) -> Self {
        self.area_formulas.insert(area.to_string(), names(formulas));
        self
    }

    pub fn failing_formulas_for(mut self, area: &str) -> Self {
        self.failing_area_lookups.insert(area.to_string());
        self
    }

    pub fn failing_areas(mut self) -> Self {
        self.fail_areas = true;
        self
    }

    /// Daily forecast value for a pair. The prior-year history is always 10.
    pub fn with_daily(mut self, area: &str, formula: &str, value: f64) -> Self {
        self.daily.insert(pair(area, formula), value);
        self
    }

    pub fn failing(mut self, area: &str, formula: &str) -> Self {
        self.failing.insert(pair(area, formula));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(String, String, Horizon)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn series(&self, area: &str, formula: &str, horizon: Horizon) -> ForecastSeries {
        let daily = self.daily.get(&pair(area, formula)).copied().unwrap_or(10.0);
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let prior_start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let days = horizon.days() as i64;

        let forecast: Vec<TimeSeriesPoint> = (0..days)
            .map(|i| TimeSeriesPoint::new(start + DateDuration::days(i), daily))
            .collect();
        let historical: Vec<TimeSeriesPoint> = (0..days)
            .map(|i| TimeSeriesPoint::new(prior_start + DateDuration::days(i), 10.0))
            .collect();

        ForecastSeries {
            area_name: area.to_string(),
            formula_name: formula.to_string(),
            horizon,
            historical,
            forecast,
            total_forecast: daily * days as f64,
            summary: ForecastSummary::default(),
        }
    }
}

#[async_trait]
impl ForecastSource for MockSource {
    async fn areas(&self) -> Result<Vec<String>> {
        if self.fail_areas {
            return Err(Error::Service {
                status: 500,
                message: "areas unavailable".to_string(),
            });
        }
        Ok(self.areas.clone())
    }

    async fn formulas(&self, area: Option<&str>) -> Result<Vec<String>> {
        match area {
            Some(area) if self.failing_area_lookups.contains(area) => Err(Error::Service {
                status: 500,
                message: format!("no formulas for {}", area),
            }),
            // Areas without an explicit list carry every formula.
            Some(area) => Ok(self
                .area_formulas
                .get(area)
                .cloned()
                .unwrap_or_else(|| self.formulas.clone())),
            None => Ok(self.formulas.clone()),
        }
    }

    async fn forecast(
        &self,
        area: &str,
        formula: &str,
        horizon: Horizon,
    ) -> Result<ForecastSeries> {
        self.calls
            .lock()
            .unwrap()
            .push((area.to_string(), formula.to_string(), horizon));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&pair(area, formula)) {
            return Err(Error::Service {
                status: 404,
                message: format!("No medicines found for formula \"{}\"", formula),
            });
        }
        Ok(self.series(area, formula, horizon))
    }
}
