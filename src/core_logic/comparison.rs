use crate::core_logic::models::{ComparisonResult, TimeSeriesPoint};
use chrono::{Datelike, Months, NaiveDate};
use polars::prelude::*;

/// Compares the forecast window against the same window one calendar year
/// earlier in `historical`.
///
/// Returns `None` when either side is empty. A forecast window with no
/// historical coverage a year back still yields a result, flagged with
/// `has_prior_year_data = false` and zeroed figures.
pub fn compare(
    historical: &[TimeSeriesPoint],
    forecast: &[TimeSeriesPoint],
) -> Option<ComparisonResult> {
    if historical.is_empty() || forecast.is_empty() {
        return None;
    }

    let forecast_start = forecast.iter().map(|p| p.date).min()?;
    let forecast_end = forecast.iter().map(|p| p.date).max()?;
    let prior_start = one_year_earlier(forecast_start)?;
    let prior_end = one_year_earlier(forecast_end)?;

    let forecast_window_label = window_label(forecast_start, forecast_end);
    let prior_year_window_label = window_label(prior_start, prior_end);

    let averages = mean_value(forecast).and_then(|forecast_average| {
        let prior = window_mean(historical, prior_start, prior_end)?;
        Ok((forecast_average, prior))
    });

    let (forecast_average, prior_year_average) = match averages {
        Ok((forecast_average, Some(prior_year_average))) => (forecast_average, prior_year_average),
        Ok((_, None)) => {
            log::debug!(
                "no historical data in {}, skipping comparison",
                prior_year_window_label
            );
            return Some(ComparisonResult {
                forecast_average: 0.0,
                prior_year_average: 0.0,
                absolute_delta: 0.0,
                percent_delta: 0.0,
                is_increase: false,
                has_prior_year_data: false,
                forecast_window_label,
                prior_year_window_label,
            });
        }
        Err(e) => {
            log::warn!("comparison for {} failed: {}", forecast_window_label, e);
            return None;
        }
    };

    let absolute_delta = forecast_average - prior_year_average;

    Some(ComparisonResult {
        forecast_average,
        prior_year_average,
        absolute_delta,
        percent_delta: percent_change(forecast_average, prior_year_average),
        is_increase: forecast_average > prior_year_average,
        has_prior_year_data: true,
        forecast_window_label,
        prior_year_window_label,
    })
}

/// Calendar-year subtraction. Feb 29 clamps to Feb 28.
pub fn one_year_earlier(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_months(Months::new(12))
}

pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

pub fn points_to_dataframe(points: &[TimeSeriesPoint]) -> PolarsResult<DataFrame> {
    // Dates are stored as days since the common era so the window filter
    // stays a plain integer comparison.
    let date_series = Series::new(
        "Date",
        points
            .iter()
            .map(|p| p.date.num_days_from_ce())
            .collect::<Vec<i32>>(),
    );
    let value_series = Series::new(
        "Value",
        points.iter().map(|p| p.value).collect::<Vec<f64>>(),
    );

    DataFrame::new(vec![date_series, value_series])
}

fn mean_value(points: &[TimeSeriesPoint]) -> PolarsResult<f64> {
    let df = points_to_dataframe(points)?;
    Ok(df.column("Value")?.mean().unwrap_or(0.0))
}

/// Mean of the points dated within `[start, end]`, `None` when none are.
fn window_mean(
    points: &[TimeSeriesPoint],
    start: NaiveDate,
    end: NaiveDate,
) -> PolarsResult<Option<f64>> {
    let windowed = points_to_dataframe(points)?
        .lazy()
        .filter(
            col("Date")
                .gt_eq(lit(start.num_days_from_ce()))
                .and(col("Date").lt_eq(lit(end.num_days_from_ce()))),
        )
        .collect()?;

    if windowed.height() == 0 {
        return Ok(None);
    }

    Ok(windowed.column("Value")?.mean())
}

fn window_label(start: NaiveDate, end: NaiveDate) -> String {
    format!("{} to {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
}
