use crate::api::lib::parse_point_date;
use crate::core_logic::models::{ForecastSeries, ForecastSummary, Horizon, TimeSeriesPoint};
use serde_json::Value;

/// Field names a point's value may be reported under, most specific first.
const VALUE_KEYS: [&str; 7] = [
    "quantity",
    "value",
    "predicted_quantity",
    "yhat",
    "y",
    "demand",
    "forecast",
];

const HISTORICAL_KEYS: [&str; 3] = ["historical_data", "historicalData", "historical"];

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// First value present under any known key, 0 when none is.
pub fn point_value(item: &Value) -> f64 {
    VALUE_KEYS
        .iter()
        .find_map(|key| item.get(key).and_then(as_number))
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
        .max(0.0)
}

pub fn normalize_point(item: &Value) -> Option<TimeSeriesPoint> {
    let date = parse_point_date(item.get("date")?.as_str()?).ok()?;
    Some(TimeSeriesPoint::new(date, point_value(item)))
}

/// Points with unparseable dates are dropped; anything that is not an array
/// reads as empty.
pub fn normalize_points(items: Option<&Value>) -> Vec<TimeSeriesPoint> {
    let Some(items) = items.and_then(Value::as_array) else {
        return Vec::new();
    };

    let points: Vec<TimeSeriesPoint> = items.iter().filter_map(normalize_point).collect();
    if points.len() < items.len() {
        log::debug!(
            "dropped {} of {} points with unusable dates",
            items.len() - points.len(),
            items.len()
        );
    }
    points
}

pub fn historical_items(body: &Value) -> Option<&Value> {
    HISTORICAL_KEYS
        .iter()
        .find_map(|key| body.get(key).filter(|items| items.is_array()))
}

fn summary_from_body(body: &Value) -> ForecastSummary {
    let summary = body.get("summary");
    let summary_date = |key: &str| {
        summary
            .and_then(|s| s.get(key))
            .and_then(Value::as_str)
            .and_then(|raw| parse_point_date(raw).ok())
    };

    ForecastSummary {
        avg_daily: summary.and_then(|s| s.get("avg_daily")).and_then(as_number),
        forecast_start: summary_date("forecast_start"),
        forecast_end: summary_date("forecast_end"),
        medicines_count: body
            .get("medicines_count")
            .and_then(Value::as_u64)
            .and_then(|count| u32::try_from(count).ok()),
        medicines: body
            .get("medicines")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|name| name.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// Builds a `ForecastSeries` from a `/forecast` response body.
///
/// The echoed `area`/`formula` names are preferred over the requested ones.
/// `total_forecast` comes from the summary when present, otherwise it is the
/// sum of the forecast points.
pub fn normalize_forecast(
    body: &Value,
    area: &str,
    formula: &str,
    horizon: Horizon,
) -> ForecastSeries {
    let echoed = |key: &str, requested: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(requested)
            .to_string()
    };

    let historical = normalize_points(historical_items(body));
    let forecast = normalize_points(body.get("forecast"));
    let total_forecast = body
        .get("summary")
        .and_then(|s| s.get("total_forecast"))
        .and_then(as_number)
        .unwrap_or_else(|| forecast.iter().map(|p| p.value).sum());

    ForecastSeries {
        area_name: echoed("area", area),
        formula_name: echoed("formula", formula),
        horizon,
        historical,
        forecast,
        total_forecast,
        summary: summary_from_body(body),
    }
}
