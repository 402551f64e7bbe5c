use crate::core_logic::aggregation::GroupingMode;
use crate::core_logic::models::Horizon;
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

pub fn horizon_from_days(days: u32) -> Result<Horizon> {
    Horizon::ALL
        .into_iter()
        .find(|horizon| horizon.days() == days)
        .ok_or(Error::InvalidHorizon(days))
}

pub fn grouping_mode_from_str(mode: &str) -> Result<GroupingMode> {
    match mode {
        "area" | "by-area" => Ok(GroupingMode::ByArea),
        "formula" | "by-formula" => Ok(GroupingMode::ByFormula),
        _ => Err(Error::InvalidGrouping(mode.to_string())),
    }
}

/// The forecasting API expects formula names with underscores instead of spaces.
pub fn formula_token(formula: &str) -> String {
    formula.replace(' ', "_")
}

/// Accepts plain ISO dates as well as the date-time forms the service and
/// raw uploads use.
pub fn parse_point_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Ok(datetime.date_naive());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
    ] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(datetime.date());
        }
    }
    Err(Error::InvalidDate(raw.to_string()))
}
