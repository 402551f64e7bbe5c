//! Forecast aggregation and year-over-year comparison for the pharmacy
//! demand dashboard.
//!
//! Forecasts come from an external forecasting service through a
//! [`ForecastSource`]. Leaves are compared against the same window a year
//! earlier with [`compare`], grouped per area or per formula in a
//! [`ForecastTree`], and mapped to screen space by [`Chart`].

pub mod adapters;
pub mod api;
pub mod config;
pub mod core_logic;
pub mod error;
pub mod session;

pub use adapters::{ForecastSource, HttpForecastSource};
pub use config::Config;
pub use core_logic::aggregation::{ChildState, ForecastTree, GroupingMode};
pub use core_logic::chart::{Chart, ChartLayout, ChartView};
pub use core_logic::comparison::compare;
pub use core_logic::metadata::{load_metadata, Metadata};
pub use core_logic::models::{
    ComparisonResult, ForecastSeries, Horizon, LeafResult, TimeSeriesPoint,
};
pub use error::{Error, Result};
pub use session::{Capability, Role, Session};
