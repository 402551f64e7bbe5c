use crate::core_logic::models::{ForecastSeries, TimeSeriesPoint};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Roughly how many points a line is thinned down to before drawing.
pub const MAX_RENDERED_POINTS: usize = 200;
const TICK_COUNT: usize = 8;
const VALUE_PADDING: f64 = 0.1;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub padding_top: f64,
    pub padding_right: f64,
    pub padding_bottom: f64,
    pub padding_left: f64,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 400.0,
            padding_top: 20.0,
            padding_right: 20.0,
            padding_bottom: 60.0,
            padding_left: 60.0,
        }
    }
}

impl ChartLayout {
    pub fn plot_width(&self) -> f64 {
        self.width - self.padding_left - self.padding_right
    }

    pub fn plot_height(&self) -> f64 {
        self.height - self.padding_top - self.padding_bottom
    }
}

/// Which line is on screen. Showing history hides the forecast entirely.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChartView {
    Forecast,
    Historical {
        range: Option<(NaiveDate, NaiveDate)>,
    },
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ChartTick {
    pub x: f64,
    pub label: String,
}

fn day_number(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

/// Screen mapping for one series. Coordinates are relative to the plot area,
/// i.e. after padding.
#[derive(Debug, Clone)]
pub struct Chart {
    layout: ChartLayout,
    view: ChartView,
    points: Vec<TimeSeriesPoint>,
    min_value: f64,
    max_value: f64,
}

impl Chart {
    pub fn new(series: &ForecastSeries, view: ChartView, layout: ChartLayout) -> Self {
        let mut points: Vec<TimeSeriesPoint> = match view {
            ChartView::Forecast => series.forecast.clone(),
            ChartView::Historical { range } => series
                .historical
                .iter()
                .filter(|p| range.map_or(true, |(start, end)| p.date >= start && p.date <= end))
                .copied()
                .collect(),
        };
        points.sort_by_key(|p| p.date);

        let min_value = points.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
        let max_value = points
            .iter()
            .map(|p| p.value)
            .fold(f64::NEG_INFINITY, f64::max);

        Self {
            layout,
            view,
            points,
            min_value,
            max_value,
        }
    }

    pub fn layout(&self) -> &ChartLayout {
        &self.layout
    }

    pub fn shows_historical(&self) -> bool {
        matches!(self.view, ChartView::Historical { .. })
    }

    /// Every visible point, before down-sampling.
    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn day_bounds(&self) -> Option<(f64, f64)> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        Some((day_number(first.date), day_number(last.date)))
    }

    pub fn x_for(&self, date: NaiveDate) -> f64 {
        match self.day_bounds() {
            Some((min, max)) if max > min => {
                (day_number(date) - min) / (max - min) * self.layout.plot_width()
            }
            _ => 0.0,
        }
    }

    /// Inverse of [`Chart::x_for`], as a fractional day number.
    pub fn day_at(&self, x: f64) -> Option<f64> {
        let (min, max) = self.day_bounds()?;
        let width = self.layout.plot_width();
        if width <= 0.0 {
            return Some(min);
        }
        Some(min + (x / width) * (max - min))
    }

    pub fn y_for(&self, value: f64) -> f64 {
        let height = self.layout.plot_height();
        if self.points.is_empty() {
            return height;
        }
        let range = self.max_value - self.min_value;
        let padding = range * VALUE_PADDING;
        let span = range + 2.0 * padding;
        if span <= 0.0 {
            return height / 2.0;
        }
        height - ((value - (self.min_value - padding)) / span) * height
    }

    pub fn sample_rate(&self) -> usize {
        (self.points.len() / MAX_RENDERED_POINTS).max(1)
    }

    /// Every Nth point for drawing. Statistics keep using the full series.
    pub fn downsampled(&self) -> Vec<TimeSeriesPoint> {
        self.points
            .iter()
            .step_by(self.sample_rate())
            .copied()
            .collect()
    }

    /// The visible point closest in time to a click at `x`. Ties go to the
    /// earlier point.
    pub fn nearest_point(&self, x: f64) -> Option<&TimeSeriesPoint> {
        let clicked = self.day_at(x)?;

        let mut nearest = self.points.first()?;
        let mut best = (day_number(nearest.date) - clicked).abs();
        for point in &self.points[1..] {
            let distance = (day_number(point.date) - clicked).abs();
            if distance < best {
                best = distance;
                nearest = point;
            }
        }
        Some(nearest)
    }

    pub fn svg_path(&self) -> String {
        let mut path = String::new();
        for (i, point) in self.downsampled().iter().enumerate() {
            let command = if i == 0 { 'M' } else { 'L' };
            if i > 0 {
                path.push(' ');
            }
            let _ = write!(
                path,
                "{} {:.2} {:.2}",
                command,
                self.x_for(point.date),
                self.y_for(point.value)
            );
        }
        path
    }

    pub fn tick_labels(&self) -> Vec<ChartTick> {
        let shown = self.downsampled();
        let step = (shown.len() / TICK_COUNT).max(1);
        shown
            .iter()
            .step_by(step)
            .map(|point| ChartTick {
                x: self.x_for(point.date),
                label: point.date.format("%b %-d").to_string(),
            })
            .collect()
    }
}
