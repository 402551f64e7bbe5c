use forecast_engine::api::lib::{grouping_mode_from_str, horizon_from_days, parse_point_date};
use forecast_engine::api::models::{
    ChartParameters, ChartReply, ForecastParameters, SummaryParameters,
};
use forecast_engine::api::rejections::{handle_rejection, BadRequest, InternalServerError};
use forecast_engine::{
    compare, load_metadata, Capability, Chart, ChartLayout, ChartView, Config, ForecastSource,
    ForecastTree, Horizon, HttpForecastSource, LeafResult, Metadata,
};

use std::convert::Infallible;
use std::process;
use std::sync::Arc;
use warp::{reject, Filter, Rejection, Reply};

fn with_state<T>(state: T) -> impl Filter<Extract = (T,), Error = Infallible> + Clone
where
    T: Clone + Send,
{
    warp::any().map(move || state.clone())
}

fn resolve_horizon(days: Option<u32>, default: Horizon) -> Result<Horizon, Rejection> {
    match days {
        Some(days) => horizon_from_days(days).map_err(|e| {
            log::debug!("{}", e);
            reject::custom(BadRequest)
        }),
        None => Ok(default),
    }
}

async fn summary(
    params: SummaryParameters,
    source: Arc<HttpForecastSource>,
    metadata: Arc<Metadata>,
    default_horizon: Horizon,
) -> Result<impl Reply, Rejection> {
    let mode = grouping_mode_from_str(&params.mode).map_err(|_| reject::custom(BadRequest))?;
    let horizon = resolve_horizon(params.days, default_horizon)?;

    let mut tree = ForecastTree::new(mode, &metadata, horizon).with_filter(&params.name);
    let name = match tree.nodes().next() {
        Some(node) => node.name.clone(),
        None => return Err(reject::not_found()),
    };

    let node = tree
        .expand_and_load(&name, source.as_ref())
        .await
        .map_err(|_| reject::custom(InternalServerError))?;
    Ok(warp::reply::json(node))
}

async fn comparison(
    params: ForecastParameters,
    source: Arc<HttpForecastSource>,
    default_horizon: Horizon,
) -> Result<impl Reply, Rejection> {
    let horizon = resolve_horizon(params.days, default_horizon)?;

    match source.forecast(&params.area, &params.formula, horizon).await {
        Ok(series) => {
            let comparison = compare(&series.historical, &series.forecast);
            Ok(warp::reply::json(&LeafResult { series, comparison }))
        }
        Err(e) => {
            log::error!("forecast for {} / {} failed: {}", params.area, params.formula, e);
            Err(reject::custom(InternalServerError))
        }
    }
}

async fn chart(
    params: ChartParameters,
    source: Arc<HttpForecastSource>,
    default_horizon: Horizon,
) -> Result<impl Reply, Rejection> {
    let horizon = resolve_horizon(params.days, default_horizon)?;

    let parse_bound = |raw: &Option<String>| match raw.as_deref() {
        Some(raw) if !raw.is_empty() => parse_point_date(raw)
            .map(Some)
            .map_err(|_| reject::custom(BadRequest)),
        _ => Ok(None),
    };
    let range = match (parse_bound(&params.start)?, parse_bound(&params.end)?) {
        (Some(start), Some(end)) => Some((start, end)),
        _ => None,
    };
    let view = if params.historical.unwrap_or(false) {
        ChartView::Historical { range }
    } else {
        ChartView::Forecast
    };

    let series = source
        .forecast(&params.area, &params.formula, horizon)
        .await
        .map_err(|e| {
            log::error!("forecast for {} / {} failed: {}", params.area, params.formula, e);
            reject::custom(InternalServerError)
        })?;

    let chart = Chart::new(&series, view, ChartLayout::default());
    Ok(warp::reply::json(&ChartReply {
        area: series.area_name.clone(),
        formula: series.formula_name.clone(),
        showing_historical: chart.shows_historical(),
        point_count: chart.points().len(),
        nearest: params.x.and_then(|x| chart.nearest_point(x).copied()),
        path: chart.svg_path(),
        ticks: chart.tick_labels(),
    }))
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            process::exit(1);
        }
    };
    if let Err(e) = config.session.require(Capability::ViewForecasts) {
        log::error!("{}", e);
        process::exit(1);
    }

    let source = match HttpForecastSource::from_config(&config) {
        Ok(source) => Arc::new(source),
        Err(e) => {
            log::error!("could not build HTTP client: {}", e);
            process::exit(1);
        }
    };

    log::info!("Loading metadata from {}", config.api_url);
    let metadata = match load_metadata(source.as_ref()).await {
        Ok(metadata) => Arc::new(metadata),
        Err(e) => {
            log::error!("could not load metadata: {}", e);
            process::exit(1);
        }
    };

    let default_horizon = config.default_horizon;

    let metadata_route = warp::path("metadata")
        .and(warp::path::end())
        .and(with_state(Arc::clone(&metadata)))
        .map(|metadata: Arc<Metadata>| warp::reply::json(metadata.as_ref()));

    let summary_route = warp::path("summary")
        .and(warp::path::end())
        .and(warp::query::<SummaryParameters>())
        .and(with_state(Arc::clone(&source)))
        .and(with_state(Arc::clone(&metadata)))
        .and(with_state(default_horizon))
        .and_then(summary);

    let comparison_route = warp::path("comparison")
        .and(warp::path::end())
        .and(warp::query::<ForecastParameters>())
        .and(with_state(Arc::clone(&source)))
        .and(with_state(default_horizon))
        .and_then(comparison);

    let chart_route = warp::path("chart")
        .and(warp::path::end())
        .and(warp::query::<ChartParameters>())
        .and(with_state(Arc::clone(&source)))
        .and(with_state(default_horizon))
        .and_then(chart);

    let routes = warp::get()
        .and(metadata_route.or(summary_route).or(comparison_route).or(chart_route))
        .recover(handle_rejection)
        .with(warp::log("forecast_engine"));

    log::info!("Starting web server on {}", config.port);
    warp::serve(routes).run(([127, 0, 0, 1], config.port)).await;
}
