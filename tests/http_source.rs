use approx::assert_abs_diff_eq;
use forecast_engine::{
    load_metadata, ChildState, Error, ForecastSource, ForecastTree, GroupingMode, Horizon,
    HttpForecastSource, Role, Session,
};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Reply};

const TOKEN: &str = "secret-token";

fn error_reply(status: StatusCode, error: &str, hint: Option<&str>) -> Response {
    let body = match hint {
        Some(hint) => json!({ "error": error, "hint": hint }),
        None => json!({ "error": error }),
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

fn forecast_reply(query: HashMap<String, String>, auth: Option<String>) -> Response {
    let expected = format!("Bearer {}", TOKEN);
    if auth.as_deref() != Some(expected.as_str()) {
        return error_reply(StatusCode::UNAUTHORIZED, "token required", None);
    }

    let area = query.get("area").cloned().unwrap_or_default();
    let formula = query.get("formula").cloned().unwrap_or_default();
    let days: usize = query
        .get("days")
        .and_then(|days| days.parse().ok())
        .unwrap_or(30);

    if formula.contains(' ') {
        return error_reply(StatusCode::BAD_REQUEST, "formula must be a token", None);
    }
    if formula == "Cetirizine" {
        return error_reply(
            StatusCode::NOT_FOUND,
            "No medicines found for formula \"Cetirizine\"",
            Some("Add medicines for this formula first"),
        );
    }

    let daily = if formula.starts_with("Paracetamol") { 15 } else { 5 };
    let forecast: Vec<_> = (0..days)
        .map(|day| {
            let date = chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
                + chrono::Duration::days(day as i64);
            json!({ "date": date.to_string(), "predicted_quantity": daily, "source": "stored" })
        })
        .collect();
    let historical: Vec<_> = (0..days)
        .map(|day| {
            let date = chrono::NaiveDate::from_ymd_opt(2023, 6, 1).unwrap()
                + chrono::Duration::days(day as i64);
            json!({ "date": date.to_string(), "quantity": 10 })
        })
        .collect();

    warp::reply::json(&json!({
        "area": area,
        "formula": formula.replace('_', " "),
        "days": days,
        "medicines_count": 1,
        "medicines": ["Panadol"],
        "historical_data": historical,
        "forecast": forecast,
        "summary": {
            "total_forecast": daily * days,
            "avg_daily": daily,
            "forecast_start": "2024-06-01"
        }
    }))
    .into_response()
}

async fn spawn_mock_service() -> SocketAddr {
    let areas = warp::path!("api" / "forecast" / "metadata" / "areas")
        .map(|| warp::reply::json(&json!({ "areas": ["Clifton", "Saddar"] })));

    let formulas = warp::path!("api" / "forecast" / "metadata" / "formulas")
        .and(warp::query::<HashMap<String, String>>())
        .map(|query: HashMap<String, String>| {
            let formulas = match query.get("area").map(String::as_str) {
                Some("Saddar") => json!(["Paracetamol 500mg", "Cetirizine", "Amoxicillin"]),
                Some(_) => json!([]),
                None => json!(["Paracetamol 500mg", "Cetirizine", "Amoxicillin", "Ibuprofen"]),
            };
            warp::reply::json(&json!({ "formulas": formulas }))
        });

    let forecast = warp::path!("api" / "forecast")
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::header::optional::<String>("authorization"))
        .map(forecast_reply);

    let routes = warp::get().and(areas.or(formulas).or(forecast));
    let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    addr
}

fn client(addr: SocketAddr) -> HttpForecastSource {
    HttpForecastSource::new(
        format!("http://{}/api/", addr),
        Session::new(Role::Analyst).with_token(TOKEN),
    )
}

#[tokio::test]
async fn test_metadata_over_http() {
    let addr = spawn_mock_service().await;
    let source = client(addr);

    let metadata = load_metadata(&source).await.unwrap();

    assert_eq!(metadata.areas, vec!["Clifton", "Saddar"]);
    assert_eq!(metadata.formulas.len(), 4);
    assert_eq!(metadata.formulas_for("Saddar").len(), 3);
    assert!(metadata.formulas_for("Clifton").is_empty());

    let tree = ForecastTree::new(GroupingMode::ByArea, &metadata, Horizon::Days28);
    assert_eq!(tree.nodes().count(), 1);
    assert!(tree.node("Saddar").is_some());
}

#[tokio::test]
async fn test_forecast_over_http() {
    let addr = spawn_mock_service().await;
    let source = client(addr);

    let series = source
        .forecast("Saddar", "Paracetamol 500mg", Horizon::Days14)
        .await
        .unwrap();

    assert_eq!(series.area_name, "Saddar");
    assert_eq!(series.formula_name, "Paracetamol 500mg");
    assert_eq!(series.forecast.len(), 14);
    assert_eq!(series.historical.len(), 14);
    assert_eq!(series.total_forecast, 210.0);
    assert_eq!(series.summary.medicines, vec!["Panadol"]);

    let comparison =
        forecast_engine::compare(&series.historical, &series.forecast).unwrap();
    assert_abs_diff_eq!(comparison.percent_delta, 50.0, epsilon = 1e-9);
}

#[tokio::test]
async fn test_service_error_carries_message() {
    let addr = spawn_mock_service().await;
    let source = client(addr);

    let err = source
        .forecast("Saddar", "Cetirizine", Horizon::Days14)
        .await
        .unwrap_err();

    match err {
        Error::Service { status, message } => {
            assert_eq!(status, 404);
            assert!(message.contains("Cetirizine"));
            assert!(message.contains("Add medicines"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let addr = spawn_mock_service().await;
    let source = HttpForecastSource::new(
        format!("http://{}/api", addr),
        Session::new(Role::Analyst),
    );

    let err = source
        .forecast("Saddar", "Amoxicillin", Horizon::Days14)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Service { status: 401, .. }));
}

#[tokio::test]
async fn test_unreachable_service() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let source = HttpForecastSource::new(
        format!("http://127.0.0.1:{}/api", port),
        Session::new(Role::Analyst),
    );

    let err = source.areas().await.unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
}

#[tokio::test]
async fn test_tree_over_http_marks_failed_leaf_unavailable() {
    let addr = spawn_mock_service().await;
    let source = client(addr);
    let metadata = load_metadata(&source).await.unwrap();
    let mut tree = ForecastTree::new(GroupingMode::ByArea, &metadata, Horizon::Days28);

    let node = tree.expand_and_load("Saddar", &source).await.unwrap();

    assert!(node.is_loaded());
    assert!(matches!(
        node.children.get("Cetirizine"),
        Some(ChildState::Unavailable { .. })
    ));
    let summary = node.summary.as_ref().unwrap();
    assert_eq!(summary.available, 2);
    assert_eq!(summary.unavailable, 1);
    assert_eq!(summary.total_forecast, (15.0 + 5.0) * 28.0);
    assert!(summary.comparison.as_ref().unwrap().has_prior_year_data);
}
