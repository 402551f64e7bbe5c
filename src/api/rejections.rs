use crate::api::models::ServiceErrorBody;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::{reject, Rejection, Reply};

#[derive(Debug)]
pub struct InternalServerError;

impl reject::Reject for InternalServerError {}

/// Malformed query values, such as an unsupported horizon or grouping mode.
#[derive(Debug)]
pub struct BadRequest;

impl reject::Reject for BadRequest {}

/// Turns rejections into JSON error replies with a matching status code.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found")
    } else if err.find::<BadRequest>().is_some()
        || err.find::<reject::InvalidQuery>().is_some()
    {
        (StatusCode::BAD_REQUEST, "invalid query parameters")
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    } else {
        if err.find::<InternalServerError>().is_none() {
            log::error!("unhandled rejection: {:?}", err);
        }
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    };

    let body = ServiceErrorBody {
        error: Some(message.to_string()),
        hint: None,
    };
    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
