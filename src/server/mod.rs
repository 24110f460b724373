//! HTTP surface over the published snapshot.
//!
//! Handlers only read the current `Arc<Snapshot>`; they never trigger a
//! refresh. Everything answers 503 until the first refresh succeeds.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::Metric;
use crate::error::AppError;
use crate::math::Transform;
use crate::report::{SeriesQuery, select};
use crate::service::Aggregator;

const NOT_READY: &str = "no snapshot published yet";

pub fn router(aggregator: Arc<Aggregator>) -> Router {
    Router::new()
        .route("/ready", get(ready))
        .route("/data", get(data))
        .route("/series", get(series))
        .route("/status", get(status))
        .with_state(aggregator)
}

/// Bind and serve until ctrl-c.
pub async fn serve(aggregator: Arc<Aggregator>, bind: SocketAddr) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| AppError::new(2, format!("Failed to bind {bind}: {e}")))?;
    info!(%bind, "http listening");

    axum::serve(listener, router(aggregator))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::new(4, format!("HTTP server failed: {e}")))?;

    info!("http stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler unavailable; serving until killed");
        std::future::pending::<()>().await;
    }
}

async fn ready(State(agg): State<Arc<Aggregator>>) -> StatusCode {
    if agg.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn data(State(agg): State<Arc<Aggregator>>) -> Response {
    let Some(snapshot) = agg.snapshot() else {
        return (StatusCode::SERVICE_UNAVAILABLE, NOT_READY).into_response();
    };
    match serde_json::to_vec(snapshot.as_ref()) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            warn!(error = %e, "snapshot serialisation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct SeriesParams {
    metric: Option<String>,
    geo: Option<String>,
    transform: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

async fn series(State(agg): State<Arc<Aggregator>>, Query(params): Query<SeriesParams>) -> Response {
    let query = match parse_series_params(params) {
        Ok(q) => q,
        Err(msg) => return (StatusCode::BAD_REQUEST, msg).into_response(),
    };
    let Some(snapshot) = agg.snapshot() else {
        return (StatusCode::SERVICE_UNAVAILABLE, NOT_READY).into_response();
    };
    match select(&snapshot, &query) {
        Ok(view) => Json(view).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

async fn status(State(agg): State<Arc<Aggregator>>) -> Response {
    Json(agg.status()).into_response()
}

fn parse_series_params(params: SeriesParams) -> Result<SeriesQuery, String> {
    let metric = params.metric.as_deref().unwrap_or(Metric::NewCases.key());
    let metric = Metric::from_key(metric).ok_or_else(|| format!("unknown metric '{metric}'"))?;

    let mut query = SeriesQuery::new(metric, params.geo.as_deref().unwrap_or(crate::domain::ROOT));
    if let Some(t) = params.transform.as_deref() {
        query.transform = Transform::from_key(t).ok_or_else(|| format!("unknown transform '{t}'"))?;
    }
    query.from = params.from.as_deref().map(parse_date).transpose()?;
    query.to = params.to.as_deref().map(parse_date).transpose()?;
    Ok(query)
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| format!("invalid date '{s}' (expected YYYY-MM-DD)"))
}
