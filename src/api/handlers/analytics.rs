//! Analytics over the transfer store.

use axum::{extract::State, response::Json};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::error;

use crate::analytics;
use crate::api::server::AppState;
use crate::api::types::{from_service_error, ApiError, ApiResult};
use crate::core::BorderHopError;

/// `{success, <key>: report, timestamp}`, or the named failure.
fn respond<T: Serialize>(key: &str, report: anyhow::Result<T>, failure: &str) -> ApiResult<Value> {
    let fail = |err: BorderHopError| -> ApiError {
        error!("{}: {}", failure, err);
        from_service_error(&err, failure)
    };

    let report = report.map_err(|e| fail(BorderHopError::from(e)))?;
    let value = serde_json::to_value(report).map_err(|e| fail(BorderHopError::from(e)))?;

    let mut body = Map::new();
    body.insert("success".into(), Value::Bool(true));
    body.insert(key.into(), value);
    body.insert("timestamp".into(), Value::String(Utc::now().to_rfc3339()));
    Ok(Json(Value::Object(body)))
}

pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Value> {
    let report = analytics::dashboard(state.store.as_ref()).await;
    respond("dashboard", report, "Failed to fetch analytics dashboard")
}

pub async fn savings_comparison(State(state): State<AppState>) -> ApiResult<Value> {
    let report = analytics::savings_comparison(state.store.as_ref()).await;
    respond("comparison", report, "Failed to calculate savings comparison")
}

pub async fn performance(State(state): State<AppState>) -> ApiResult<Value> {
    let report = analytics::performance(state.store.as_ref()).await;
    respond("performance", report, "Failed to fetch performance metrics")
}

pub async fn insights(State(state): State<AppState>) -> ApiResult<Value> {
    let report = analytics::insights(state.store.as_ref()).await;
    respond("insights", report, "Failed to fetch insights")
}

pub async fn realtime(State(state): State<AppState>) -> ApiResult<Value> {
    let report = analytics::realtime(state.store.as_ref(), Utc::now()).await;
    respond("realtime", report, "Failed to fetch real-time analytics")
}
