//! Service info, health and metrics

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;

use crate::api::server::AppState;
use crate::api::types::{CircleHealth, HealthResponse, NotFoundResponse, ServiceEndpoints, ServiceInfo};
use crate::routing::SUPPORTED_CHAIN_IDS;

pub const SERVICE_NAME: &str = "BorderHop Backend";

pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "BorderHop Backend API",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        endpoints: ServiceEndpoints {
            health: "/health",
            api: "/api/*",
            circle: "/api/circle/status",
            metrics: "/api/metrics",
        },
        documentation: "BorderHop Cross-Chain Remittance API",
        timestamp: Utc::now(),
    })
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let circle = &state.config.circle;
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        database: if state.store.has_primary() { "connected" } else { "disconnected" },
        circle: CircleHealth {
            environment: circle.environment.clone(),
            api_configured: circle.api_configured(),
            client_configured: circle.client_configured(),
        },
        chains: SUPPORTED_CHAIN_IDS,
        timestamp: Utc::now(),
    })
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to render metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn not_found() -> (StatusCode, Json<NotFoundResponse>) {
    (StatusCode::NOT_FOUND, Json(NotFoundResponse { error: "Route not found" }))
}
