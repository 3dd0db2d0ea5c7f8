//! Circle integration status

use axum::{extract::State, response::Json};
use chrono::Utc;
use tracing::error;

use crate::api::server::AppState;
use crate::api::types::{
    from_service_error, ApiResult, CircleChainSummary, CircleDomainsResponse, CircleStatusResponse,
};
use crate::routing::chain_catalogue;

pub async fn circle_status(State(state): State<AppState>) -> Json<CircleStatusResponse> {
    let supported_chains = chain_catalogue(state.config.chains.infura_project_id.as_deref())
        .into_iter()
        .map(|c| CircleChainSummary {
            name: c.id,
            domain: c.domain,
            usdc: c.usdc,
            token_messenger: c.token_messenger,
        })
        .collect();

    Json(CircleStatusResponse {
        status: "configured",
        environment: state.config.circle.environment.clone(),
        base_url: state.circle.base_url().to_string(),
        supported_chains,
        timestamp: Utc::now(),
    })
}

/// Domains as reported by Circle itself.
pub async fn circle_domains(State(state): State<AppState>) -> ApiResult<CircleDomainsResponse> {
    match state.circle.get_supported_domains().await {
        Ok(domains) => Ok(Json(CircleDomainsResponse { success: true, domains })),
        Err(e) => {
            error!("Failed to fetch CCTP domains: {}", e);
            state.metrics.circle_api_errors.inc();
            Err(from_service_error(&e, "Failed to fetch supported domains"))
        }
    }
}
