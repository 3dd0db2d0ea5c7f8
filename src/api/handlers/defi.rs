//! DeFi yield endpoints, all backed by static tables.

use axum::{
    extract::Path,
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::types::*;
use crate::core::validation::required;
use crate::core::BorderHopError;
use crate::defi::{self, DefiProtocol, RiskLevel};

#[derive(Serialize)]
pub struct ProtocolSummary {
    #[serde(flatten)]
    pub protocol: &'static DefiProtocol,
    #[serde(rename = "averageAPY")]
    pub average_apy: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolsResponse {
    pub success: bool,
    pub protocols: Vec<ProtocolSummary>,
    pub total_protocols: usize,
    pub supported_chains: Vec<&'static str>,
    pub timestamp: DateTime<Utc>,
}

pub async fn list_protocols() -> Json<ProtocolsResponse> {
    let protocols: Vec<ProtocolSummary> = defi::protocols()
        .iter()
        .map(|p| ProtocolSummary { protocol: p, average_apy: p.average_apy() })
        .collect();
    Json(ProtocolsResponse {
        success: true,
        total_protocols: protocols.len(),
        protocols,
        supported_chains: defi::supported_chains(),
        timestamp: Utc::now(),
    })
}

#[derive(Serialize)]
pub struct OptimizeYieldResponse {
    pub success: bool,
    #[serde(flatten)]
    pub optimization: defi::YieldOptimization,
    pub timestamp: DateTime<Utc>,
}

pub async fn optimize_yield(
    ApiJson(req): ApiJson<OptimizeYieldRequest>,
) -> ApiResult<OptimizeYieldResponse> {
    let (Some(amount), Some(chain), Some(risk)) = (
        req.amount.filter(|a| *a != 0.0),
        required(&req.chain),
        required(&req.risk_tolerance),
    ) else {
        return Err(missing_fields());
    };

    let risk = RiskLevel::parse(risk).ok_or_else(|| {
        api_error(StatusCode::BAD_REQUEST, "Invalid risk tolerance", "INVALID_INPUT")
    })?;

    Ok(Json(OptimizeYieldResponse {
        success: true,
        optimization: defi::optimize_yield(amount, chain, risk),
        timestamp: Utc::now(),
    }))
}

#[derive(Serialize)]
pub struct SimulateDepositResponse {
    pub success: bool,
    pub simulation: defi::DepositSimulation,
    pub message: &'static str,
}

pub async fn simulate_deposit(
    ApiJson(req): ApiJson<SimulateDepositRequest>,
) -> ApiResult<SimulateDepositResponse> {
    let (Some(protocol), Some(chain), Some(amount)) = (
        required(&req.protocol),
        required(&req.chain),
        req.amount.filter(|a| *a != 0.0),
    ) else {
        return Err(missing_fields());
    };

    let simulation = defi::simulate_deposit(protocol, chain, amount, req.auto_compound, Utc::now())
        .map_err(|e| match e {
            BorderHopError::ValidationError(msg) => {
                api_error(StatusCode::BAD_REQUEST, &msg, "INVALID_INPUT")
            }
            other => from_service_error(&other, "Failed to simulate DeFi deposit"),
        })?;

    Ok(Json(SimulateDepositResponse {
        success: true,
        simulation,
        message: "DeFi deposit simulation completed with CCTP V2 hooks",
    }))
}

#[derive(Serialize)]
pub struct LiquidityResponse {
    pub success: bool,
    pub chain: String,
    pub data: defi::ChainLiquidity,
    pub timestamp: DateTime<Utc>,
}

pub async fn chain_liquidity(Path(chain): Path<String>) -> ApiResult<LiquidityResponse> {
    let data = defi::liquidity(&chain)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Chain not supported", "INVALID_INPUT"))?;
    Ok(Json(LiquidityResponse { success: true, chain, data, timestamp: Utc::now() }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmingResponse {
    pub success: bool,
    pub chain: String,
    pub opportunities: Vec<defi::FarmingOpportunity>,
    pub total_opportunities: usize,
    pub timestamp: DateTime<Utc>,
}

pub async fn farming(Path(chain): Path<String>) -> Json<FarmingResponse> {
    let opportunities = defi::farming_opportunities(&chain);
    Json(FarmingResponse {
        success: true,
        chain,
        total_opportunities: opportunities.len(),
        opportunities,
        timestamp: Utc::now(),
    })
}

#[derive(Serialize)]
pub struct GasOptimizationResponse {
    pub success: bool,
    pub chain: String,
    #[serde(flatten)]
    pub optimization: defi::GasOptimization,
    pub timestamp: DateTime<Utc>,
}

pub async fn gas_optimization(Path(chain): Path<String>) -> Json<GasOptimizationResponse> {
    let optimization = defi::gas_optimization(&chain);
    Json(GasOptimizationResponse { success: true, chain, optimization, timestamp: Utc::now() })
}
