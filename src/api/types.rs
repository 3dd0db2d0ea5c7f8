use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::core::errors::BorderHopError;
use crate::core::{Transfer, TransferStatus};
use crate::defi::HookExecutionResult;
use crate::routing::RouteData;

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn api_error(status: StatusCode, error: &str, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: error.to_string(),
            code: code.to_string(),
            message: None,
        }),
    )
}

/// `Json` body extractor whose rejections use the shared error body.
///
/// Malformed JSON, a wrongly typed field or a missing `Content-Type` all
/// answer 400 `INVALID_INPUT`; the parser's text goes into `message`.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(invalid_body(&rejection)),
        }
    }
}

pub fn invalid_body(rejection: &JsonRejection) -> ApiError {
    let detail = rejection.body_text();
    warn!(status = %rejection.status(), "Rejected request body: {}", detail);
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            success: false,
            error: "Invalid request body".to_string(),
            code: "INVALID_INPUT".to_string(),
            message: Some(detail),
        }),
    )
}

/// Map a service error to its status and code. `error` is the public summary,
/// the error's own text goes into `message`.
pub fn from_service_error(err: &BorderHopError, error: &str) -> ApiError {
    (
        err.status_code(),
        Json(ErrorResponse {
            success: false,
            error: error.to_string(),
            code: err.code().to_string(),
            message: Some(err.to_string()),
        }),
    )
}

pub fn missing_fields() -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "Missing required fields", "INVALID_INPUT")
}

/// Accept numbers and numeric strings; anything else counts as absent.
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<f64>,
    pub source_chain: Option<String>,
    pub destination_chain: Option<String>,
    pub intent: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteResponse {
    pub success: bool,
    pub data: RouteData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<f64>,
    pub source_chain: Option<String>,
    pub destination_chain: Option<String>,
    pub recipient_address: Option<String>,
    pub sender_address: Option<String>,
    pub intent: Option<String>,
    pub email: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferCreatedResponse {
    pub success: bool,
    pub transfer_id: String,
    pub message: String,
    pub status: TransferStatus,
    pub estimated_fees: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cctp_transfer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStatusView {
    pub transfer_id: String,
    pub status: TransferStatus,
    pub burn_tx_hash: Option<String>,
    pub mint_tx_hash: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub fees_paid: f64,
    #[serde(rename = "circleCCTP")]
    pub circle_cctp: bool,
    pub hooks_executed: bool,
}

impl From<&Transfer> for TransferStatusView {
    fn from(t: &Transfer) -> Self {
        let completed_at = match t.completed_at {
            Some(at) => Some(at),
            None if t.status == TransferStatus::Completed => Some(t.updated_at),
            None => None,
        };
        Self {
            transfer_id: t.transfer_id.clone(),
            status: t.status,
            burn_tx_hash: t.tx_hash.clone(),
            mint_tx_hash: t.destination_tx_hash.clone(),
            completed_at,
            fees_paid: t.estimated_fees,
            circle_cctp: true,
            hooks_executed: t.hooks_executed(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferStatusResponse {
    pub success: bool,
    pub transfer: TransferStatusView,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainSummary {
    pub name: String,
    pub id: String,
    pub domain: u32,
    pub usdc: String,
    pub rpc: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainsResponse {
    pub success: bool,
    pub chains: Vec<ChainSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub transfer_id: String,
    pub amount: f64,
    pub source_chain: String,
    pub destination_chain: String,
    pub status: TransferStatus,
    pub timestamp: DateTime<Utc>,
    pub fees: f64,
    #[serde(rename = "circleCCTP")]
    pub circle_cctp: bool,
    pub hooks_executed: bool,
}

impl From<&Transfer> for HistoryEntry {
    fn from(t: &Transfer) -> Self {
        Self {
            transfer_id: t.transfer_id.clone(),
            amount: t.amount,
            source_chain: t.source_chain.clone(),
            destination_chain: t.destination_chain.clone(),
            status: t.status,
            timestamp: t.created_at,
            fees: t.estimated_fees,
            circle_cctp: true,
            hooks_executed: t.hooks_executed(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub history: Vec<HistoryEntry>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub transfer: Transfer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook: Option<HookExecutionResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeYieldRequest {
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<f64>,
    pub chain: Option<String>,
    pub risk_tolerance: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateDepositRequest {
    pub protocol: Option<String>,
    pub chain: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<f64>,
    #[serde(default)]
    pub auto_compound: bool,
}

/// `GET /`
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub endpoints: ServiceEndpoints,
    pub documentation: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceEndpoints {
    pub health: &'static str,
    pub api: &'static str,
    pub circle: &'static str,
    pub metrics: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    pub circle: CircleHealth,
    pub chains: [&'static str; 3],
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleHealth {
    pub environment: String,
    pub api_configured: bool,
    pub client_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleChainSummary {
    pub name: &'static str,
    pub domain: u32,
    pub usdc: &'static str,
    pub token_messenger: &'static str,
}

/// `GET /api/circle/status`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleStatusResponse {
    pub status: &'static str,
    pub environment: String,
    pub base_url: String,
    pub supported_chains: Vec<CircleChainSummary>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CircleDomainsResponse {
    pub success: bool,
    pub domains: Vec<Value>,
}

/// `GET /api/remittance/cctp/status`
#[derive(Debug, Clone, Serialize)]
pub struct CctpStatusResponse {
    pub success: bool,
    pub status: CctpServiceStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CctpServiceStatus {
    pub service: &'static str,
    pub environment: String,
    pub supported_chains: [&'static str; 3],
    pub api_configured: bool,
    pub client_configured: bool,
    pub infura_configured: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotFoundResponse {
    pub error: &'static str,
}
