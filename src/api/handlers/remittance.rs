//! Remittance endpoints: routing, transfers, status, history and the Circle webhook.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::api::server::AppState;
use crate::api::types::*;
use crate::circle::{process_webhook_event, verify_webhook_signature, CctpTransferRequest};
use crate::core::domain::{generate_transfer_id, ZERO_ADDRESS};
use crate::core::validation::{normalize_address, parse_intent, required, validate_amount};
use crate::core::{
    BorderHopError, Transfer, TransferIntent, TransferLookup, TransferPatch, TransferStatus,
};
use crate::defi::yield_hook_for;
use crate::routing::{
    calculate_optimal_route, chain_catalogue, find_chain, validate_chain_configuration, CCTP_FEE,
    SUPPORTED_CHAIN_IDS,
};
use crate::simulation::demo_progress;
use crate::storage::TransferStore;

pub const SIGNATURE_HEADER: &str = "x-circle-signature";

const DEMO_ACTION: &str = "Demo transfer - chain configuration not fully supported";

/// Missing or zero amounts count as absent, like missing chains.
fn present_amount(amount: Option<f64>) -> Option<f64> {
    amount.filter(|a| *a != 0.0)
}

fn storage_error(err: anyhow::Error, public: &str) -> ApiError {
    let err = BorderHopError::from(err);
    error!("{}: {}", public, err);
    from_service_error(&err, public)
}

/// POST /api/remittance/route
pub async fn calculate_route(ApiJson(req): ApiJson<RouteRequest>) -> ApiResult<RouteResponse> {
    let (Some(amount), Some(source), Some(destination)) = (
        present_amount(req.amount),
        required(&req.source_chain),
        required(&req.destination_chain),
    ) else {
        return Err(missing_fields());
    };

    let intent = parse_intent(req.intent.as_deref())
        .map_err(|e| from_service_error(&e, "Invalid intent"))?;

    let data = calculate_optimal_route(amount, source, destination, intent);
    Ok(Json(RouteResponse { success: true, data }))
}

/// POST /api/remittance/transfer
pub async fn create_transfer(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TransferRequest>,
) -> ApiResult<TransferCreatedResponse> {
    let (Some(amount), Some(source), Some(destination), Some(recipient)) = (
        present_amount(req.amount),
        required(&req.source_chain),
        required(&req.destination_chain),
        required(&req.recipient_address),
    ) else {
        return Err(missing_fields());
    };

    let amount = validate_amount(amount).map_err(|e| from_service_error(&e, "Invalid amount"))?;
    let intent = parse_intent(req.intent.as_deref())
        .map_err(|e| from_service_error(&e, "Invalid intent"))?;
    let sender = normalize_address(required(&req.sender_address).unwrap_or(ZERO_ADDRESS));
    let recipient = normalize_address(recipient);
    let now = Utc::now();

    info!(amount, source_chain = source, destination_chain = destination, %intent, "Transfer request received");

    if !validate_chain_configuration(source, destination) {
        let transfer_id = generate_transfer_id("demo");
        let mut transfer = Transfer::new(
            transfer_id.clone(),
            sender,
            recipient,
            amount,
            source.to_string(),
            destination.to_string(),
            intent,
            now,
        );
        transfer.estimated_fees = CCTP_FEE;
        transfer.suggested_actions = vec![DEMO_ACTION.to_string()];
        transfer.email = req.email.clone();
        transfer.note = req.note.clone();

        state
            .store
            .create(&transfer)
            .await
            .map_err(|e| storage_error(e, "Transfer failed"))?;
        state.metrics.record_transfer_created(true);
        info!(transfer_id = %transfer_id, "Demo transfer stored");

        return Ok(Json(TransferCreatedResponse {
            success: true,
            transfer_id,
            message: "Demo transfer initiated (chain configuration not fully supported)".into(),
            status: TransferStatus::Pending,
            estimated_fees: CCTP_FEE,
            cctp_transfer_id: None,
            route: None,
            demo: Some(true),
        }));
    }

    let route = calculate_optimal_route(amount, source, destination, intent);
    let transfer_id = generate_transfer_id("BH");
    let mut transfer = Transfer::new(
        transfer_id.clone(),
        sender,
        recipient,
        amount,
        source.to_string(),
        destination.to_string(),
        intent,
        now,
    );
    transfer.estimated_fees = route.estimated_fees;
    transfer.suggested_actions = route.suggested_actions.clone();
    transfer.email = req.email.clone();
    transfer.note = req.note.clone();

    state
        .store
        .create(&transfer)
        .await
        .map_err(|e| storage_error(e, "Transfer failed"))?;
    state.metrics.record_transfer_created(false);
    info!(transfer_id = %transfer_id, backend = state.store.backend_name(), "Transfer stored");

    let mut status = TransferStatus::Pending;
    let mut cctp_transfer_id = None;
    if state.config.circle.live_transfers && state.circle.is_configured() {
        let updated = initiate_burn(&state, &transfer).await?;
        status = updated.status;
        cctp_transfer_id = updated.cctp_transfer_id;
    }

    Ok(Json(TransferCreatedResponse {
        success: true,
        transfer_id,
        message: "Transfer initiated successfully".into(),
        status,
        estimated_fees: route.estimated_fees,
        cctp_transfer_id,
        route: Some(route),
        demo: None,
    }))
}

fn chain_id(name: &str) -> &str {
    name.trim_end_matches("-sepolia")
}

/// Burn on the source chain through Circle and record the outcome on the transfer.
async fn initiate_burn(state: &AppState, transfer: &Transfer) -> Result<Transfer, ApiError> {
    let infura = state.config.chains.infura_project_id.as_deref();
    let (Some(source), Some(destination)) = (
        find_chain(chain_id(&transfer.source_chain), infura),
        find_chain(chain_id(&transfer.destination_chain), infura),
    ) else {
        return Ok(transfer.clone());
    };

    let request = CctpTransferRequest {
        amount: transfer.amount.to_string(),
        destination_address: transfer.recipient.clone(),
        destination_domain: destination.domain,
        source_domain: source.domain,
        sender_address: transfer.sender.clone(),
    };
    let lookup = TransferLookup::ById(transfer.transfer_id.clone());

    match state.circle.initiate_transfer(&request).await {
        Ok(burn) => {
            let patch = TransferPatch {
                status: Some(TransferStatus::Processing),
                cctp_transfer_id: Some(burn.transfer_id),
                tx_hash: burn.tx_hash,
                ..Default::default()
            };
            let updated = state
                .store
                .find_one_and_update(&lookup, &patch)
                .await
                .map_err(|e| storage_error(e, "Transfer failed"))?;
            state.metrics.record_status(TransferStatus::Processing.as_str());
            Ok(updated.unwrap_or_else(|| transfer.clone()))
        }
        Err(e) => {
            error!(transfer_id = %transfer.transfer_id, "CCTP burn failed: {}", e);
            state.metrics.circle_api_errors.inc();
            let patch = TransferPatch {
                status: Some(TransferStatus::Failed),
                error: Some(e.to_string()),
                ..Default::default()
            };
            if let Err(store_err) = state.store.find_one_and_update(&lookup, &patch).await {
                error!(transfer_id = %transfer.transfer_id, "Failed to mark transfer failed: {}", store_err);
            } else {
                state.metrics.record_status(TransferStatus::Failed.as_str());
            }
            Err(from_service_error(&e, "Transfer failed"))
        }
    }
}

/// Reconcile against Circle's view of the transfer. Errors are logged and dropped.
async fn reconcile_with_circle(state: &AppState, transfer: Transfer) -> Transfer {
    let Some(cctp_id) = transfer.cctp_transfer_id.clone() else {
        return transfer;
    };
    if !state.circle.is_configured() {
        return transfer;
    }

    let remote = match state.circle.get_transfer_status(&cctp_id).await {
        Ok(remote) => remote,
        Err(e) => {
            warn!(transfer_id = %transfer.transfer_id, cctp_transfer_id = %cctp_id, "Error fetching CCTP status: {}", e);
            state.metrics.circle_api_errors.inc();
            return transfer;
        }
    };

    let Some(remote_status) = TransferStatus::parse(&remote.status) else {
        warn!(cctp_transfer_id = %cctp_id, status = %remote.status, "Unknown CCTP status");
        return transfer;
    };
    if remote_status == transfer.status {
        return transfer;
    }

    let patch = TransferPatch {
        status: Some(remote_status),
        tx_hash: remote.burn_tx_hash,
        destination_tx_hash: remote.mint_tx_hash,
        completed_at: remote.completed_at,
        ..Default::default()
    };
    let lookup = TransferLookup::ById(transfer.transfer_id.clone());
    match state.store.find_one_and_update(&lookup, &patch).await {
        Ok(Some(updated)) => {
            state.metrics.record_status(remote_status.as_str());
            updated
        }
        Ok(None) => transfer,
        Err(e) => {
            warn!(transfer_id = %transfer.transfer_id, "CCTP status not applied: {}", e);
            transfer
        }
    }
}

/// GET /api/remittance/status/:transfer_id
pub async fn transfer_status(
    State(state): State<AppState>,
    Path(transfer_id): Path<String>,
) -> ApiResult<TransferStatusResponse> {
    let lookup = TransferLookup::ById(transfer_id.clone());
    let mut transfer = state
        .store
        .find_one(&lookup)
        .await
        .map_err(|e| storage_error(e, "Failed to fetch transfer status"))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Transfer not found", "NOT_FOUND"))?;

    if let Some(patch) = demo_progress(&transfer, Utc::now(), &state.config.demo) {
        info!(transfer_id = %transfer_id, status = ?patch.status, "Advancing demo transfer");
        if let Some(updated) = state
            .store
            .find_one_and_update(&lookup, &patch)
            .await
            .map_err(|e| storage_error(e, "Failed to fetch transfer status"))?
        {
            if let Some(status) = patch.status {
                state.metrics.record_status(status.as_str());
            }
            transfer = updated;
        }
    }

    let transfer = reconcile_with_circle(&state, transfer).await;

    Ok(Json(TransferStatusResponse {
        success: true,
        transfer: TransferStatusView::from(&transfer),
    }))
}

/// GET /api/remittance/chains
pub async fn list_chains(State(state): State<AppState>) -> Json<ChainsResponse> {
    let chains = chain_catalogue(state.config.chains.infura_project_id.as_deref())
        .into_iter()
        .map(|c| ChainSummary {
            name: c.display_name(),
            id: c.id.to_string(),
            domain: c.domain,
            usdc: c.usdc.to_string(),
            rpc: c.rpc,
        })
        .collect();
    Json(ChainsResponse { success: true, chains })
}

/// GET /api/remittance/history/:address
pub async fn transfer_history(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<HistoryResponse> {
    let transfers = state
        .store
        .find_by_address(&normalize_address(&address))
        .await
        .map_err(|e| storage_error(e, "Failed to fetch transfer history"))?;

    let history: Vec<HistoryEntry> = transfers.iter().map(HistoryEntry::from).collect();
    let total = history.len();
    Ok(Json(HistoryResponse { success: true, history, total }))
}

fn check_signature(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), ApiError> {
    let webhook = &state.config.webhook;
    if !webhook.verify_signature {
        return Ok(());
    }
    let Some(secret) = required(&webhook.secret) else {
        error!("Webhook signature verification is on but no secret is configured");
        return Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Webhook secret not configured",
            "CONFIG_ERROR",
        ));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if signature.is_empty() || !verify_webhook_signature(secret, body, signature) {
        warn!("Rejected webhook with invalid signature");
        state.metrics.record_webhook("rejected");
        return Err(api_error(
            StatusCode::UNAUTHORIZED,
            "Invalid webhook signature",
            "INVALID_SIGNATURE",
        ));
    }
    Ok(())
}

/// POST /api/remittance/webhook
pub async fn circle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<WebhookResponse> {
    check_signature(&state, &headers, &body)?;

    let event = serde_json::from_slice::<Value>(&body)
        .map_err(BorderHopError::from)
        .and_then(|payload| process_webhook_event(&payload))
        .map_err(|e| {
            warn!("Invalid webhook payload: {}", e);
            state.metrics.record_webhook("invalid");
            api_error(StatusCode::BAD_REQUEST, "Failed to process webhook", "INVALID_INPUT")
        })?;

    info!(cctp_transfer_id = %event.transfer_id, status = %event.status, "Received CCTP webhook");

    let now = Utc::now();
    let completed = event.status == TransferStatus::Completed.as_str();
    let new_status = if completed { TransferStatus::Completed } else { TransferStatus::Failed };
    let patch = TransferPatch {
        status: Some(new_status),
        destination_tx_hash: event.destination_tx_hash.clone(),
        error: event.error.clone(),
        completed_at: completed.then_some(now),
        ..Default::default()
    };

    let lookup = TransferLookup::ByCctpId(event.transfer_id.clone());
    let updated = match state.store.find_one_and_update(&lookup, &patch).await {
        Ok(Some(updated)) => updated,
        Ok(None) => {
            warn!(cctp_transfer_id = %event.transfer_id, "Webhook received for unknown transfer");
            state.metrics.record_webhook("unknown_transfer");
            return Err(api_error(StatusCode::NOT_FOUND, "Transfer not found", "NOT_FOUND"));
        }
        Err(e) => {
            state.metrics.record_webhook("refused");
            return Err(storage_error(e, "Failed to process webhook"));
        }
    };

    state.metrics.record_webhook(new_status.as_str());
    state.metrics.record_status(new_status.as_str());
    info!(
        transfer_id = %updated.transfer_id,
        cctp_transfer_id = %event.transfer_id,
        status = %new_status,
        "Transfer status updated via webhook"
    );

    let hook = if completed && updated.intent == TransferIntent::MaximizeYield {
        info!(transfer_id = %updated.transfer_id, "Executing yield maximization hook");
        yield_hook_for(&updated, now)
    } else {
        None
    };

    Ok(Json(WebhookResponse { success: true, transfer: updated, hook }))
}

/// GET /api/remittance/cctp/status
pub async fn cctp_status(State(state): State<AppState>) -> Json<CctpStatusResponse> {
    let circle = &state.config.circle;
    Json(CctpStatusResponse {
        success: true,
        status: CctpServiceStatus {
            service: "Circle CCTP V2",
            environment: circle.environment.clone(),
            supported_chains: SUPPORTED_CHAIN_IDS,
            api_configured: circle.api_configured(),
            client_configured: circle.client_configured(),
            infura_configured: required(&state.config.chains.infura_project_id).is_some(),
            timestamp: Utc::now(),
        },
    })
}
