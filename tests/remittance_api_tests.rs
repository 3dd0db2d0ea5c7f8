//! Remittance endpoints driven through the full router.

use axum::http::StatusCode;
use axum_test::TestServer;
use borderhop::api::server::BorderHopServer;
use borderhop::core::config::{AppConfig, DemoConfig};
use borderhop::core::{Transfer, TransferIntent, TransferLookup, TransferStatus};
use borderhop::storage::{MemoryTransferStore, TransferStore};
use bytes::Bytes;
use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.database_url = None;
    config
}

fn server_with(config: AppConfig) -> TestServer {
    let server = BorderHopServer::new_for_test(config).unwrap();
    TestServer::new(server.create_router()).unwrap()
}

/// Server whose primary store the test can inspect directly.
fn server_with_store(config: AppConfig) -> (TestServer, Arc<MemoryTransferStore>) {
    let store = Arc::new(MemoryTransferStore::new());
    let primary: Arc<dyn TransferStore> = store.clone();
    let server = BorderHopServer::from_parts(config, Some(primary)).unwrap();
    (TestServer::new(server.create_router()).unwrap(), store)
}

fn transfer_body() -> Value {
    json!({
        "amount": 100,
        "sourceChain": "ethereum",
        "destinationChain": "base",
        "recipientAddress": "0xAbC0000000000000000000000000000000000001",
        "senderAddress": "0xDEF0000000000000000000000000000000000002",
        "email": "alice@example.com",
        "note": "rent"
    })
}

fn stored_with_cctp_id(cctp_id: &str, intent: TransferIntent) -> Transfer {
    let mut t = Transfer::new(
        "BH_1_hooked".into(),
        "0xsender".into(),
        "0xrecipient".into(),
        250.0,
        "ethereum".into(),
        "base".into(),
        intent,
        Utc::now(),
    );
    t.cctp_transfer_id = Some(cctp_id.into());
    t
}

#[tokio::test]
async fn test_create_transfer_persists_normalized_record() {
    let (server, store) = server_with_store(test_config());

    let response = server.post("/api/remittance/transfer").json(&transfer_body()).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["estimatedFees"], 0.001);
    assert_eq!(body["message"], "Transfer initiated successfully");
    assert_eq!(body["route"]["optimalChain"], "base");
    assert!(body.get("demo").is_none());

    let id = body["transferId"].as_str().unwrap();
    assert!(id.starts_with("BH_"));

    let stored = store.find_one(&TransferLookup::ById(id.into())).await.unwrap().unwrap();
    assert_eq!(stored.recipient, "0xabc0000000000000000000000000000000000001");
    assert_eq!(stored.sender, "0xdef0000000000000000000000000000000000002");
    assert_eq!(stored.email.as_deref(), Some("alice@example.com"));
    assert_eq!(stored.note.as_deref(), Some("rent"));
    assert_eq!(stored.status, TransferStatus::Pending);
}

#[tokio::test]
async fn test_create_transfer_defaults_sender_to_zero_address() {
    let (server, store) = server_with_store(test_config());
    let mut body = transfer_body();
    body.as_object_mut().unwrap().remove("senderAddress");

    let response = server.post("/api/remittance/transfer").json(&body).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let id = response.json::<Value>()["transferId"].as_str().unwrap().to_string();

    let stored = store.find_one(&TransferLookup::ById(id)).await.unwrap().unwrap();
    assert_eq!(stored.sender, "0x0000000000000000000000000000000000000000");
}

#[tokio::test]
async fn test_create_transfer_missing_fields() {
    let server = server_with(test_config());
    for field in ["amount", "sourceChain", "destinationChain", "recipientAddress"] {
        let mut body = transfer_body();
        body.as_object_mut().unwrap().remove(field);
        let response = server.post("/api/remittance/transfer").json(&body).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "without {}", field);
        assert_eq!(response.json::<Value>()["error"], "Missing required fields");
    }
}

#[tokio::test]
async fn test_create_transfer_rejects_small_amount_and_unknown_intent() {
    let server = server_with(test_config());

    let mut tiny = transfer_body();
    tiny["amount"] = json!(0.001);
    let response = server.post("/api/remittance/transfer").json(&tiny).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_INPUT");

    let mut odd_intent = transfer_body();
    odd_intent["intent"] = json!("fastest");
    let response = server.post("/api/remittance/transfer").json(&odd_intent).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Invalid intent");
}

#[tokio::test]
async fn test_unsupported_chain_creates_demo_transfer() {
    let (server, store) = server_with_store(test_config());
    let mut body = transfer_body();
    body["sourceChain"] = json!("polygon");

    let response = server.post("/api/remittance/transfer").json(&body).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["demo"], true);
    assert_eq!(body["estimatedFees"], 0.001);
    assert!(body.get("route").is_none());

    let id = body["transferId"].as_str().unwrap();
    assert!(id.starts_with("demo_"));
    let stored = store.find_one(&TransferLookup::ById(id.into())).await.unwrap().unwrap();
    assert_eq!(
        stored.suggested_actions,
        vec!["Demo transfer - chain configuration not fully supported"]
    );
}

#[tokio::test]
async fn test_route_endpoint() {
    let server = server_with(test_config());

    let response = server
        .post("/api/remittance/route")
        .json(&json!({
            "amount": "250",
            "sourceChain": "ethereum",
            "destinationChain": "arbitrum",
            "intent": "minimize_fees"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["optimalChain"], "base");
    assert_eq!(body["data"]["estimatedFees"], 0.001);

    let response = server
        .post("/api/remittance/route")
        .json(&json!({ "sourceChain": "ethereum", "destinationChain": "base" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["success"], false);
}

#[tokio::test]
async fn test_status_unknown_transfer_is_404() {
    let server = server_with(test_config());
    let response = server.get("/api/remittance/status/BH_0_missing").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "Transfer not found");
}

#[tokio::test]
async fn test_status_of_fresh_transfer_stays_pending() {
    let server = server_with(test_config());
    let id = server.post("/api/remittance/transfer").json(&transfer_body()).await.json::<Value>()
        ["transferId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = server.get(&format!("/api/remittance/status/{}", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let view = &response.json::<Value>()["transfer"];
    assert_eq!(view["transferId"], id.as_str());
    assert_eq!(view["status"], "pending");
    assert_eq!(view["circleCCTP"], true);
    assert_eq!(view["hooksExecuted"], false);
    assert_eq!(view["completedAt"], Value::Null);
    assert_eq!(view["feesPaid"], 0.001);
}

#[tokio::test]
async fn test_demo_progression_steps_through_status_reads() {
    let mut config = test_config();
    config.demo = DemoConfig {
        enabled: true,
        cctp_id_after_secs: -1,
        burn_after_secs: -1,
        complete_after_secs: 3600,
    };
    let (server, store) = server_with_store(config);
    let id = server.post("/api/remittance/transfer").json(&transfer_body()).await.json::<Value>()
        ["transferId"]
        .as_str()
        .unwrap()
        .to_string();
    let lookup = TransferLookup::ById(id.clone());
    let path = format!("/api/remittance/status/{}", id);

    // One step per read: burn hash first, since it is checked before the CCTP id.
    let first = server.get(&path).await.json::<Value>();
    assert!(first["transfer"]["burnTxHash"].as_str().unwrap().starts_with("0x"));
    let stored = store.find_one(&lookup).await.unwrap().unwrap();
    assert!(stored.tx_hash.is_some());
    assert!(stored.cctp_transfer_id.is_none());

    server.get(&path).await;
    let stored = store.find_one(&lookup).await.unwrap().unwrap();
    assert!(stored.cctp_transfer_id.as_deref().unwrap().starts_with("cctp_"));
    assert_eq!(stored.status, TransferStatus::Pending);
}

#[tokio::test]
async fn test_demo_progression_completes_old_transfer() {
    let mut config = test_config();
    config.demo.complete_after_secs = -1;
    let server = server_with(config);
    let id = server.post("/api/remittance/transfer").json(&transfer_body()).await.json::<Value>()
        ["transferId"]
        .as_str()
        .unwrap()
        .to_string();

    let view = server.get(&format!("/api/remittance/status/{}", id)).await.json::<Value>()
        ["transfer"]
        .clone();
    assert_eq!(view["status"], "completed");
    assert_eq!(view["hooksExecuted"], true);
    assert!(view["mintTxHash"].as_str().unwrap().starts_with("0x"));
    assert!(view["completedAt"].is_string());
}

#[tokio::test]
async fn test_disabled_demo_never_advances() {
    let mut config = test_config();
    config.demo.enabled = false;
    config.demo.complete_after_secs = -1;
    let server = server_with(config);
    let id = server.post("/api/remittance/transfer").json(&transfer_body()).await.json::<Value>()
        ["transferId"]
        .as_str()
        .unwrap()
        .to_string();

    let view = server.get(&format!("/api/remittance/status/{}", id)).await.json::<Value>();
    assert_eq!(view["transfer"]["status"], "pending");
}

#[tokio::test]
async fn test_history_matches_either_side_case_insensitively() {
    let server = server_with(test_config());
    server.post("/api/remittance/transfer").json(&transfer_body()).await;
    let mut other = transfer_body();
    other["recipientAddress"] = json!("0x9990000000000000000000000000000000000009");
    server.post("/api/remittance/transfer").json(&other).await;

    let response = server
        .get("/api/remittance/history/0xDEF0000000000000000000000000000000000002")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["total"], 2);
    assert_eq!(body["history"].as_array().unwrap().len(), 2);
    assert_eq!(body["history"][0]["circleCCTP"], true);
    assert_eq!(body["history"][0]["fees"], 0.001);

    let response = server
        .get("/api/remittance/history/0x9990000000000000000000000000000000000009")
        .await;
    assert_eq!(response.json::<Value>()["total"], 1);

    let response = server.get("/api/remittance/history/0xnobody").await;
    assert_eq!(response.json::<Value>()["total"], 0);
}

#[tokio::test]
async fn test_chains_endpoint() {
    let mut config = test_config();
    config.chains.infura_project_id = Some("proj".into());
    let server = server_with(config);

    let body: Value = server.get("/api/remittance/chains").await.json();
    let chains = body["chains"].as_array().unwrap();
    assert_eq!(chains.len(), 3);
    assert_eq!(chains[0]["name"], "Ethereum");
    assert_eq!(chains[0]["id"], "ethereum");
    assert_eq!(chains[0]["rpc"], "https://sepolia.infura.io/v3/proj");
    assert_eq!(chains[1]["domain"], 6);
}

#[tokio::test]
async fn test_webhook_completes_transfer() {
    let (server, store) = server_with_store(test_config());
    store.create(&stored_with_cctp_id("cctp_done", TransferIntent::Standard)).await.unwrap();

    let response = server
        .post("/api/remittance/webhook")
        .json(&json!({
            "transferId": "cctp_done",
            "status": "completed",
            "destinationTxHash": "0xmint"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["transfer"]["status"], "completed");
    assert_eq!(body["transfer"]["destinationTxHash"], "0xmint");
    assert!(body["transfer"]["completedAt"].is_string());
    assert!(body.get("hook").is_none());
}

#[tokio::test]
async fn test_webhook_runs_yield_hook_for_maximize_yield() {
    let (server, store) = server_with_store(test_config());
    store.create(&stored_with_cctp_id("cctp_yield", TransferIntent::MaximizeYield)).await.unwrap();

    let body: Value = server
        .post("/api/remittance/webhook")
        .json(&json!({ "transferId": "cctp_yield", "status": "completed" }))
        .await
        .json();
    assert_eq!(body["hook"]["success"], true);
    assert_eq!(body["hook"]["hookId"], "hook_BH_1_hooked");
    assert_eq!(body["hook"]["result"]["protocol"], "aave");
    assert_eq!(body["hook"]["result"]["chain"], "base");
}

#[tokio::test]
async fn test_webhook_non_completed_status_marks_failed() {
    let (server, store) = server_with_store(test_config());
    store.create(&stored_with_cctp_id("cctp_bad", TransferIntent::Standard)).await.unwrap();

    let body: Value = server
        .post("/api/remittance/webhook")
        .json(&json!({ "transferId": "cctp_bad", "status": "reverted", "error": "attestation timeout" }))
        .await
        .json();
    assert_eq!(body["transfer"]["status"], "failed");
    assert_eq!(body["transfer"]["error"], "attestation timeout");
}

#[tokio::test]
async fn test_webhook_cannot_reopen_terminal_transfer() {
    let (server, store) = server_with_store(test_config());
    store.create(&stored_with_cctp_id("cctp_once", TransferIntent::Standard)).await.unwrap();

    let done = server
        .post("/api/remittance/webhook")
        .json(&json!({ "transferId": "cctp_once", "status": "completed" }))
        .await;
    assert_eq!(done.status_code(), StatusCode::OK);

    let late_failure = server
        .post("/api/remittance/webhook")
        .json(&json!({ "transferId": "cctp_once", "status": "failed" }))
        .await;
    assert_eq!(late_failure.status_code(), StatusCode::CONFLICT);

    let stored =
        store.find_one(&TransferLookup::ByCctpId("cctp_once".into())).await.unwrap().unwrap();
    assert_eq!(stored.status, TransferStatus::Completed);
}

#[tokio::test]
async fn test_webhook_rejects_bad_payload_and_unknown_transfer() {
    let server = server_with(test_config());

    let response = server.post("/api/remittance/webhook").json(&json!({ "status": "completed" })).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Failed to process webhook");

    let response = server
        .post("/api/remittance/webhook")
        .content_type("application/json")
        .bytes(Bytes::from_static(b"{not json"))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/remittance/webhook")
        .json(&json!({ "transferId": "cctp_ghost", "status": "completed" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_webhook_signature_enforced_when_enabled() {
    let mut config = test_config();
    config.webhook.verify_signature = true;
    config.webhook.secret = Some("whsec_test".into());
    let (server, store) = server_with_store(config);
    store.create(&stored_with_cctp_id("cctp_signed", TransferIntent::Standard)).await.unwrap();

    let payload = serde_json::to_vec(&json!({ "transferId": "cctp_signed", "status": "completed" }))
        .unwrap();

    let unsigned = server
        .post("/api/remittance/webhook")
        .content_type("application/json")
        .bytes(Bytes::from(payload.clone()))
        .await;
    assert_eq!(unsigned.status_code(), StatusCode::UNAUTHORIZED);

    let forged = server
        .post("/api/remittance/webhook")
        .content_type("application/json")
        .add_header("X-Circle-Signature", "deadbeef")
        .bytes(Bytes::from(payload.clone()))
        .await;
    assert_eq!(forged.status_code(), StatusCode::UNAUTHORIZED);

    let signature = borderhop::circle::sign_webhook_payload("whsec_test", &payload).unwrap();
    let signed = server
        .post("/api/remittance/webhook")
        .content_type("application/json")
        .add_header("X-Circle-Signature", signature.as_str())
        .bytes(Bytes::from(payload))
        .await;
    assert_eq!(signed.status_code(), StatusCode::OK);
    assert_eq!(signed.json::<Value>()["transfer"]["status"], "completed");
}

#[tokio::test]
async fn test_webhook_verification_without_secret_is_config_error() {
    let mut config = test_config();
    config.webhook.verify_signature = true;
    config.webhook.secret = None;
    let server = server_with(config);

    let response = server
        .post("/api/remittance/webhook")
        .json(&json!({ "transferId": "cctp_x", "status": "completed" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>()["code"], "CONFIG_ERROR");
}

#[tokio::test]
async fn test_cctp_status_reports_configuration() {
    let mut config = test_config();
    config.circle.api_key = Some("key".into());
    let server = server_with(config);

    let body: Value = server.get("/api/remittance/cctp/status").await.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["status"]["service"], "Circle CCTP V2");
    assert_eq!(body["status"]["apiConfigured"], true);
    assert_eq!(body["status"]["clientConfigured"], false);
    assert_eq!(body["status"]["infuraConfigured"], false);
    assert_eq!(body["status"]["supportedChains"], json!(["ethereum", "base", "arbitrum"]));
}

#[tokio::test]
async fn test_malformed_bodies_get_error_envelope() {
    let server = server_with(test_config());

    let mut body = transfer_body();
    body["sourceChain"] = json!(5);
    let response = server.post("/api/remittance/transfer").json(&body).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert_eq!(error["success"], false);
    assert_eq!(error["error"], "Invalid request body");
    assert_eq!(error["code"], "INVALID_INPUT");

    let response = server
        .post("/api/remittance/route")
        .bytes(Bytes::from_static(br#"{"amount":10,"sourceChain":"ethereum","destinationChain":"base"}"#))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_INPUT");

    let response = server
        .post("/api/defi/optimize-yield")
        .json(&json!({ "amount": 100, "chain": 5, "riskTolerance": "low" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Invalid request body");
}
