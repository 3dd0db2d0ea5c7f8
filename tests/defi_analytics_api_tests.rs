use axum::http::StatusCode;
use axum_test::TestServer;
use borderhop::api::server::BorderHopServer;
use borderhop::core::config::AppConfig;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_case::test_case;

fn test_server() -> TestServer {
    let mut config = AppConfig::default();
    config.storage.database_url = None;
    let server = BorderHopServer::new_for_test(config).unwrap();
    TestServer::new(server.create_router()).unwrap()
}

async fn send(server: &TestServer, amount: f64, destination: &str, intent: &str) {
    let response = server
        .post("/api/remittance/transfer")
        .json(&json!({
            "amount": amount,
            "sourceChain": "ethereum",
            "destinationChain": destination,
            "recipientAddress": "0x1111111111111111111111111111111111111111",
            "intent": intent
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_protocols_listing() {
    let server = test_server();
    let body: Value = server.get("/api/defi/protocols").await.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["totalProtocols"], 4);
    assert_eq!(body["supportedChains"], json!(["ethereum", "base", "arbitrum"]));

    let aave = &body["protocols"][0];
    assert_eq!(aave["id"], "aave");
    assert_eq!(aave["name"], "Aave");
    assert_eq!(aave["minDeposit"], 100.0);
    assert_eq!(aave["risk"], "low");
    let average = aave["averageAPY"].as_f64().unwrap();
    assert!((average - 0.045).abs() < 1e-9);
}

#[test_case("low", 2 ; "low risk keeps lending only")]
#[test_case("medium", 3 ; "medium adds curve")]
#[test_case("high", 4 ; "high accepts everything")]
#[tokio::test]
async fn test_optimize_yield_by_risk(risk: &str, suitable: u64) {
    let server = test_server();
    let body: Value = server
        .post("/api/defi/optimize-yield")
        .json(&json!({ "amount": 10000, "chain": "base", "riskTolerance": risk }))
        .await
        .json();
    assert_eq!(body["analysis"]["suitableProtocols"], suitable);
    assert_eq!(body["recommendations"].as_array().unwrap().len() as u64, suitable);
    assert_eq!(body["analysis"]["gasFee"], 0.005);
}

#[tokio::test]
async fn test_optimize_yield_filters_by_min_deposit() {
    let server = test_server();
    let body: Value = server
        .post("/api/defi/optimize-yield")
        .json(&json!({ "amount": 75, "chain": "ethereum", "riskTolerance": "high" }))
        .await
        .json();
    let ids: Vec<&str> = body["recommendations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["compound"]);
    assert_eq!(body["analysis"]["totalProtocols"], 4);
}

#[tokio::test]
async fn test_optimize_yield_validation() {
    let server = test_server();
    let response = server
        .post("/api/defi/optimize-yield")
        .json(&json!({ "amount": 100, "chain": "base" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/defi/optimize-yield")
        .json(&json!({ "amount": 100, "chain": "base", "riskTolerance": "reckless" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Invalid risk tolerance");
}

#[tokio::test]
async fn test_simulate_deposit() {
    let server = test_server();
    let response = server
        .post("/api/defi/simulate-deposit")
        .json(&json!({ "protocol": "aave", "chain": "base", "amount": 1000, "autoCompound": true }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let sim = &body["simulation"];
    assert_eq!(sim["protocol"], "Aave");
    assert_eq!(sim["apy"], 0.052);
    assert!((sim["returns"]["yearly"].as_f64().unwrap() - 52.0).abs() < 1e-9);
    assert!((sim["fees"]["total"].as_f64().unwrap() - 0.008).abs() < 1e-12);
    assert_eq!(sim["hook"]["success"], true);
    assert_eq!(sim["hook"]["result"]["parameters"]["autoCompound"], true);
}

#[tokio::test]
async fn test_simulate_deposit_errors() {
    let server = test_server();
    let response = server
        .post("/api/defi/simulate-deposit")
        .json(&json!({ "protocol": "maker", "chain": "base", "amount": 1000 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Protocol not found");

    let response = server
        .post("/api/defi/simulate-deposit")
        .json(&json!({ "protocol": "aave", "chain": "solana", "amount": 1000 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Protocol not supported on this chain");

    let response = server
        .post("/api/defi/simulate-deposit")
        .json(&json!({ "protocol": "aave", "chain": "base" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Missing required fields");
}

#[tokio::test]
async fn test_chain_data_endpoints() {
    let server = test_server();

    let body: Value = server.get("/api/defi/liquidity/arbitrum").await.json();
    assert_eq!(body["chain"], "arbitrum");
    assert_eq!(body["data"]["topPairs"][2]["pair"], "USDC/ARB");
    let response = server.get("/api/defi/liquidity/solana").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let body: Value = server.get("/api/defi/farming/ethereum").await.json();
    assert_eq!(body["totalOpportunities"], 2);
    let body: Value = server.get("/api/defi/farming/solana").await.json();
    assert_eq!(body["totalOpportunities"], 0);

    let body: Value = server.get("/api/defi/gas-optimization/ethereum").await.json();
    assert_eq!(body["currentGasPrice"], 25.0);
    assert_eq!(body["strategies"].as_array().unwrap().len(), 3);
    assert_eq!(body["recommendations"][0]["name"], "Choose Optimal Chain");
    let body: Value = server.get("/api/defi/gas-optimization/solana").await.json();
    assert_eq!(body["currentGasPrice"], 0.0);
}

#[tokio::test]
async fn test_analytics_on_empty_store() {
    let server = test_server();

    let body: Value = server.get("/api/analytics/dashboard").await.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["dashboard"]["overview"]["totalTransfers"], 0);
    assert_eq!(body["dashboard"]["overview"]["totalVolume"], "$0");

    let body: Value = server.get("/api/analytics/savings-comparison").await.json();
    assert_eq!(body["comparison"]["savings"]["percentage"], 0.0);

    let body: Value = server.get("/api/analytics/insights").await.json();
    assert_eq!(body["insights"]["userBehavior"]["mostPopularIntent"], "standard");
}

#[tokio::test]
async fn test_analytics_reflect_stored_transfers() {
    let server = test_server();
    send(&server, 1000.0, "base", "maximize_yield").await;
    send(&server, 500.0, "base", "standard").await;
    send(&server, 250.0, "arbitrum", "maximize_yield").await;

    let body: Value = server.get("/api/analytics/dashboard").await.json();
    let overview = &body["dashboard"]["overview"];
    assert_eq!(overview["totalTransfers"], 3);
    assert_eq!(overview["totalVolume"], "$1,750");
    assert_eq!(overview["averageTransferSize"], "$583.33");
    assert_eq!(body["dashboard"]["chainDistribution"]["base"], 2);
    assert_eq!(body["dashboard"]["intentDistribution"]["maximize_yield"], 2);
    assert_eq!(body["dashboard"]["recentActivity"].as_array().unwrap().len(), 3);

    let body: Value = server.get("/api/analytics/performance").await.json();
    assert_eq!(body["performance"]["chains"]["mostPopular"], "base");

    let body: Value = server.get("/api/analytics/insights").await.json();
    assert_eq!(body["insights"]["userBehavior"]["mostPopularIntent"], "maximize_yield");
    assert_eq!(body["insights"]["userBehavior"]["volumeTrend"], "high");

    let body: Value = server.get("/api/analytics/realtime").await.json();
    assert_eq!(body["realtime"]["recentActivity"].as_array().unwrap().len(), 3);
    assert_eq!(body["realtime"]["liveMetrics"]["transfersToday"], 3);
}

#[tokio::test]
async fn test_service_routes() {
    let server = test_server();

    let body: Value = server.get("/").await.json();
    assert_eq!(body["service"], "BorderHop Backend API");
    assert_eq!(body["status"], "running");

    let body: Value = server.get("/health").await.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "disconnected");
    assert_eq!(body["circle"]["apiConfigured"], false);
    assert_eq!(body["chains"], json!(["ethereum", "base", "arbitrum"]));

    let body: Value = server.get("/api/circle/status").await.json();
    assert_eq!(body["status"], "configured");
    assert_eq!(body["baseUrl"], "https://api-sandbox.circle.com/v1");
    assert_eq!(body["supportedChains"][2]["domain"], 3);

    let response = server.get("/api/nowhere").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>(), json!({ "error": "Route not found" }));
}

#[tokio::test]
async fn test_metrics_count_created_transfers() {
    let server = test_server();
    send(&server, 20.0, "base", "standard").await;

    let response = server.get("/api/metrics").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let text = response.text();
    assert!(text.contains("transfers_created_total{kind=\"routed\"} 1"));
}
