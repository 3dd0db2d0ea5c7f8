use axum::{
    error_handling::HandleErrorLayer,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::{limit::ConcurrencyLimitLayer, timeout::TimeoutLayer, BoxError, ServiceBuilder};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::api::handlers;
use crate::api::server_config::*;
use crate::api::types::{api_error, ApiError};
use crate::circle::CircleClient;
use crate::core::config::AppConfig;
use crate::core::errors::BorderHopError;
use crate::monitoring::BorderHopMetrics;
use crate::network::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::storage::{connect_with_retry, FallbackTransferStore, TransferStore};

pub type AppState = Arc<BorderHopServer>;

pub struct BorderHopServer {
    pub config: AppConfig,
    pub store: Arc<FallbackTransferStore>,
    pub circle: Arc<CircleClient>,
    pub metrics: Arc<BorderHopMetrics>,
    pub rate_limiter: RateLimiter,
}

impl BorderHopServer {
    /// Connect the configured database (with retries) and build the server.
    pub async fn new(config: AppConfig) -> Result<Self, BorderHopError> {
        let primary = connect_with_retry(&config.storage)
            .await
            .map(|store| Arc::new(store) as Arc<dyn TransferStore>);
        Self::from_parts(config, primary)
    }

    pub fn from_parts(
        config: AppConfig,
        primary: Option<Arc<dyn TransferStore>>,
    ) -> Result<Self, BorderHopError> {
        let metrics = Arc::new(BorderHopMetrics::new()?);
        let store = Arc::new(FallbackTransferStore::new(primary, metrics.clone()));
        let circle = Arc::new(CircleClient::new(&config.circle));
        let rate_limiter = RateLimiter::new(RATE_LIMIT_REQUESTS, RATE_LIMIT_WINDOW);

        info!(
            backend = store.backend_name(),
            circle_environment = %config.circle.environment,
            circle_api_configured = config.circle.api_configured(),
            "BorderHop server initialised"
        );

        Ok(Self { config, store, circle, metrics, rate_limiter })
    }

    /// In-memory storage only; no database is touched.
    pub fn new_for_test(config: AppConfig) -> Result<Self, BorderHopError> {
        Self::from_parts(config, None)
    }

    fn cors_layer(&self) -> CorsLayer {
        let configured = self.config.server.cors_allow_origin.trim();
        let allow_origin = if configured == "*" {
            AllowOrigin::any()
        } else {
            let origins: Vec<HeaderValue> = configured
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|s| match HeaderValue::from_str(s) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin: {}", s);
                        None
                    }
                })
                .collect();
            AllowOrigin::list(origins)
        };

        info!("CORS configured to allow origin: {}", configured);

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::ORIGIN,
                header::HeaderName::from_static("x-circle-signature"),
            ])
            .expose_headers([header::CONTENT_TYPE])
            .max_age(CORS_MAX_AGE)
    }

    pub fn create_router(self) -> Router {
        let cors = self.cors_layer();
        let limiter = self.rate_limiter.clone();
        let state: AppState = Arc::new(self);

        let remittance = Router::new()
            .route("/route", post(handlers::remittance::calculate_route))
            .route("/transfer", post(handlers::remittance::create_transfer))
            .route("/status/:transfer_id", get(handlers::remittance::transfer_status))
            .route("/chains", get(handlers::remittance::list_chains))
            .route("/history/:address", get(handlers::remittance::transfer_history))
            .route("/webhook", post(handlers::remittance::circle_webhook))
            .route("/cctp/status", get(handlers::remittance::cctp_status));

        let defi = Router::new()
            .route("/protocols", get(handlers::defi::list_protocols))
            .route("/optimize-yield", post(handlers::defi::optimize_yield))
            .route("/simulate-deposit", post(handlers::defi::simulate_deposit))
            .route("/liquidity/:chain", get(handlers::defi::chain_liquidity))
            .route("/farming/:chain", get(handlers::defi::farming))
            .route("/gas-optimization/:chain", get(handlers::defi::gas_optimization));

        let analytics = Router::new()
            .route("/dashboard", get(handlers::analytics::dashboard))
            .route("/savings-comparison", get(handlers::analytics::savings_comparison))
            .route("/performance", get(handlers::analytics::performance))
            .route("/insights", get(handlers::analytics::insights))
            .route("/realtime", get(handlers::analytics::realtime));

        Router::new()
            .route("/", get(handlers::health::service_info))
            .route("/health", get(handlers::health::health_check))
            .route("/api/metrics", get(handlers::health::metrics))
            .route("/api/circle/status", get(handlers::circle::circle_status))
            .route("/api/circle/domains", get(handlers::circle::circle_domains))
            .nest("/api/remittance", remittance)
            .nest("/api/defi", defi)
            .nest("/api/analytics", analytics)
            .fallback(handlers::health::not_found)
            .with_state(state)
            .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
            .layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(handle_middleware_error))
                    .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENCY))
                    .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
                    .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                    .layer(TraceLayer::new_for_http()),
            )
            .layer(cors)
    }

    pub async fn start(self) -> Result<(), anyhow::Error> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let app = self.create_router();
        info!("BorderHop backend listening on {}", addr);
        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("BorderHop backend stopped");
        Ok(())
    }
}

/// Timeouts and load shedding from the tower stack, in the shared error body.
async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        warn!("Request timed out");
        api_error(StatusCode::REQUEST_TIMEOUT, "Request timed out", "TIMEOUT")
    } else {
        warn!("Request rejected by middleware: {}", err);
        api_error(StatusCode::SERVICE_UNAVAILABLE, "Service overloaded", "SERVICE_UNAVAILABLE")
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
