//! Global request quota backed by `governor`.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorRateLimiter,
};
use serde_json::json;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Shared across every request the router serves.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    /// `requests` per `period`, all of which may arrive as one burst.
    /// Zero values are raised to one.
    pub fn new(requests: u32, period: Duration) -> Self {
        let burst = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        let replenish = period.checked_div(burst.get()).filter(|d| !d.is_zero());
        let quota = match replenish.and_then(Quota::with_period) {
            Some(quota) => quota.allow_burst(burst),
            None => Quota::per_second(burst),
        };
        Self { limiter: Arc::new(GovernorRateLimiter::direct(quota)) }
    }

    pub fn allow(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

/// Reject with 429 once the quota is spent.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    if limiter.allow() {
        return next.run(req).await;
    }

    warn!(path = %req.uri().path(), "Rate limit exceeded");
    (
        StatusCode::TOO_MANY_REQUESTS,
        [("Retry-After", "1")],
        Json(json!({
            "success": false,
            "error": "Too many requests",
            "code": "RATE_LIMIT_EXCEEDED",
        })),
    )
        .into_response()
}
