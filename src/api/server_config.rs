//! Server limits

use std::time::Duration;

/// Concurrent request limit
pub const MAX_CONCURRENCY: usize = 256;

/// Request body limit
pub const MAX_BODY_SIZE: usize = 1024 * 1024; // 1MB

/// Request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// CORS preflight cache
pub const CORS_MAX_AGE: Duration = Duration::from_secs(3600);

/// Global rate limit
pub const RATE_LIMIT_REQUESTS: u32 = 10000;
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(1);
