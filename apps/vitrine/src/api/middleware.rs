//! # Middleware Module
//!
//! Rate limiting for the Vitrine HTTP API.
//!
//! ## Configuration
//!
//! Rate limiting is configured via environment variable:
//! - `VITRINE_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Default rate limit when the variable is unset.
const DEFAULT_RATE_LIMIT: u32 = 100;

/// Fallback quota for a zero passed directly to `create_rate_limiter`.
const FALLBACK_RPS: NonZeroU32 = NonZeroU32::MIN;

// =============================================================================
// RATE LIMITER
// =============================================================================

/// Global rate limiter type alias.
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Create a new global rate limiter allowing `requests_per_second`.
pub fn create_rate_limiter(requests_per_second: u32) -> GlobalRateLimiter {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(FALLBACK_RPS);
    Arc::new(RateLimiter::direct(Quota::per_second(rps)))
}

/// Rate limit from `VITRINE_RATE_LIMIT`, or the default when unset or
/// unparsable.
pub fn get_rate_limit_from_env() -> u32 {
    std::env::var("VITRINE_RATE_LIMIT")
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_RATE_LIMIT)
}

/// Rate limiting middleware.
///
/// Returns 429 Too Many Requests once the global quota is spent.
pub async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    match limiter.check() {
        Ok(()) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
            Err((StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_allows_first_request() {
        let limiter = create_rate_limiter(5);
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn zero_quota_still_builds() {
        let limiter = create_rate_limiter(0);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
