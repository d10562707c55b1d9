//! # Vitrine HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /policy` - Stored capture policy
//! - `POST /policy` - Partial policy update
//! - `POST /policy/reset` - Back to defaults
//! - `GET /meta` - Last-capture memory
//! - `POST /meta/reset` - Forget the last capture
//! - `POST /decide` - Dry-run decision
//! - `POST /capture` - Decide, plan and record a capture
//! - `POST /distance` - Haversine distance and confidence band
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `VITRINE_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `VITRINE_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `VITRINE_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::get_api_key_from_env;
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    AckResponse, CaptureRequest, CaptureResponse, DecideRequest, DecideResponse, DistanceRequest,
    DistanceResponse, HealthResponse, MetaResponse, PolicyResponse, PolicyUpdateRequest,
};

use crate::location::LocationProvider;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use vitrine_core::primitives::DEFAULT_LOCATION_TIMEOUT_MS;
use vitrine_core::{StorageBackend, VitrineError};

/// Maximum request body size (2 MiB).
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// Policy and memory storage. Captures take the write lock for their
    /// whole load-decide-record sequence.
    pub store: Arc<RwLock<StorageBackend>>,
    /// Fallback location source for captures that carry no location.
    pub location: Arc<LocationProvider>,
    pub location_timeout: Duration,
}

impl AppState {
    /// Create new app state over a store, without a location source.
    #[must_use]
    pub fn new(store: StorageBackend) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            location: Arc::new(LocationProvider::Disabled),
            location_timeout: Duration::from_millis(DEFAULT_LOCATION_TIMEOUT_MS),
        }
    }

    /// Use `provider` for captures that carry no location.
    #[must_use]
    pub fn with_location(mut self, provider: LocationProvider, timeout: Duration) -> Self {
        self.location = Arc::new(provider);
        self.location_timeout = timeout;
        self
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from `VITRINE_CORS_ORIGINS`.
///
/// - `*`: allows all origins
/// - unset: localhost only
/// - otherwise: comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("VITRINE_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (VITRINE_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in VITRINE_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                restricted_cors(allowed_origins)
            }
        }
        None => {
            tracing::info!("CORS: No VITRINE_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:8081",
        "http://localhost:19006",
        "http://127.0.0.1:8081",
        "http://127.0.0.1:19006",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();

    restricted_cors(origins)
}

fn restricted_cors(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting (if enabled)
/// 5. Authentication (if configured)
pub fn create_router(state: AppState) -> Router {
    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set VITRINE_API_KEY environment variable to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/policy",
            get(handlers::get_policy_handler).post(handlers::set_policy_handler),
        )
        .route("/policy/reset", post(handlers::reset_policy_handler))
        .route("/meta", get(handlers::get_meta_handler))
        .route("/meta/reset", post(handlers::reset_meta_handler))
        .route("/decide", post(handlers::decide_handler))
        .route("/capture", post(handlers::capture_handler))
        .route("/distance", post(handlers::distance_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer())
                .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and run until Ctrl+C.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), VitrineError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| VitrineError::Io(format!("Bind failed: {e}")))?;

    tracing::info!("Vitrine HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| VitrineError::Io(format!("Server error: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl+C; server runs until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
