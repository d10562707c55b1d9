//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        AckResponse, CaptureRequest, CaptureResponse, DecideRequest, DecideResponse,
        DistanceRequest, DistanceResponse, HealthResponse, MetaResponse, PolicyResponse,
        PolicyUpdateRequest,
    },
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use vitrine_core::{
    CapturePlanner, DecisionEngine, DecisionInput, MetaStore, PolicyStore, haversine_distance_meters,
    meters_to_confidence, now_millis,
};

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// POLICY HANDLERS
// =============================================================================

/// Get the stored capture policy.
pub async fn get_policy_handler(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.read().await;
    (StatusCode::OK, Json(PolicyResponse::success(store.load_policy())))
}

/// Update the capture policy.
pub async fn set_policy_handler(
    State(state): State<AppState>,
    Json(request): Json<PolicyUpdateRequest>,
) -> impl IntoResponse {
    let mut store = state.store.write().await;
    let policy = match request.apply_to(store.load_policy()) {
        Ok(policy) => policy,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(PolicyResponse::error(e.to_string())));
        }
    };

    match store.save_policy(&policy) {
        Ok(()) => (StatusCode::OK, Json(PolicyResponse::success(policy))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(PolicyResponse::error(format!("Save failed: {e}"))),
        ),
    }
}

/// Forget the stored policy.
pub async fn reset_policy_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut store = state.store.write().await;
    match store.reset_policy() {
        Ok(()) => (StatusCode::OK, Json(AckResponse::success())),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(AckResponse::error(format!("Reset failed: {e}"))),
        ),
    }
}

// =============================================================================
// META HANDLERS
// =============================================================================

/// Get the last-capture memory.
pub async fn get_meta_handler(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.read().await;
    (StatusCode::OK, Json(MetaResponse::success(store.load_meta())))
}

/// Forget the last-capture memory.
pub async fn reset_meta_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut store = state.store.write().await;
    match store.reset_meta() {
        Ok(()) => (StatusCode::OK, Json(AckResponse::success())),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(AckResponse::error(format!("Reset failed: {e}"))),
        ),
    }
}

// =============================================================================
// DECIDE HANDLER
// =============================================================================

/// Dry-run decision. Nothing is written.
pub async fn decide_handler(
    State(state): State<AppState>,
    Json(request): Json<DecideRequest>,
) -> impl IntoResponse {
    if let Err(e) = request.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(DecideResponse::error(e.to_string())),
        );
    }

    let store = state.store.read().await;
    let policy = request.policy.unwrap_or_else(|| store.load_policy());
    let meta = request.meta.clone().unwrap_or_else(|| store.load_meta());
    drop(store);

    let input = DecisionInput {
        exhibitions: &request.exhibitions,
        policy: &policy,
        meta: &meta,
        current_location: request.current_location,
        explicit_target_id: request.explicit_target_id.as_deref(),
    };
    let evaluation = DecisionEngine::evaluate(&input, request.now.unwrap_or_else(now_millis));

    (
        StatusCode::OK,
        Json(DecideResponse::from_evaluation(evaluation)),
    )
}

// =============================================================================
// CAPTURE HANDLER
// =============================================================================

/// Attribute a capture and record it in the memory.
///
/// The store lock is held from loading the memory until the new memory is
/// written, so concurrent captures are serialized.
pub async fn capture_handler(
    State(state): State<AppState>,
    Json(request): Json<CaptureRequest>,
) -> impl IntoResponse {
    if let Err(e) = request.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(CaptureResponse::error(e.to_string())),
        );
    }

    let current_location = match request.current_location {
        Some(point) => Some(point),
        None => {
            state
                .location
                .current_location(state.location_timeout)
                .await
        }
    };

    let mut store = state.store.write().await;
    let policy = store.load_policy();
    let meta = store.load_meta();
    let now = now_millis();

    let input = DecisionInput {
        exhibitions: &request.exhibitions,
        policy: &policy,
        meta: &meta,
        current_location,
        explicit_target_id: request.explicit_target_id.as_deref(),
    };
    let (_, plan) = CapturePlanner::plan_capture(&input, request.section, now);

    match plan.record(&mut *store, now) {
        Ok(meta) => {
            tracing::info!(
                target_id = plan.target_id(),
                creates = plan.creates_record(),
                section = %plan.section,
                path = plan.path.as_str(),
                "capture planned"
            );
            (StatusCode::OK, Json(CaptureResponse::success(plan, meta)))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(CaptureResponse::error(format!("Recording capture failed: {e}"))),
        ),
    }
}

// =============================================================================
// DISTANCE HANDLER
// =============================================================================

/// Great-circle distance between two points.
pub async fn distance_handler(Json(request): Json<DistanceRequest>) -> impl IntoResponse {
    let meters = haversine_distance_meters(request.from, request.to);
    Json(DistanceResponse {
        meters,
        confidence: meters_to_confidence(meters),
    })
}
