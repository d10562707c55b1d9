//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Payload fields are camelCase, matching the persisted records and the
//! decision call shape (`targetExhibitionId`, `createNew`, ...).

use serde::{Deserialize, Serialize};
use vitrine_core::{
    CaptureMeta, CaptureMode, CapturePlan, CapturePolicy, CaptureSection, Confidence, Decision,
    DecisionPath, Evaluation, ExhibitionRef, GeoPoint, VitrineError, validate_pool,
};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// POLICY
// =============================================================================

/// Partial policy update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyUpdateRequest {
    #[serde(default)]
    pub time_window_minutes: Option<u32>,
    #[serde(default)]
    pub distance_threshold_meters: Option<u32>,
    #[serde(default)]
    pub mode: Option<String>,
}

impl PolicyUpdateRequest {
    /// Apply the update on top of `current` and validate the result.
    pub fn apply_to(&self, current: CapturePolicy) -> Result<CapturePolicy, VitrineError> {
        let mode = match self.mode.as_deref() {
            Some(mode) => mode.parse::<CaptureMode>()?,
            None => current.mode,
        };
        let policy = CapturePolicy {
            time_window_minutes: self
                .time_window_minutes
                .unwrap_or(current.time_window_minutes),
            distance_threshold_meters: self
                .distance_threshold_meters
                .unwrap_or(current.distance_threshold_meters),
            mode,
        };
        policy.validate()?;
        Ok(policy)
    }
}

/// Policy response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<CapturePolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PolicyResponse {
    pub fn success(policy: CapturePolicy) -> Self {
        Self {
            success: true,
            policy: Some(policy),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            policy: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// META
// =============================================================================

/// Last-capture memory response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<CaptureMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MetaResponse {
    pub fn success(meta: CaptureMeta) -> Self {
        Self {
            success: true,
            meta: Some(meta),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            meta: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// DECIDE REQUEST/RESPONSE
// =============================================================================

/// Dry-run decision request.
///
/// `policy` and `meta` default to the stored values; `now` defaults to the
/// server clock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideRequest {
    pub exhibitions: Vec<ExhibitionRef>,
    #[serde(default)]
    pub policy: Option<CapturePolicy>,
    #[serde(default)]
    pub meta: Option<CaptureMeta>,
    #[serde(default)]
    pub current_location: Option<GeoPoint>,
    #[serde(default)]
    pub explicit_target_id: Option<String>,
    #[serde(default)]
    pub now: Option<i64>,
}

impl DecideRequest {
    /// Validate caller-supplied fields.
    pub fn validate(&self) -> Result<(), VitrineError> {
        validate_pool(&self.exhibitions)?;
        if let Some(policy) = &self.policy {
            policy.validate()?;
        }
        Ok(())
    }
}

/// Decision response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<DecisionPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DecideResponse {
    pub fn from_evaluation(evaluation: Evaluation) -> Self {
        Self {
            success: true,
            decision: Some(evaluation.decision),
            path: Some(evaluation.path),
            distance_meters: evaluation.distance_meters,
            confidence: evaluation.confidence,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            decision: None,
            path: None,
            distance_meters: None,
            confidence: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// CAPTURE REQUEST/RESPONSE
// =============================================================================

/// A capture to attribute and record.
///
/// Without `currentLocation` the server asks its configured location source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    pub exhibitions: Vec<ExhibitionRef>,
    #[serde(default)]
    pub current_location: Option<GeoPoint>,
    #[serde(default)]
    pub explicit_target_id: Option<String>,
    #[serde(default)]
    pub section: CaptureSection,
}

impl CaptureRequest {
    /// Validate caller-supplied fields.
    pub fn validate(&self) -> Result<(), VitrineError> {
        validate_pool(&self.exhibitions)
    }
}

/// Capture response: the plan the journal must carry out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<CapturePlan>,
    /// Memory after the capture, when it changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<CaptureMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaptureResponse {
    pub fn success(plan: CapturePlan, meta: Option<CaptureMeta>) -> Self {
        Self {
            success: true,
            plan: Some(plan),
            meta,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            plan: None,
            meta: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// DISTANCE REQUEST/RESPONSE
// =============================================================================

/// Distance between two points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceRequest {
    pub from: GeoPoint,
    pub to: GeoPoint,
}

/// Distance and its confidence band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceResponse {
    pub meters: f64,
    pub confidence: Confidence,
}

// =============================================================================
// GENERIC ACKNOWLEDGEMENT
// =============================================================================

/// Response for resets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AckResponse {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
        }
    }
}
