//! Unit tests for API types serialization/deserialization.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use vitrine::api::{
    AckResponse, CaptureRequest, CaptureResponse, DecideRequest, DecideResponse, HealthResponse,
    PolicyResponse, PolicyUpdateRequest,
};
use vitrine_core::{
    CaptureMode, CapturePlan, CapturePolicy, CaptureSection, CaptureTarget, CreateReason,
    DecisionPath, ExhibitionRef, GeoPoint, MetaUpdate, VitrineError,
};

// =============================================================================
// HEALTH RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

// =============================================================================
// POLICY TESTS
// =============================================================================

#[test]
fn test_policy_update_request_is_partial() {
    let request: PolicyUpdateRequest = serde_json::from_str(r#"{"mode":"force-new"}"#).unwrap();
    assert_eq!(request.time_window_minutes, None);

    let policy = request.apply_to(CapturePolicy::default()).unwrap();
    assert_eq!(policy.mode, CaptureMode::ForceNew);
    assert_eq!(policy.time_window_minutes, 120);
}

#[test]
fn test_policy_update_request_validates() {
    let request = PolicyUpdateRequest {
        time_window_minutes: Some(0),
        ..Default::default()
    };
    assert!(matches!(
        request.apply_to(CapturePolicy::default()),
        Err(VitrineError::InvalidPolicy(_))
    ));

    let request = PolicyUpdateRequest {
        mode: Some("FORCE_NEW".to_string()),
        ..Default::default()
    };
    assert!(request.apply_to(CapturePolicy::default()).is_err());
}

#[test]
fn test_policy_response_wire_names() {
    let json = serde_json::to_string(&PolicyResponse::success(CapturePolicy::default())).unwrap();
    assert!(json.contains(r#""timeWindowMinutes":120"#));
    assert!(json.contains(r#""distanceThresholdMeters":200"#));
    assert!(json.contains(r#""mode":"auto""#));
    assert!(!json.contains("error"));

    let json = serde_json::to_string(&PolicyResponse::error("nope")).unwrap();
    assert!(json.contains(r#""success":false"#));
    assert!(!json.contains("policy"));
}

// =============================================================================
// DECIDE TESTS
// =============================================================================

#[test]
fn test_decide_request_optional_fields() {
    let request: DecideRequest =
        serde_json::from_str(r#"{"exhibitions":[{"id":"1","createdAt":"2024-03-01"}]}"#).unwrap();
    assert_eq!(request.exhibitions.len(), 1);
    assert!(request.policy.is_none());
    assert!(request.meta.is_none());
    assert!(request.current_location.is_none());
    assert!(request.now.is_none());
    assert!(request.validate().is_ok());
}

#[test]
fn test_decide_request_rejects_long_ids() {
    let request = DecideRequest {
        exhibitions: vec![ExhibitionRef::new("x".repeat(300))],
        ..Default::default()
    };
    assert!(matches!(
        request.validate(),
        Err(VitrineError::InvalidInput(_))
    ));
}

#[test]
fn test_decide_response_error_omits_decision() {
    let json = serde_json::to_string(&DecideResponse::error("bad pool")).unwrap();
    assert!(json.contains(r#""error":"bad pool""#));
    assert!(!json.contains("decision"));
    assert!(!json.contains("distanceMeters"));
}

// =============================================================================
// CAPTURE TESTS
// =============================================================================

#[test]
fn test_capture_request_defaults_to_photos() {
    let request: CaptureRequest = serde_json::from_str(
        r#"{"exhibitions":[],"currentLocation":{"lat":48.8606,"lng":2.3376}}"#,
    )
    .unwrap();
    assert_eq!(request.section, CaptureSection::Photos);
    assert_eq!(request.current_location, Some(GeoPoint::new(48.8606, 2.3376)));
    assert!(request.validate().is_ok());
}

#[test]
fn test_capture_response_wire_shape() {
    let plan = CapturePlan {
        target: CaptureTarget::New {
            id: "1700000000000".to_string(),
            reason: CreateReason::TargetMissing,
        },
        section: CaptureSection::Photos,
        meta_update: Some(MetaUpdate {
            exhibition_id: "1700000000000".to_string(),
            location: None,
        }),
        path: DecisionPath::WithinWindow,
    };

    let value = serde_json::to_value(CaptureResponse::success(plan, None)).unwrap();
    assert_eq!(value["plan"]["target"]["kind"], "new");
    assert_eq!(value["plan"]["target"]["reason"], "target_missing");
    assert_eq!(value["plan"]["metaUpdate"]["exhibitionId"], "1700000000000");
    assert_eq!(value["plan"]["path"], "within_window");
    assert!(value.get("meta").is_none());
}

#[test]
fn test_ack_response() {
    assert!(AckResponse::success().success);
    assert_eq!(AckResponse::error("x").error.as_deref(), Some("x"));
}
