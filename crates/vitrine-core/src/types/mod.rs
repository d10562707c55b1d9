//! # Core Type Definitions
//!
//! This module contains the value types shared by every layer of Vitrine:
//! - Coordinates (`GeoPoint`)
//! - User-tunable policy (`CapturePolicy`, `CaptureMode`)
//! - Last-capture memory (`CaptureMeta`)
//! - Candidate pool entries (`ExhibitionRef`)
//! - Engine output (`Decision`)
//! - Error types (`VitrineError`)
//!
//! Field names serialize in camelCase so persisted records and API payloads
//! keep the shape the mobile client already writes.

use crate::primitives::{
    DEFAULT_DISTANCE_THRESHOLD_METERS, DEFAULT_TIME_WINDOW_MINUTES, MAX_EXHIBITION_ID_LENGTH,
    MAX_POOL_SIZE, MILLIS_PER_MINUTE,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// GEO POINT
// =============================================================================

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Create a new point.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to another point, in meters.
    #[must_use]
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        crate::geo::haversine_distance_meters(*self, *other)
    }
}

impl FromStr for GeoPoint {
    type Err = VitrineError;

    /// Parse `"lat,lng"` (whitespace around either number is ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| VitrineError::InvalidInput(format!("expected LAT,LNG, got '{s}'")))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| VitrineError::InvalidInput(format!("invalid latitude '{}'", lat.trim())))?;
        let lng: f64 = lng
            .trim()
            .parse()
            .map_err(|_| VitrineError::InvalidInput(format!("invalid longitude '{}'", lng.trim())))?;
        Ok(Self::new(lat, lng))
    }
}

// =============================================================================
// CAPTURE POLICY
// =============================================================================

/// Operating mode of the decision engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureMode {
    /// Decide from elapsed time and displacement.
    #[default]
    Auto,
    /// Every capture starts a new exhibition.
    ForceNew,
    /// Every capture appends to an existing exhibition when one exists.
    ForceExisting,
}

impl CaptureMode {
    /// The persisted name of this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::ForceNew => "force-new",
            Self::ForceExisting => "force-existing",
        }
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureMode {
    type Err = VitrineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "force-new" => Ok(Self::ForceNew),
            "force-existing" => Ok(Self::ForceExisting),
            other => Err(VitrineError::InvalidPolicy(format!(
                "unknown mode '{other}' (expected auto, force-new or force-existing)"
            ))),
        }
    }
}

/// User-tunable thresholds for automatic capture attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturePolicy {
    /// Maximum minutes since the last capture for which appending is plausible.
    pub time_window_minutes: u32,
    /// Maximum displacement in meters since the last capture for which
    /// appending is plausible.
    pub distance_threshold_meters: u32,
    /// Override for the time/distance heuristic.
    pub mode: CaptureMode,
}

impl Default for CapturePolicy {
    fn default() -> Self {
        Self {
            time_window_minutes: DEFAULT_TIME_WINDOW_MINUTES,
            distance_threshold_meters: DEFAULT_DISTANCE_THRESHOLD_METERS,
            mode: CaptureMode::Auto,
        }
    }
}

impl CapturePolicy {
    /// The time window in milliseconds.
    #[must_use]
    pub const fn time_window_millis(&self) -> i64 {
        (self.time_window_minutes as i64).saturating_mul(MILLIS_PER_MINUTE)
    }

    /// Validate a policy before an explicit settings save.
    ///
    /// Zero thresholds are rejected: the store normalizes a stored zero back
    /// to the default, so the value would not survive a reload.
    pub fn validate(&self) -> Result<(), VitrineError> {
        if self.time_window_minutes == 0 {
            return Err(VitrineError::InvalidPolicy(
                "timeWindowMinutes must be greater than zero".to_string(),
            ));
        }
        if self.distance_threshold_meters == 0 {
            return Err(VitrineError::InvalidPolicy(
                "distanceThresholdMeters must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// CAPTURE META
// =============================================================================

/// Memory of the most recent successful capture.
///
/// Overwritten in full on every attribution; never merged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureMeta {
    pub last_exhibition_id: Option<String>,
    /// Epoch milliseconds.
    pub last_capture_at: Option<i64>,
    pub last_location: Option<GeoPoint>,
}

impl CaptureMeta {
    /// A record stating that `exhibition_id` received a capture at `at_ms`.
    #[must_use]
    pub fn record(exhibition_id: impl Into<String>, at_ms: i64, location: Option<GeoPoint>) -> Self {
        Self {
            last_exhibition_id: Some(exhibition_id.into()),
            last_capture_at: Some(at_ms),
            last_location: location,
        }
    }

    /// True when nothing has ever been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last_exhibition_id.is_none()
            && self.last_capture_at.is_none()
            && self.last_location.is_none()
    }

    /// The remembered exhibition id, ignoring empty strings.
    #[must_use]
    pub fn remembered_id(&self) -> Option<&str> {
        self.last_exhibition_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }
}

// =============================================================================
// EXHIBITION REFERENCE
// =============================================================================

/// A visit record as seen by the engine: an id plus optional ISO-8601
/// timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhibitionRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl ExhibitionRef {
    /// A record with no timestamps.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            updated_at: None,
            created_at: None,
        }
    }

    /// Builder: set `updatedAt`.
    #[must_use]
    pub fn updated(mut self, at: impl Into<String>) -> Self {
        self.updated_at = Some(at.into());
        self
    }

    /// Builder: set `createdAt`.
    #[must_use]
    pub fn created(mut self, at: impl Into<String>) -> Self {
        self.created_at = Some(at.into());
        self
    }

    /// Recency key used by the selection scan, in epoch milliseconds.
    ///
    /// `updatedAt` wins over `createdAt`; empty strings count as absent.
    /// The chosen timestamp is not re-checked against the other one: an
    /// unparsable `updatedAt` yields 0 even when `createdAt` is valid.
    #[must_use]
    pub fn recency_millis(&self) -> i64 {
        let chosen = self
            .updated_at
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.created_at.as_deref().filter(|s| !s.is_empty()));
        chosen.and_then(parse_timestamp_millis).unwrap_or(0)
    }
}

/// Parse an ISO-8601 timestamp into epoch milliseconds.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC) and a
/// bare `YYYY-MM-DD` (UTC midnight).
#[must_use]
pub fn parse_timestamp_millis(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Validate a candidate pool supplied from outside the process.
///
/// Rejects pools larger than `MAX_POOL_SIZE` and ids that are empty or longer
/// than `MAX_EXHIBITION_ID_LENGTH` bytes. Timestamps are not checked: an
/// unparsable one only demotes its record in the recency scan.
pub fn validate_pool(exhibitions: &[ExhibitionRef]) -> Result<(), VitrineError> {
    if exhibitions.len() > MAX_POOL_SIZE {
        return Err(VitrineError::InvalidInput(format!(
            "pool has {} records (max {MAX_POOL_SIZE})",
            exhibitions.len()
        )));
    }
    for (index, exhibition) in exhibitions.iter().enumerate() {
        if exhibition.id.is_empty() {
            return Err(VitrineError::InvalidInput(format!(
                "record {index} has an empty id"
            )));
        }
        if exhibition.id.len() > MAX_EXHIBITION_ID_LENGTH {
            return Err(VitrineError::InvalidInput(format!(
                "record {index} id exceeds {MAX_EXHIBITION_ID_LENGTH} bytes"
            )));
        }
    }
    Ok(())
}

// =============================================================================
// DECISION
// =============================================================================

/// Output of the decision engine.
///
/// `target_exhibition_id` is `Some` only when `create_new` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub target_exhibition_id: Option<String>,
    pub create_new: bool,
}

impl Decision {
    /// Append to an existing exhibition.
    #[must_use]
    pub fn append(id: impl Into<String>) -> Self {
        Self {
            target_exhibition_id: Some(id.into()),
            create_new: false,
        }
    }

    /// Start a new exhibition.
    #[must_use]
    pub const fn create() -> Self {
        Self {
            target_exhibition_id: None,
            create_new: true,
        }
    }

    /// Append when an id resolved, create otherwise.
    #[must_use]
    pub fn from_selection(id: Option<String>) -> Self {
        match id {
            Some(id) => Self::append(id),
            None => Self::create(),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Vitrine system.
///
/// The decision path itself never fails; these cover writes, database
/// handles, configuration and caller-supplied input.
#[derive(Debug, Error)]
pub enum VitrineError {
    /// The backing key-value store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A value could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A policy failed settings-save validation.
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// Caller-supplied input was rejected.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// The configuration file could not be used.
    #[error("Configuration error: {0}")]
    Config(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_defaults() {
        let policy = CapturePolicy::default();
        assert_eq!(policy.time_window_minutes, 120);
        assert_eq!(policy.distance_threshold_meters, 200);
        assert_eq!(policy.mode, CaptureMode::Auto);
        assert_eq!(policy.time_window_millis(), 7_200_000);
    }

    #[test]
    fn policy_validate_rejects_zero() {
        let mut policy = CapturePolicy::default();
        assert!(policy.validate().is_ok());

        policy.time_window_minutes = 0;
        assert!(matches!(
            policy.validate(),
            Err(VitrineError::InvalidPolicy(_))
        ));

        policy.time_window_minutes = 5;
        policy.distance_threshold_meters = 0;
        assert!(matches!(
            policy.validate(),
            Err(VitrineError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn policy_serializes_camel_case() {
        let json = serde_json::to_string(&CapturePolicy::default()).expect("serialize");
        assert_eq!(
            json,
            r#"{"timeWindowMinutes":120,"distanceThresholdMeters":200,"mode":"auto"}"#
        );
    }

    #[test]
    fn mode_names() {
        for mode in [
            CaptureMode::Auto,
            CaptureMode::ForceNew,
            CaptureMode::ForceExisting,
        ] {
            assert_eq!(mode.as_str().parse::<CaptureMode>().expect("parse"), mode);
        }
        assert!("sometimes".parse::<CaptureMode>().is_err());
    }

    #[test]
    fn geo_point_from_str() {
        let p: GeoPoint = "37.5665, 126.9780".parse().expect("parse");
        assert_eq!(p, GeoPoint::new(37.5665, 126.978));
        assert!("37.5".parse::<GeoPoint>().is_err());
        assert!("north,east".parse::<GeoPoint>().is_err());
    }

    #[test]
    fn meta_record_and_remembered_id() {
        let meta = CaptureMeta::default();
        assert!(meta.is_empty());
        assert_eq!(meta.remembered_id(), None);

        let meta = CaptureMeta::record("ex-1", 42, None);
        assert!(!meta.is_empty());
        assert_eq!(meta.remembered_id(), Some("ex-1"));
        assert_eq!(meta.last_capture_at, Some(42));

        let blank = CaptureMeta::record("", 42, None);
        assert_eq!(blank.remembered_id(), None);
    }

    #[test]
    fn timestamp_formats() {
        assert_eq!(parse_timestamp_millis("1970-01-01T00:00:01Z"), Some(1_000));
        assert_eq!(
            parse_timestamp_millis("1970-01-01T09:00:01+09:00"),
            Some(1_000)
        );
        assert_eq!(parse_timestamp_millis("1970-01-01T00:00:01.500"), Some(1_500));
        assert_eq!(parse_timestamp_millis("1970-01-01T00:00:02"), Some(2_000));
        assert_eq!(parse_timestamp_millis("1970-01-02"), Some(86_400_000));
        assert_eq!(parse_timestamp_millis("yesterday"), None);
    }

    #[test]
    fn recency_prefers_updated_then_created() {
        let both = ExhibitionRef::new("a")
            .updated("1970-01-01T00:00:02Z")
            .created("1970-01-01T00:00:01Z");
        assert_eq!(both.recency_millis(), 2_000);

        let created_only = ExhibitionRef::new("b").created("1970-01-01T00:00:01Z");
        assert_eq!(created_only.recency_millis(), 1_000);

        let empty_updated = ExhibitionRef::new("c")
            .updated("")
            .created("1970-01-01T00:00:03Z");
        assert_eq!(empty_updated.recency_millis(), 3_000);

        assert_eq!(ExhibitionRef::new("d").recency_millis(), 0);

        let garbage = ExhibitionRef::new("e")
            .updated("not a date")
            .created("1970-01-01T00:00:03Z");
        assert_eq!(garbage.recency_millis(), 0);
    }

    #[test]
    fn exhibition_ref_deserializes_optional_timestamps() {
        let r: ExhibitionRef = serde_json::from_str(r#"{"id":"x"}"#).expect("parse");
        assert_eq!(r, ExhibitionRef::new("x"));

        let r: ExhibitionRef =
            serde_json::from_str(r#"{"id":"y","updatedAt":"2024-05-01T10:00:00Z","name":"ignored"}"#)
                .expect("parse");
        assert_eq!(r.updated_at.as_deref(), Some("2024-05-01T10:00:00Z"));
    }

    #[test]
    fn decision_constructors() {
        assert_eq!(
            Decision::append("x"),
            Decision {
                target_exhibition_id: Some("x".to_string()),
                create_new: false
            }
        );
        assert_eq!(Decision::create().target_exhibition_id, None);
        assert!(Decision::from_selection(None).create_new);
        assert!(!Decision::from_selection(Some("y".to_string())).create_new);
    }

    #[test]
    fn pool_validation() {
        assert!(validate_pool(&[]).is_ok());
        assert!(validate_pool(&[ExhibitionRef::new("1")]).is_ok());
        assert!(matches!(
            validate_pool(&[ExhibitionRef::new("1"), ExhibitionRef::new("")]),
            Err(VitrineError::InvalidInput(msg)) if msg.contains("record 1")
        ));
        let long = "x".repeat(MAX_EXHIBITION_ID_LENGTH + 1);
        assert!(validate_pool(&[ExhibitionRef::new(long)]).is_err());
    }
}
