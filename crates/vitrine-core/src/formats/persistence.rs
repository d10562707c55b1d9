//! # Persistence Format
//!
//! JSON encoding for the two persisted records:
//!
//! - `@capture_policy_v1`: `{"timeWindowMinutes":n,"distanceThresholdMeters":n,"mode":"auto"}`
//! - `@capture_meta_v1`: `{"lastExhibitionId":s,"lastCaptureAt":n,"lastLocation":{"lat":n,"lng":n}}`
//!
//! ## Normalization rules
//!
//! Decoding never fails. The raw string is parsed once into a
//! `serde_json::Value` and each field is checked independently:
//!
//! | Field                     | Accepted                                   | Otherwise |
//! |---------------------------|--------------------------------------------|-----------|
//! | `timeWindowMinutes`       | number or numeric string, truncated, >= 1  | 120       |
//! | `distanceThresholdMeters` | number or numeric string, truncated, >= 1  | 200       |
//! | `mode`                    | `auto`, `force-new`, `force-existing`      | `auto`    |
//! | `lastExhibitionId`        | non-empty string                           | `None`    |
//! | `lastCaptureAt`           | finite number, truncated to ms             | `None`    |
//! | `lastLocation`            | object with numeric `lat` and `lng`        | `None`    |
//!
//! A missing key, invalid JSON, or a JSON value that is not an object yields
//! the all-default record.

use crate::{CaptureMeta, CaptureMode, CapturePolicy, GeoPoint, VitrineError};
use serde_json::{Map, Value};

// =============================================================================
// ENCODING
// =============================================================================

/// Serialize a policy for storage.
pub fn encode_policy(policy: &CapturePolicy) -> Result<String, VitrineError> {
    serde_json::to_string(policy).map_err(|e| VitrineError::Serialization(e.to_string()))
}

/// Serialize a capture memory record for storage.
///
/// Absent fields are written as explicit `null`s.
pub fn encode_meta(meta: &CaptureMeta) -> Result<String, VitrineError> {
    serde_json::to_string(meta).map_err(|e| VitrineError::Serialization(e.to_string()))
}

// =============================================================================
// DECODING
// =============================================================================

/// Decode a stored policy, substituting defaults per field.
#[must_use]
pub fn decode_policy(raw: Option<&str>) -> CapturePolicy {
    let defaults = CapturePolicy::default();
    let Some(fields) = raw.and_then(parse_object) else {
        return defaults;
    };

    CapturePolicy {
        time_window_minutes: positive_u32(&fields, "timeWindowMinutes")
            .unwrap_or(defaults.time_window_minutes),
        distance_threshold_meters: positive_u32(&fields, "distanceThresholdMeters")
            .unwrap_or(defaults.distance_threshold_meters),
        mode: capture_mode(&fields).unwrap_or(defaults.mode),
    }
}

/// Decode a stored capture memory record, substituting `None` per field.
#[must_use]
pub fn decode_meta(raw: Option<&str>) -> CaptureMeta {
    let Some(fields) = raw.and_then(parse_object) else {
        return CaptureMeta::default();
    };

    CaptureMeta {
        last_exhibition_id: non_empty_string(&fields, "lastExhibitionId"),
        last_capture_at: epoch_millis(&fields, "lastCaptureAt"),
        last_location: geo_point(&fields, "lastLocation"),
    }
}

/// Parse the raw string and keep it only if it is a JSON object.
fn parse_object(raw: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(fields)) => Some(fields),
        Ok(other) => {
            tracing::debug!(kind = json_kind(&other), "stored record is not an object");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "stored record is not valid JSON");
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A strictly positive whole number, from a JSON number or a numeric string.
fn positive_u32(fields: &Map<String, Value>, name: &str) -> Option<u32> {
    let value = fields.get(name)?;
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let accepted = number
        .filter(|n| n.is_finite())
        .map(f64::trunc)
        .filter(|n| *n >= 1.0 && *n <= f64::from(u32::MAX))
        .map(|n| n as u32);
    if accepted.is_none() {
        tracing::debug!(field = name, value = %value, "invalid stored value, using default");
    }
    accepted
}

fn capture_mode(fields: &Map<String, Value>) -> Option<CaptureMode> {
    let value = fields.get("mode")?;
    let mode = value.as_str().and_then(|s| s.parse::<CaptureMode>().ok());
    if mode.is_none() {
        tracing::debug!(field = "mode", value = %value, "invalid stored value, using default");
    }
    mode
}

fn non_empty_string(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields
        .get(name)?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn epoch_millis(fields: &Map<String, Value>, name: &str) -> Option<i64> {
    match fields.get(name)? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        _ => None,
    }
}

fn geo_point(fields: &Map<String, Value>, name: &str) -> Option<GeoPoint> {
    let location = fields.get(name)?.as_object()?;
    let lat = location.get("lat").and_then(Value::as_f64)?;
    let lng = location.get("lng").and_then(Value::as_f64)?;
    Some(GeoPoint::new(lat, lng))
}

// =============================================================================
// TESTS
// =============================================================================
