//! # Innate Primitives
//!
//! Hardcoded constants for the Vitrine CORE.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! User-tunable thresholds live in [`crate::CapturePolicy`]; the constants here
//! are the ones the user never sees.

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Upper bound (inclusive) of the `High` location-confidence band, in meters.
pub const HIGH_CONFIDENCE_MAX_METERS: f64 = 100.0;

/// Upper bound (inclusive) of the `Medium` location-confidence band, in meters.
pub const MEDIUM_CONFIDENCE_MAX_METERS: f64 = 300.0;

/// Default time window for appending to the current exhibition.
pub const DEFAULT_TIME_WINDOW_MINUTES: u32 = 120;

/// Default displacement threshold for appending to the current exhibition.
pub const DEFAULT_DISTANCE_THRESHOLD_METERS: u32 = 200;

/// Milliseconds in one minute.
pub const MILLIS_PER_MINUTE: i64 = 60_000;

/// Storage key of the persisted capture policy.
pub const POLICY_KEY: &str = "@capture_policy_v1";

/// Storage key of the persisted last-capture memory.
pub const META_KEY: &str = "@capture_meta_v1";

/// Default timeout for a best-effort location fetch.
pub const DEFAULT_LOCATION_TIMEOUT_MS: u64 = 8_000;

/// Maximum number of exhibition records accepted in one decision request.
///
/// A personal journal never approaches this; the bound keeps the O(n)
/// recency scan cheap for inputs arriving over the network.
pub const MAX_POOL_SIZE: usize = 100_000;

/// Maximum length of an exhibition id, in bytes.
pub const MAX_EXHIBITION_ID_LENGTH: usize = 256;
