//! # Geo Module
//!
//! Great-circle distance and location-confidence classification.
//!
//! This is the only module in the CORE that does floating-point arithmetic;
//! everything downstream of it compares distances, it never computes them.

#![allow(clippy::float_arithmetic)]

use crate::GeoPoint;
use crate::primitives::{
    EARTH_RADIUS_METERS, HIGH_CONFIDENCE_MAX_METERS, MEDIUM_CONFIDENCE_MAX_METERS,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Great-circle distance between two points in meters (haversine formula).
///
/// Symmetric and zero for identical points. Inputs are not validated:
/// non-finite coordinates produce a non-finite result.
#[must_use]
pub fn haversine_distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let sin_d_lat = (d_lat / 2.0).sin();
    let sin_d_lng = (d_lng / 2.0).sin();
    let h = sin_d_lat * sin_d_lat + lat1.cos() * lat2.cos() * sin_d_lng * sin_d_lng;

    // Rounding can push h a hair past 1.0 for antipodal points.
    // clamp (not min) so NaN stays NaN.
    let c = 2.0 * h.sqrt().clamp(0.0, 1.0).asin();
    EARTH_RADIUS_METERS * c
}

/// How much a displacement can be trusted as "same place".
///
/// Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a distance: `<= 100` high, `<= 300` medium, otherwise low.
///
/// NaN falls through every comparison and lands in `Low`.
#[must_use]
pub fn meters_to_confidence(distance_meters: f64) -> Confidence {
    if distance_meters <= HIGH_CONFIDENCE_MAX_METERS {
        Confidence::High
    } else if distance_meters <= MEDIUM_CONFIDENCE_MAX_METERS {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

// =============================================================================
// TESTS
// =============================================================================
