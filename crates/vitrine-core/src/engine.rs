//! # Decision Engine
//!
//! Decides, for one captured photo, whether it belongs to an existing
//! exhibition record or starts a new one.
//!
//! The engine is a pure function of its inputs. The last-capture memory acts
//! as implicit state, but it is passed in by value by the caller; the engine
//! never touches storage and never reads the clock.
//!
//! Rules, in strict priority order:
//! 1. Explicit target id: append to it, no questions asked.
//! 2. Empty pool: create.
//! 3. Mode override: `force-new` creates, `force-existing` selects.
//! 4. Auto: append iff the last capture is inside the time window AND the
//!    displacement (when both locations are known) is inside the threshold.
//!
//! ## Concurrency
//!
//! Callers must serialize capture events per device. Two decisions made
//! concurrently from the same stale memory can both choose to create a
//! record.

use crate::geo::{Confidence, meters_to_confidence};
use crate::{CaptureMeta, CaptureMode, CapturePolicy, Decision, ExhibitionRef, GeoPoint};
use serde::{Deserialize, Serialize};

// =============================================================================
// INPUT / OUTPUT
// =============================================================================

/// Everything one decision depends on.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInput<'a> {
    /// Candidate pool of existing records.
    pub exhibitions: &'a [ExhibitionRef],
    pub policy: &'a CapturePolicy,
    pub meta: &'a CaptureMeta,
    /// `None` when the location lookup failed or timed out.
    pub current_location: Option<GeoPoint>,
    /// Set when the user picked a record by hand.
    pub explicit_target_id: Option<&'a str>,
}

/// Which rule produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPath {
    /// The caller named the target.
    ExplicitTarget,
    /// No records exist yet.
    EmptyPool,
    /// Policy mode `force-new`.
    ForcedNew,
    /// Policy mode `force-existing`.
    ForcedExisting,
    /// Auto: inside the time window and not too far away.
    WithinWindow,
    /// Auto: no capture has ever been recorded.
    NoPriorCapture,
    /// Auto: the time window has elapsed.
    OutsideWindow,
    /// Auto: moved farther than the distance threshold.
    TooFar,
    /// Append was chosen but no record id could be resolved.
    SelectionMiss,
}

impl DecisionPath {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExplicitTarget => "explicit_target",
            Self::EmptyPool => "empty_pool",
            Self::ForcedNew => "forced_new",
            Self::ForcedExisting => "forced_existing",
            Self::WithinWindow => "within_window",
            Self::NoPriorCapture => "no_prior_capture",
            Self::OutsideWindow => "outside_window",
            Self::TooFar => "too_far",
            Self::SelectionMiss => "selection_miss",
        }
    }
}

/// A decision together with how it was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub decision: Decision,
    pub path: DecisionPath,
    /// Displacement since the last capture, when both locations were known
    /// and the auto heuristic ran.
    pub distance_meters: Option<f64>,
    /// Confidence band of `distance_meters`.
    pub confidence: Option<Confidence>,
}

impl Evaluation {
    fn new(decision: Decision, path: DecisionPath) -> Self {
        Self {
            decision,
            path,
            distance_meters: None,
            confidence: None,
        }
    }

    fn with_distance(mut self, distance_meters: Option<f64>) -> Self {
        self.confidence = distance_meters.map(meters_to_confidence);
        self.distance_meters = distance_meters;
        self
    }
}

// =============================================================================
// HEURISTIC
// =============================================================================

/// Outcome of the time/distance checks.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Assessment {
    has_prior_capture: bool,
    time_ok: bool,
    distance_ok: bool,
    distance_meters: Option<f64>,
}

impl Assessment {
    fn append_to_existing(&self) -> bool {
        self.time_ok && self.distance_ok
    }
}

fn assess(
    policy: &CapturePolicy,
    last_capture_at: Option<i64>,
    last_location: Option<GeoPoint>,
    current_location: Option<GeoPoint>,
    now_ms: i64,
) -> Assessment {
    let time_ok = last_capture_at
        .is_some_and(|last| now_ms.saturating_sub(last) <= policy.time_window_millis());

    // Unknown distance never blocks appending.
    let distance_meters = match (last_location, current_location) {
        (Some(last), Some(current)) => Some(last.distance_to(&current)),
        _ => None,
    };
    let distance_ok = distance_meters
        .is_none_or(|d| d <= f64::from(policy.distance_threshold_meters));

    Assessment {
        has_prior_capture: last_capture_at.is_some(),
        time_ok,
        distance_ok,
        distance_meters,
    }
}

/// True when the auto heuristic says the capture starts a new exhibition.
///
/// Appending requires a prior capture no older than the time window and,
/// when both the remembered and the current location are known, a
/// displacement no larger than the distance threshold.
#[must_use]
pub fn should_create_new_exhibition(
    policy: &CapturePolicy,
    last_capture_at: Option<i64>,
    last_location: Option<GeoPoint>,
    current_location: Option<GeoPoint>,
    now_ms: i64,
) -> bool {
    !assess(
        policy,
        last_capture_at,
        last_location,
        current_location,
        now_ms,
    )
    .append_to_existing()
}

// =============================================================================
// SELECTION
// =============================================================================

/// Choose the record to append to.
///
/// A non-empty remembered id wins outright and is not checked against the
/// pool. Otherwise the most recently updated record is chosen (`updatedAt`,
/// then `createdAt`, then epoch zero); on equal timestamps the first record
/// in input order wins.
#[must_use]
pub fn pick_existing_exhibition_id(
    exhibitions: &[ExhibitionRef],
    remembered_id: Option<&str>,
) -> Option<String> {
    if let Some(id) = remembered_id.filter(|id| !id.is_empty()) {
        return Some(id.to_string());
    }

    let mut best: Option<(&ExhibitionRef, i64)> = None;
    for exhibition in exhibitions {
        let recency = exhibition.recency_millis();
        match best {
            Some((_, best_recency)) if recency <= best_recency => {}
            _ => best = Some((exhibition, recency)),
        }
    }
    best.map(|(exhibition, _)| exhibition.id.clone())
}

// =============================================================================
// ENGINE
// =============================================================================

/// The capture-target decision engine.
pub struct DecisionEngine;

impl DecisionEngine {
    /// Decide where a capture goes.
    #[must_use]
    pub fn decide(input: &DecisionInput<'_>, now_ms: i64) -> Decision {
        Self::evaluate(input, now_ms).decision
    }

    /// Decide where a capture goes and report which rule decided it.
    #[must_use]
    pub fn evaluate(input: &DecisionInput<'_>, now_ms: i64) -> Evaluation {
        let evaluation = Self::evaluate_inner(input, now_ms);
        tracing::debug!(
            path = evaluation.path.as_str(),
            create_new = evaluation.decision.create_new,
            target = evaluation.decision.target_exhibition_id.as_deref().unwrap_or("-"),
            distance_meters = evaluation.distance_meters,
            pool_size = input.exhibitions.len(),
            "capture target decided"
        );
        evaluation
    }

    fn evaluate_inner(input: &DecisionInput<'_>, now_ms: i64) -> Evaluation {
        if let Some(id) = input.explicit_target_id.filter(|id| !id.is_empty()) {
            return Evaluation::new(Decision::append(id), DecisionPath::ExplicitTarget);
        }

        if input.exhibitions.is_empty() {
            return Evaluation::new(Decision::create(), DecisionPath::EmptyPool);
        }

        let remembered = input.meta.remembered_id();

        match input.policy.mode {
            CaptureMode::ForceNew => Evaluation::new(Decision::create(), DecisionPath::ForcedNew),
            CaptureMode::ForceExisting => {
                let selected = pick_existing_exhibition_id(input.exhibitions, remembered);
                let path = if selected.is_some() {
                    DecisionPath::ForcedExisting
                } else {
                    DecisionPath::SelectionMiss
                };
                Evaluation::new(Decision::from_selection(selected), path)
            }
            CaptureMode::Auto => {
                let assessment = assess(
                    input.policy,
                    input.meta.last_capture_at,
                    input.meta.last_location,
                    input.current_location,
                    now_ms,
                );

                let evaluation = if !assessment.append_to_existing() {
                    let path = if !assessment.has_prior_capture {
                        DecisionPath::NoPriorCapture
                    } else if !assessment.time_ok {
                        DecisionPath::OutsideWindow
                    } else {
                        DecisionPath::TooFar
                    };
                    Evaluation::new(Decision::create(), path)
                } else {
                    match pick_existing_exhibition_id(input.exhibitions, remembered) {
                        Some(id) => {
                            Evaluation::new(Decision::append(id), DecisionPath::WithinWindow)
                        }
                        None => Evaluation::new(Decision::create(), DecisionPath::SelectionMiss),
                    }
                };
                evaluation.with_distance(assessment.distance_meters)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
