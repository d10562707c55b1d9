//! # Capture Planner
//!
//! Turns a decision into the concrete mutations the journal must perform:
//! which record receives the photo, whether a record is created (and with
//! which id), and how the last-capture memory changes.
//!
//! The engine trusts a remembered exhibition id without looking at the pool.
//! The planner is where pool membership is checked: a target that no longer
//! exists becomes a new record instead of a dangling append.
//!
//! Flow of one capture:
//! 1. A hand-picked target that exists in the pool receives the photo in the
//!    requested section. Only `photos` captures touch the memory, and they
//!    record no location.
//! 2. Otherwise (no hand-picked target, or it was deleted) the engine decides
//!    without it, and the photo goes to the main `photos` section.

use crate::engine::{DecisionEngine, DecisionInput, DecisionPath, Evaluation};
use crate::store::MetaStore;
use crate::{CaptureMeta, ExhibitionRef, GeoPoint, VitrineError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// SECTIONS
// =============================================================================

/// Which photo list of a record a capture lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSection {
    /// Main visit photos.
    #[default]
    Photos,
    /// Floor plan shots.
    Floor,
    /// Poster shots.
    Poster,
}

impl CaptureSection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Photos => "photos",
            Self::Floor => "floor",
            Self::Poster => "poster",
        }
    }

    /// Whether a capture in this section counts as visit activity.
    #[must_use]
    pub const fn updates_memory(self) -> bool {
        matches!(self, Self::Photos)
    }
}

impl fmt::Display for CaptureSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureSection {
    type Err = VitrineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "photos" => Ok(Self::Photos),
            "floor" => Ok(Self::Floor),
            "poster" => Ok(Self::Poster),
            other => Err(VitrineError::InvalidInput(format!(
                "unknown section '{other}' (expected photos, floor or poster)"
            ))),
        }
    }
}

// =============================================================================
// PLAN
// =============================================================================

/// Why a new record is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateReason {
    /// The engine decided to create.
    Decided,
    /// The engine chose a record that is no longer in the pool.
    TargetMissing,
}

/// The record that receives the capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaptureTarget {
    /// Append to a record already in the pool.
    Existing { id: String },
    /// Create a record with this id.
    New { id: String, reason: CreateReason },
}

/// The memory write that follows a capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaUpdate {
    pub exhibition_id: String,
    pub location: Option<GeoPoint>,
}

/// Everything the journal layer must do for one capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturePlan {
    pub target: CaptureTarget,
    pub section: CaptureSection,
    /// `None` when the capture must not touch the last-capture memory.
    pub meta_update: Option<MetaUpdate>,
    /// The engine rule behind the plan.
    pub path: DecisionPath,
}

impl CapturePlan {
    /// Id of the record receiving the photo.
    #[must_use]
    pub fn target_id(&self) -> &str {
        match &self.target {
            CaptureTarget::Existing { id } | CaptureTarget::New { id, .. } => id,
        }
    }

    /// True when the journal must create a record.
    #[must_use]
    pub fn creates_record(&self) -> bool {
        matches!(self.target, CaptureTarget::New { .. })
    }

    /// Perform the memory write, if any, stamped at `at_ms`.
    pub fn record<S: MetaStore>(
        &self,
        store: &mut S,
        at_ms: i64,
    ) -> Result<Option<CaptureMeta>, VitrineError> {
        match &self.meta_update {
            Some(update) => store
                .update_meta_at(&update.exhibition_id, update.location, at_ms)
                .map(Some),
            None => Ok(None),
        }
    }
}

// =============================================================================
// PLANNER
// =============================================================================

/// Resolves decisions against the pool.
pub struct CapturePlanner;

impl CapturePlanner {
    /// Run the full caller-side flow for one capture: honour a hand-picked
    /// target that still exists, otherwise ask the engine, then resolve.
    ///
    /// Returns the engine evaluation alongside the plan.
    #[must_use]
    pub fn plan_capture(
        input: &DecisionInput<'_>,
        section: CaptureSection,
        now_ms: i64,
    ) -> (Evaluation, CapturePlan) {
        if let Some(id) = input.explicit_target_id.filter(|id| !id.is_empty()) {
            if contains(input.exhibitions, id) {
                let evaluation = DecisionEngine::evaluate(input, now_ms);
                let plan = CapturePlan {
                    target: CaptureTarget::Existing { id: id.to_string() },
                    section,
                    meta_update: section.updates_memory().then(|| MetaUpdate {
                        exhibition_id: id.to_string(),
                        location: None,
                    }),
                    path: evaluation.path,
                };
                return (evaluation, plan);
            }
            tracing::info!(target_id = id, "hand-picked exhibition not found, deciding automatically");
        }

        let automatic = DecisionInput {
            explicit_target_id: None,
            ..*input
        };
        let evaluation = DecisionEngine::evaluate(&automatic, now_ms);
        let plan = Self::resolve(&evaluation, input.exhibitions, input.current_location, now_ms);
        (evaluation, plan)
    }

    /// Resolve an automatic decision into a plan for the main photo section.
    #[must_use]
    pub fn resolve(
        evaluation: &Evaluation,
        pool: &[ExhibitionRef],
        current_location: Option<GeoPoint>,
        now_ms: i64,
    ) -> CapturePlan {
        let decision = &evaluation.decision;
        let target = match decision.target_exhibition_id.as_deref() {
            Some(id) if !decision.create_new && contains(pool, id) => {
                CaptureTarget::Existing { id: id.to_string() }
            }
            Some(id) if !decision.create_new => {
                tracing::info!(target_id = id, "decided exhibition no longer exists, creating a new one");
                CaptureTarget::New {
                    id: Self::new_exhibition_id(now_ms, pool),
                    reason: CreateReason::TargetMissing,
                }
            }
            _ => CaptureTarget::New {
                id: Self::new_exhibition_id(now_ms, pool),
                reason: CreateReason::Decided,
            },
        };

        let exhibition_id = match &target {
            CaptureTarget::Existing { id } | CaptureTarget::New { id, .. } => id.clone(),
        };

        CapturePlan {
            target,
            section: CaptureSection::Photos,
            meta_update: Some(MetaUpdate {
                exhibition_id,
                location: current_location,
            }),
            path: evaluation.path,
        }
    }

    /// Id for a new record: the capture time in decimal milliseconds, bumped
    /// past any id already in the pool.
    ///
    /// At most `pool.len() + 1` candidates are tried. If bumping would run
    /// past `i64::MAX`, the id becomes `<now_ms>-<n>` instead.
    #[must_use]
    pub fn new_exhibition_id(now_ms: i64, pool: &[ExhibitionRef]) -> String {
        let taken: BTreeSet<&str> = pool.iter().map(|e| e.id.as_str()).collect();

        let mut candidate = Some(now_ms);
        for _ in 0..=taken.len() {
            let Some(value) = candidate else { break };
            let id = value.to_string();
            if !taken.contains(id.as_str()) {
                return id;
            }
            candidate = value.checked_add(1);
        }

        let mut suffix: usize = 1;
        loop {
            let id = format!("{now_ms}-{suffix}");
            if !taken.contains(id.as_str()) {
                return id;
            }
            suffix += 1;
        }
    }
}

fn contains(pool: &[ExhibitionRef], id: &str) -> bool {
    pool.iter().any(|e| e.id == id)
}

// =============================================================================
// TESTS
// =============================================================================
