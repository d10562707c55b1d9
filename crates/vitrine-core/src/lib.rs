//! # vitrine-core
//!
//! The capture-target decision engine for Vitrine, an exhibition-visit
//! journal.
//!
//! Every time a photo is taken, the engine decides whether it belongs to the
//! exhibition record the visitor is already filling in, or whether a new
//! visit has started. It weighs elapsed time since the last capture,
//! distance moved, a user-tunable policy and an optional hand-picked target.
//!
//! ## Layout
//!
//! - `geo`: great-circle distance and confidence bands
//! - `types`: policy, memory, record reference and decision types
//! - `formats`: JSON persistence with per-field normalization
//! - `storage`: key-value seam (in-memory and redb backends)
//! - `store`: typed policy/meta stores on top of any key-value backend
//! - `engine`: the decision rules
//! - `planner`: resolves a decision against the pool into journal mutations
//!
//! ## Constraints
//!
//! The decision path is pure: no clock, no I/O, no async. Storage is only
//! touched by `store` and by the caller that drives it.

// =============================================================================
// MODULES
// =============================================================================

pub mod engine;
pub mod formats;
pub mod geo;
pub mod planner;
pub mod primitives;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    CaptureMeta, CaptureMode, CapturePolicy, Decision, ExhibitionRef, GeoPoint, VitrineError,
    parse_timestamp_millis, validate_pool,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use engine::{
    DecisionEngine, DecisionInput, DecisionPath, Evaluation, pick_existing_exhibition_id,
    should_create_new_exhibition,
};
pub use geo::{Confidence, haversine_distance_meters, meters_to_confidence};
pub use planner::{
    CapturePlan, CapturePlanner, CaptureSection, CaptureTarget, CreateReason, MetaUpdate,
};

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use storage::{KeyValueStore, MemoryStore, RedbStore, StorageBackend};
pub use store::{MetaStore, PolicyStore, now_millis};
