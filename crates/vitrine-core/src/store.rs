//! # Policy and Meta Stores
//!
//! Typed access to the two persisted records on top of any [`KeyValueStore`].
//!
//! Loads never fail: a storage read error is logged and treated as a missing
//! key, and malformed values are normalized field by field (see
//! [`crate::formats::persistence`]). Saves overwrite unconditionally and report
//! write failures to the caller.

use crate::formats::{decode_meta, decode_policy, encode_meta, encode_policy};
use crate::primitives::{META_KEY, POLICY_KEY};
use crate::storage::KeyValueStore;
use crate::{CaptureMeta, CapturePolicy, GeoPoint, VitrineError};

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Log a read error and fall back to "key absent".
///
/// Storage errors on the read path must not reach the decision path, but
/// they must not vanish silently either.
fn log_and_absent(result: Result<Option<String>, VitrineError>, key: &str) -> Option<String> {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "storage read failed, using defaults");
            None
        }
    }
}

// =============================================================================
// POLICY STORE
// =============================================================================

/// Load/save of the user-tunable capture policy.
pub trait PolicyStore {
    /// Load the policy, substituting defaults per field. Never fails.
    fn load_policy(&self) -> CapturePolicy;

    /// Overwrite the stored policy.
    fn save_policy(&mut self, policy: &CapturePolicy) -> Result<(), VitrineError>;

    /// Forget the stored policy; the next load returns defaults.
    fn reset_policy(&mut self) -> Result<(), VitrineError>;
}

impl<S: KeyValueStore> PolicyStore for S {
    fn load_policy(&self) -> CapturePolicy {
        let raw = log_and_absent(self.get(POLICY_KEY), POLICY_KEY);
        decode_policy(raw.as_deref())
    }

    fn save_policy(&mut self, policy: &CapturePolicy) -> Result<(), VitrineError> {
        let raw = encode_policy(policy)?;
        self.set(POLICY_KEY, &raw)?;
        tracing::info!(
            time_window_minutes = policy.time_window_minutes,
            distance_threshold_meters = policy.distance_threshold_meters,
            mode = %policy.mode,
            "capture policy saved"
        );
        Ok(())
    }

    fn reset_policy(&mut self) -> Result<(), VitrineError> {
        self.remove(POLICY_KEY)
    }
}

// =============================================================================
// META STORE
// =============================================================================

/// Load/save of the last-capture memory.
pub trait MetaStore {
    /// Load the memory, substituting `None` per malformed field. Never fails.
    fn load_meta(&self) -> CaptureMeta;

    /// Overwrite the stored memory.
    fn save_meta(&mut self, meta: &CaptureMeta) -> Result<(), VitrineError>;

    /// Forget the stored memory; the next load returns the empty record.
    fn reset_meta(&mut self) -> Result<(), VitrineError>;

    /// Record a capture attributed to `exhibition_id` at `at_ms`.
    ///
    /// Writes the full record: a `None` location replaces a previously
    /// remembered one.
    fn update_meta_at(
        &mut self,
        exhibition_id: &str,
        location: Option<GeoPoint>,
        at_ms: i64,
    ) -> Result<CaptureMeta, VitrineError> {
        let meta = CaptureMeta::record(exhibition_id, at_ms, location);
        self.save_meta(&meta)?;
        Ok(meta)
    }

    /// Record a capture attributed to `exhibition_id` now.
    fn update_meta(
        &mut self,
        exhibition_id: &str,
        location: Option<GeoPoint>,
    ) -> Result<CaptureMeta, VitrineError> {
        self.update_meta_at(exhibition_id, location, now_millis())
    }
}

impl<S: KeyValueStore> MetaStore for S {
    fn load_meta(&self) -> CaptureMeta {
        let raw = log_and_absent(self.get(META_KEY), META_KEY);
        decode_meta(raw.as_deref())
    }

    fn save_meta(&mut self, meta: &CaptureMeta) -> Result<(), VitrineError> {
        let raw = encode_meta(meta)?;
        self.set(META_KEY, &raw)?;
        tracing::debug!(
            exhibition_id = meta.last_exhibition_id.as_deref().unwrap_or("-"),
            captured_at = meta.last_capture_at,
            has_location = meta.last_location.is_some(),
            "capture meta saved"
        );
        Ok(())
    }

    fn reset_meta(&mut self) -> Result<(), VitrineError> {
        self.remove(META_KEY)
    }
}

// =============================================================================
// TESTS
// =============================================================================
