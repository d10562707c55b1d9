//! # Capture Scenario Tests (S0-S3)
//!
//! End-to-end visit scenarios over the public API.
//!
//! ## Tiers
//! - S0: Geo and confidence
//! - S1: Decision rules
//! - S2: Tolerant persistence
//! - S3: Full capture flow over a redb store

#![allow(clippy::float_arithmetic)]

use vitrine_core::{
    CaptureMeta, CaptureMode, CapturePolicy, Decision, DecisionEngine, DecisionInput,
    DecisionPath, ExhibitionRef, GeoPoint, MemoryStore, MetaStore, PolicyStore,
};

const NOW: i64 = 1_700_000_000_000;
const MINUTE: i64 = 60_000;

/// City Hall, Seoul.
const CITY_HALL: GeoPoint = GeoPoint::new(37.5665, 126.9780);

fn gallery_pool() -> Vec<ExhibitionRef> {
    vec![
        ExhibitionRef::new("1").updated("2024-03-01T09:00:00Z"),
        ExhibitionRef::new("2").updated("2024-03-05T09:00:00Z"),
    ]
}

fn decide(
    exhibitions: &[ExhibitionRef],
    policy: &CapturePolicy,
    meta: &CaptureMeta,
    current_location: Option<GeoPoint>,
    now_ms: i64,
) -> Decision {
    DecisionEngine::decide(
        &DecisionInput {
            exhibitions,
            policy,
            meta,
            current_location,
            explicit_target_id: None,
        },
        now_ms,
    )
}

// =============================================================================
// TIER S0: GEO AND CONFIDENCE
// =============================================================================

mod s0_geo {
    use super::*;
    use vitrine_core::{Confidence, haversine_distance_meters, meters_to_confidence};

    /// S0.1: 0.001 degrees of latitude is roughly 111 meters.
    #[test]
    fn small_offset_distance() {
        let north = GeoPoint::new(CITY_HALL.lat + 0.001, CITY_HALL.lng);
        let d = haversine_distance_meters(CITY_HALL, north);
        assert!((d - 111.19).abs() < 0.5, "got {d}");
        assert_eq!(meters_to_confidence(d), Confidence::Medium);
    }

    /// S0.2: Band boundaries are inclusive.
    #[test]
    fn band_boundaries() {
        assert_eq!(meters_to_confidence(100.0), Confidence::High);
        assert_eq!(meters_to_confidence(100.5), Confidence::Medium);
        assert_eq!(meters_to_confidence(300.0), Confidence::Medium);
        assert_eq!(meters_to_confidence(300.5), Confidence::Low);
    }
}

// =============================================================================
// TIER S1: DECISION RULES
// =============================================================================

mod s1_rules {
    use super::*;

    /// S1.1: Same gallery, same afternoon: the photo joins the remembered visit.
    #[test]
    fn append_within_time_and_distance() {
        let meta = CaptureMeta::record("1", NOW - 30 * MINUTE, Some(CITY_HALL));
        let nearby = GeoPoint::new(CITY_HALL.lat + 0.0005, CITY_HALL.lng);

        let decision = decide(
            &gallery_pool(),
            &CapturePolicy::default(),
            &meta,
            Some(nearby),
            NOW,
        );
        assert_eq!(decision, Decision::append("1"));
    }

    /// S1.2: Three hours later with a two-hour window: new visit.
    #[test]
    fn time_expiry_creates() {
        let meta = CaptureMeta::record("1", NOW - 180 * MINUTE, Some(CITY_HALL));
        let decision = decide(
            &gallery_pool(),
            &CapturePolicy::default(),
            &meta,
            Some(CITY_HALL),
            NOW,
        );
        assert_eq!(decision, Decision::create());
    }

    /// S1.2b: An hour after the last photo, standing on the same spot.
    #[test]
    fn one_hour_same_spot_appends() {
        let pool = vec![ExhibitionRef::new("1")];
        let meta = CaptureMeta::record("1", NOW - 60 * MINUTE, Some(CITY_HALL));

        let decision = decide(
            &pool,
            &CapturePolicy::default(),
            &meta,
            Some(CITY_HALL),
            NOW,
        );
        assert_eq!(decision, Decision::append("1"));
    }

    /// S1.2c: 200 minutes exceeds the 120-minute window even on the same spot.
    #[test]
    fn two_hundred_minutes_same_spot_creates() {
        let pool = vec![ExhibitionRef::new("1")];
        let meta = CaptureMeta::record("1", NOW - 200 * MINUTE, Some(CITY_HALL));

        let decision = decide(
            &pool,
            &CapturePolicy::default(),
            &meta,
            Some(CITY_HALL),
            NOW,
        );
        assert_eq!(decision, Decision::create());
    }

    /// S1.3: Ten minutes later but a kilometre away: new visit.
    #[test]
    fn distance_excess_creates() {
        let meta = CaptureMeta::record("1", NOW - 10 * MINUTE, Some(CITY_HALL));
        let across_town = GeoPoint::new(CITY_HALL.lat + 0.009, CITY_HALL.lng);

        let decision = decide(
            &gallery_pool(),
            &CapturePolicy::default(),
            &meta,
            Some(across_town),
            NOW,
        );
        assert_eq!(decision, Decision::create());
    }

    /// S1.4: No location fix: time alone decides.
    #[test]
    fn unknown_location_fails_open() {
        let meta = CaptureMeta::record("1", NOW - 10 * MINUTE, Some(CITY_HALL));
        let decision = decide(
            &gallery_pool(),
            &CapturePolicy::default(),
            &meta,
            None,
            NOW,
        );
        assert_eq!(decision, Decision::append("1"));

        let no_memory_location = CaptureMeta::record("1", NOW - 10 * MINUTE, None);
        let decision = decide(
            &gallery_pool(),
            &CapturePolicy::default(),
            &no_memory_location,
            Some(CITY_HALL),
            NOW,
        );
        assert_eq!(decision, Decision::append("1"));
    }

    /// S1.5: Forced existing without memory picks the latest record.
    #[test]
    fn force_existing_picks_latest() {
        let policy = CapturePolicy {
            mode: CaptureMode::ForceExisting,
            ..CapturePolicy::default()
        };
        let decision = decide(
            &gallery_pool(),
            &policy,
            &CaptureMeta::default(),
            None,
            NOW,
        );
        assert_eq!(decision, Decision::append("2"));
    }

    /// S1.6: Equal timestamps select the first record every time.
    #[test]
    fn tie_break_is_stable() {
        let pool = vec![
            ExhibitionRef::new("x").updated("2024-01-01T00:00:00Z"),
            ExhibitionRef::new("y").updated("2024-01-01T00:00:00Z"),
        ];
        let policy = CapturePolicy {
            mode: CaptureMode::ForceExisting,
            ..CapturePolicy::default()
        };
        for _ in 0..10 {
            assert_eq!(
                decide(&pool, &policy, &CaptureMeta::default(), None, NOW),
                Decision::append("x")
            );
        }
    }

    /// S1.7: The evaluation explains itself.
    #[test]
    fn evaluation_reports_path_and_distance() {
        let meta = CaptureMeta::record("1", NOW - 10 * MINUTE, Some(CITY_HALL));
        let pool = gallery_pool();
        let policy = CapturePolicy::default();
        let input = DecisionInput {
            exhibitions: &pool,
            policy: &policy,
            meta: &meta,
            current_location: Some(CITY_HALL),
            explicit_target_id: None,
        };

        let evaluation = DecisionEngine::evaluate(&input, NOW);
        assert_eq!(evaluation.path, DecisionPath::WithinWindow);
        assert_eq!(evaluation.distance_meters, Some(0.0));
    }
}

// =============================================================================
// TIER S2: TOLERANT PERSISTENCE
// =============================================================================

mod s2_persistence {
    use super::*;
    use vitrine_core::primitives::{META_KEY, POLICY_KEY};

    /// S2.1: A garbled policy from an older build loads field by field.
    #[test]
    fn malformed_policy_recovers() {
        let store = MemoryStore::with_entries([(
            POLICY_KEY,
            r#"{"timeWindowMinutes":"abc","distanceThresholdMeters":50,"mode":"sideways"}"#,
        )]);
        assert_eq!(
            store.load_policy(),
            CapturePolicy {
                time_window_minutes: 120,
                distance_threshold_meters: 50,
                mode: CaptureMode::Auto,
            }
        );
    }

    /// S2.2: Unparsable memory loads as empty.
    #[test]
    fn malformed_meta_recovers() {
        let store = MemoryStore::with_entries([(META_KEY, "not json")]);
        assert!(store.load_meta().is_empty());
    }

    /// S2.3: A memory whose location lost a coordinate keeps the rest.
    #[test]
    fn partial_meta_keeps_valid_fields() {
        let store = MemoryStore::with_entries([(
            META_KEY,
            r#"{"lastExhibitionId":"7","lastCaptureAt":1700000000000,"lastLocation":{"lat":37.5}}"#,
        )]);
        assert_eq!(
            store.load_meta(),
            CaptureMeta {
                last_exhibition_id: Some("7".to_string()),
                last_capture_at: Some(1_700_000_000_000),
                last_location: None,
            }
        );
    }
}

// =============================================================================
// TIER S3: FULL CAPTURE FLOW
// =============================================================================

mod s3_capture_flow {
    use super::*;
    use vitrine_core::{
        CapturePlanner, CaptureSection, CaptureTarget, CreateReason, RedbStore, StorageBackend,
    };

    /// One capture the way the journal drives it: load, decide, plan, record.
    fn capture<S: PolicyStore + MetaStore>(
        store: &mut S,
        pool: &[ExhibitionRef],
        here: Option<GeoPoint>,
        now_ms: i64,
    ) -> CaptureTarget {
        let policy = store.load_policy();
        let meta = store.load_meta();
        let input = DecisionInput {
            exhibitions: pool,
            policy: &policy,
            meta: &meta,
            current_location: here,
            explicit_target_id: None,
        };
        let (_, plan) = CapturePlanner::plan_capture(&input, CaptureSection::Photos, now_ms);
        plan.record(store, now_ms).expect("record meta");
        plan.target
    }

    /// S3.1: A visit, a break, and a second visit across a reopened database.
    #[test]
    fn day_of_gallery_hopping() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vitrine.db");
        let mut pool: Vec<ExhibitionRef> = Vec::new();

        // First photo of the day: nothing exists yet.
        let mut store = RedbStore::open(&path).expect("open");
        let first = capture(&mut store, &pool, Some(CITY_HALL), NOW);
        let first_id = NOW.to_string();
        assert_eq!(
            first,
            CaptureTarget::New {
                id: first_id.clone(),
                reason: CreateReason::Decided
            }
        );
        pool.push(ExhibitionRef::new(first_id.clone()).created("2023-11-14T22:13:20Z"));

        // Twenty minutes later, same room.
        let second = capture(&mut store, &pool, Some(CITY_HALL), NOW + 20 * MINUTE);
        assert_eq!(second, CaptureTarget::Existing { id: first_id.clone() });
        drop(store);

        // Reopen: memory survived, and a far-away capture starts a new visit.
        let mut store = StorageBackend::with_redb(&path).expect("reopen");
        assert_eq!(store.load_meta().last_exhibition_id.as_deref(), Some(first_id.as_str()));

        let elsewhere = GeoPoint::new(37.5796, 126.9770);
        let later = NOW + 40 * MINUTE;
        let third = capture(&mut store, &pool, Some(elsewhere), later);
        assert_eq!(
            third,
            CaptureTarget::New {
                id: later.to_string(),
                reason: CreateReason::Decided
            }
        );
        assert_eq!(
            store.load_meta(),
            CaptureMeta::record(later.to_string(), later, Some(elsewhere))
        );
    }

    /// S3.2: The remembered record was deleted from the journal.
    #[test]
    fn deleted_record_is_recreated() {
        let mut store = MemoryStore::new();
        store
            .update_meta_at("deleted", Some(CITY_HALL), NOW - MINUTE)
            .expect("seed");

        let target = capture(&mut store, &gallery_pool(), Some(CITY_HALL), NOW);
        assert_eq!(
            target,
            CaptureTarget::New {
                id: NOW.to_string(),
                reason: CreateReason::TargetMissing
            }
        );
    }

    /// S3.3: Posters for a hand-picked record leave the visit memory intact.
    #[test]
    fn hand_picked_poster_keeps_memory() {
        let mut store = MemoryStore::new();
        let remembered = CaptureMeta::record("1", NOW - MINUTE, Some(CITY_HALL));
        store.save_meta(&remembered).expect("seed");

        let pool = gallery_pool();
        let policy = store.load_policy();
        let meta = store.load_meta();
        let input = DecisionInput {
            exhibitions: &pool,
            policy: &policy,
            meta: &meta,
            current_location: Some(CITY_HALL),
            explicit_target_id: Some("2"),
        };
        let (evaluation, plan) = CapturePlanner::plan_capture(&input, CaptureSection::Poster, NOW);
        assert_eq!(evaluation.path, DecisionPath::ExplicitTarget);
        assert_eq!(plan.target_id(), "2");
        assert_eq!(plan.record(&mut store, NOW).expect("record"), None);
        assert_eq!(store.load_meta(), remembered);
    }

    /// S3.4: A saved force-new policy applies to the next capture.
    #[test]
    fn policy_change_applies_immediately() {
        let mut store = MemoryStore::new();
        store
            .update_meta_at("1", Some(CITY_HALL), NOW - MINUTE)
            .expect("seed");
        store
            .save_policy(&CapturePolicy {
                mode: CaptureMode::ForceNew,
                ..CapturePolicy::default()
            })
            .expect("save");

        let target = capture(&mut store, &gallery_pool(), Some(CITY_HALL), NOW);
        assert!(matches!(target, CaptureTarget::New { reason: CreateReason::Decided, .. }));
    }
}
