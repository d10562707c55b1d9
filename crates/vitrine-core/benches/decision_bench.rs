//! # Decision Benchmarks
//!
//! Performance benchmarks for vitrine-core decision operations.
//!
//! Run with: `cargo bench -p vitrine-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use vitrine_core::formats::decode_policy;
use vitrine_core::{
    CaptureMeta, CaptureMode, CapturePolicy, DecisionEngine, DecisionInput, ExhibitionRef,
    GeoPoint, haversine_distance_meters, pick_existing_exhibition_id,
};

const NOW: i64 = 1_700_000_000_000;

/// A journal of `size` records with distinct update days.
fn create_pool(size: usize) -> Vec<ExhibitionRef> {
    (0..size)
        .map(|i| {
            let day = i % 28 + 1;
            let month = i / 28 % 12 + 1;
            ExhibitionRef::new(i.to_string()).updated(format!("2024-{month:02}-{day:02}T12:00:00Z"))
        })
        .collect()
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_haversine(c: &mut Criterion) {
    let a = GeoPoint::new(37.5665, 126.9780);
    let b = GeoPoint::new(35.1796, 129.0756);
    c.bench_function("haversine", |bench| {
        bench.iter(|| haversine_distance_meters(black_box(a), black_box(b)))
    });
}

fn bench_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("pick_existing");

    for size in [10, 100, 1000].iter() {
        let pool = create_pool(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &pool, |bench, pool| {
            bench.iter(|| black_box(pick_existing_exhibition_id(pool, None)))
        });
    }

    group.finish();
}

fn bench_decide(c: &mut Criterion) {
    let mut group = c.benchmark_group("decide");
    let here = GeoPoint::new(37.5665, 126.9780);
    let meta = CaptureMeta::record("5", NOW - 600_000, Some(here));

    for mode in [CaptureMode::Auto, CaptureMode::ForceExisting] {
        let policy = CapturePolicy {
            mode,
            ..CapturePolicy::default()
        };
        let pool = create_pool(1000);
        let empty_memory = CaptureMeta::default();
        let input = DecisionInput {
            exhibitions: &pool,
            policy: &policy,
            meta: if mode == CaptureMode::Auto {
                &meta
            } else {
                &empty_memory
            },
            current_location: Some(here),
            explicit_target_id: None,
        };
        group.bench_function(mode.as_str(), |bench| {
            bench.iter(|| black_box(DecisionEngine::decide(&input, NOW)))
        });
    }

    group.finish();
}

fn bench_decode_policy(c: &mut Criterion) {
    let raw = r#"{"timeWindowMinutes":"90","distanceThresholdMeters":150.7,"mode":"auto"}"#;
    c.bench_function("decode_policy", |bench| {
        bench.iter(|| black_box(decode_policy(Some(black_box(raw)))))
    });
}

criterion_group!(
    benches,
    bench_haversine,
    bench_selection,
    bench_decide,
    bench_decode_policy
);
criterion_main!(benches);
