//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::{CaptureArgs, Settings};
use crate::api::{self, AppState, PolicyUpdateRequest};
use crate::config::BackendKind;
use std::path::{Path, PathBuf};
use vitrine_core::{
    CaptureMeta, CapturePlanner, CaptureSection, CaptureTarget, DecisionEngine, DecisionInput,
    ExhibitionRef, GeoPoint, MetaStore, PolicyStore, StorageBackend, VitrineError,
    haversine_distance_meters, meters_to_confidence, now_millis, validate_pool,
};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum pool file size (16 MB).
const MAX_POOL_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Canonicalize an input path and ensure it names a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, VitrineError> {
    let canonical = path.canonicalize().map_err(|e| {
        VitrineError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(VitrineError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Read and validate a pool file: a JSON array of exhibition references.
pub fn read_pool(path: &Path) -> Result<Vec<ExhibitionRef>, VitrineError> {
    let path = validate_file_path(path)?;

    let metadata = std::fs::metadata(&path)
        .map_err(|e| VitrineError::Io(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > MAX_POOL_FILE_SIZE {
        return Err(VitrineError::InvalidInput(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_POOL_FILE_SIZE
        )));
    }

    let data = std::fs::read(&path)
        .map_err(|e| VitrineError::Io(format!("Cannot read '{}': {}", path.display(), e)))?;
    let pool: Vec<ExhibitionRef> = serde_json::from_slice(&data).map_err(|e| {
        VitrineError::Serialization(format!("Invalid pool file '{}': {}", path.display(), e))
    })?;
    validate_pool(&pool)?;
    Ok(pool)
}

// =============================================================================
// STORE
// =============================================================================

/// Open the configured settings store.
pub fn open_store(settings: &Settings) -> Result<StorageBackend, VitrineError> {
    match settings.backend {
        BackendKind::Redb => StorageBackend::with_redb(&settings.database),
        BackendKind::Memory => Ok(StorageBackend::default()),
    }
}

/// Open the store for reading only. A redb file that does not exist yet is
/// left uncreated and reads fall back to the defaults.
pub fn open_store_for_reading(settings: &Settings) -> Result<StorageBackend, VitrineError> {
    if settings.backend == BackendKind::Redb && !settings.database.exists() {
        tracing::debug!(path = %settings.database.display(), "database not initialized");
        return Ok(StorageBackend::default());
    }
    open_store(settings)
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn format_location(location: Option<GeoPoint>) -> String {
    location.map_or_else(
        || "unknown".to_string(),
        |point| format!("{:.6}, {:.6}", point.lat, point.lng),
    )
}

fn format_timestamp(at_ms: Option<i64>) -> String {
    at_ms
        .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
        .map_or_else(|| "never".to_string(), |at| at.to_rfc3339())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(settings: Settings, host: &str, port: u16) -> Result<(), VitrineError> {
    let store = open_store(&settings)?;

    println!("Vitrine Capture Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", settings.backend);
    println!("  Database: {:?}", settings.database);
    println!("  Location: {}", settings.location.describe());
    println!();
    println!("Endpoints:");
    println!("  GET  /health       - Health check");
    println!("  GET  /policy       - Capture policy");
    println!("  POST /policy       - Update capture policy");
    println!("  GET  /meta         - Last capture");
    println!("  POST /decide       - Dry-run decision");
    println!("  POST /capture      - Record a capture");
    println!("  POST /distance     - Distance between two points");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::new(store).with_location(settings.location, settings.location_timeout);
    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, state).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show storage, policy, memory and location source.
pub fn cmd_status(settings: &Settings) -> Result<(), VitrineError> {
    let initialized = settings.backend == BackendKind::Memory || settings.database.exists();
    let store = open_store_for_reading(settings)?;
    let policy = store.load_policy();
    let meta = store.load_meta();

    if settings.json_mode {
        print_json(&serde_json::json!({
            "database": settings.database.to_string_lossy(),
            "initialized": initialized,
            "backend": settings.backend.as_str(),
            "location_source": settings.location.describe(),
            "policy": policy,
            "meta": meta,
        }));
        return Ok(());
    }

    println!("Vitrine Status");
    println!("==============");
    println!("Database: {:?}", settings.database);
    println!("Backend:  {}", settings.backend);
    println!("Location: {}", settings.location.describe());
    if !initialized {
        println!("Not initialized. Run `vitrine init` to create the database.");
    }
    println!();
    print_policy(&policy);
    println!();
    print_meta(&meta);

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new database holding the default policy.
pub fn cmd_init(settings: &Settings, force: bool) -> Result<(), VitrineError> {
    if settings.backend == BackendKind::Memory {
        println!("Memory backend needs no initialization");
        return Ok(());
    }

    if settings.database.exists() {
        if !force {
            return Err(VitrineError::Storage(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(&settings.database).map_err(|e| {
            VitrineError::Io(format!(
                "Cannot remove '{}': {}",
                settings.database.display(),
                e
            ))
        })?;
    }

    let mut store = open_store(settings)?;
    store.save_policy(&vitrine_core::CapturePolicy::default())?;
    println!("Initialized new redb database at {:?}", settings.database);
    Ok(())
}

// =============================================================================
// POLICY COMMANDS
// =============================================================================

fn print_policy(policy: &vitrine_core::CapturePolicy) {
    println!("Capture Policy");
    println!("  Time window: {} min", policy.time_window_minutes);
    println!("  Distance:    {} m", policy.distance_threshold_meters);
    println!("  Mode:        {}", policy.mode);
}

/// Print the stored policy.
pub fn cmd_policy_show(settings: &Settings) -> Result<(), VitrineError> {
    let store = open_store_for_reading(settings)?;
    let policy = store.load_policy();

    if settings.json_mode {
        print_json(&serde_json::json!(policy));
    } else {
        print_policy(&policy);
    }
    Ok(())
}

/// Change one or more policy fields.
pub fn cmd_policy_set(
    settings: &Settings,
    time_window: Option<u32>,
    distance: Option<u32>,
    mode: Option<String>,
) -> Result<(), VitrineError> {
    if time_window.is_none() && distance.is_none() && mode.is_none() {
        return Err(VitrineError::InvalidInput(
            "Nothing to change. Pass --time-window, --distance or --mode.".to_string(),
        ));
    }

    let mut store = open_store(settings)?;
    let update = PolicyUpdateRequest {
        time_window_minutes: time_window,
        distance_threshold_meters: distance,
        mode,
    };
    let policy = update.apply_to(store.load_policy())?;
    store.save_policy(&policy)?;

    if settings.json_mode {
        print_json(&serde_json::json!(policy));
    } else {
        print_policy(&policy);
    }
    Ok(())
}

/// Forget the stored policy.
pub fn cmd_policy_reset(settings: &Settings) -> Result<(), VitrineError> {
    let mut store = open_store(settings)?;
    store.reset_policy()?;
    println!("Capture policy reset to defaults");
    Ok(())
}

// =============================================================================
// META COMMANDS
// =============================================================================

fn print_meta(meta: &CaptureMeta) {
    println!("Last Capture");
    println!(
        "  Exhibition: {}",
        meta.last_exhibition_id.as_deref().unwrap_or("none")
    );
    println!("  At:         {}", format_timestamp(meta.last_capture_at));
    println!("  Location:   {}", format_location(meta.last_location));
}

/// Print the last-capture memory.
pub fn cmd_meta_show(settings: &Settings) -> Result<(), VitrineError> {
    let store = open_store_for_reading(settings)?;
    let meta = store.load_meta();

    if settings.json_mode {
        print_json(&serde_json::json!(meta));
    } else {
        print_meta(&meta);
    }
    Ok(())
}

/// Forget the last capture.
pub fn cmd_meta_reset(settings: &Settings) -> Result<(), VitrineError> {
    let mut store = open_store(settings)?;
    store.reset_meta()?;
    println!("Last-capture memory cleared");
    Ok(())
}

// =============================================================================
// DECIDE COMMAND
// =============================================================================

/// Use the command-line location, or ask the configured source.
async fn resolve_location(settings: &Settings, args: &CaptureArgs) -> Option<GeoPoint> {
    match args.location() {
        Some(point) => Some(point),
        None => {
            settings
                .location
                .current_location(settings.location_timeout)
                .await
        }
    }
}

/// Dry-run a decision against a pool file.
pub async fn cmd_decide(
    settings: &Settings,
    args: &CaptureArgs,
    now: Option<i64>,
) -> Result<(), VitrineError> {
    let pool = read_pool(&args.pool)?;
    let current_location = resolve_location(settings, args).await;

    let store = open_store_for_reading(settings)?;
    let policy = store.load_policy();
    let meta = store.load_meta();

    let input = DecisionInput {
        exhibitions: &pool,
        policy: &policy,
        meta: &meta,
        current_location,
        explicit_target_id: args.target.as_deref(),
    };
    let evaluation = DecisionEngine::evaluate(&input, now.unwrap_or_else(now_millis));

    if settings.json_mode {
        print_json(&serde_json::json!({
            "decision": evaluation.decision,
            "path": evaluation.path,
            "distanceMeters": evaluation.distance_meters,
            "confidence": evaluation.confidence,
        }));
        return Ok(());
    }

    println!("Decision");
    println!("========");
    match &evaluation.decision.target_exhibition_id {
        Some(id) if !evaluation.decision.create_new => println!("Append to: {}", id),
        _ => println!("Create a new exhibition"),
    }
    println!("Rule:      {}", evaluation.path.as_str());
    println!("Location:  {}", format_location(current_location));
    if let (Some(meters), Some(confidence)) = (evaluation.distance_meters, evaluation.confidence)
    {
        println!("Moved:     {:.1} m ({} confidence)", meters, confidence);
    }
    Ok(())
}

// =============================================================================
// CAPTURE COMMAND
// =============================================================================

/// Decide, plan and record a capture.
pub async fn cmd_capture(
    settings: &Settings,
    args: &CaptureArgs,
    section: CaptureSection,
) -> Result<(), VitrineError> {
    let pool = read_pool(&args.pool)?;
    let current_location = resolve_location(settings, args).await;

    let mut store = open_store(settings)?;
    let policy = store.load_policy();
    let meta = store.load_meta();
    let now = now_millis();

    let input = DecisionInput {
        exhibitions: &pool,
        policy: &policy,
        meta: &meta,
        current_location,
        explicit_target_id: args.target.as_deref(),
    };
    let (_, plan) = CapturePlanner::plan_capture(&input, section, now);
    let recorded = plan.record(&mut store, now)?;

    if !store.is_persistent() {
        tracing::warn!("memory backend: this capture will not be remembered");
    }

    if settings.json_mode {
        print_json(&serde_json::json!({
            "plan": plan,
            "meta": recorded,
        }));
        return Ok(());
    }

    println!("Capture Plan");
    println!("============");
    match &plan.target {
        CaptureTarget::Existing { id } => println!("Append to:  {}", id),
        CaptureTarget::New { id, reason } => {
            println!("Create:     {} ({:?})", id, reason);
        }
    }
    println!("Section:    {}", plan.section);
    println!("Rule:       {}", plan.path.as_str());
    match recorded {
        Some(meta) => {
            println!();
            print_meta(&meta);
        }
        None => println!("Memory:     unchanged"),
    }
    Ok(())
}

// =============================================================================
// DISTANCE COMMAND
// =============================================================================

/// Great-circle distance between two points.
pub fn cmd_distance(settings: &Settings, from: GeoPoint, to: GeoPoint) -> Result<(), VitrineError> {
    let meters = haversine_distance_meters(from, to);
    let confidence = meters_to_confidence(meters);

    if settings.json_mode {
        print_json(&serde_json::json!({
            "meters": meters,
            "confidence": confidence,
        }));
    } else {
        println!("{:.1} m ({} confidence)", meters, confidence);
    }
    Ok(())
}

// =============================================================================
// LOCATE COMMAND
// =============================================================================

/// Query the configured location source once.
pub async fn cmd_locate(settings: &Settings) -> Result<(), VitrineError> {
    let location = settings
        .location
        .current_location(settings.location_timeout)
        .await;

    if settings.json_mode {
        print_json(&serde_json::json!({
            "source": settings.location.describe(),
            "location": location,
        }));
    } else {
        println!("Source:   {}", settings.location.describe());
        println!("Location: {}", format_location(location));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
