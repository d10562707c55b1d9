//! # Vitrine CLI Module
//!
//! This module implements the CLI interface for Vitrine.
//!
//! ## Available Commands
//!
//! - `status` - Show storage, policy, memory and location source
//! - `init` - Initialize a new database with the default policy
//! - `policy show|set|reset` - Inspect or change the capture policy
//! - `meta show|reset` - Inspect or forget the last capture
//! - `decide` - Dry-run a decision against a pool file
//! - `capture` - Decide, plan and record a capture
//! - `distance` - Haversine distance between two points
//! - `locate` - Query the configured location source
//! - `server` - Start the HTTP server

mod commands;

use crate::config::{AppConfig, BackendKind, ServerConfig};
use crate::location::LocationProvider;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use vitrine_core::{CaptureSection, GeoPoint, VitrineError};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Vitrine - exhibition journal capture service
///
/// Decides whether each new photo belongs to the current exhibition visit or
/// starts a new one.
#[derive(Parser, Debug)]
#[command(name = "vitrine")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file
    #[arg(short = 'c', long, global = true, default_value = crate::config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Path to the settings database (overrides the config file)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "redb" or "memory" (overrides the config file)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show storage, policy, memory and location source
    Status,

    /// Initialize a new database with the default policy
    Init {
        /// Overwrite an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Inspect or change the capture policy
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },

    /// Inspect or forget the last-capture memory
    Meta {
        #[command(subcommand)]
        action: MetaAction,
    },

    /// Decide where a capture would go, without recording anything
    Decide {
        #[command(flatten)]
        capture: CaptureArgs,

        /// Evaluate at this epoch-millisecond instant instead of now
        #[arg(long)]
        now: Option<i64>,
    },

    /// Decide, plan and record a capture
    Capture {
        #[command(flatten)]
        capture: CaptureArgs,

        /// Photo list of the target record (photos, floor, poster)
        #[arg(short, long, default_value = "photos")]
        section: CaptureSection,
    },

    /// Great-circle distance between two points
    Distance {
        /// Start point as LAT,LNG
        #[arg(long, allow_hyphen_values = true)]
        from: GeoPoint,

        /// End point as LAT,LNG
        #[arg(long, allow_hyphen_values = true)]
        to: GeoPoint,
    },

    /// Query the configured location source once
    Locate,

    /// Start HTTP server
    Server {
        /// Host to bind to (overrides the config file)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Policy subcommands.
#[derive(Subcommand, Debug)]
pub enum PolicyAction {
    /// Print the stored policy
    Show,

    /// Change one or more policy fields
    Set {
        /// Time window in minutes
        #[arg(short, long)]
        time_window: Option<u32>,

        /// Distance threshold in meters
        #[arg(short, long)]
        distance: Option<u32>,

        /// auto, force-new or force-existing
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// Forget the stored policy (back to defaults)
    Reset,
}

/// Memory subcommands.
#[derive(Subcommand, Debug)]
pub enum MetaAction {
    /// Print the last-capture memory
    Show,

    /// Forget the last capture
    Reset,
}

/// Arguments shared by `decide` and `capture`.
#[derive(clap::Args, Debug)]
pub struct CaptureArgs {
    /// JSON file holding the exhibition pool (`[{"id": .., "updatedAt": ..}]`)
    #[arg(short = 'f', long)]
    pub pool: PathBuf,

    /// Current latitude (skips the location source)
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Current longitude (skips the location source)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Hand-picked exhibition id
    #[arg(short, long)]
    pub target: Option<String>,
}

impl CaptureArgs {
    /// The location given on the command line, if any.
    #[must_use]
    pub fn location(&self) -> Option<GeoPoint> {
        self.lat.zip(self.lng).map(|(lat, lng)| GeoPoint::new(lat, lng))
    }
}

// =============================================================================
// RESOLVED SETTINGS
// =============================================================================

/// Configuration file merged with command-line overrides.
#[derive(Debug)]
pub struct Settings {
    pub backend: BackendKind,
    pub database: PathBuf,
    pub location: LocationProvider,
    pub location_timeout: Duration,
    pub server: ServerConfig,
    pub json_mode: bool,
}

impl Settings {
    /// Load the configuration file and apply the global flags.
    pub fn resolve(cli: &Cli) -> Result<Self, VitrineError> {
        let config = AppConfig::load(&cli.config)?;

        let backend = match cli.backend.as_deref() {
            Some(name) => name.parse()?,
            None => config.storage.backend,
        };

        Ok(Self {
            backend,
            database: cli
                .database
                .clone()
                .unwrap_or(config.storage.database),
            location: LocationProvider::from_config(&config.location)?,
            location_timeout: Duration::from_millis(config.location.timeout_ms),
            server: config.server,
            json_mode: cli.json_mode,
        })
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), VitrineError> {
    let settings = Settings::resolve(&cli)?;

    match cli.command {
        Some(Commands::Status) | None => cmd_status(&settings),
        Some(Commands::Init { force }) => cmd_init(&settings, force),
        Some(Commands::Policy { action }) => match action {
            PolicyAction::Show => cmd_policy_show(&settings),
            PolicyAction::Set {
                time_window,
                distance,
                mode,
            } => cmd_policy_set(&settings, time_window, distance, mode),
            PolicyAction::Reset => cmd_policy_reset(&settings),
        },
        Some(Commands::Meta { action }) => match action {
            MetaAction::Show => cmd_meta_show(&settings),
            MetaAction::Reset => cmd_meta_reset(&settings),
        },
        Some(Commands::Decide { capture, now }) => cmd_decide(&settings, &capture, now).await,
        Some(Commands::Capture { capture, section }) => {
            cmd_capture(&settings, &capture, section).await
        }
        Some(Commands::Distance { from, to }) => cmd_distance(&settings, from, to),
        Some(Commands::Locate) => cmd_locate(&settings).await,
        Some(Commands::Server { host, port }) => {
            let host = host.unwrap_or_else(|| settings.server.host.clone());
            let port = port.unwrap_or(settings.server.port);
            cmd_server(settings, &host, port).await
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
