//! # Configuration
//!
//! `vitrine.toml`, read once at startup. Every section and field is optional;
//! a missing file means all defaults. CLI flags override the file, and the
//! HTTP security knobs stay in environment variables.
//!
//! ```toml
//! [storage]
//! backend = "redb"        # or "memory"
//! database = "vitrine.db"
//!
//! [location]
//! source = "command"      # "none", "fixed" or "command"
//! command = ["termux-location", "-p", "network"]
//! timeout_ms = 8000
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use vitrine_core::VitrineError;
use vitrine_core::primitives::DEFAULT_LOCATION_TIMEOUT_MS;

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "vitrine.toml";

/// Maximum configuration file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// STORAGE
// =============================================================================

/// Which key-value backend holds the policy and memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// redb database file.
    #[default]
    Redb,
    /// Volatile; everything is forgotten on exit.
    Memory,
}

impl BackendKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Redb => "redb",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = VitrineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "redb" => Ok(Self::Redb),
            "memory" => Ok(Self::Memory),
            other => Err(VitrineError::Config(format!(
                "unknown backend '{other}' (expected redb or memory)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: BackendKind,
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Redb,
            database: PathBuf::from("vitrine.db"),
        }
    }
}

// =============================================================================
// LOCATION
// =============================================================================

/// Where the current location comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    /// No location; decisions rely on time alone.
    #[default]
    #[serde(rename = "none")]
    Disabled,
    /// A configured point (a desk setup, or testing).
    Fixed,
    /// An external locator program.
    Command,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub source: LocationSource,
    /// Latitude for the `fixed` source.
    pub lat: Option<f64>,
    /// Longitude for the `fixed` source.
    pub lng: Option<f64>,
    /// Program and arguments for the `command` source.
    pub command: Vec<String>,
    pub timeout_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            source: LocationSource::Disabled,
            lat: None,
            lng: None,
            command: Vec::new(),
            timeout_ms: DEFAULT_LOCATION_TIMEOUT_MS,
        }
    }
}

// =============================================================================
// SERVER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

// =============================================================================
// APP CONFIG
// =============================================================================

/// The whole configuration file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub location: LocationConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Parse configuration text.
    pub fn from_toml(text: &str) -> Result<Self, VitrineError> {
        toml::from_str(text).map_err(|e| VitrineError::Config(e.to_string()))
    }

    /// Load the file at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, VitrineError> {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no configuration file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(VitrineError::Io(format!(
                    "Cannot read '{}': {e}",
                    path.display()
                )));
            }
        };

        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(VitrineError::Config(format!(
                "'{}' is {} bytes (max {MAX_CONFIG_FILE_SIZE})",
                path.display(),
                metadata.len()
            )));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| VitrineError::Io(format!("Cannot read '{}': {e}", path.display())))?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}

// =============================================================================
// TESTS
// =============================================================================
