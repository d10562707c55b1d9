//! # Location Provider
//!
//! Best-effort current location for a capture.
//!
//! A lookup never fails from the caller's point of view: a disabled source,
//! a locator that exits non-zero (permission denied, no fix), unparsable
//! output and a timeout all resolve to `None`, and the decision engine then
//! relies on elapsed time alone.
//!
//! The `command` source runs an external locator such as `termux-location`
//! or `CoreLocationCLI` and accepts any of these on stdout:
//! - `37.5665 126.978`
//! - `37.5665,126.978`
//! - `{"lat": 37.5665, "lng": 126.978}` or `{"latitude": .., "longitude": ..}`

use crate::config::{LocationConfig, LocationSource};
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use vitrine_core::{GeoPoint, VitrineError};

/// Where a lookup gets its answer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LocationProvider {
    /// Always `None`.
    #[default]
    Disabled,
    /// Always the same point.
    Fixed(GeoPoint),
    /// Run a locator program and parse its stdout.
    Command { program: String, args: Vec<String> },
}

impl LocationProvider {
    /// Build the provider described by the `[location]` section.
    pub fn from_config(config: &LocationConfig) -> Result<Self, VitrineError> {
        match config.source {
            LocationSource::Disabled => Ok(Self::Disabled),
            LocationSource::Fixed => match (config.lat, config.lng) {
                (Some(lat), Some(lng)) => {
                    let point = GeoPoint::new(lat, lng);
                    if !is_valid_point(point) {
                        return Err(VitrineError::Config(format!(
                            "fixed location ({lat}, {lng}) is out of range"
                        )));
                    }
                    Ok(Self::Fixed(point))
                }
                _ => Err(VitrineError::Config(
                    "location source 'fixed' needs both lat and lng".to_string(),
                )),
            },
            LocationSource::Command => {
                let (program, args) = config.command.split_first().ok_or_else(|| {
                    VitrineError::Config(
                        "location source 'command' needs a non-empty command".to_string(),
                    )
                })?;
                Ok(Self::Command {
                    program: program.clone(),
                    args: args.to_vec(),
                })
            }
        }
    }

    /// Short name for status output.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Disabled => "none".to_string(),
            Self::Fixed(point) => format!("fixed ({}, {})", point.lat, point.lng),
            Self::Command { program, .. } => format!("command ({program})"),
        }
    }

    /// Fetch the current location, giving up after `timeout`.
    pub async fn current_location(&self, timeout: Duration) -> Option<GeoPoint> {
        match self {
            Self::Disabled => None,
            Self::Fixed(point) => Some(*point),
            Self::Command { program, args } => {
                match tokio::time::timeout(timeout, run_locator(program, args)).await {
                    Ok(point) => point,
                    Err(_) => {
                        tracing::warn!(
                            program = %program,
                            ?timeout,
                            "location lookup timed out"
                        );
                        None
                    }
                }
            }
        }
    }
}

async fn run_locator(program: &str, args: &[String]) -> Option<GeoPoint> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await;

    let output = match output {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(program, error = %e, "location command could not be started");
            return None;
        }
    };

    if !output.status.success() {
        tracing::info!(
            program,
            status = %output.status,
            "location command failed, continuing without location"
        );
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let point = parse_location_output(&stdout);
    if point.is_none() {
        tracing::warn!(program, "location command output not understood");
    }
    point
}

/// Parse a locator's stdout into a point.
#[must_use]
pub fn parse_location_output(output: &str) -> Option<GeoPoint> {
    let trimmed = output.trim();
    let point = if trimmed.starts_with('{') {
        let value: Value = serde_json::from_str(trimmed).ok()?;
        let lat = first_number(&value, &["lat", "latitude"])?;
        let lng = first_number(&value, &["lng", "lon", "longitude"])?;
        GeoPoint::new(lat, lng)
    } else {
        let mut parts = trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty());
        let lat = parts.next()?.parse().ok()?;
        let lng = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        GeoPoint::new(lat, lng)
    };
    is_valid_point(point).then_some(point)
}

fn first_number(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| value.get(*key).and_then(Value::as_f64))
}

fn is_valid_point(point: GeoPoint) -> bool {
    (-90.0..=90.0).contains(&point.lat) && (-180.0..=180.0).contains(&point.lng)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SEOUL: GeoPoint = GeoPoint::new(37.5665, 126.978);

    #[test]
    fn parses_plain_pairs() {
        assert_eq!(parse_location_output("37.5665 126.978\n"), Some(SEOUL));
        assert_eq!(parse_location_output("37.5665,126.978"), Some(SEOUL));
        assert_eq!(parse_location_output(" 37.5665 , 126.978 "), Some(SEOUL));
    }

    #[test]
    fn parses_json_objects() {
        assert_eq!(
            parse_location_output(r#"{"lat":37.5665,"lng":126.978}"#),
            Some(SEOUL)
        );
        assert_eq!(
            parse_location_output(
                r#"{"latitude":37.5665,"longitude":126.978,"accuracy":12.0,"provider":"network"}"#
            ),
            Some(SEOUL)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_location_output(""), None);
        assert_eq!(parse_location_output("no fix"), None);
        assert_eq!(parse_location_output("1 2 3"), None);
        assert_eq!(parse_location_output("95.0 10.0"), None);
        assert_eq!(parse_location_output(r#"{"lat":"37.5","lng":126.9}"#), None);
        assert_eq!(parse_location_output("NaN 10"), None);
    }

    #[test]
    fn provider_from_config() {
        let fixed = LocationConfig {
            source: LocationSource::Fixed,
            lat: Some(SEOUL.lat),
            lng: Some(SEOUL.lng),
            ..LocationConfig::default()
        };
        assert_eq!(
            LocationProvider::from_config(&fixed).expect("fixed"),
            LocationProvider::Fixed(SEOUL)
        );

        let half = LocationConfig {
            lng: None,
            ..fixed
        };
        assert!(LocationProvider::from_config(&half).is_err());

        let command = LocationConfig {
            source: LocationSource::Command,
            command: vec!["termux-location".to_string(), "-p".to_string(), "network".to_string()],
            ..LocationConfig::default()
        };
        assert_eq!(
            LocationProvider::from_config(&command).expect("command"),
            LocationProvider::Command {
                program: "termux-location".to_string(),
                args: vec!["-p".to_string(), "network".to_string()],
            }
        );

        let empty = LocationConfig {
            source: LocationSource::Command,
            ..LocationConfig::default()
        };
        assert!(LocationProvider::from_config(&empty).is_err());
    }

    #[tokio::test]
    async fn disabled_and_fixed_sources() {
        let timeout = Duration::from_millis(100);
        assert_eq!(LocationProvider::Disabled.current_location(timeout).await, None);
        assert_eq!(
            LocationProvider::Fixed(SEOUL).current_location(timeout).await,
            Some(SEOUL)
        );
    }

    #[tokio::test]
    async fn missing_program_yields_none() {
        let provider = LocationProvider::Command {
            program: "vitrine-no-such-locator".to_string(),
            args: Vec::new(),
        };
        assert_eq!(provider.current_location(Duration::from_secs(2)).await, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_output_and_failures() {
        let echo = LocationProvider::Command {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo 37.5665,126.978".to_string()],
        };
        assert_eq!(echo.current_location(Duration::from_secs(5)).await, Some(SEOUL));

        let denied = LocationProvider::Command {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo 37.5 126.9; exit 1".to_string()],
        };
        assert_eq!(denied.current_location(Duration::from_secs(5)).await, None);

        let slow = LocationProvider::Command {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "sleep 5; echo 37.5 126.9".to_string()],
        };
        assert_eq!(slow.current_location(Duration::from_millis(200)).await, None);
    }
}
