//! Configuration management for the runner.

use std::env;
use std::path::PathBuf;

/// Runner configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Snapshot file of the left replica
    pub left: PathBuf,
    /// Snapshot file of the right replica
    pub right: PathBuf,
    /// Snapshot file of the shared state; missing means first sync
    pub state: PathBuf,
    /// Maximum rounds to run; stops early once a round finds nothing
    pub rounds: u32,
    /// Boolean attributes every record carries
    pub attributes: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let left = lookup("TWINSYNC_LEFT")
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingVar("TWINSYNC_LEFT"))?;

        let right = lookup("TWINSYNC_RIGHT")
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingVar("TWINSYNC_RIGHT"))?;

        let state = lookup("TWINSYNC_STATE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("state.json"));

        let rounds = lookup("TWINSYNC_ROUNDS")
            .unwrap_or_else(|| "1".to_string())
            .parse()
            .ok()
            .filter(|rounds| *rounds >= 1)
            .ok_or(ConfigError::InvalidRounds)?;

        let attributes: Vec<String> = lookup("TWINSYNC_ATTRIBUTES")
            .unwrap_or_else(|| "read,important".to_string())
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();
        if attributes.is_empty() {
            return Err(ConfigError::EmptyAttributes);
        }

        Ok(Self {
            left,
            right,
            state,
            rounds,
            attributes,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(&'static str),

    #[error("Invalid TWINSYNC_ROUNDS value, expected a positive integer")]
    InvalidRounds,

    #[error("TWINSYNC_ATTRIBUTES must name at least one attribute")]
    EmptyAttributes,
}
