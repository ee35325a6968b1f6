//! Configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file,
//! then `DICETRAY_`-prefixed environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DICETRAY_";

/// What to do with a roll whose animation never reports completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StallPolicy {
    /// Drop the roll without logging it
    #[default]
    Discard,
    /// Log the roll anyway
    ForceLog,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    MissingFile(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Figment(#[from] Box<figment::Error>),
}

/// Roller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name recorded with each roll
    pub actor: String,
    /// Color passed to the animation for every die
    pub color: String,
    /// Largest dice count accepted in one roll
    pub max_dice: u32,
    /// Length of the simulated animation (milliseconds)
    pub animation_ms: u64,
    /// How long to wait for an animation to finish; unset waits forever
    pub completion_timeout_ms: Option<u64>,
    /// Applied when `completion_timeout_ms` elapses
    pub stall_policy: StallPolicy,
    /// Seed for a reproducible random source
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            actor: "Anonymous".to_string(),
            color: "white".to_string(),
            max_dice: 100,
            animation_ms: 600,
            completion_timeout_ms: None,
            stall_policy: StallPolicy::Discard,
            seed: None,
        }
    }
}

impl Config {
    /// Load defaults, an optional TOML file, and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
            figment = figment.merge(Toml::file(path));
        }

        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_dice == 0 {
            return Err(ConfigError::Invalid("max_dice must be at least 1".to_string()));
        }
        if self.color.trim().is_empty() {
            return Err(ConfigError::Invalid("color must not be empty".to_string()));
        }
        Ok(())
    }

    /// Simulated animation length
    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_ms)
    }

    /// Completion timeout, if any
    pub fn completion_timeout(&self) -> Option<Duration> {
        self.completion_timeout_ms.map(Duration::from_millis)
    }
}
