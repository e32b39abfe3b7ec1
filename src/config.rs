//! # Engine configuration
//!
//! Everything tunable about the engine, loadable from JSON.
//!
//! ```json
//! {
//!   "game": { "chips_per_buyin": 100, "dollars_per_buyin": 20.0 },
//!   "autosave_interval_secs": 30,
//!   "code_ttl_secs": 300,
//!   "login_ttl_secs": 86400
//! }
//! ```
//!
//! Every field is optional and falls back to the value shown above. The
//! three intervals must be between one second and one year.
use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::ledger::GameConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Buy-in unit for a fresh ledger
    pub game: GameConfig,
    /// How often an in-progress session is saved even without changes
    pub autosave_interval_secs: u64,
    /// How long a login code stays valid
    pub code_ttl_secs: u64,
    /// How long a login lasts
    pub login_ttl_secs: u64,
}

/// Upper bound for every interval setting, one year.
pub const MAX_INTERVAL_SECS: u64 = 366 * 24 * 60 * 60;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            autosave_interval_secs: 30,
            code_ttl_secs: 300,
            login_ttl_secs: 86_400,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.game.validate()?;

        for (name, secs) in [
            ("autosave_interval_secs", self.autosave_interval_secs),
            ("code_ttl_secs", self.code_ttl_secs),
            ("login_ttl_secs", self.login_ttl_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
            if secs > MAX_INTERVAL_SECS {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "{} must be at most {} seconds",
                    name, MAX_INTERVAL_SECS
                )));
            }
        }

        Ok(())
    }

    pub fn autosave_interval(&self) -> Duration {
        interval(self.autosave_interval_secs)
    }

    pub fn code_ttl(&self) -> Duration {
        interval(self.code_ttl_secs)
    }

    pub fn login_ttl(&self) -> Duration {
        interval(self.login_ttl_secs)
    }
}

// Capped so an unvalidated config can't overflow chrono.
fn interval(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_INTERVAL_SECS) as i64)
}
