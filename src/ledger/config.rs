use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{Cents, as_dollars};
use crate::errors::ConfigError;

/// The unit of a buy-in: how many chips a player receives and what they pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Chips handed out per buy-in
    pub chips_per_buyin: u64,
    /// Price of one buy-in
    #[serde(with = "as_dollars")]
    pub dollars_per_buyin: Cents,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            chips_per_buyin: 100,
            dollars_per_buyin: Cents::new(2000),
        }
    }
}

impl GameConfig {
    /// Largest accepted `chips_per_buyin`.
    pub const MAX_CHIPS_PER_BUYIN: u64 = 1_000_000_000;
    /// Largest accepted `dollars_per_buyin`, $1,000,000.00.
    pub const MAX_DOLLARS_PER_BUYIN: Cents = Cents::new(100_000_000);

    /// Build a validated configuration from a chip count and a dollar price.
    pub fn new(chips_per_buyin: u64, dollars_per_buyin: f64) -> Result<Self, ConfigError> {
        if !dollars_per_buyin.is_finite() {
            return Err(ConfigError::InvalidConfiguration(format!(
                "dollars_per_buyin must be a finite amount, got {}",
                dollars_per_buyin
            )));
        }
        let config = Self {
            chips_per_buyin,
            dollars_per_buyin: Cents::from_dollars(dollars_per_buyin),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chips_per_buyin == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "chips_per_buyin must be positive".to_string(),
            ));
        }

        if self.chips_per_buyin > Self::MAX_CHIPS_PER_BUYIN {
            return Err(ConfigError::InvalidConfiguration(format!(
                "chips_per_buyin must be at most {}",
                Self::MAX_CHIPS_PER_BUYIN
            )));
        }

        if !self.dollars_per_buyin.is_positive() {
            return Err(ConfigError::InvalidConfiguration(
                "dollars_per_buyin must be positive".to_string(),
            ));
        }

        if self.dollars_per_buyin > Self::MAX_DOLLARS_PER_BUYIN {
            return Err(ConfigError::InvalidConfiguration(format!(
                "dollars_per_buyin must be at most {}",
                Self::MAX_DOLLARS_PER_BUYIN
            )));
        }

        Ok(())
    }
}

impl fmt::Display for GameConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "1 Buy-in = {} chips = {}",
            self.chips_per_buyin, self.dollars_per_buyin
        )
    }
}
