//! # Game Configuration
//!
//! One TOML file holds both the scheduler timing and the economy content:
//!
//! ```toml
//! [timing]
//! production_interval_ms = 1000
//! refresh_interval_ms = 10
//! max_catch_up_ticks = 5
//!
//! [[resources]]
//! name = "milk"
//! # ...
//! ```
//!
//! Every field has a default; a file with only `[timing]` plays no content,
//! and [`GameConfig::builtin`] plays the bundled game.

use std::path::Path;
use std::time::Duration;

use creamery_economy::{EconomyConfig, EconomyError};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{GameError, GameResult};

/// Default production tick interval.
pub const DEFAULT_PRODUCTION_INTERVAL_MS: u64 = 1000;

/// Default refresh tick interval.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 10;

/// Default cap on production ticks replayed after a stall.
pub const DEFAULT_MAX_CATCH_UP_TICKS: u32 = 5;

/// Scheduler timing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Production tick interval in milliseconds.
    pub production_interval_ms: u64,
    /// Refresh tick interval in milliseconds.
    pub refresh_interval_ms: u64,
    /// Most production ticks run for a single step; the rest are dropped.
    pub max_catch_up_ticks: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            production_interval_ms: DEFAULT_PRODUCTION_INTERVAL_MS,
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            max_catch_up_ticks: DEFAULT_MAX_CATCH_UP_TICKS,
        }
    }
}

impl TimingConfig {
    /// Production interval as a duration.
    #[must_use]
    pub const fn production_interval(&self) -> Duration {
        Duration::from_millis(self.production_interval_ms)
    }

    /// Refresh interval as a duration.
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Checks that the scheduler can run with these values.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTiming` for zero intervals or a zero catch-up cap.
    pub fn validate(&self) -> GameResult<()> {
        if self.production_interval_ms == 0 || self.refresh_interval_ms == 0 {
            return Err(GameError::InvalidTiming(
                "intervals must be at least 1 ms".to_string(),
            ));
        }
        if self.max_catch_up_ticks == 0 {
            return Err(GameError::InvalidTiming(
                "max_catch_up_ticks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Timing plus content.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Scheduler timing.
    #[serde(default)]
    pub timing: TimingConfig,
    /// Economy content, flattened to the top level.
    #[serde(flatten)]
    pub content: EconomyConfig,
}

impl GameConfig {
    /// Default timing with the bundled content.
    ///
    /// # Errors
    ///
    /// Only fails if the bundled content is broken.
    pub fn builtin() -> GameResult<Self> {
        Ok(Self {
            timing: TimingConfig::default(),
            content: EconomyConfig::creamery()?,
        })
    }

    /// Parses and validates a game configuration.
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed TOML and `InvalidTiming` for
    /// unusable timing values.
    pub fn from_toml_str(source: &str) -> GameResult<Self> {
        let config: Self = toml::from_str(source).map_err(EconomyError::from)?;
        config.timing.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a game configuration file.
    ///
    /// # Errors
    ///
    /// Returns a read error if the file is missing, otherwise as
    /// [`GameConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> GameResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        info!(
            path = %path.display(),
            production_ms = config.timing.production_interval_ms,
            "loaded game config"
        );
        Ok(config)
    }
}
