//! # Game Error Types

use creamery_economy::EconomyError;
use thiserror::Error;

/// Errors raised by the host side of the game.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// The economy refused an operation or its content is invalid.
    #[error(transparent)]
    Economy(#[from] EconomyError),

    /// A timing value makes the scheduler unusable.
    #[error("invalid timing: {0}")]
    InvalidTiming(String),

    /// The intent queue is full; the intent was dropped.
    #[error("intent queue full")]
    QueueFull,

    /// Every receiver of the intent queue is gone.
    #[error("intent queue closed")]
    QueueClosed,
}

/// Result type for game operations.
pub type GameResult<T> = Result<T, GameError>;

impl From<toml::de::Error> for GameError {
    fn from(err: toml::de::Error) -> Self {
        Self::Economy(EconomyError::from(err))
    }
}

impl From<std::io::Error> for GameError {
    fn from(err: std::io::Error) -> Self {
        Self::Economy(EconomyError::from(err))
    }
}
