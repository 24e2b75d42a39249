//! # Economy Error Types
//!
//! All errors that can occur in the economy system.
//!
//! None of them are fatal: a failed transaction leaves the ledger and the
//! registry exactly as they were.

use thiserror::Error;

use crate::fixed_point::Amount;

/// Errors that can occur in the economy system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EconomyError {
    /// Attempted to buy or convert without enough of a required resource.
    #[error("insufficient resources: need {required} {resource}, have {available}")]
    InsufficientResources {
        /// Name of the resource that was short.
        resource: String,
        /// The amount required.
        required: Amount,
        /// The amount available.
        available: Amount,
    },

    /// Attempted to sell more units than are owned, or a negative count.
    #[error("invalid sell count for {building}: requested {requested}, own {owned}")]
    InvalidSellCount {
        /// Name of the building.
        building: String,
        /// Units the caller asked to sell.
        requested: i64,
        /// Units currently owned.
        owned: u32,
    },

    /// A collect was asked to take resources away.
    #[error("cannot collect a negative amount of {resource}: {amount}")]
    NegativeCollect {
        /// Name of the resource.
        resource: String,
        /// The amount requested.
        amount: Amount,
    },

    /// Resource not found in the ledger.
    #[error("resource not found: {0}")]
    UnknownResource(String),

    /// Building not found in the registry.
    #[error("building not found: {0}")]
    UnknownBuilding(String),

    /// Exchange not found.
    #[error("exchange not found: {0}")]
    UnknownExchange(String),

    /// Activation control was requested for a building that is not a converter.
    #[error("building {0} is not a converter")]
    NotAConverter(String),

    /// Invalid content configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The content file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(String),

    /// The content file could not be read.
    #[error("failed to read configuration: {0}")]
    ConfigIo(String),
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;

impl From<toml::de::Error> for EconomyError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigParse(err.to_string())
    }
}

impl From<std::io::Error> for EconomyError {
    fn from(err: std::io::Error) -> Self {
        Self::ConfigIo(err.to_string())
    }
}
