//! # Creamery Economy
//!
//! The arithmetic behind an incremental ice cream game, with no GUI attached.
//!
//! ## Design Principles
//!
//! 1. **Zero floating point** - Amounts and costs live on a 2-decimal integer grid
//! 2. **Transactional purchases** - A failed buy, sell or exchange changes nothing
//! 3. **Incremental rate display** - Per-resource rates follow every effect toggle
//! 4. **External configuration** - All content in TOML files
//!
//! ## Threading
//!
//! The engine is single-threaded and lock-free. Hosts that tick and render on
//! different threads wrap it in one coarse lock.
//!
//! ## Example
//!
//! ```rust
//! use creamery_economy::{Amount, EconomyConfig};
//!
//! let mut economy = EconomyConfig::creamery()?.build()?;
//! let milk = economy.resource_id("milk")?;
//! let cow = economy.building_id("Cow")?;
//!
//! economy.collect(milk, Amount::from_whole(10))?;
//! economy.buy(cow)?;
//! economy.tick();
//! assert_eq!(economy.amount(milk), Amount::from_cents(63));
//! # Ok::<(), creamery_economy::EconomyError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod fixed_point;
pub mod ledger;
pub mod registry;
pub mod unlock;

pub use config::{EconomyConfig, CREAMERY_CONTENT};
pub use engine::{
    BuildingView, CostView, Economy, EconomySnapshot, ExchangeView, ResourceView, TickReport,
};
pub use error::{EconomyError, EconomyResult};
pub use exchange::{Exchange, ExchangeId, ExchangeTable, Multiplier};
pub use fixed_point::{Amount, Ratio};
pub use ledger::{Ledger, Resource, ResourceId};
pub use registry::{
    Building, BuildingId, BuildingKind, CostLine, EfficiencyBoost, Registry, ResourceAmount,
    ResourceRate,
};
pub use unlock::{Entity, UnlockCondition, UnlockRule};
