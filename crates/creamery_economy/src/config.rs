//! # Content Configuration
//!
//! Resources, buildings, exchanges and unlock rules are data. They are read
//! once at startup from TOML and resolved into an [`Economy`]; names are only
//! used here; the engine works on ids.
//!
//! ```toml
//! [[resources]]
//! name = "milk"
//! capacity = 5000
//!
//! [[buildings]]
//! name = "Cow"
//! kind = "producer"
//! costs = [{ resource = "milk", amount = 10, growth = 1.12 }]
//! effects = [{ resource = "milk", rate = 0.63 }]
//!
//! [[exchanges]]
//! name = "make ice cream"
//! inputs = [{ resource = "milk", amount = 50 }]
//! output = { resource = "ice cream", amount = 1 }
//!
//! [[unlocks]]
//! target = { building = "Cow" }
//! when = { resource = "milk", at_least = 3 }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::Economy;
use crate::error::{EconomyError, EconomyResult};
use crate::exchange::ExchangeTable;
use crate::fixed_point::{Amount, Ratio};
use crate::ledger::Ledger;
use crate::registry::{
    BuildingId, BuildingKind, CostLine, EfficiencyBoost, Registry, ResourceAmount, ResourceRate,
};
use crate::unlock::{Entity, UnlockCondition, UnlockRule};

/// The built-in content: the ice cream game.
pub const CREAMERY_CONTENT: &str = include_str!("../data/creamery.toml");

/// Capacity given to resources that do not name one.
pub const DEFAULT_CAPACITY: Amount = Amount::from_whole(5000);

fn default_capacity() -> Amount {
    DEFAULT_CAPACITY
}

/// One `[[resources]]` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Unique name.
    pub name: String,
    /// Initial capacity.
    #[serde(default = "default_capacity")]
    pub capacity: Amount,
    /// Starting amount.
    #[serde(default)]
    pub amount: Amount,
}

/// One price line of a building.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostConfig {
    /// Resource paid.
    pub resource: String,
    /// Price of the first unit.
    pub amount: Amount,
    /// Multiplier applied after each purchase.
    pub growth: Ratio,
}

/// A named resource quantity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountConfig {
    /// Resource name.
    pub resource: String,
    /// Quantity.
    pub amount: Amount,
}

/// A named per-unit rate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateConfig {
    /// Resource name.
    pub resource: String,
    /// Per unit per tick.
    pub rate: Ratio,
}

/// An efficiency boost by building name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoostConfig {
    /// Target building name.
    pub building: String,
    /// Multiplier increment per unit.
    pub increment: Ratio,
}

/// Building kind as written in content files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindConfig {
    /// Steady production.
    Producer,
    /// Activated conversion.
    Converter,
    /// Capacity expansion.
    Storage,
    /// Multiplier for other buildings.
    Efficiency,
    /// Capacity expansion and multiplier.
    StorageEfficiency,
}

/// One `[[buildings]]` table. Which lists are allowed depends on `kind`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingConfig {
    /// Unique name.
    pub name: String,
    /// What the building does.
    pub kind: KindConfig,
    /// Price of the first unit.
    pub costs: Vec<CostConfig>,
    /// Producer and converter outputs.
    #[serde(default)]
    pub effects: Vec<RateConfig>,
    /// Converter inputs.
    #[serde(default)]
    pub inputs: Vec<AmountConfig>,
    /// Storage expansions.
    #[serde(default)]
    pub expansions: Vec<AmountConfig>,
    /// Efficiency boosts.
    #[serde(default)]
    pub boosts: Vec<BoostConfig>,
}

/// One `[[exchanges]]` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Unique name.
    pub name: String,
    /// Spent per exchange.
    pub inputs: Vec<AmountConfig>,
    /// Granted per exchange.
    pub output: AmountConfig,
}

/// What an unlock reveals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetConfig {
    /// A resource label.
    Resource(String),
    /// A building row.
    Building(String),
    /// An exchange button.
    Exchange(String),
}

/// When an unlock fires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WhenConfig {
    /// The resource reached an amount.
    Resource {
        /// Watched resource.
        resource: String,
        /// Threshold, inclusive.
        at_least: Amount,
    },
    /// The building was owned in some number of units.
    Building {
        /// Watched building.
        building: String,
        /// Threshold, inclusive.
        owned: u32,
    },
}

/// One `[[unlocks]]` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockConfig {
    /// What gets revealed.
    pub target: TargetConfig,
    /// When it gets revealed.
    pub when: WhenConfig,
}

/// A whole content file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Resources in declaration order.
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
    /// Buildings in declaration order.
    #[serde(default)]
    pub buildings: Vec<BuildingConfig>,
    /// Exchanges in declaration order.
    #[serde(default)]
    pub exchanges: Vec<ExchangeConfig>,
    /// Visibility rules.
    #[serde(default)]
    pub unlocks: Vec<UnlockConfig>,
}

impl EconomyConfig {
    /// Parses content from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigParse` on malformed TOML or unknown values.
    pub fn from_toml_str(source: &str) -> EconomyResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a content file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigIo` if the file cannot be read and `ConfigParse` if it
    /// is not valid content.
    pub fn from_file(path: impl AsRef<Path>) -> EconomyResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        info!(path = %path.display(), buildings = config.buildings.len(), "loaded content");
        Ok(config)
    }

    /// The built-in ice cream game.
    ///
    /// # Errors
    ///
    /// Only fails if the bundled file is broken.
    pub fn creamery() -> EconomyResult<Self> {
        Self::from_toml_str(CREAMERY_CONTENT)
    }

    /// Resolves names and assembles the economy.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for duplicate names, lists that do not match
    /// a building's kind and efficiency boosts on non-producing buildings;
    /// `UnknownResource`, `UnknownBuilding` or `UnknownExchange` for
    /// dangling references.
    pub fn build(&self) -> EconomyResult<Economy> {
        let mut ledger = Ledger::new();
        for resource in &self.resources {
            ledger.add_resource(&resource.name, resource.capacity, resource.amount)?;
        }

        // Boosts may point at buildings declared further down.
        let mut positions = HashMap::new();
        for (building, index) in self.buildings.iter().zip(0u32..) {
            positions
                .entry(building.name.as_str())
                .or_insert_with(|| BuildingId::from_index(index));
        }
        let building_id = |name: &str| {
            positions
                .get(name)
                .copied()
                .ok_or_else(|| EconomyError::UnknownBuilding(name.to_string()))
        };

        let mut registry = Registry::new();
        for building in &self.buildings {
            let costs = building
                .costs
                .iter()
                .map(|cost| Ok(CostLine::new(ledger.id_of(&cost.resource)?, cost.amount, cost.growth)))
                .collect::<EconomyResult<Vec<_>>>()?;
            let kind = building.resolve_kind(&ledger, &building_id)?;
            registry.add_building(&building.name, costs, kind)?;
        }

        let mut exchanges = ExchangeTable::new();
        for exchange in &self.exchanges {
            let inputs = resolve_amounts(&ledger, &exchange.inputs)?;
            let output = ResourceAmount::new(
                ledger.id_of(&exchange.output.resource)?,
                exchange.output.amount,
            );
            exchanges.add_exchange(&exchange.name, inputs, output)?;
        }

        let mut rules = Vec::with_capacity(self.unlocks.len());
        for unlock in &self.unlocks {
            let target = match &unlock.target {
                TargetConfig::Resource(name) => Entity::Resource(ledger.id_of(name)?),
                TargetConfig::Building(name) => Entity::Building(registry.id_of(name)?),
                TargetConfig::Exchange(name) => Entity::Exchange(exchanges.id_of(name)?),
            };
            let condition = match &unlock.when {
                WhenConfig::Resource { resource, at_least } => UnlockCondition::ResourceReached {
                    resource: ledger.id_of(resource)?,
                    at_least: *at_least,
                },
                WhenConfig::Building { building, owned } => UnlockCondition::BuildingOwned {
                    building: registry.id_of(building)?,
                    owned: *owned,
                },
            };
            rules.push(UnlockRule { target, condition });
        }

        Economy::new(ledger, registry, exchanges, rules)
    }
}

fn resolve_amounts(ledger: &Ledger, amounts: &[AmountConfig]) -> EconomyResult<Vec<ResourceAmount>> {
    amounts
        .iter()
        .map(|entry| Ok(ResourceAmount::new(ledger.id_of(&entry.resource)?, entry.amount)))
        .collect()
}

fn resolve_rates(ledger: &Ledger, rates: &[RateConfig]) -> EconomyResult<Vec<ResourceRate>> {
    rates
        .iter()
        .map(|entry| Ok(ResourceRate::new(ledger.id_of(&entry.resource)?, entry.rate)))
        .collect()
}

impl BuildingConfig {
    fn resolve_kind(
        &self,
        ledger: &Ledger,
        building_id: &impl Fn(&str) -> EconomyResult<BuildingId>,
    ) -> EconomyResult<BuildingKind> {
        let (effects, inputs, expansions, boosts) = match self.kind {
            KindConfig::Producer => (true, false, false, false),
            KindConfig::Converter => (true, true, false, false),
            KindConfig::Storage => (false, false, true, false),
            KindConfig::Efficiency => (false, false, false, true),
            KindConfig::StorageEfficiency => (false, false, true, true),
        };
        let stray = [
            ("effects", effects, self.effects.is_empty()),
            ("inputs", inputs, self.inputs.is_empty()),
            ("expansions", expansions, self.expansions.is_empty()),
            ("boosts", boosts, self.boosts.is_empty()),
        ]
        .into_iter()
        .find(|(_, allowed, empty)| !allowed && !empty);
        if let Some((field, _, _)) = stray {
            return Err(EconomyError::InvalidConfig(format!(
                "building {} cannot have {field}",
                self.name
            )));
        }

        let boosts = self
            .boosts
            .iter()
            .map(|boost| Ok(EfficiencyBoost::new(building_id(&boost.building)?, boost.increment)))
            .collect::<EconomyResult<Vec<_>>>()?;

        Ok(match self.kind {
            KindConfig::Producer => BuildingKind::Producer {
                effects: resolve_rates(ledger, &self.effects)?,
            },
            KindConfig::Converter => BuildingKind::Converter {
                inputs: resolve_amounts(ledger, &self.inputs)?,
                outputs: resolve_rates(ledger, &self.effects)?,
                activated: 0,
            },
            KindConfig::Storage => BuildingKind::Storage {
                expansions: resolve_amounts(ledger, &self.expansions)?,
            },
            KindConfig::Efficiency => BuildingKind::Efficiency { boosts },
            KindConfig::StorageEfficiency => BuildingKind::StorageEfficiency {
                expansions: resolve_amounts(ledger, &self.expansions)?,
                boosts,
            },
        })
    }
}
