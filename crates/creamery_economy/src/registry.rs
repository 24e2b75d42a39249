//! # Production Registry
//!
//! **Everything the player can own.**
//!
//! A building is a repeatable purchase. Each unit bought makes the next one
//! dearer; each unit sold walks the price back down. What a unit *does* is
//! decided by its [`BuildingKind`]:
//!
//! | Kind                | Effect per unit                                   |
//! |---------------------|---------------------------------------------------|
//! | `Producer`          | adds a fixed rate of resources every tick         |
//! | `Converter`         | while activated, turns inputs into outputs        |
//! | `Storage`           | raises the capacity of some resources             |
//! | `Efficiency`        | raises the efficiency multiplier of other buildings |
//! | `StorageEfficiency` | both of the above                                 |
//!
//! ## Integrity
//!
//! Efficiency buildings may only boost producers and converters. Boosting
//! another efficiency building would make multipliers depend on each other;
//! [`Registry::validate`] rejects such content up front.
//!
//! ## Example
//!
//! ```rust,ignore
//! let cow = registry.add_building(
//!     "Cow",
//!     vec![CostLine::new(milk, Amount::from_whole(10), Ratio::from_raw(11_200))],
//!     BuildingKind::Producer {
//!         effects: vec![ResourceRate::new(milk, Ratio::from_raw(6_300))],
//!     },
//! )?;
//! registry.validate()?;
//! ```

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{EconomyError, EconomyResult};
use crate::fixed_point::{Amount, Ratio};
use crate::ledger::ResourceId;

/// Index of a building in the registry, assigned in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct BuildingId(u32);

impl BuildingId {
    /// Returns the position of this building in declaration order.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Builds an id from a declaration position.
    ///
    /// Content loaders use this to resolve forward references before the
    /// target building is registered; [`Registry::validate`] checks them.
    #[inline]
    #[must_use]
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }
}

/// A fixed quantity of one resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceAmount {
    /// The resource.
    pub resource: ResourceId,
    /// Quantity required, consumed or granted.
    pub amount: Amount,
}

impl ResourceAmount {
    /// Creates a new resource amount.
    #[inline]
    #[must_use]
    pub const fn new(resource: ResourceId, amount: Amount) -> Self {
        Self { resource, amount }
    }
}

/// A per-unit, per-tick rate for one resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceRate {
    /// The resource produced.
    pub resource: ResourceId,
    /// Quantity per unit per tick, before efficiency.
    pub rate: Ratio,
}

impl ResourceRate {
    /// Creates a new resource rate.
    #[inline]
    #[must_use]
    pub const fn new(resource: ResourceId, rate: Ratio) -> Self {
        Self { resource, rate }
    }
}

/// An efficiency increment applied to another building per unit owned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EfficiencyBoost {
    /// The building whose multiplier is raised.
    pub target: BuildingId,
    /// Added to the target's multiplier (`0.2` is +20%).
    pub increment: Ratio,
}

impl EfficiencyBoost {
    /// Creates a new efficiency boost.
    #[inline]
    #[must_use]
    pub const fn new(target: BuildingId, increment: Ratio) -> Self {
        Self { target, increment }
    }
}

/// One line of a building's price: what resource, how much, how fast it grows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CostLine {
    /// Resource paid.
    resource: ResourceId,
    /// Price of the next unit.
    amount: Amount,
    /// Price of the first unit.
    initial: Amount,
    /// Multiplier applied after each purchase.
    growth: Ratio,
}

impl CostLine {
    /// Creates a cost line priced at `amount` for the first unit.
    #[inline]
    #[must_use]
    pub const fn new(resource: ResourceId, amount: Amount, growth: Ratio) -> Self {
        Self {
            resource,
            amount,
            initial: amount,
            growth,
        }
    }

    /// Returns the resource paid.
    #[inline]
    #[must_use]
    pub const fn resource(&self) -> ResourceId {
        self.resource
    }

    /// Returns the price of the next unit.
    #[inline]
    #[must_use]
    pub const fn amount(&self) -> Amount {
        self.amount
    }

    /// Returns the price of the first unit.
    #[inline]
    #[must_use]
    pub const fn initial(&self) -> Amount {
        self.initial
    }

    /// Returns the growth multiplier.
    #[inline]
    #[must_use]
    pub const fn growth(&self) -> Ratio {
        self.growth
    }

    /// Applies one purchase worth of growth, rounding to 2 decimals.
    pub(crate) fn grow(&mut self) {
        self.amount = self.amount.mul_ratio(self.growth);
    }

    /// Reverses one purchase worth of growth and returns the reduced price.
    pub(crate) fn shrink(&mut self) -> Amount {
        if let Some(reduced) = self.amount.div_ratio(self.growth) {
            self.amount = reduced;
        }
        self.amount
    }
}

/// What a building does. A closed set, dispatched with `match` by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildingKind {
    /// Steady production every tick.
    Producer {
        /// Per-unit rates.
        effects: Vec<ResourceRate>,
    },
    /// Player-activated conversion of inputs into outputs.
    Converter {
        /// Consumed per activated unit per tick.
        inputs: Vec<ResourceAmount>,
        /// Produced per activated unit per tick, before efficiency.
        outputs: Vec<ResourceRate>,
        /// Units currently running, `0..=count`.
        activated: u32,
    },
    /// Capacity expansion.
    Storage {
        /// Capacity added per unit owned.
        expansions: Vec<ResourceAmount>,
    },
    /// Multiplier for other buildings.
    Efficiency {
        /// Increments applied per unit owned.
        boosts: Vec<EfficiencyBoost>,
    },
    /// Capacity expansion and multiplier in one building.
    StorageEfficiency {
        /// Capacity added per unit owned.
        expansions: Vec<ResourceAmount>,
        /// Increments applied per unit owned.
        boosts: Vec<EfficiencyBoost>,
    },
}

impl BuildingKind {
    /// Short lowercase name, as used in content files.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Producer { .. } => "producer",
            Self::Converter { .. } => "converter",
            Self::Storage { .. } => "storage",
            Self::Efficiency { .. } => "efficiency",
            Self::StorageEfficiency { .. } => "storage_efficiency",
        }
    }
}

/// An ownable building and its purchase state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Building {
    /// Registry index.
    id: BuildingId,
    /// Unique name.
    name: String,
    /// Units owned.
    count: u32,
    /// Price of the next unit.
    costs: Vec<CostLine>,
    /// Scales every output of this building.
    efficiency: Ratio,
    /// What the building does.
    kind: BuildingKind,
}

impl Building {
    /// Returns the registry id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> BuildingId {
        self.id
    }

    /// Returns the building name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of units owned.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Returns the price of the next unit.
    #[inline]
    #[must_use]
    pub fn costs(&self) -> &[CostLine] {
        &self.costs
    }

    /// Returns the efficiency multiplier (1.0 unless boosted).
    #[inline]
    #[must_use]
    pub const fn efficiency(&self) -> Ratio {
        self.efficiency
    }

    /// Returns the building kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> &BuildingKind {
        &self.kind
    }

    /// Returns the activated count for converters, `None` otherwise.
    #[inline]
    #[must_use]
    pub const fn activated(&self) -> Option<u32> {
        match &self.kind {
            BuildingKind::Converter { activated, .. } => Some(*activated),
            _ => None,
        }
    }

    /// Returns true for converters.
    #[inline]
    #[must_use]
    pub const fn is_converter(&self) -> bool {
        matches!(self.kind, BuildingKind::Converter { .. })
    }

    /// Units whose outputs currently count toward production.
    ///
    /// All owned producers run; only activated converters do.
    #[must_use]
    pub const fn running_units(&self) -> u32 {
        match &self.kind {
            BuildingKind::Producer { .. } => self.count,
            BuildingKind::Converter { activated, .. } => *activated,
            _ => 0,
        }
    }

    /// Per-unit outputs scaled by efficiency.
    pub fn outputs(&self) -> &[ResourceRate] {
        match &self.kind {
            BuildingKind::Producer { effects } => effects,
            BuildingKind::Converter { outputs, .. } => outputs,
            _ => &[],
        }
    }

    /// Per-unit converter inputs; empty for other kinds.
    #[must_use]
    pub fn inputs(&self) -> &[ResourceAmount] {
        match &self.kind {
            BuildingKind::Converter { inputs, .. } => inputs,
            _ => &[],
        }
    }

    /// Capacity expansions per unit; empty unless a storage kind.
    #[must_use]
    pub fn expansions(&self) -> &[ResourceAmount] {
        match &self.kind {
            BuildingKind::Storage { expansions }
            | BuildingKind::StorageEfficiency { expansions, .. } => expansions,
            _ => &[],
        }
    }

    /// Efficiency boosts per unit; empty unless an efficiency kind.
    #[must_use]
    pub fn boosts(&self) -> &[EfficiencyBoost] {
        match &self.kind {
            BuildingKind::Efficiency { boosts }
            | BuildingKind::StorageEfficiency { boosts, .. } => boosts,
            _ => &[],
        }
    }

    /// Effective per-unit rate of one output after efficiency.
    #[inline]
    #[must_use]
    pub fn effective_rate(&self, output: &ResourceRate) -> Ratio {
        output.rate * self.efficiency
    }

    pub(crate) fn costs_mut(&mut self) -> &mut [CostLine] {
        &mut self.costs
    }

    pub(crate) fn set_count(&mut self, count: u32) {
        self.count = count;
    }

    pub(crate) fn set_efficiency(&mut self, efficiency: Ratio) {
        self.efficiency = efficiency;
    }

    /// Sets the activated count, clamped to `0..=count`. Returns the previous value.
    ///
    /// No-op returning `None` for non-converters.
    pub(crate) fn set_activated(&mut self, value: i64) -> Option<u32> {
        let count = self.count;
        match &mut self.kind {
            BuildingKind::Converter { activated, .. } => {
                let previous = *activated;
                let clamped = value.clamp(0, i64::from(count));
                *activated = u32::try_from(clamped).unwrap_or(count);
                Some(previous)
            }
            _ => None,
        }
    }
}

/// All buildings of one economy.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    /// Buildings in declaration order.
    buildings: Vec<Building>,
    /// Name index.
    by_name: HashMap<String, BuildingId>,
    /// Whether boost targets have been checked since the last insertion.
    validated: bool,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a building with `count = 0` and efficiency 1.0.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the name is taken, the building has no
    /// price, a growth multiplier is not positive, or the kind carries no
    /// effect at all.
    pub fn add_building(
        &mut self,
        name: &str,
        costs: Vec<CostLine>,
        kind: BuildingKind,
    ) -> EconomyResult<BuildingId> {
        if self.by_name.contains_key(name) {
            return Err(EconomyError::InvalidConfig(format!(
                "building {name} declared twice"
            )));
        }
        if costs.is_empty() {
            return Err(EconomyError::InvalidConfig(format!(
                "building {name} must cost something"
            )));
        }
        if let Some(line) = costs.iter().find(|line| !line.growth.is_positive()) {
            return Err(EconomyError::InvalidConfig(format!(
                "building {name} has non-positive cost growth {}",
                line.growth
            )));
        }
        if let Some(line) = costs.iter().find(|line| line.amount.is_negative()) {
            return Err(EconomyError::InvalidConfig(format!(
                "building {name} has negative cost {}",
                line.amount
            )));
        }
        let empty = match &kind {
            BuildingKind::Producer { effects } => effects.is_empty(),
            BuildingKind::Converter { inputs, outputs, .. } => {
                inputs.is_empty() || outputs.is_empty()
            }
            BuildingKind::Storage { expansions } => expansions.is_empty(),
            BuildingKind::Efficiency { boosts } => boosts.is_empty(),
            BuildingKind::StorageEfficiency { expansions, boosts } => {
                expansions.is_empty() || boosts.is_empty()
            }
        };
        if empty {
            return Err(EconomyError::InvalidConfig(format!(
                "{} {name} has no effect",
                kind.label()
            )));
        }

        let index = u32::try_from(self.buildings.len()).map_err(|_| {
            EconomyError::InvalidConfig("too many buildings".to_string())
        })?;
        let id = BuildingId(index);

        // Converters start with nothing running regardless of what was passed.
        let kind = match kind {
            BuildingKind::Converter { inputs, outputs, .. } => BuildingKind::Converter {
                inputs,
                outputs,
                activated: 0,
            },
            other => other,
        };

        self.buildings.push(Building {
            id,
            name: name.to_string(),
            count: 0,
            costs,
            efficiency: Ratio::ONE,
            kind,
        });
        self.by_name.insert(name.to_string(), id);
        self.validated = false;

        Ok(id)
    }

    /// Checks that every efficiency boost targets a producer or converter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending boost.
    pub fn validate(&mut self) -> EconomyResult<()> {
        if self.validated {
            return Ok(());
        }

        for building in &self.buildings {
            for boost in building.boosts() {
                let Some(target) = self.buildings.get(boost.target.index()) else {
                    return Err(EconomyError::InvalidConfig(format!(
                        "{} boosts unknown building #{}",
                        building.name,
                        boost.target.index()
                    )));
                };
                if !matches!(
                    target.kind,
                    BuildingKind::Producer { .. } | BuildingKind::Converter { .. }
                ) {
                    return Err(EconomyError::InvalidConfig(format!(
                        "{} boosts {} which produces nothing",
                        building.name, target.name
                    )));
                }
            }
        }

        self.validated = true;
        Ok(())
    }

    /// Returns whether [`Registry::validate`] has passed since the last insertion.
    #[inline]
    #[must_use]
    pub const fn is_validated(&self) -> bool {
        self.validated
    }

    /// Looks up a building by name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownBuilding` if no building has this name.
    pub fn id_of(&self, name: &str) -> EconomyResult<BuildingId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| EconomyError::UnknownBuilding(name.to_string()))
    }

    /// Gets a building by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(id.index())
    }

    /// Gets a building by id, or `UnknownBuilding`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownBuilding` for ids that do not belong to this registry.
    pub fn building(&self, id: BuildingId) -> EconomyResult<&Building> {
        self.get(id)
            .ok_or_else(|| EconomyError::UnknownBuilding(format!("#{}", id.index())))
    }

    pub(crate) fn get_mut(&mut self, id: BuildingId) -> Option<&mut Building> {
        self.buildings.get_mut(id.index())
    }

    /// Iterates over all buildings in declaration order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Building> {
        self.buildings.iter()
    }

    /// Returns the number of buildings.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    /// Returns true if no buildings are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;

    fn resources() -> (Ledger, ResourceId, ResourceId) {
        let mut ledger = Ledger::new();
        let milk = ledger
            .add_resource("milk", Amount::from_whole(5000), Amount::ZERO)
            .unwrap();
        let ice_cream = ledger
            .add_resource("ice cream", Amount::from_whole(5000), Amount::ZERO)
            .unwrap();
        (ledger, milk, ice_cream)
    }

    fn cow(milk: ResourceId) -> (Vec<CostLine>, BuildingKind) {
        (
            vec![CostLine::new(milk, Amount::from_whole(10), Ratio::from_raw(11_200))],
            BuildingKind::Producer {
                effects: vec![ResourceRate::new(milk, Ratio::from_raw(6_300))],
            },
        )
    }

    #[test]
    fn test_add_building_defaults() {
        let (_, milk, _) = resources();
        let mut registry = Registry::new();
        let (costs, kind) = cow(milk);
        let id = registry.add_building("Cow", costs, kind).unwrap();

        let building = registry.get(id).unwrap();
        assert_eq!(building.count(), 0);
        assert_eq!(building.efficiency(), Ratio::ONE);
        assert_eq!(building.costs()[0].amount(), Amount::from_whole(10));
        assert_eq!(registry.id_of("Cow").unwrap(), id);
    }

    #[test]
    fn test_cost_line_grow_and_shrink() {
        let (_, milk, _) = resources();
        let mut line = CostLine::new(milk, Amount::from_whole(10), Ratio::from_raw(11_200));
        line.grow();
        assert_eq!(line.amount(), Amount::from_cents(1_120));
        line.grow();
        assert_eq!(line.amount(), Amount::from_cents(1_254));
        assert_eq!(line.shrink(), Amount::from_cents(1_120));
        assert_eq!(line.shrink(), Amount::from_whole(10));
        assert_eq!(line.initial(), Amount::from_whole(10));
    }

    #[test]
    fn test_rejects_free_building() {
        let (_, milk, _) = resources();
        let mut registry = Registry::new();
        let (_, kind) = cow(milk);
        let result = registry.add_building("Cow", Vec::new(), kind);
        assert!(matches!(result, Err(EconomyError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_growth() {
        let (_, milk, _) = resources();
        let mut registry = Registry::new();
        let (_, kind) = cow(milk);
        let costs = vec![CostLine::new(milk, Amount::from_whole(10), Ratio::ZERO)];
        assert!(registry.add_building("Cow", costs, kind).is_err());
    }

    #[test]
    fn test_rejects_duplicate_name() {
        let (_, milk, _) = resources();
        let mut registry = Registry::new();
        let (costs, kind) = cow(milk);
        registry.add_building("Cow", costs.clone(), kind.clone()).unwrap();
        assert!(registry.add_building("Cow", costs, kind).is_err());
    }

    #[test]
    fn test_converter_starts_deactivated() {
        let (_, milk, ice_cream) = resources();
        let mut registry = Registry::new();
        let id = registry
            .add_building(
                "Factory",
                vec![CostLine::new(ice_cream, Amount::from_whole(5), Ratio::from_raw(12_000))],
                BuildingKind::Converter {
                    inputs: vec![ResourceAmount::new(milk, Amount::from_whole(5))],
                    outputs: vec![ResourceRate::new(ice_cream, Ratio::from_raw(1_000))],
                    activated: 7,
                },
            )
            .unwrap();
        assert_eq!(registry.get(id).unwrap().activated(), Some(0));
    }

    #[test]
    fn test_set_activated_clamps() {
        let (_, milk, ice_cream) = resources();
        let mut registry = Registry::new();
        let id = registry
            .add_building(
                "Factory",
                vec![CostLine::new(ice_cream, Amount::from_whole(5), Ratio::from_raw(12_000))],
                BuildingKind::Converter {
                    inputs: vec![ResourceAmount::new(milk, Amount::from_whole(5))],
                    outputs: vec![ResourceRate::new(ice_cream, Ratio::from_raw(1_000))],
                    activated: 0,
                },
            )
            .unwrap();
        let factory = registry.get_mut(id).unwrap();
        factory.set_count(2);
        assert_eq!(factory.set_activated(5), Some(0));
        assert_eq!(factory.activated(), Some(2));
        factory.set_activated(-4);
        assert_eq!(factory.activated(), Some(0));
    }

    #[test]
    fn test_validate_rejects_boosting_storage() {
        let (_, milk, _) = resources();
        let mut registry = Registry::new();
        let barn = registry
            .add_building(
                "Barn",
                vec![CostLine::new(milk, Amount::from_whole(100), Ratio::from_raw(15_000))],
                BuildingKind::Storage {
                    expansions: vec![ResourceAmount::new(milk, Amount::from_whole(500))],
                },
            )
            .unwrap();
        registry
            .add_building(
                "Milking Machine",
                vec![CostLine::new(milk, Amount::from_whole(50), Ratio::from_raw(14_000))],
                BuildingKind::Efficiency {
                    boosts: vec![EfficiencyBoost::new(barn, Ratio::from_raw(2_000))],
                },
            )
            .unwrap();

        assert!(registry.validate().is_err());
        assert!(!registry.is_validated());
    }

    #[test]
    fn test_validate_rejects_unknown_target() {
        let (_, milk, _) = resources();
        let mut registry = Registry::new();
        registry
            .add_building(
                "Milking Machine",
                vec![CostLine::new(milk, Amount::from_whole(50), Ratio::from_raw(14_000))],
                BuildingKind::Efficiency {
                    boosts: vec![EfficiencyBoost::new(BuildingId::from_index(9), Ratio::from_raw(2_000))],
                },
            )
            .unwrap();
        assert!(registry.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_producer_target() {
        let (_, milk, _) = resources();
        let mut registry = Registry::new();
        let (costs, kind) = cow(milk);
        let cow = registry.add_building("Cow", costs, kind).unwrap();
        registry
            .add_building(
                "Milking Machine",
                vec![CostLine::new(milk, Amount::from_whole(50), Ratio::from_raw(14_000))],
                BuildingKind::Efficiency {
                    boosts: vec![EfficiencyBoost::new(cow, Ratio::from_raw(2_000))],
                },
            )
            .unwrap();
        assert!(registry.validate().is_ok());
        assert!(registry.is_validated());
    }
}
