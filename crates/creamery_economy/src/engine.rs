//! # Economy Engine
//!
//! The only code that mutates the ledger and the registry.
//!
//! ## Transactions
//!
//! ```text
//! buy(building)
//!   1. Check every cost line (fail -> InsufficientResources, nothing changed)
//!   2. Storage: expand capacities
//!   3. Deduct every cost
//!   4. count += 1, every cost *= growth (rounded)
//!   5. Apply the kind's effect and mirror it into the rate display
//!
//! sell(building, n)
//!   repeat n times: cost /= growth (rounded), refund it, count -= 1,
//!   reverse the kind's effect
//! ```
//!
//! A failed transaction never leaves partial state behind. Every check runs
//! before the first write, the same way a craft validates all ingredients
//! before consuming any.
//!
//! ## Rate display
//!
//! Each resource carries a display production rate. It is updated
//! incrementally on every buy, sell, activation toggle and efficiency change,
//! and never recomputed from scratch.

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{EconomyError, EconomyResult};
use crate::exchange::{ExchangeId, ExchangeTable, Multiplier};
use crate::fixed_point::{Amount, Ratio};
use crate::ledger::{Ledger, ResourceId};
use crate::registry::{Building, BuildingId, Registry};
use crate::unlock::{Entity, UnlockCondition, UnlockRule, Visibility};

/// Scales a per-unit rate by a signed unit count.
fn scaled(rate: Ratio, units: i64) -> Ratio {
    let magnitude = u32::try_from(units.unsigned_abs()).unwrap_or(u32::MAX);
    if units < 0 {
        -rate.times(magnitude)
    } else {
        rate.times(magnitude)
    }
}

/// What one production tick did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// 1-based tick number.
    pub tick: u64,
    /// Net change actually applied per resource, after clamping. Zero entries
    /// are omitted.
    pub produced: Vec<(ResourceId, Amount)>,
    /// Converters that had units activated but could not pay their inputs.
    pub stalled: Vec<BuildingId>,
}

impl TickReport {
    /// Net change of one resource during the tick.
    #[must_use]
    pub fn produced_of(&self, resource: ResourceId) -> Amount {
        self.produced
            .iter()
            .find(|(id, _)| *id == resource)
            .map_or(Amount::ZERO, |(_, amount)| *amount)
    }
}

/// One price line as shown to the player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CostView {
    /// Resource name.
    pub resource: String,
    /// Price of the next unit.
    pub amount: Amount,
}

/// Read-only view of one resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceView {
    /// Resource name.
    pub name: String,
    /// Current amount.
    pub amount: Amount,
    /// Current capacity.
    pub capacity: Amount,
    /// Display production rate per tick.
    pub production_rate: Ratio,
    /// Rate formatted as `+0.63/s`, empty when zero.
    pub per_second: String,
    /// Whether the label has been revealed.
    pub visible: bool,
}

/// Read-only view of one building.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BuildingView {
    /// Building name.
    pub name: String,
    /// Kind label (`producer`, `converter`, ...).
    pub kind: &'static str,
    /// Units owned.
    pub count: u32,
    /// Activated units, converters only.
    pub activated: Option<u32>,
    /// Price of the next unit.
    pub costs: Vec<CostView>,
    /// Efficiency multiplier.
    pub efficiency: Ratio,
    /// Whether the next unit is affordable.
    pub available: bool,
    /// Whether the row has been revealed.
    pub visible: bool,
}

/// Read-only view of one exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExchangeView {
    /// Exchange name.
    pub name: String,
    /// Whether a single exchange is affordable.
    pub available: bool,
    /// Whether the button has been revealed.
    pub visible: bool,
}

/// Everything a polling presentation layer needs, in one value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EconomySnapshot {
    /// Production ticks run so far.
    pub tick: u64,
    /// Resources in declaration order.
    pub resources: Vec<ResourceView>,
    /// Buildings in declaration order.
    pub buildings: Vec<BuildingView>,
    /// Exchanges in declaration order.
    pub exchanges: Vec<ExchangeView>,
}

/// The economy: resources, buildings, exchanges and their visibility.
#[derive(Clone, Debug)]
pub struct Economy {
    ledger: Ledger,
    registry: Registry,
    exchanges: ExchangeTable,
    visibility: Visibility,
    ticks: u64,
}

impl Economy {
    /// Assembles an economy from its parts.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the registry does not validate, a building or
    /// exchange names a resource missing from the ledger, or an unlock rule
    /// references an entity that does not exist.
    pub fn new(
        ledger: Ledger,
        mut registry: Registry,
        exchanges: ExchangeTable,
        rules: Vec<UnlockRule>,
    ) -> EconomyResult<Self> {
        registry.validate()?;

        for building in registry.iter() {
            let foreign = building
                .costs()
                .iter()
                .map(|line| line.resource())
                .chain(building.outputs().iter().map(|o| o.resource))
                .chain(building.inputs().iter().map(|i| i.resource))
                .chain(building.expansions().iter().map(|e| e.resource))
                .find(|id| ledger.get(*id).is_none());
            if let Some(id) = foreign {
                return Err(EconomyError::InvalidConfig(format!(
                    "{} references unknown resource #{}",
                    building.name(),
                    id.index()
                )));
            }
        }

        for (_, exchange) in exchanges.iter() {
            let foreign = exchange
                .inputs()
                .iter()
                .map(|input| input.resource)
                .chain(std::iter::once(exchange.output().resource))
                .find(|id| ledger.get(*id).is_none());
            if let Some(id) = foreign {
                return Err(EconomyError::InvalidConfig(format!(
                    "{} references unknown resource #{}",
                    exchange.name(),
                    id.index()
                )));
            }
        }

        let exists = |entity: Entity| match entity {
            Entity::Resource(id) => ledger.get(id).is_some(),
            Entity::Building(id) => registry.get(id).is_some(),
            Entity::Exchange(id) => exchanges.get(id).is_some(),
        };
        for rule in &rules {
            let watched = match rule.condition {
                UnlockCondition::ResourceReached { resource, .. } => Entity::Resource(resource),
                UnlockCondition::BuildingOwned { building, .. } => Entity::Building(building),
            };
            if !exists(rule.target) || !exists(watched) {
                return Err(EconomyError::InvalidConfig(format!(
                    "unlock rule references unknown entity: {rule:?}"
                )));
            }
        }

        Ok(Self {
            visibility: Visibility::new(ledger.len(), registry.len(), exchanges.len(), rules),
            ledger,
            registry,
            exchanges,
            ticks: 0,
        })
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Returns the resource ledger.
    #[inline]
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Returns the building registry.
    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the exchange table.
    #[inline]
    #[must_use]
    pub const fn exchanges(&self) -> &ExchangeTable {
        &self.exchanges
    }

    /// Number of production ticks run so far.
    #[inline]
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Resolves a resource name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource` if no resource has this name.
    pub fn resource_id(&self, name: &str) -> EconomyResult<ResourceId> {
        self.ledger.id_of(name)
    }

    /// Resolves a building name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownBuilding` if no building has this name.
    pub fn building_id(&self, name: &str) -> EconomyResult<BuildingId> {
        self.registry.id_of(name)
    }

    /// Resolves an exchange name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownExchange` if no exchange has this name.
    pub fn exchange_id(&self, name: &str) -> EconomyResult<ExchangeId> {
        self.exchanges.id_of(name)
    }

    /// Current amount of a resource.
    #[inline]
    #[must_use]
    pub fn amount(&self, resource: ResourceId) -> Amount {
        self.ledger.amount(resource)
    }

    /// Gets a building by id.
    #[inline]
    #[must_use]
    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.registry.get(id)
    }

    // =========================================================================
    // Predicates
    // =========================================================================

    /// Whether every cost line of the next unit is affordable.
    ///
    /// Unknown buildings are never available.
    #[must_use]
    pub fn available(&self, id: BuildingId) -> bool {
        self.registry.get(id).is_some_and(|building| {
            building
                .costs()
                .iter()
                .all(|line| self.ledger.has_at_least(line.resource(), line.amount()))
        })
    }

    /// Whether the scaled bundle of an exchange is affordable.
    #[must_use]
    pub fn exchange_available(&self, id: ExchangeId, multiplier: Multiplier) -> bool {
        self.exchanges.get(id).is_some_and(|exchange| {
            exchange
                .scaled_inputs(multiplier)
                .all(|input| self.ledger.has_at_least(input.resource, input.amount))
        })
    }

    /// Whether a converter has idle units left to activate.
    #[must_use]
    pub fn can_activate_more(&self, id: BuildingId) -> bool {
        self.registry
            .get(id)
            .and_then(|building| building.activated().map(|active| active < building.count()))
            .unwrap_or(false)
    }

    /// Whether a converter has any unit running.
    #[must_use]
    pub fn can_deactivate(&self, id: BuildingId) -> bool {
        self.registry
            .get(id)
            .and_then(Building::activated)
            .is_some_and(|active| active > 0)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Buys one unit of a building.
    ///
    /// # Errors
    ///
    /// Returns `UnknownBuilding` for a foreign id and `InsufficientResources`
    /// naming the first cost line that cannot be paid. Either way nothing
    /// changes.
    pub fn buy(&mut self, id: BuildingId) -> EconomyResult<()> {
        let building = self.registry.building(id)?;

        for line in building.costs() {
            let available = self.ledger.amount(line.resource());
            if available < line.amount() {
                debug!(
                    building = building.name(),
                    resource = self.ledger.name(line.resource()),
                    "purchase refused"
                );
                return Err(EconomyError::InsufficientResources {
                    resource: self.ledger.name(line.resource()).to_string(),
                    required: line.amount(),
                    available,
                });
            }
        }

        for expansion in building.expansions() {
            self.ledger.expand_capacity(expansion.resource, expansion.amount);
        }
        for line in building.costs() {
            self.ledger.adjust(line.resource(), -line.amount());
        }

        let Some(building) = self.registry.get_mut(id) else {
            return Err(EconomyError::UnknownBuilding(format!("#{}", id.index())));
        };
        building.set_count(building.count() + 1);
        for line in building.costs_mut() {
            line.grow();
        }
        debug!(building = building.name(), count = building.count(), "bought");
        let converter = building.is_converter();
        let boosts = !building.boosts().is_empty();

        // New converter units start running.
        if converter {
            self.change_activation(id, 1);
        } else {
            self.shift_output_rate(id, 1);
        }
        if boosts {
            self.apply_boosts(id, true);
        }

        Ok(())
    }

    /// Sells `count` units of a building, one at a time.
    ///
    /// Each unit refunds the reduced cost, so buying `n` and selling `n`
    /// returns exactly what was paid. Selling zero units does nothing.
    ///
    /// # Errors
    ///
    /// Returns `UnknownBuilding` for a foreign id and `InvalidSellCount` when
    /// selling more than is owned. Either way nothing changes.
    pub fn sell(&mut self, id: BuildingId, count: u32) -> EconomyResult<()> {
        let building = self.registry.building(id)?;
        if count > building.count() {
            return Err(EconomyError::InvalidSellCount {
                building: building.name().to_string(),
                requested: i64::from(count),
                owned: building.count(),
            });
        }

        for _ in 0..count {
            self.sell_one(id);
        }
        if count > 0 {
            if let Some(building) = self.registry.get(id) {
                debug!(building = building.name(), sold = count, left = building.count(), "sold");
            }
        }

        Ok(())
    }

    fn sell_one(&mut self, id: BuildingId) {
        let Some(building) = self.registry.get_mut(id) else {
            return;
        };
        let mut refunds = Vec::with_capacity(building.costs().len());
        for line in building.costs_mut() {
            refunds.push((line.resource(), line.shrink()));
        }
        building.set_count(building.count() - 1);

        for (resource, refund) in refunds {
            self.ledger.adjust(resource, refund);
        }

        let Some(building) = self.registry.get(id) else {
            return;
        };
        for expansion in building.expansions() {
            self.ledger.expand_capacity(expansion.resource, -expansion.amount);
        }
        let overactive = building
            .activated()
            .is_some_and(|active| active > building.count());
        let converter = building.is_converter();
        let boosts = !building.boosts().is_empty();

        if overactive {
            self.change_activation(id, -1);
        } else if !converter {
            self.shift_output_rate(id, -1);
        }
        if boosts {
            self.apply_boosts(id, false);
        }
    }

    /// Moves a converter's activated count by `delta`, clamped to `0..=count`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownBuilding` for a foreign id and `NotAConverter` for any
    /// other kind of building.
    pub fn set_activated(&mut self, id: BuildingId, delta: i32) -> EconomyResult<()> {
        let building = self.registry.building(id)?;
        if !building.is_converter() {
            return Err(EconomyError::NotAConverter(building.name().to_string()));
        }
        self.change_activation(id, i64::from(delta));
        Ok(())
    }

    /// Adds a manually collected amount (the click button).
    ///
    /// Returns the change actually applied after the capacity clamp.
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource` for a foreign id and `NegativeCollect` for an
    /// amount below zero. Either way nothing changes.
    pub fn collect(&mut self, resource: ResourceId, amount: Amount) -> EconomyResult<Amount> {
        if self.ledger.get(resource).is_none() {
            return Err(EconomyError::UnknownResource(format!("#{}", resource.index())));
        }
        if amount.is_negative() {
            return Err(EconomyError::NegativeCollect {
                resource: self.ledger.name(resource).to_string(),
                amount,
            });
        }
        let applied = self.ledger.adjust(resource, amount);
        trace!(resource = self.ledger.name(resource), %applied, "collected");
        Ok(applied)
    }

    /// Runs an exchange `multiplier` times at once.
    ///
    /// # Errors
    ///
    /// Returns `UnknownExchange` for a foreign id and `InsufficientResources`
    /// when any part of the scaled bundle is short. Either way nothing
    /// changes.
    pub fn convert(&mut self, id: ExchangeId, multiplier: Multiplier) -> EconomyResult<()> {
        let exchange = self
            .exchanges
            .get(id)
            .ok_or_else(|| EconomyError::UnknownExchange(format!("#{}", id.index())))?;

        for input in exchange.scaled_inputs(multiplier) {
            let available = self.ledger.amount(input.resource);
            if available < input.amount {
                return Err(EconomyError::InsufficientResources {
                    resource: self.ledger.name(input.resource).to_string(),
                    required: input.amount,
                    available,
                });
            }
        }

        for input in exchange.scaled_inputs(multiplier) {
            self.ledger.adjust(input.resource, -input.amount);
        }
        let reward = exchange.scaled_output(multiplier);
        self.ledger.adjust(reward.resource, reward.amount);
        debug!(exchange = exchange.name(), factor = multiplier.factor(), "converted");

        Ok(())
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Runs one production tick.
    ///
    /// Producers add `count * rate * efficiency` of each output. Converters
    /// pay `activated * input` of every input and add
    /// `activated * rate * efficiency` of each output, or do nothing at all
    /// if any input is short. Buildings run in declaration order.
    pub fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let mut produced = vec![Amount::ZERO; self.ledger.len()];
        let mut stalled = Vec::new();

        for building in self.registry.iter() {
            let units = building.running_units();
            if units == 0 {
                continue;
            }

            if building.is_converter() {
                let short = building.inputs().iter().any(|input| {
                    !self.ledger.has_at_least(input.resource, input.amount.times(units))
                });
                if short {
                    trace!(building = building.name(), "converter stalled");
                    stalled.push(building.id());
                    continue;
                }
                for input in building.inputs() {
                    let applied = self.ledger.adjust(input.resource, -input.amount.times(units));
                    produced[input.resource.index()] += applied;
                }
            }

            for output in building.outputs() {
                let amount = building.effective_rate(output).times(units).to_amount();
                let applied = self.ledger.adjust(output.resource, amount);
                produced[output.resource.index()] += applied;
            }
        }

        let produced = self
            .ledger
            .iter()
            .map(|(id, _)| (id, produced[id.index()]))
            .filter(|(_, amount)| !amount.is_zero())
            .collect();

        trace!(tick = self.ticks, stalled = stalled.len(), "production tick");
        TickReport {
            tick: self.ticks,
            produced,
            stalled,
        }
    }

    // =========================================================================
    // Visibility
    // =========================================================================

    /// Evaluates unlock rules and latches whatever became visible.
    ///
    /// Returns the newly revealed entities, in rule order followed by
    /// resources revealed by their first positive amount.
    pub fn refresh_visibility(&mut self) -> Vec<Entity> {
        let mut revealed = Vec::new();

        let met: Vec<Entity> = self
            .visibility
            .pending()
            .iter()
            .filter(|rule| match rule.condition {
                UnlockCondition::ResourceReached { resource, at_least } => {
                    self.ledger.has_at_least(resource, at_least)
                }
                UnlockCondition::BuildingOwned { building, owned } => self
                    .registry
                    .get(building)
                    .is_some_and(|b| b.count() >= owned),
            })
            .map(|rule| rule.target)
            .collect();
        for entity in met {
            if self.visibility.reveal(entity) {
                revealed.push(entity);
            }
        }

        for (id, resource) in self.ledger.iter() {
            let entity = Entity::Resource(id);
            if resource.amount().is_positive()
                && !self.visibility.has_rule(entity)
                && self.visibility.reveal(entity)
            {
                revealed.push(entity);
            }
        }

        self.visibility.retire_satisfied();
        if !revealed.is_empty() {
            debug!(count = revealed.len(), "revealed");
        }
        revealed
    }

    /// Reads the visibility latch of an entity.
    #[inline]
    #[must_use]
    pub fn is_visible(&self, entity: Entity) -> bool {
        self.visibility.is_visible(entity)
    }

    // =========================================================================
    // Read model
    // =========================================================================

    /// Captures the whole state for a polling presentation layer.
    #[must_use]
    pub fn snapshot(&self) -> EconomySnapshot {
        let resources = self
            .ledger
            .iter()
            .map(|(id, resource)| ResourceView {
                name: resource.name().to_string(),
                amount: resource.amount(),
                capacity: resource.capacity(),
                production_rate: resource.production_rate(),
                per_second: resource.production_rate().per_second_label(),
                visible: self.is_visible(Entity::Resource(id)),
            })
            .collect();

        let buildings = self
            .registry
            .iter()
            .map(|building| BuildingView {
                name: building.name().to_string(),
                kind: building.kind().label(),
                count: building.count(),
                activated: building.activated(),
                costs: building
                    .costs()
                    .iter()
                    .map(|line| CostView {
                        resource: self.ledger.name(line.resource()).to_string(),
                        amount: line.amount(),
                    })
                    .collect(),
                efficiency: building.efficiency(),
                available: self.available(building.id()),
                visible: self.is_visible(Entity::Building(building.id())),
            })
            .collect();

        let exchanges = self
            .exchanges
            .iter()
            .map(|(id, exchange)| ExchangeView {
                name: exchange.name().to_string(),
                available: self.exchange_available(id, Multiplier::X1),
                visible: self.is_visible(Entity::Exchange(id)),
            })
            .collect();

        EconomySnapshot {
            tick: self.ticks,
            resources,
            buildings,
            exchanges,
        }
    }

    // =========================================================================
    // Rate display bookkeeping
    // =========================================================================

    /// Adds `units` worth of a building's outputs to the rate display.
    fn shift_output_rate(&mut self, id: BuildingId, units: i64) {
        let Some(building) = self.registry.get(id) else {
            return;
        };
        for output in building.outputs() {
            self.ledger
                .add_production_rate(output.resource, scaled(building.effective_rate(output), units));
        }
    }

    /// Clamps a converter's activated count and mirrors the change into the
    /// rate display of its inputs and outputs.
    fn change_activation(&mut self, id: BuildingId, delta: i64) {
        let Some(building) = self.registry.get_mut(id) else {
            return;
        };
        let Some(previous) = building.activated() else {
            return;
        };
        building.set_activated(i64::from(previous) + delta);
        let current = building.activated().unwrap_or(previous);
        let change = i64::from(current) - i64::from(previous);
        if change == 0 {
            return;
        }
        trace!(building = building.name(), activated = current, "activation changed");

        let Some(building) = self.registry.get(id) else {
            return;
        };
        for input in building.inputs() {
            self.ledger
                .add_production_rate(input.resource, -scaled(input.amount.to_ratio(), change));
        }
        self.shift_output_rate(id, change);
    }

    /// Applies (or reverses) one unit of an efficiency building's boosts.
    fn apply_boosts(&mut self, id: BuildingId, raise: bool) {
        let Some(building) = self.registry.get(id) else {
            return;
        };
        let boosts = building.boosts().to_vec();

        for boost in boosts {
            let increment = if raise { boost.increment } else { -boost.increment };
            let Some(target) = self.registry.get_mut(boost.target) else {
                continue;
            };
            // The display follows the rounded per-unit rate the tick uses.
            let before: Vec<Ratio> = target
                .outputs()
                .iter()
                .map(|output| target.effective_rate(output))
                .collect();
            target.set_efficiency(target.efficiency() + increment);
            let units = i64::from(target.running_units());

            let Some(target) = self.registry.get(boost.target) else {
                continue;
            };
            for (output, before) in target.outputs().iter().zip(before) {
                let delta = target.effective_rate(output) - before;
                self.ledger
                    .add_production_rate(output.resource, scaled(delta, units));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BuildingKind, CostLine, EfficiencyBoost, ResourceAmount, ResourceRate};

    struct Fixture {
        economy: Economy,
        milk: ResourceId,
        ice_cream: ResourceId,
        cow: BuildingId,
        factory: BuildingId,
        barn: BuildingId,
        machine: BuildingId,
        make_ice_cream: ExchangeId,
    }

    fn fixture() -> Fixture {
        let mut ledger = Ledger::new();
        let milk = ledger.add_resource("milk", Amount::from_whole(5000), Amount::ZERO).unwrap();
        let ice_cream = ledger
            .add_resource("ice cream", Amount::from_whole(5000), Amount::ZERO)
            .unwrap();

        let mut registry = Registry::new();
        let cow = registry
            .add_building(
                "Cow",
                vec![CostLine::new(milk, Amount::from_whole(10), Ratio::from_raw(11_200))],
                BuildingKind::Producer {
                    effects: vec![ResourceRate::new(milk, Ratio::from_raw(6_300))],
                },
            )
            .unwrap();
        let factory = registry
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
        let barn = registry
            .add_building(
                "Barn",
                vec![CostLine::new(milk, Amount::from_whole(100), Ratio::from_raw(15_000))],
                BuildingKind::Storage {
                    expansions: vec![ResourceAmount::new(milk, Amount::from_whole(1000))],
                },
            )
            .unwrap();
        let machine = registry
            .add_building(
                "Milking Machine",
                vec![CostLine::new(milk, Amount::from_whole(50), Ratio::from_raw(14_000))],
                BuildingKind::Efficiency {
                    boosts: vec![EfficiencyBoost::new(cow, Ratio::from_raw(2_000))],
                },
            )
            .unwrap();

        let mut exchanges = ExchangeTable::new();
        let make_ice_cream = exchanges
            .add_exchange(
                "make ice cream",
                vec![ResourceAmount::new(milk, Amount::from_whole(50))],
                ResourceAmount::new(ice_cream, Amount::ONE),
            )
            .unwrap();

        let rules = vec![UnlockRule {
            target: Entity::Building(cow),
            condition: UnlockCondition::ResourceReached {
                resource: milk,
                at_least: Amount::from_whole(3),
            },
        }];

        Fixture {
            economy: Economy::new(ledger, registry, exchanges, rules).unwrap(),
            milk,
            ice_cream,
            cow,
            factory,
            barn,
            machine,
            make_ice_cream,
        }
    }

    impl Fixture {
        fn collect(&mut self, resource: ResourceId, whole: i64) {
            self.economy.collect(resource, Amount::from_whole(whole)).unwrap();
        }
    }

    #[test]
    fn test_first_cow_scenario() {
        let mut f = fixture();
        for _ in 0..3 {
            f.economy.collect(f.milk, Amount::ONE).unwrap();
        }
        assert_eq!(f.economy.amount(f.milk), Amount::from_whole(3));

        let err = f.economy.buy(f.cow).unwrap_err();
        assert_eq!(
            err,
            EconomyError::InsufficientResources {
                resource: "milk".to_string(),
                required: Amount::from_whole(10),
                available: Amount::from_whole(3),
            }
        );
        assert_eq!(f.economy.amount(f.milk), Amount::from_whole(3));

        for _ in 0..7 {
            f.economy.collect(f.milk, Amount::ONE).unwrap();
        }
        f.economy.buy(f.cow).unwrap();
        let cow = f.economy.building(f.cow).unwrap();
        assert_eq!(f.economy.amount(f.milk), Amount::ZERO);
        assert_eq!(cow.count(), 1);
        assert_eq!(cow.costs()[0].amount(), Amount::from_cents(1_120));

        let report = f.economy.tick();
        assert_eq!(f.economy.amount(f.milk), Amount::from_cents(63));
        assert_eq!(report.tick, 1);
        assert_eq!(report.produced_of(f.milk), Amount::from_cents(63));
    }

    #[test]
    fn test_sell_refunds_reduced_cost() {
        let mut f = fixture();
        f.collect(f.milk, 10);
        f.economy.buy(f.cow).unwrap();
        f.economy.tick();

        f.economy.sell(f.cow, 1).unwrap();
        let cow = f.economy.building(f.cow).unwrap();
        assert_eq!(f.economy.amount(f.milk), Amount::from_cents(1_063));
        assert_eq!(cow.count(), 0);
        assert_eq!(cow.costs()[0].amount(), Amount::from_whole(10));
        assert_eq!(f.economy.ledger().production_rate(f.milk), Ratio::ZERO);
    }

    #[test]
    fn test_buy_sell_round_trip_is_exact() {
        let mut f = fixture();
        f.collect(f.milk, 4000);
        let before = f.economy.amount(f.milk);

        for _ in 0..20 {
            f.economy.buy(f.cow).unwrap();
        }
        assert!(f.economy.amount(f.milk) < before);
        f.economy.sell(f.cow, 20).unwrap();

        let cow = f.economy.building(f.cow).unwrap();
        assert_eq!(f.economy.amount(f.milk), before);
        assert_eq!(cow.count(), 0);
        assert_eq!(cow.costs()[0].amount(), cow.costs()[0].initial());
        assert_eq!(f.economy.ledger().production_rate(f.milk), Ratio::ZERO);
    }

    #[test]
    fn test_oversell_rejected_without_change() {
        let mut f = fixture();
        f.collect(f.milk, 10);
        f.economy.buy(f.cow).unwrap();

        let err = f.economy.sell(f.cow, 2).unwrap_err();
        assert_eq!(
            err,
            EconomyError::InvalidSellCount {
                building: "Cow".to_string(),
                requested: 2,
                owned: 1,
            }
        );
        assert_eq!(f.economy.building(f.cow).unwrap().count(), 1);
        assert_eq!(f.economy.amount(f.milk), Amount::ZERO);
    }

    #[test]
    fn test_sell_zero_is_noop() {
        let mut f = fixture();
        f.economy.sell(f.cow, 0).unwrap();
        assert_eq!(f.economy.building(f.cow).unwrap().count(), 0);
    }

    #[test]
    fn test_available_is_monotonic() {
        let mut f = fixture();
        assert!(!f.economy.available(f.cow));
        f.collect(f.milk, 9);
        assert!(!f.economy.available(f.cow));
        f.collect(f.milk, 1);
        assert!(f.economy.available(f.cow));
        f.collect(f.milk, 100);
        assert!(f.economy.available(f.cow));
    }

    #[test]
    fn test_converter_all_or_nothing() {
        let mut f = fixture();
        f.collect(f.ice_cream, 11);
        f.economy.buy(f.factory).unwrap();
        f.economy.buy(f.factory).unwrap();
        assert_eq!(f.economy.building(f.factory).unwrap().activated(), Some(2));

        f.collect(f.milk, 9);
        let ice_cream_before = f.economy.amount(f.ice_cream);
        let report = f.economy.tick();
        assert_eq!(report.stalled, vec![f.factory]);
        assert_eq!(f.economy.amount(f.milk), Amount::from_whole(9));
        assert_eq!(f.economy.amount(f.ice_cream), ice_cream_before);

        f.collect(f.milk, 1);
        let report = f.economy.tick();
        assert!(report.stalled.is_empty());
        assert_eq!(f.economy.amount(f.milk), Amount::ZERO);
        assert_eq!(
            f.economy.amount(f.ice_cream),
            ice_cream_before + Amount::from_cents(20)
        );
    }

    #[test]
    fn test_activation_display_matches_closed_form() {
        let mut f = fixture();
        f.collect(f.ice_cream, 100);
        for _ in 0..4 {
            f.economy.buy(f.factory).unwrap();
        }

        for delta in [-1, -1, 3, -7, 2, 1, 1, -2, 9] {
            f.economy.set_activated(f.factory, delta).unwrap();
            let factory = f.economy.building(f.factory).unwrap();
            let active = factory.activated().unwrap();
            assert!(active <= factory.count());
            assert_eq!(
                f.economy.ledger().production_rate(f.milk),
                -Amount::from_whole(5).to_ratio().times(active)
            );
            assert_eq!(
                f.economy.ledger().production_rate(f.ice_cream),
                Ratio::from_raw(1_000).times(active)
            );
        }
    }

    #[test]
    fn test_activation_predicates() {
        let mut f = fixture();
        f.collect(f.ice_cream, 5);
        f.economy.buy(f.factory).unwrap();
        assert!(!f.economy.can_activate_more(f.factory));
        assert!(f.economy.can_deactivate(f.factory));

        f.economy.set_activated(f.factory, -1).unwrap();
        assert!(f.economy.can_activate_more(f.factory));
        assert!(!f.economy.can_deactivate(f.factory));
        assert!(!f.economy.can_activate_more(f.cow));
    }

    #[test]
    fn test_set_activated_rejects_producer() {
        let mut f = fixture();
        let err = f.economy.set_activated(f.cow, 1).unwrap_err();
        assert_eq!(err, EconomyError::NotAConverter("Cow".to_string()));
    }

    #[test]
    fn test_selling_converter_deactivates_unit() {
        let mut f = fixture();
        f.collect(f.ice_cream, 20);
        f.economy.buy(f.factory).unwrap();
        f.economy.buy(f.factory).unwrap();
        f.economy.sell(f.factory, 1).unwrap();

        assert_eq!(f.economy.building(f.factory).unwrap().activated(), Some(1));
        assert_eq!(
            f.economy.ledger().production_rate(f.milk),
            -Amount::from_whole(5).to_ratio()
        );
    }

    #[test]
    fn test_efficiency_propagation() {
        let mut f = fixture();
        f.collect(f.milk, 200);
        for _ in 0..3 {
            f.economy.buy(f.cow).unwrap();
        }
        let before = f.economy.amount(f.milk);
        f.economy.tick();
        let base = f.economy.amount(f.milk) - before;
        assert_eq!(base, Amount::from_cents(189));

        f.economy.buy(f.machine).unwrap();
        assert_eq!(f.economy.building(f.cow).unwrap().efficiency(), Ratio::from_raw(12_000));

        let before = f.economy.amount(f.milk);
        f.economy.tick();
        let boosted = f.economy.amount(f.milk) - before;
        // 3 cows * 0.63 * 0.20
        assert_eq!(boosted - base, Amount::from_cents(38));
        assert_eq!(
            f.economy.ledger().production_rate(f.milk),
            Ratio::from_raw(6_300).times(3).mul_ratio(Ratio::from_raw(12_000))
        );

        f.economy.sell(f.machine, 1).unwrap();
        assert_eq!(f.economy.building(f.cow).unwrap().efficiency(), Ratio::ONE);
        assert_eq!(
            f.economy.ledger().production_rate(f.milk),
            Ratio::from_raw(6_300).times(3)
        );
    }

    #[test]
    fn test_stacked_boosts_display_matches_tick() {
        let mut ledger = Ledger::new();
        let milk = ledger.add_resource("milk", Amount::from_whole(5000), Amount::ZERO).unwrap();
        let mut registry = Registry::new();
        let cow = registry
            .add_building(
                "Cow",
                vec![CostLine::new(milk, Amount::ONE, Ratio::from_raw(10_001))],
                BuildingKind::Producer {
                    effects: vec![ResourceRate::new(milk, Ratio::from_raw(6_300))],
                },
            )
            .unwrap();
        let feeder = registry
            .add_building(
                "Feeder",
                vec![CostLine::new(milk, Amount::ONE, Ratio::from_raw(10_001))],
                BuildingKind::Efficiency {
                    boosts: vec![EfficiencyBoost::new(cow, Ratio::from_raw(1_250))],
                },
            )
            .unwrap();
        let mut economy = Economy::new(ledger, registry, ExchangeTable::new(), Vec::new()).unwrap();
        economy.collect(milk, Amount::from_whole(100)).unwrap();
        for _ in 0..100 {
            economy.buy(cow).unwrap();
        }
        economy.collect(milk, Amount::from_whole(100)).unwrap();

        // 0.63 * 1.125 = 0.70875 and 0.63 * 1.25 = 0.7875: the per-unit rate
        // rounds differently from the summed increments.
        for _ in 0..2 {
            economy.buy(feeder).unwrap();
            let building = economy.building(cow).unwrap();
            let per_unit = building.effective_rate(&building.outputs()[0]);
            assert_eq!(economy.ledger().production_rate(milk), per_unit.times(100));
        }
        assert_eq!(economy.ledger().production_rate(milk), Ratio::from_raw(787_500));

        let report = economy.tick();
        assert_eq!(report.produced_of(milk), Amount::from_cents(7_875));

        economy.sell(feeder, 2).unwrap();
        assert_eq!(economy.ledger().production_rate(milk), Ratio::from_raw(630_000));
    }

    #[test]
    fn test_two_input_converter_all_or_nothing() {
        let mut ledger = Ledger::new();
        let milk = ledger.add_resource("milk", Amount::from_whole(5000), Amount::ZERO).unwrap();
        let sugar = ledger.add_resource("sugar", Amount::from_whole(5000), Amount::ZERO).unwrap();
        let ice_cream = ledger
            .add_resource("ice cream", Amount::from_whole(5000), Amount::ZERO)
            .unwrap();
        let mut registry = Registry::new();
        let churn = registry
            .add_building(
                "Churn",
                vec![CostLine::new(ice_cream, Amount::ONE, Ratio::from_raw(12_000))],
                BuildingKind::Converter {
                    inputs: vec![
                        ResourceAmount::new(milk, Amount::from_whole(5)),
                        ResourceAmount::new(sugar, Amount::from_whole(2)),
                    ],
                    outputs: vec![ResourceRate::new(ice_cream, Ratio::from_raw(1_000))],
                    activated: 0,
                },
            )
            .unwrap();
        let mut economy = Economy::new(ledger, registry, ExchangeTable::new(), Vec::new()).unwrap();
        economy.collect(ice_cream, Amount::ONE).unwrap();
        economy.buy(churn).unwrap();
        economy.collect(milk, Amount::from_whole(50)).unwrap();
        economy.collect(sugar, Amount::ONE).unwrap();

        let report = economy.tick();
        assert_eq!(report.stalled, vec![churn]);
        assert!(report.produced.is_empty());
        assert_eq!(economy.amount(milk), Amount::from_whole(50));
        assert_eq!(economy.amount(sugar), Amount::ONE);
        assert_eq!(economy.amount(ice_cream), Amount::ZERO);

        economy.collect(sugar, Amount::ONE).unwrap();
        economy.tick();
        assert_eq!(economy.amount(milk), Amount::from_whole(45));
        assert_eq!(economy.amount(sugar), Amount::ZERO);
        assert_eq!(economy.amount(ice_cream), Amount::from_cents(10));
    }

    #[test]
    fn test_exchange_with_foreign_resource_rejected() {
        let mut ledger = Ledger::new();
        let milk = ledger.add_resource("milk", Amount::from_whole(5000), Amount::ZERO).unwrap();
        let mut other = Ledger::new();
        other.add_resource("milk", Amount::from_whole(5000), Amount::ZERO).unwrap();
        let cream = other.add_resource("cream", Amount::from_whole(5000), Amount::ZERO).unwrap();

        let mut exchanges = ExchangeTable::new();
        exchanges
            .add_exchange(
                "skim",
                vec![ResourceAmount::new(milk, Amount::from_whole(10))],
                ResourceAmount::new(cream, Amount::ONE),
            )
            .unwrap();

        let err = Economy::new(ledger, Registry::new(), exchanges, Vec::new()).unwrap_err();
        assert!(matches!(err, EconomyError::InvalidConfig(_)));
    }

    #[test]
    fn test_negative_collect_rejected() {
        let mut f = fixture();
        f.collect(f.milk, 3);
        let err = f.economy.collect(f.milk, Amount::from_whole(-3)).unwrap_err();
        assert_eq!(
            err,
            EconomyError::NegativeCollect {
                resource: "milk".to_string(),
                amount: Amount::from_whole(-3),
            }
        );
        assert_eq!(f.economy.amount(f.milk), Amount::from_whole(3));
    }

    #[test]
    fn test_storage_is_symmetric() {
        let mut f = fixture();
        f.collect(f.milk, 100);
        f.economy.buy(f.barn).unwrap();
        assert_eq!(f.economy.ledger().capacity(f.milk), Amount::from_whole(6000));
        assert_eq!(f.economy.amount(f.milk), Amount::ZERO);

        f.economy.sell(f.barn, 1).unwrap();
        assert_eq!(f.economy.ledger().capacity(f.milk), Amount::from_whole(5000));
        assert_eq!(f.economy.amount(f.milk), Amount::from_whole(100));
    }

    #[test]
    fn test_convert_is_atomic_and_scaled() {
        let mut f = fixture();
        f.collect(f.milk, 499);
        assert!(f.economy.exchange_available(f.make_ice_cream, Multiplier::X1));
        assert!(!f.economy.exchange_available(f.make_ice_cream, Multiplier::X10));

        let err = f.economy.convert(f.make_ice_cream, Multiplier::X10).unwrap_err();
        assert!(matches!(err, EconomyError::InsufficientResources { .. }));
        assert_eq!(f.economy.amount(f.milk), Amount::from_whole(499));

        f.collect(f.milk, 1);
        f.economy.convert(f.make_ice_cream, Multiplier::X10).unwrap();
        assert_eq!(f.economy.amount(f.milk), Amount::ZERO);
        assert_eq!(f.economy.amount(f.ice_cream), Amount::from_whole(10));
    }

    #[test]
    fn test_collect_respects_capacity() {
        let mut f = fixture();
        let applied = f.economy.collect(f.milk, Amount::from_whole(6000)).unwrap();
        assert_eq!(applied, Amount::from_whole(5000));
        assert_eq!(f.economy.amount(f.milk), Amount::from_whole(5000));
    }

    #[test]
    fn test_visibility_latches() {
        let mut f = fixture();
        assert!(!f.economy.is_visible(Entity::Building(f.cow)));
        assert!(f.economy.is_visible(Entity::Building(f.factory)));
        assert!(f.economy.refresh_visibility().is_empty());

        f.collect(f.milk, 3);
        let revealed = f.economy.refresh_visibility();
        assert_eq!(
            revealed,
            vec![Entity::Building(f.cow), Entity::Resource(f.milk)]
        );

        f.collect(f.milk, 7);
        f.economy.buy(f.cow).unwrap();
        assert_eq!(f.economy.amount(f.milk), Amount::ZERO);
        assert!(f.economy.refresh_visibility().is_empty());
        assert!(f.economy.is_visible(Entity::Building(f.cow)));
        assert!(f.economy.is_visible(Entity::Resource(f.milk)));
        assert!(!f.economy.is_visible(Entity::Resource(f.ice_cream)));
    }

    #[test]
    fn test_snapshot_views() {
        let mut f = fixture();
        f.collect(f.milk, 10);
        f.economy.buy(f.cow).unwrap();
        f.economy.refresh_visibility();

        let snapshot = f.economy.snapshot();
        assert_eq!(snapshot.resources[0].per_second, "+0.63/s");
        assert_eq!(snapshot.resources[1].per_second, "");
        assert_eq!(snapshot.buildings[0].count, 1);
        assert_eq!(snapshot.buildings[0].costs[0].amount, Amount::from_cents(1_120));
        assert_eq!(snapshot.buildings[1].kind, "converter");
        assert_eq!(snapshot.buildings[1].activated, Some(0));
        assert!(!snapshot.exchanges[0].available);
    }

    #[test]
    fn test_unknown_ids_rejected() {
        let mut f = fixture();
        let foreign = BuildingId::from_index(42);
        assert!(matches!(f.economy.buy(foreign), Err(EconomyError::UnknownBuilding(_))));
        assert!(!f.economy.available(foreign));
        assert!(matches!(
            f.economy.building_id("Goat"),
            Err(EconomyError::UnknownBuilding(_))
        ));
    }
}
