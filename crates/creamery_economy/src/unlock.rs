//! # Unlocks
//!
//! Latched visibility. A building, exchange or resource starts hidden if a
//! rule names it, and is revealed the first time the rule holds. Once revealed
//! it stays revealed, even if the triggering resource is spent again.
//!
//! Resources without a rule appear the first time their amount is positive.
//! Buildings and exchanges without a rule are visible from the start.

use serde::Serialize;

use crate::exchange::ExchangeId;
use crate::fixed_point::Amount;
use crate::ledger::ResourceId;
use crate::registry::BuildingId;

/// Anything the presentation layer can show or hide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Entity {
    /// A resource label.
    Resource(ResourceId),
    /// A building row.
    Building(BuildingId),
    /// An exchange button.
    Exchange(ExchangeId),
}

/// When a hidden entity is revealed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnlockCondition {
    /// The resource has reached the amount at least once.
    ResourceReached {
        /// Watched resource.
        resource: ResourceId,
        /// Threshold, inclusive.
        at_least: Amount,
    },
    /// The building has been owned in at least this many units.
    BuildingOwned {
        /// Watched building.
        building: BuildingId,
        /// Threshold, inclusive.
        owned: u32,
    },
}

/// A rule revealing one entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnlockRule {
    /// What gets revealed.
    pub target: Entity,
    /// When it gets revealed.
    pub condition: UnlockCondition,
}

/// Latch state for every entity of one economy.
#[derive(Clone, Debug, Default)]
pub struct Visibility {
    /// One latch per resource.
    resources: Vec<bool>,
    /// One latch per building.
    buildings: Vec<bool>,
    /// One latch per exchange.
    exchanges: Vec<bool>,
    /// Rules not yet satisfied.
    pending: Vec<UnlockRule>,
}

impl Visibility {
    /// Builds the initial latches.
    ///
    /// Resources start hidden. Buildings and exchanges start visible unless a
    /// rule targets them.
    #[must_use]
    pub fn new(resources: usize, buildings: usize, exchanges: usize, rules: Vec<UnlockRule>) -> Self {
        let mut visibility = Self {
            resources: vec![false; resources],
            buildings: vec![true; buildings],
            exchanges: vec![true; exchanges],
            pending: Vec::new(),
        };
        for rule in &rules {
            visibility.set(rule.target, false);
        }
        visibility.pending = rules;
        visibility
    }

    /// Reads a latch. Unknown entities read as hidden.
    #[must_use]
    pub fn is_visible(&self, entity: Entity) -> bool {
        let slot = match entity {
            Entity::Resource(id) => self.resources.get(id.index()),
            Entity::Building(id) => self.buildings.get(id.index()),
            Entity::Exchange(id) => self.exchanges.get(id.index()),
        };
        slot.copied().unwrap_or(false)
    }

    /// Whether a pending rule targets the entity.
    #[must_use]
    pub fn has_rule(&self, entity: Entity) -> bool {
        self.pending.iter().any(|rule| rule.target == entity)
    }

    /// Rules still waiting on their condition.
    #[must_use]
    pub fn pending(&self) -> &[UnlockRule] {
        &self.pending
    }

    /// Latches an entity as visible. Returns true if it was hidden before.
    pub fn reveal(&mut self, entity: Entity) -> bool {
        let was_visible = self.is_visible(entity);
        self.set(entity, true);
        !was_visible && self.is_visible(entity)
    }

    /// Drops every pending rule whose target is already visible.
    pub fn retire_satisfied(&mut self) {
        let latched: Vec<bool> = self
            .pending
            .iter()
            .map(|rule| self.is_visible(rule.target))
            .collect();
        let mut flags = latched.into_iter();
        self.pending.retain(|_| !flags.next().unwrap_or(false));
    }

    fn set(&mut self, entity: Entity, value: bool) {
        let slot = match entity {
            Entity::Resource(id) => self.resources.get_mut(id.index()),
            Entity::Building(id) => self.buildings.get_mut(id.index()),
            Entity::Exchange(id) => self.exchanges.get_mut(id.index()),
        };
        if let Some(slot) = slot {
            *slot = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ExchangeTable;
    use crate::ledger::Ledger;
    use crate::registry::ResourceAmount;

    fn fixture() -> (ResourceId, ExchangeId) {
        let mut ledger = Ledger::new();
        let milk = ledger.add_resource("milk", Amount::from_whole(5000), Amount::ZERO).unwrap();
        let ice_cream = ledger
            .add_resource("ice cream", Amount::from_whole(5000), Amount::ZERO)
            .unwrap();
        let mut table = ExchangeTable::new();
        let exchange = table
            .add_exchange(
                "make ice cream",
                vec![ResourceAmount::new(milk, Amount::from_whole(50))],
                ResourceAmount::new(ice_cream, Amount::ONE),
            )
            .unwrap();
        (milk, exchange)
    }

    #[test]
    fn test_initial_state() {
        let (milk, exchange) = fixture();
        let rule = UnlockRule {
            target: Entity::Building(BuildingId::from_index(0)),
            condition: UnlockCondition::ResourceReached {
                resource: milk,
                at_least: Amount::from_whole(3),
            },
        };
        let visibility = Visibility::new(2, 2, 1, vec![rule]);

        assert!(!visibility.is_visible(Entity::Resource(milk)));
        assert!(!visibility.is_visible(Entity::Building(BuildingId::from_index(0))));
        assert!(visibility.is_visible(Entity::Building(BuildingId::from_index(1))));
        assert!(visibility.is_visible(Entity::Exchange(exchange)));
        assert!(visibility.has_rule(Entity::Building(BuildingId::from_index(0))));
    }

    #[test]
    fn test_reveal_latches_once() {
        let (milk, _) = fixture();
        let mut visibility = Visibility::new(2, 0, 0, Vec::new());
        assert!(visibility.reveal(Entity::Resource(milk)));
        assert!(!visibility.reveal(Entity::Resource(milk)));
        assert!(visibility.is_visible(Entity::Resource(milk)));
    }

    #[test]
    fn test_retire_satisfied() {
        let (milk, _) = fixture();
        let target = Entity::Building(BuildingId::from_index(0));
        let rule = UnlockRule {
            target,
            condition: UnlockCondition::ResourceReached {
                resource: milk,
                at_least: Amount::ONE,
            },
        };
        let mut visibility = Visibility::new(2, 1, 0, vec![rule]);
        visibility.reveal(target);
        assert!(visibility.has_rule(target));
        visibility.retire_satisfied();
        assert!(visibility.pending().is_empty());
        assert!(visibility.is_visible(target));
        assert!(!visibility.has_rule(target));
    }

    #[test]
    fn test_unknown_entity_hidden() {
        let visibility = Visibility::new(0, 0, 0, Vec::new());
        assert!(!visibility.is_visible(Entity::Building(BuildingId::from_index(4))));
    }
}
