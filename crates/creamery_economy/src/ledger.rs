//! # Resource Ledger
//!
//! Bounded accumulators for every named resource (milk, ice cream, vanilla...).
//!
//! ## Invariants
//!
//! 1. **Bounded**: `0 <= amount <= capacity` after every mutation
//! 2. **Lossy at the cap**: excess above capacity is discarded, not queued
//! 3. **Never removed**: resources live for the whole session
//!
//! The production rate stored next to each resource is display-only. The
//! engine keeps it in sync incrementally whenever an effect toggles; the ledger
//! never derives it.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{EconomyError, EconomyResult};
use crate::fixed_point::{Amount, Ratio};

/// Index of a resource in the ledger, assigned in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceId(u32);

impl ResourceId {
    /// Returns the position of this resource in declaration order.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named, bounded accumulator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    /// Unique name.
    name: String,
    /// Current amount, always within `[0, capacity]`.
    amount: Amount,
    /// Upper bound, only moved by storage buildings.
    capacity: Amount,
    /// Running sum of active per-tick contributions.
    production_rate: Ratio,
}

impl Resource {
    /// Returns the resource name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current amount.
    #[inline]
    #[must_use]
    pub const fn amount(&self) -> Amount {
        self.amount
    }

    /// Returns the current capacity.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> Amount {
        self.capacity
    }

    /// Returns the display production rate (per tick).
    #[inline]
    #[must_use]
    pub const fn production_rate(&self) -> Ratio {
        self.production_rate
    }

    /// Returns true if the resource is filled to capacity.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.amount >= self.capacity
    }
}

/// All resources of one economy.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    /// Resources in declaration order.
    resources: Vec<Resource>,
    /// Name index.
    by_name: HashMap<String, ResourceId>,
}

impl Ledger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource.
    ///
    /// The starting amount is clamped into `[0, capacity]`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the name is taken or the capacity is negative.
    pub fn add_resource(
        &mut self,
        name: &str,
        capacity: Amount,
        starting_amount: Amount,
    ) -> EconomyResult<ResourceId> {
        if self.by_name.contains_key(name) {
            return Err(EconomyError::InvalidConfig(format!(
                "resource {name} declared twice"
            )));
        }
        if capacity.is_negative() {
            return Err(EconomyError::InvalidConfig(format!(
                "resource {name} has negative capacity {capacity}"
            )));
        }
        let index = u32::try_from(self.resources.len()).map_err(|_| {
            EconomyError::InvalidConfig("too many resources".to_string())
        })?;
        let id = ResourceId(index);

        self.resources.push(Resource {
            name: name.to_string(),
            amount: starting_amount.clamp_to(Amount::ZERO, capacity),
            capacity,
            production_rate: Ratio::ZERO,
        });
        self.by_name.insert(name.to_string(), id);

        Ok(id)
    }

    /// Looks up a resource by name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource` if no resource has this name.
    pub fn id_of(&self, name: &str) -> EconomyResult<ResourceId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| EconomyError::UnknownResource(name.to_string()))
    }

    /// Gets a resource by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.index())
    }

    /// Returns the resource name, or an empty string for a foreign id.
    #[must_use]
    pub fn name(&self, id: ResourceId) -> &str {
        self.get(id).map_or("", Resource::name)
    }

    /// Returns the current amount of a resource.
    #[inline]
    #[must_use]
    pub fn amount(&self, id: ResourceId) -> Amount {
        self.get(id).map_or(Amount::ZERO, Resource::amount)
    }

    /// Returns the capacity of a resource.
    #[inline]
    #[must_use]
    pub fn capacity(&self, id: ResourceId) -> Amount {
        self.get(id).map_or(Amount::ZERO, Resource::capacity)
    }

    /// Returns the display production rate of a resource.
    #[inline]
    #[must_use]
    pub fn production_rate(&self, id: ResourceId) -> Ratio {
        self.get(id).map_or(Ratio::ZERO, Resource::production_rate)
    }

    /// Checks whether at least `amount` of a resource is on hand.
    #[inline]
    #[must_use]
    pub fn has_at_least(&self, id: ResourceId, amount: Amount) -> bool {
        self.amount(id) >= amount
    }

    /// Adds `delta` (possibly negative) and clamps into `[0, capacity]`.
    ///
    /// Always succeeds. Returns the change that was actually applied, which
    /// differs from `delta` when the clamp kicked in.
    pub fn adjust(&mut self, id: ResourceId, delta: Amount) -> Amount {
        let Some(resource) = self.resources.get_mut(id.index()) else {
            return Amount::ZERO;
        };
        let before = resource.amount;
        resource.amount = (before + delta).clamp_to(Amount::ZERO, resource.capacity);
        resource.amount - before
    }

    /// Moves the capacity by `delta` (negative when storage is sold).
    ///
    /// Capacity saturates at zero, and the amount is re-clamped so the
    /// ledger invariant holds after a shrink.
    pub fn expand_capacity(&mut self, id: ResourceId, delta: Amount) {
        if let Some(resource) = self.resources.get_mut(id.index()) {
            resource.capacity = (resource.capacity + delta).clamp_to(Amount::ZERO, Amount::MAX);
            resource.amount = resource.amount.clamp_to(Amount::ZERO, resource.capacity);
        }
    }

    /// Accumulates into the display production rate.
    pub fn add_production_rate(&mut self, id: ResourceId, delta: Ratio) {
        if let Some(resource) = self.resources.get_mut(id.index()) {
            resource.production_rate += delta;
        }
    }

    /// Iterates over all resources in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &Resource)> {
        self.resources
            .iter()
            .zip(0u32..)
            .map(|(resource, index)| (ResourceId(index), resource))
    }

    /// Returns the number of resources.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if no resources are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
