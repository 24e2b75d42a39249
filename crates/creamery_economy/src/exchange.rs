//! # Exchanges
//!
//! One-shot conversions the player triggers by hand: spend a fixed bundle,
//! receive a fixed reward. Exchanges are not owned and have no state, so their
//! price never grows.
//!
//! The check is all-or-nothing over the whole bundle, the same way a
//! transactional craft either consumes every ingredient or none.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{EconomyError, EconomyResult};
use crate::registry::ResourceAmount;

/// Index of an exchange, assigned in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ExchangeId(u32);

impl ExchangeId {
    /// Returns the position of this exchange in declaration order.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Batch size for one exchange call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Multiplier {
    /// One exchange.
    #[default]
    X1,
    /// Ten at once.
    X10,
    /// A hundred at once.
    X100,
    /// A thousand at once.
    X1000,
}

impl Multiplier {
    /// All multipliers, smallest first.
    pub const ALL: [Self; 4] = [Self::X1, Self::X10, Self::X100, Self::X1000];

    /// Returns the number of exchanges this multiplier performs.
    #[inline]
    #[must_use]
    pub const fn factor(self) -> u32 {
        match self {
            Self::X1 => 1,
            Self::X10 => 10,
            Self::X100 => 100,
            Self::X1000 => 1000,
        }
    }

    /// Parses a factor back into a multiplier.
    #[must_use]
    pub const fn from_factor(factor: u32) -> Option<Self> {
        match factor {
            1 => Some(Self::X1),
            10 => Some(Self::X10),
            100 => Some(Self::X100),
            1000 => Some(Self::X1000),
            _ => None,
        }
    }
}

/// A stateless bundle-for-reward conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exchange {
    /// Unique name.
    name: String,
    /// Spent per exchange.
    inputs: Vec<ResourceAmount>,
    /// Granted per exchange.
    output: ResourceAmount,
}

impl Exchange {
    /// Returns the exchange name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the bundle spent per exchange.
    #[inline]
    #[must_use]
    pub fn inputs(&self) -> &[ResourceAmount] {
        &self.inputs
    }

    /// Returns the reward per exchange.
    #[inline]
    #[must_use]
    pub const fn output(&self) -> ResourceAmount {
        self.output
    }

    /// Inputs scaled by `multiplier`.
    pub fn scaled_inputs(&self, multiplier: Multiplier) -> impl Iterator<Item = ResourceAmount> + '_ {
        self.inputs.iter().map(move |input| {
            ResourceAmount::new(input.resource, input.amount.times(multiplier.factor()))
        })
    }

    /// Reward scaled by `multiplier`.
    #[must_use]
    pub const fn scaled_output(&self, multiplier: Multiplier) -> ResourceAmount {
        ResourceAmount::new(self.output.resource, self.output.amount.times(multiplier.factor()))
    }
}

/// All exchanges of one economy.
#[derive(Clone, Debug, Default)]
pub struct ExchangeTable {
    /// Exchanges in declaration order.
    exchanges: Vec<Exchange>,
    /// Name index.
    by_name: HashMap<String, ExchangeId>,
}

impl ExchangeTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an exchange.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for duplicate names, empty bundles or
    /// non-positive amounts.
    pub fn add_exchange(
        &mut self,
        name: &str,
        inputs: Vec<ResourceAmount>,
        output: ResourceAmount,
    ) -> EconomyResult<ExchangeId> {
        if self.by_name.contains_key(name) {
            return Err(EconomyError::InvalidConfig(format!(
                "exchange {name} declared twice"
            )));
        }
        if inputs.is_empty() {
            return Err(EconomyError::InvalidConfig(format!(
                "exchange {name} spends nothing"
            )));
        }
        if !output.amount.is_positive() || inputs.iter().any(|i| !i.amount.is_positive()) {
            return Err(EconomyError::InvalidConfig(format!(
                "exchange {name} has a non-positive amount"
            )));
        }

        let index = u32::try_from(self.exchanges.len()).map_err(|_| {
            EconomyError::InvalidConfig("too many exchanges".to_string())
        })?;
        let id = ExchangeId(index);
        self.exchanges.push(Exchange {
            name: name.to_string(),
            inputs,
            output,
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Looks up an exchange by name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownExchange` if no exchange has this name.
    pub fn id_of(&self, name: &str) -> EconomyResult<ExchangeId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| EconomyError::UnknownExchange(name.to_string()))
    }

    /// Gets an exchange by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: ExchangeId) -> Option<&Exchange> {
        self.exchanges.get(id.index())
    }

    /// Iterates over all exchanges in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (ExchangeId, &Exchange)> {
        self.exchanges
            .iter()
            .zip(0u32..)
            .map(|(exchange, index)| (ExchangeId(index), exchange))
    }

    /// Returns the number of exchanges.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    /// Returns true if the table is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}
