//! # Autoplayer
//!
//! A greedy bot that plays the economy through the intent queue, the same
//! way a presentation layer would. Used by the headless binary and by
//! long-running tests.
//!
//! Each decision, in order:
//! 1. Click the collect resource
//! 2. Top up idle converter units
//! 3. Try an exchange whose product has never been seen
//! 4. Buy an affordable building, newest first
//! 5. Otherwise save for the cheapest visible building, converting toward it

use creamery_economy::{Amount, Building, BuildingId, Economy, Entity, ExchangeId, Multiplier, ResourceId};
use tracing::debug;

use crate::intents::PlayerIntent;

/// Default collect amount per decision.
pub const DEFAULT_CLICKS_PER_DECISION: i64 = 1;

/// What the bot is working toward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PlayerState {
    /// Nothing in particular.
    #[default]
    Gathering,
    /// Saving for a building it cannot afford yet.
    Saving {
        /// Building saved for.
        target: BuildingId,
    },
}

/// The greedy bot.
#[derive(Clone, Debug)]
pub struct AutoPlayer {
    /// Resource clicked every decision.
    click_resource: ResourceId,
    /// Amount per click.
    click_amount: Amount,
    /// Current goal.
    state: PlayerState,
    /// Decisions taken.
    decisions: u64,
}

impl AutoPlayer {
    /// Creates a bot that clicks `click_resource` by `clicks` whole units.
    #[must_use]
    pub const fn new(click_resource: ResourceId, clicks: i64) -> Self {
        Self {
            click_resource,
            click_amount: Amount::from_whole(clicks),
            state: PlayerState::Gathering,
            decisions: 0,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> PlayerState {
        self.state
    }

    /// Returns the number of decisions taken.
    #[must_use]
    pub const fn decisions(&self) -> u64 {
        self.decisions
    }

    /// Reads the economy and returns the intents for this decision.
    pub fn decide(&mut self, economy: &Economy) -> Vec<PlayerIntent> {
        self.decisions += 1;
        let mut intents = vec![PlayerIntent::Collect {
            resource: self.click_resource,
            amount: self.click_amount,
        }];

        for building in economy.registry().iter() {
            if let Some(active) = building.activated() {
                if active < building.count() {
                    intents.push(PlayerIntent::Activate {
                        building: building.id(),
                        delta: i32::try_from(building.count() - active).unwrap_or(i32::MAX),
                    });
                }
            }
        }

        // One spending action per decision; later ones would read stale amounts.
        if let Some(exchange) = self.explore(economy) {
            intents.push(PlayerIntent::Convert {
                exchange,
                multiplier: Multiplier::X1,
            });
            return intents;
        }

        let visible = |id: BuildingId| economy.is_visible(Entity::Building(id));
        if let Some(building) = economy
            .registry()
            .iter()
            .rev()
            .find(|b| visible(b.id()) && economy.available(b.id()))
        {
            debug!(building = building.name(), "autoplayer buying");
            intents.push(PlayerIntent::Buy(building.id()));
            self.state = PlayerState::Gathering;
            return intents;
        }

        let target = economy
            .registry()
            .iter()
            .filter(|b| visible(b.id()))
            .min_by_key(|b| Self::shortfall(economy, b.id()))
            .map(Building::id);

        if let Some(target) = target {
            if self.state != (PlayerState::Saving { target }) {
                debug!(building = target.index(), "autoplayer saving");
            }
            self.state = PlayerState::Saving { target };
            if let Some(exchange) = Self::feeder(economy, target) {
                intents.push(PlayerIntent::Convert {
                    exchange,
                    multiplier: Multiplier::X1,
                });
            }
        }

        intents
    }

    /// An affordable, visible exchange whose product is still hidden.
    fn explore(&self, economy: &Economy) -> Option<ExchangeId> {
        economy.exchanges().iter().find_map(|(id, exchange)| {
            let product = exchange.output().resource;
            (product != self.click_resource
                && economy.is_visible(Entity::Exchange(id))
                && !economy.is_visible(Entity::Resource(product))
                && economy.exchange_available(id, Multiplier::X1))
            .then_some(id)
        })
    }

    /// Sum of what is still missing for the next unit of `id`.
    fn shortfall(economy: &Economy, id: BuildingId) -> Amount {
        economy.building(id).map_or(Amount::ZERO, |building| {
            building
                .costs()
                .iter()
                .map(|line| line.amount() - economy.amount(line.resource()))
                .filter(|missing| missing.is_positive())
                .fold(Amount::ZERO, |total, missing| total + missing)
        })
    }

    /// An affordable exchange producing a resource `target` is short of.
    fn feeder(economy: &Economy, target: BuildingId) -> Option<ExchangeId> {
        let building = economy.building(target)?;
        building
            .costs()
            .iter()
            .filter(|line| economy.amount(line.resource()) < line.amount())
            .find_map(|line| {
                economy.exchanges().iter().find_map(|(id, exchange)| {
                    (exchange.output().resource == line.resource()
                        && economy.is_visible(Entity::Exchange(id))
                        && economy.exchange_available(id, Multiplier::X1))
                    .then_some(id)
                })
            })
    }
}
