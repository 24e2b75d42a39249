//! # Player Intents
//!
//! The only way a presentation layer changes the economy.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐      ┌──────────────┐      ┌──────────────┐
//! │ Presentation │─────>│    Intent    │─────>│  Game loop   │
//! │    layer     │      │    queue     │      │  (economy)   │
//! └──────────────┘      └──────────────┘      └──────────────┘
//!        ^                                           │
//!        └────────────── polls snapshot ─────────────┘
//! ```
//!
//! Intents flow one way. Results are never pushed back; the presentation
//! layer re-reads state on its refresh timer. Uses a bounded crossbeam
//! channel so a stuck consumer cannot grow memory without limit.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use creamery_economy::{
    Amount, BuildingId, Economy, EconomyError, EconomyResult, ExchangeId, Multiplier, ResourceId,
};

use crate::error::{GameError, GameResult};

/// Default queue capacity.
pub const DEFAULT_INTENT_CAPACITY: usize = 1024;

/// Something the player asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerIntent {
    /// Click-to-gain.
    Collect {
        /// Resource collected.
        resource: ResourceId,
        /// Amount per click batch.
        amount: Amount,
    },
    /// Buy one unit.
    Buy(BuildingId),
    /// Sell units. Signed, because it usually comes from a text field.
    Sell {
        /// Building sold.
        building: BuildingId,
        /// Units requested.
        count: i64,
    },
    /// Press `+` or `-` on a converter.
    Activate {
        /// Converter.
        building: BuildingId,
        /// Change in activated units.
        delta: i32,
    },
    /// Run an exchange.
    Convert {
        /// Exchange run.
        exchange: ExchangeId,
        /// Batch size.
        multiplier: Multiplier,
    },
}

impl PlayerIntent {
    /// Applies the intent to the economy.
    ///
    /// # Errors
    ///
    /// Whatever the economy refuses. A negative sell count is reported as
    /// `InvalidSellCount` without touching the economy.
    pub fn apply(self, economy: &mut Economy) -> EconomyResult<()> {
        match self {
            Self::Collect { resource, amount } => economy.collect(resource, amount).map(|_| ()),
            Self::Buy(building) => economy.buy(building),
            Self::Sell { building, count } => match u32::try_from(count) {
                Ok(count) => economy.sell(building, count),
                Err(_) => {
                    let target = economy
                        .building(building)
                        .ok_or_else(|| EconomyError::UnknownBuilding(format!("#{}", building.index())))?;
                    Err(EconomyError::InvalidSellCount {
                        building: target.name().to_string(),
                        requested: count,
                        owned: target.count(),
                    })
                }
            },
            Self::Activate { building, delta } => economy.set_activated(building, delta),
            Self::Convert {
                exchange,
                multiplier,
            } => economy.convert(exchange, multiplier),
        }
    }

    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Collect { .. } => "collect",
            Self::Buy(_) => "buy",
            Self::Sell { .. } => "sell",
            Self::Activate { .. } => "activate",
            Self::Convert { .. } => "convert",
        }
    }
}

/// Bounded intent queue.
pub struct IntentQueue {
    /// Sender end - held by presentation layers.
    sender: Sender<PlayerIntent>,
    /// Receiver end - held by the game loop.
    receiver: Receiver<PlayerIntent>,
}

impl IntentQueue {
    /// Creates a queue holding at most `capacity` pending intents.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates a sender handle (clone for multiple producers).
    #[must_use]
    pub fn sender(&self) -> IntentSender {
        IntentSender {
            sender: self.sender.clone(),
        }
    }

    /// Creates a receiver handle.
    #[must_use]
    pub fn receiver(&self) -> IntentReceiver {
        IntentReceiver {
            receiver: self.receiver.clone(),
        }
    }

    /// Creates a paired sender and receiver.
    #[must_use]
    pub fn create_pair(capacity: usize) -> (IntentSender, IntentReceiver) {
        let queue = Self::new(capacity);
        (queue.sender(), queue.receiver())
    }
}

impl Default for IntentQueue {
    fn default() -> Self {
        Self::new(DEFAULT_INTENT_CAPACITY)
    }
}

/// Handle for submitting intents.
#[derive(Clone, Debug)]
pub struct IntentSender {
    sender: Sender<PlayerIntent>,
}

impl IntentSender {
    /// Submits an intent without blocking.
    ///
    /// # Errors
    ///
    /// Returns `QueueFull` if the queue is at capacity (the intent is
    /// dropped) and `QueueClosed` if the game loop is gone.
    pub fn submit(&self, intent: PlayerIntent) -> GameResult<()> {
        match self.sender.try_send(intent) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(GameError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(GameError::QueueClosed),
        }
    }
}

/// Handle for draining intents.
#[derive(Clone, Debug)]
pub struct IntentReceiver {
    receiver: Receiver<PlayerIntent>,
}

impl IntentReceiver {
    /// Takes every pending intent, in submission order.
    #[must_use]
    pub fn drain(&self) -> Vec<PlayerIntent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending intents.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Checks whether any intent is pending.
    #[inline]
    #[must_use]
    pub fn has_intents(&self) -> bool {
        !self.receiver.is_empty()
    }
}
