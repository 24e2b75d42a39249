//! # Creamery Game Loop
//!
//! One scheduler, one repeating timer per logical tick:
//! ```text
//! step(elapsed):
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. ADVANCE TIMERS                                                   │
//! │    ├─ production timer (default 1000 ms, catch-up capped)           │
//! │    └─ refresh timer    (default 10 ms, never catches up)            │
//! │                                                                     │
//! │ 2. APPLY INTENTS                                                    │
//! │    └─ Drain the queue in submission order; refusals are counted     │
//! │                                                                     │
//! │ 3. PRODUCTION TICKS                                                 │
//! │    └─ economy.tick() once per due production interval               │
//! │                                                                     │
//! │ 4. REFRESH                                                          │
//! │    └─ Latch newly satisfied unlocks; presentation re-reads state    │
//! │                                                                     │
//! │ 5. RECORD STATS                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop never sleeps. Hosts call [`GameLoop::step_realtime`] from their
//! own event loop, or [`GameLoop::step`] with a simulated elapsed time.

use std::time::{Duration, Instant};

use creamery_economy::{Economy, Entity, TickReport};
use tracing::{debug, info, warn};

use crate::config::{GameConfig, TimingConfig};
use crate::error::GameResult;
use crate::intents::{IntentQueue, IntentReceiver, IntentSender, DEFAULT_INTENT_CAPACITY};
use crate::shared::SharedEconomy;

/// A timer that fires once per elapsed interval.
#[derive(Clone, Debug)]
pub struct RepeatingTimer {
    /// Time between firings.
    interval: Duration,
    /// Time carried over toward the next firing.
    accumulated: Duration,
    /// Most firings reported by one `advance`.
    max_catch_up: u32,
    /// Firings reported so far.
    fired: u64,
    /// Firings dropped by the catch-up cap.
    dropped: u64,
}

/// What one `advance` produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Firing {
    /// Firings to run now.
    pub run: u32,
    /// Firings that were due but exceeded the catch-up cap.
    pub dropped: u32,
}

impl RepeatingTimer {
    /// Creates a timer. A zero interval is treated as one nanosecond.
    #[must_use]
    pub fn new(interval: Duration, max_catch_up: u32) -> Self {
        Self {
            interval: interval.max(Duration::from_nanos(1)),
            accumulated: Duration::ZERO,
            max_catch_up: max_catch_up.max(1),
            fired: 0,
            dropped: 0,
        }
    }

    /// Adds elapsed time and reports how many firings are due.
    pub fn advance(&mut self, elapsed: Duration) -> Firing {
        let total = (self.accumulated + elapsed).as_nanos();
        let interval = self.interval.as_nanos();
        let due = u32::try_from(total / interval).unwrap_or(u32::MAX);
        self.accumulated = Duration::from_nanos(u64::try_from(total % interval).unwrap_or(0));

        let run = due.min(self.max_catch_up);
        let dropped = due - run;
        self.fired += u64::from(run);
        self.dropped += u64::from(dropped);
        Firing { run, dropped }
    }

    /// Returns the interval.
    #[inline]
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Time left until the next firing.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.interval.saturating_sub(self.accumulated)
    }

    /// Firings reported so far.
    #[inline]
    #[must_use]
    pub const fn fired(&self) -> u64 {
        self.fired
    }

    /// Firings dropped so far.
    #[inline]
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Firings of both timers for one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Due {
    /// Production timer.
    pub production: Firing,
    /// Refresh timer.
    pub refresh: Firing,
}

/// Owns the production and refresh timers.
#[derive(Clone, Debug)]
pub struct Scheduler {
    production: RepeatingTimer,
    refresh: RepeatingTimer,
}

impl Scheduler {
    /// Builds both timers from the timing configuration.
    #[must_use]
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            production: RepeatingTimer::new(timing.production_interval(), timing.max_catch_up_ticks),
            // Only the latest state matters for a refresh.
            refresh: RepeatingTimer::new(timing.refresh_interval(), 1),
        }
    }

    /// Advances both timers by the same elapsed time.
    pub fn advance(&mut self, elapsed: Duration) -> Due {
        Due {
            production: self.production.advance(elapsed),
            refresh: self.refresh.advance(elapsed),
        }
    }

    /// Returns the production timer.
    #[must_use]
    pub const fn production(&self) -> &RepeatingTimer {
        &self.production
    }

    /// Returns the refresh timer.
    #[must_use]
    pub const fn refresh(&self) -> &RepeatingTimer {
        &self.refresh
    }
}

/// Timing of one step.
#[derive(Clone, Copy, Debug, Default)]
pub struct StepStats {
    /// Wall time spent inside the step in microseconds.
    pub total_us: u64,
    /// Production ticks run.
    pub ticks: u32,
    /// Production ticks dropped by the catch-up cap.
    pub ticks_dropped: u32,
    /// Whether the refresh tick ran.
    pub refreshed: bool,
    /// Intents applied.
    pub intents_applied: u32,
    /// Intents the economy refused.
    pub intents_rejected: u32,
}

/// What one step did.
#[derive(Clone, Debug, Default)]
pub struct StepReport {
    /// One report per production tick run.
    pub ticks: Vec<TickReport>,
    /// Entities revealed by the refresh tick.
    pub revealed: Vec<Entity>,
    /// Timing and counters.
    pub stats: StepStats,
}

/// The game loop orchestrator.
///
/// Owns the scheduler and the receiving end of the intent queue; shares the
/// economy with whoever holds a [`SharedEconomy`] clone.
pub struct GameLoop {
    /// The economy, behind one lock.
    economy: SharedEconomy,
    /// Production and refresh timers.
    scheduler: Scheduler,
    /// Queue the presentation layer submits into.
    queue: IntentQueue,
    /// Receiving end of `queue`.
    intents: IntentReceiver,
    /// Time of the last realtime step.
    last_step: Option<Instant>,
    /// Accumulated statistics.
    stats_accumulator: LoopStatsAccumulator,
}

impl GameLoop {
    /// Creates a loop around an economy.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTiming` for unusable timing values.
    pub fn new(economy: Economy, timing: &TimingConfig) -> GameResult<Self> {
        timing.validate()?;
        let queue = IntentQueue::new(DEFAULT_INTENT_CAPACITY);
        let intents = queue.receiver();

        Ok(Self {
            economy: SharedEconomy::new(economy),
            scheduler: Scheduler::new(timing),
            queue,
            intents,
            last_step: None,
            stats_accumulator: LoopStatsAccumulator::new(timing.refresh_interval()),
        })
    }

    /// Builds the economy from the configuration and wraps it in a loop.
    ///
    /// # Errors
    ///
    /// Returns content errors from the economy and `InvalidTiming` for
    /// unusable timing values.
    pub fn from_config(config: &GameConfig) -> GameResult<Self> {
        let economy = config.content.build()?;
        info!(
            resources = economy.ledger().len(),
            buildings = economy.registry().len(),
            exchanges = economy.exchanges().len(),
            "economy ready"
        );
        Self::new(economy, &config.timing)
    }

    /// Creates a handle for submitting intents.
    #[must_use]
    pub fn intent_sender(&self) -> IntentSender {
        self.queue.sender()
    }

    /// Returns a handle to the shared economy.
    #[must_use]
    pub fn economy(&self) -> SharedEconomy {
        self.economy.clone()
    }

    /// Returns the scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Advances the loop by `elapsed` of simulated time.
    pub fn step(&mut self, elapsed: Duration) -> StepReport {
        let start = Instant::now();
        let due = self.scheduler.advance(elapsed);
        if due.production.dropped > 0 {
            warn!(
                dropped = due.production.dropped,
                "production fell behind, dropping ticks"
            );
        }

        let mut report = StepReport::default();
        {
            let mut economy = self.economy.lock();

            for intent in self.intents.drain() {
                match intent.apply(&mut economy) {
                    Ok(()) => report.stats.intents_applied += 1,
                    Err(err) => {
                        debug!(intent = intent.label(), error = %err, "intent refused");
                        report.stats.intents_rejected += 1;
                    }
                }
            }

            for _ in 0..due.production.run {
                report.ticks.push(economy.tick());
            }

            if due.refresh.run > 0 {
                report.revealed = economy.refresh_visibility();
            }
        }

        report.stats.ticks = due.production.run;
        report.stats.ticks_dropped = due.production.dropped;
        report.stats.refreshed = due.refresh.run > 0;
        report.stats.total_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.stats_accumulator.record(report.stats);
        report
    }

    /// Advances the loop by the wall time since the previous realtime step.
    ///
    /// The first call only starts the clock.
    pub fn step_realtime(&mut self) -> StepReport {
        let now = Instant::now();
        let elapsed = self
            .last_step
            .map_or(Duration::ZERO, |last| now.duration_since(last));
        self.last_step = Some(now);
        self.step(elapsed)
    }

    /// Runs exactly `ticks` production intervals of simulated time.
    ///
    /// Returns the number of production ticks actually run.
    pub fn run_ticks(&mut self, ticks: u64) -> u64 {
        let interval = self.scheduler.production().interval();
        let mut run = 0;
        for _ in 0..ticks {
            run += u64::from(self.step(interval).stats.ticks);
        }
        run
    }

    /// Returns the accumulated statistics.
    #[must_use]
    pub const fn stats(&self) -> &LoopStatsAccumulator {
        &self.stats_accumulator
    }
}

/// Accumulator for step statistics.
#[derive(Clone, Debug)]
pub struct LoopStatsAccumulator {
    /// Steps whose wall time exceeded this are counted as over budget.
    budget: Duration,
    /// Total steps recorded.
    pub steps_recorded: u64,
    /// Production ticks run.
    pub ticks_run: u64,
    /// Production ticks dropped.
    pub ticks_dropped: u64,
    /// Refresh ticks run.
    pub refreshes: u64,
    /// Intents applied.
    pub intents_applied: u64,
    /// Intents refused.
    pub intents_rejected: u64,
    /// Sum of step times.
    pub total_us_sum: u64,
    /// Min step time.
    pub min_step_us: u64,
    /// Max step time.
    pub max_step_us: u64,
    /// Steps that exceeded the budget.
    pub steps_over_budget: u64,
}

impl LoopStatsAccumulator {
    /// Creates an empty accumulator with a per-step budget.
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            steps_recorded: 0,
            ticks_run: 0,
            ticks_dropped: 0,
            refreshes: 0,
            intents_applied: 0,
            intents_rejected: 0,
            total_us_sum: 0,
            min_step_us: u64::MAX,
            max_step_us: 0,
            steps_over_budget: 0,
        }
    }

    /// Records one step.
    pub fn record(&mut self, stats: StepStats) {
        self.steps_recorded += 1;
        self.ticks_run += u64::from(stats.ticks);
        self.ticks_dropped += u64::from(stats.ticks_dropped);
        self.refreshes += u64::from(stats.refreshed);
        self.intents_applied += u64::from(stats.intents_applied);
        self.intents_rejected += u64::from(stats.intents_rejected);
        self.total_us_sum += stats.total_us;
        self.min_step_us = self.min_step_us.min(stats.total_us);
        self.max_step_us = self.max_step_us.max(stats.total_us);

        if u128::from(stats.total_us) > self.budget.as_micros() {
            self.steps_over_budget += 1;
        }
    }

    /// Returns the average step time in microseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_step_us(&self) -> f64 {
        if self.steps_recorded == 0 {
            return 0.0;
        }
        self.total_us_sum as f64 / self.steps_recorded as f64
    }

    /// Logs a summary at info level.
    pub fn log_summary(&self) {
        info!(
            steps = self.steps_recorded,
            ticks = self.ticks_run,
            dropped = self.ticks_dropped,
            refreshes = self.refreshes,
            intents_applied = self.intents_applied,
            intents_rejected = self.intents_rejected,
            avg_step_us = self.avg_step_us(),
            max_step_us = self.max_step_us,
            over_budget = self.steps_over_budget,
            "loop statistics"
        );
    }
}
