//! # Creamery Headless
//!
//! Runs the economy with the autoplayer and no presentation layer.
//!
//! ```bash
//! # Built-in content, 600 production ticks
//! creamery_headless
//!
//! # Custom content
//! RUST_LOG=debug creamery_headless content.toml 3600
//! ```

use std::process::ExitCode;

use creamery::economy::{Economy, Entity};
use creamery::{AutoPlayer, GameConfig, GameLoop, GameResult};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Production ticks when none are given.
const DEFAULT_TICKS: u64 = 600;

/// Resource the autoplayer clicks.
const CLICK_RESOURCE: &str = "milk";

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();
}

fn load_config(path: Option<&str>) -> GameResult<GameConfig> {
    match path {
        Some(path) => GameConfig::from_file(path),
        None => GameConfig::builtin(),
    }
}

fn run(config: &GameConfig, ticks: u64) -> GameResult<()> {
    let mut game = GameLoop::from_config(config)?;
    let shared = game.economy();
    let sender = game.intent_sender();

    let click = shared.read(|economy| economy.resource_id(CLICK_RESOURCE))?;
    let mut player = AutoPlayer::new(click, creamery::gameplay::DEFAULT_CLICKS_PER_DECISION);

    let interval = game.scheduler().production().interval();
    for _ in 0..ticks {
        for intent in shared.read(|economy| player.decide(economy)) {
            sender.submit(intent)?;
        }
        let report = game.step(interval);
        for entity in &report.revealed {
            shared.read(|economy| info!(entity = %describe(economy, *entity), "unlocked"));
        }
    }

    game.stats().log_summary();
    shared.read(log_summary);
    Ok(())
}

fn describe(economy: &Economy, entity: Entity) -> String {
    match entity {
        Entity::Resource(id) => economy.ledger().name(id).to_string(),
        Entity::Building(id) => economy
            .building(id)
            .map_or_else(String::new, |b| b.name().to_string()),
        Entity::Exchange(id) => economy
            .exchanges()
            .get(id)
            .map_or_else(String::new, |e| e.name().to_string()),
    }
}

fn log_summary(economy: &Economy) {
    info!(tick = economy.tick_count(), "final state");
    for (id, resource) in economy.ledger().iter() {
        if economy.is_visible(Entity::Resource(id)) {
            info!(
                resource = resource.name(),
                amount = %resource.amount(),
                capacity = %resource.capacity(),
                rate = %resource.production_rate().per_second_label(),
            );
        }
    }
    for building in economy.registry().iter().filter(|b| b.count() > 0) {
        info!(building = building.name(), count = building.count());
    }
}

fn main() -> ExitCode {
    init_logging();

    let mut args = std::env::args().skip(1);
    let path = args.next();
    let ticks = match args.next().map(|raw| raw.parse::<u64>()) {
        None => DEFAULT_TICKS,
        Some(Ok(ticks)) => ticks,
        Some(Err(err)) => {
            error!(%err, "tick count must be a whole number");
            return ExitCode::FAILURE;
        }
    };

    let config = match load_config(path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    info!(ticks, "creamery headless starting");
    match run(&config, ticks) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "run aborted");
            ExitCode::FAILURE
        }
    }
}
