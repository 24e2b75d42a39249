//! # Creamery
//!
//! The game crate: timing, intents and a headless player around the
//! economy.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                            CREAMERY                                 │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  ┌─────────────────┐     ┌─────────────────┐     ┌───────────────┐  │
//! │  │  Presentation   │     │  Intent queue   │     │   Game loop   │  │
//! │  │  (or autoplayer)│────>│  (bounded)      │────>│               │  │
//! │  │                 │     │                 │     │ • production  │  │
//! │  └────────^────────┘     └─────────────────┘     │ • refresh     │  │
//! │           │                                      └───────┬───────┘  │
//! │           │              ┌─────────────────┐             │          │
//! │           └──────────────│ SharedEconomy   │<────────────┘          │
//! │               snapshot   │ (one lock)      │                        │
//! │                          └─────────────────┘                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: Timing plus economy content from TOML
//! - `game_loop`: Production and refresh scheduling
//! - `intents`: Player intents and their queue
//! - `shared`: Lock-guarded economy handle
//! - `gameplay`: Automated players

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod game_loop;
pub mod gameplay;
pub mod intents;
pub mod shared;

pub use creamery_economy as economy;

pub use config::{GameConfig, TimingConfig};
pub use error::{GameError, GameResult};
pub use game_loop::{GameLoop, LoopStatsAccumulator, RepeatingTimer, Scheduler, StepReport, StepStats};
pub use gameplay::{AutoPlayer, PlayerState};
pub use intents::{IntentQueue, IntentReceiver, IntentSender, PlayerIntent};
pub use shared::SharedEconomy;
