//! # Gameplay
//!
//! Players that drive the economy through intents.

pub mod autoplayer;

pub use autoplayer::{AutoPlayer, PlayerState, DEFAULT_CLICKS_PER_DECISION};
