// src/poll/mod.rs
//! The polling loop, its persisted state and its statistics stream.

pub mod engine;
pub mod state;
pub mod stats;

pub use engine::{PollConfig, PollLoop};
pub use state::{JsonFileStateStore, MemoryStateStore, PollState, StateStore};
pub use stats::{StatsEvent, SIGNAL_CEILING, SIGNAL_FLOOR};
