//! Session layer: registry, input relay, and staleness reaping
//!
//! This module owns the shared lookup tables mutated from more than one
//! concurrent path. Each table lives behind a single owner exposing only
//! atomic operations, so concurrent stop-and-exit or timeout-and-submit
//! races resolve to "first writer wins".
//!
//! # Features
//!
//! - **Registry**: Session id → state, one live entry per id
//! - **Input relay**: Single-resolution settlement slots with deadlines
//! - **Reaper**: Periodic termination of sessions past the age threshold

pub mod input;
pub mod reaper;
pub mod registry;
pub use input::{InputAnswer, InputRelay};
pub use reaper::StaleSessionReaper;
pub use registry::{Session, SessionRegistry, SessionState};

#[cfg(test)]
mod tests;
