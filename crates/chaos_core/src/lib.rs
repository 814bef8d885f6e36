//! `chaos_core` — the simulation state store and the rules that drive it.
//!
//! No IO, no network. All randomness via the passed-in Rng. Collaborators
//! compute effect bundles as plain data and hand them to `GameState`.

mod coalition;
mod diff;
mod engine;
mod error;
mod id;
mod listeners;
mod store;
mod types;
pub mod validate;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

pub use coalition::{assess_coalition, CoalitionStatus};
pub use diff::{diff, StateDiff};
pub use engine::{
    advance_day, apply_decision, cascade_deltas, DayReport, DecisionOutcome, CASCADE_SOURCE,
    DAILY_TURN_SOURCE, MAX_CASCADE_DEPTH,
};
pub use error::StateError;
pub use id::session_uuid;
pub use listeners::{ChangeEvent, ListenerError, ListenerResult, SubscriptionId};
pub use store::{EffectsOutcome, GameState};
pub use types::*;

#[cfg(test)]
mod tests;
