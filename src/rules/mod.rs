//! Deterministic rules core
//!
//! Everything that decides the outcome of a run lives here. This module must
//! stay pure and deterministic:
//! - All randomness comes from seeded streams
//! - Time only advances through the caller's delta
//! - Stable iteration order (application order, socket index)
//! - No rendering, physics or platform dependencies

pub mod cooldown;
pub mod course;
pub mod events;
pub mod input;
pub mod modifiers;
pub mod outcome;
pub mod rng;
pub mod scoring;
pub mod session;
pub mod stability;
pub mod state;
pub mod tick;

#[cfg(test)]
mod properties;

pub use cooldown::{Ability, CooldownTracker};
pub use course::{CourseConfig, CourseLayout, HazardPlacement};
pub use events::{EventBus, EventData, EventKind, GameEvent, ListenerId, StabilityReason};
pub use input::{ContactEvent, ContactKind, Gesture, InputFrame, InputInbox, VectorField};
pub use modifiers::{ActiveModifiers, ModCard, ModifierDeck, ModifierId, ModifierInstance, Rarity};
pub use outcome::{LoseReason, check_lose, check_win, lose_reason};
pub use rng::SeededRng;
pub use scoring::{Rank, ScoreBreakdown, ScoreInput, final_score, rank_for_score};
pub use session::{Phase, SessionEvent, SessionStateMachine};
pub use stability::{HazardKind, ImpactSeverity, StabilityLevel};
pub use state::{OrbState, OrbUpdate, RunConfig, RunSnapshot, RunState, RunStats};
pub use tick::{Game, PhysicsRequest, RunResult, TickOutput};
