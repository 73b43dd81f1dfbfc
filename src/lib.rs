//! TILT//RIFT - run-state and rules engine for a tilt-controlled orb game
//!
//! Core modules:
//! - `rules`: Deterministic rules core (run state, scoring, stability, session phases)
//! - `seed` / `share`: Seed validation, daily seeds and share links
//! - `telemetry`: Telemetry records and batching queue
//! - `platform`: Browser/native platform abstraction
//! - `persistence`: Versioned save envelope for settings and high scores

pub mod error;
pub mod highscores;
pub mod persistence;
pub mod platform;
pub mod rules;
pub mod seed;
pub mod settings;
pub mod share;
pub mod telemetry;

pub use error::{Error, Result};
pub use highscores::HighScores;
pub use seed::Seed;
pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Shards on a default course
    pub const TOTAL_SHARDS: u32 = 12;
    /// Run time limit in seconds (3 minutes)
    pub const DEFAULT_TIME_LIMIT: f32 = 180.0;
    /// Stability ceiling
    pub const MAX_STABILITY: f32 = 100.0;

    /// Seconds a combo survives without another pickup
    pub const COMBO_WINDOW: f32 = 3.0;
    /// Base points for a shard before combo multiplier
    pub const SHARD_BASE_SCORE: f64 = 100.0;

    /// Contacts below this force are grazes and are not counted as impacts
    pub const GRAZE_FORCE: f32 = 0.5;

    /// World gravity (m/s²)
    pub const GRAVITY: f32 = 9.8;

    /// Nominal simulation rate of the host loop
    pub const SIM_DT: f32 = 1.0 / 60.0;
}

/// Clamp that maps NaN to `min` instead of propagating it
#[inline]
pub fn clamp_finite(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}

/// Subtract a dead zone from an axis value, keeping its sign
#[inline]
pub fn deadzone(value: f32, threshold: f32) -> f32 {
    if value.abs() < threshold {
        0.0
    } else {
        value - value.signum() * threshold
    }
}

/// Clamp each axis of a tilt vector into [-1, 1]; NaN axes become level
#[inline]
pub fn clamp_tilt(tilt: Vec2) -> Vec2 {
    let axis = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) };
    Vec2::new(axis(tilt.x), axis(tilt.y))
}
