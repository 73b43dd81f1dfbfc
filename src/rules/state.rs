//! Run state: the authoritative aggregate for one play session
//!
//! Mutated only through the operations below. Arithmetic is delegated to
//! [`stability`](super::stability), [`scoring`](super::scoring), the cooldown
//! tracker and modifier instances. Every change queues a [`GameEvent`]
//! stamped with the run clock; the tick driver drains the queue with
//! [`RunState::take_events`] once the tick is complete.

use std::collections::BTreeSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::cooldown::{Ability, CooldownTracker};
use super::events::{EventData, EventKind, GameEvent, StabilityReason};
use super::modifiers::{ActiveModifiers, ModifierEffect, ModifierId};
use super::scoring::{self, Rank, ScoreInput, combo_multiplier};
use super::stability::{self, HazardKind, ImpactSeverity};
use crate::consts::*;

/// Per-run tunables; defaults come from [`crate::consts`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub time_limit: f32,
    pub max_stability: f32,
    pub total_shards: u32,
    pub combo_window: f32,
    pub shard_base_score: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            time_limit: DEFAULT_TIME_LIMIT,
            max_stability: MAX_STABILITY,
            total_shards: TOTAL_SHARDS,
            combo_window: COMBO_WINDOW,
            shard_base_score: SHARD_BASE_SCORE,
        }
    }
}

/// Counters and resources for the current run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub shards_collected: u32,
    pub total_shards: u32,
    pub time_remaining: f32,
    pub time_elapsed: f32,
    pub current_combo: u32,
    pub max_combo: u32,
    pub combo_timer: f32,
    pub impact_count: u32,
    pub stability: f32,
    pub max_stability: f32,
    pub score: u64,
    pub airtime: f32,
    pub max_speed: f32,
}

impl RunStats {
    pub fn new(config: &RunConfig) -> Self {
        let max_stability = if config.max_stability > 0.0 {
            config.max_stability
        } else {
            MAX_STABILITY
        };
        Self {
            shards_collected: 0,
            total_shards: config.total_shards.max(1),
            time_remaining: config.time_limit.max(0.0),
            time_elapsed: 0.0,
            current_combo: 0,
            max_combo: 0,
            combo_timer: 0.0,
            impact_count: 0,
            stability: max_stability,
            max_stability,
            score: 0,
            airtime: 0.0,
            max_speed: 0.0,
        }
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new(&RunConfig::default())
    }
}

/// Copy of the physics layer's view of the orb
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub speed: f32,
    pub is_grounded: bool,
    pub is_in_exit_gate: bool,
    /// Run clock (seconds) of the last counted impact
    pub last_impact_time: f32,
    pub last_impact_force: f32,
}

impl Default for OrbState {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.0, 0.0),
            velocity: Vec3::ZERO,
            speed: 0.0,
            is_grounded: true,
            is_in_exit_gate: false,
            last_impact_time: 0.0,
            last_impact_force: 0.0,
        }
    }
}

/// Partial orb sync; `None` fields keep their current value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OrbUpdate {
    pub position: Option<Vec3>,
    pub velocity: Option<Vec3>,
    pub speed: Option<f32>,
    pub is_grounded: Option<bool>,
    pub is_in_exit_gate: Option<bool>,
}

impl OrbUpdate {
    /// Overlay `later` on top of `self`, field by field
    pub fn merge(&mut self, later: OrbUpdate) {
        self.position = later.position.or(self.position);
        self.velocity = later.velocity.or(self.velocity);
        self.speed = later.speed.or(self.speed);
        self.is_grounded = later.is_grounded.or(self.is_grounded);
        self.is_in_exit_gate = later.is_in_exit_gate.or(self.is_in_exit_gate);
    }
}

/// Read-only view handed to presentation and the outcome checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub stats: RunStats,
    pub orb: OrbState,
    pub cooldowns: Vec<(Ability, f32)>,
    pub modifiers: Vec<ModifierId>,
    pub collected: Vec<String>,
}

impl RunSnapshot {
    /// End-of-run tally; `stats.score` stays the running shard sum
    pub fn final_score(&self) -> u64 {
        let overclock = self.modifiers.contains(&ModifierId::Overclock);
        scoring::final_score(&ScoreInput::from(&self.stats), overclock)
    }

    pub fn final_rank(&self) -> Rank {
        scoring::rank_for_score(self.final_score())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    config: RunConfig,
    stats: RunStats,
    orb: OrbState,
    collected: BTreeSet<String>,
    cooldowns: CooldownTracker,
    modifiers: ActiveModifiers,
    #[serde(skip)]
    pending: Vec<GameEvent>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new(RunConfig::default())
    }
}

impl RunState {
    pub fn new(mut config: RunConfig) -> Self {
        if config.combo_window.is_nan() || config.combo_window <= 0.0 {
            config.combo_window = COMBO_WINDOW;
        }
        Self {
            stats: RunStats::new(&config),
            config,
            orb: OrbState::default(),
            collected: BTreeSet::new(),
            cooldowns: CooldownTracker::new(),
            modifiers: ActiveModifiers::new(),
            pending: Vec::new(),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn orb(&self) -> &OrbState {
        &self.orb
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    pub fn modifiers(&self) -> &ActiveModifiers {
        &self.modifiers
    }

    pub fn is_collected(&self, id: &str) -> bool {
        self.collected.contains(id)
    }

    /// Run clock in milliseconds, used to stamp events
    pub fn clock_ms(&self) -> u64 {
        (self.stats.time_elapsed as f64 * 1000.0).round() as u64
    }

    /// Queue an event stamped with the run clock
    pub fn queue_event(&mut self, kind: EventKind, data: EventData) {
        let event = GameEvent::new(kind, self.clock_ms(), data);
        self.pending.push(event);
    }

    /// Drain events queued since the last call
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Back to defaults: stats, orb, collection set, cooldowns, modifiers
    pub fn reset_run(&mut self) {
        self.stats = RunStats::new(&self.config);
        self.orb = OrbState::default();
        self.collected.clear();
        self.cooldowns.reset();
        self.modifiers.clear();
        self.pending.clear();
        log::info!(
            "Run reset: {} shards, {:.0}s",
            self.stats.total_shards,
            self.stats.time_remaining
        );
    }

    /// Course-dependent shard total; keeps `shards_collected <= total_shards`
    pub fn set_total_shards(&mut self, total: u32) {
        let total = total.max(1);
        self.config.total_shards = total;
        self.stats.total_shards = total;
        self.stats.shards_collected = self.stats.shards_collected.min(total);
    }

    // --- Shards, combo, score ---

    /// First pickup of `id` scores, heals and bumps the combo; repeats are ignored
    ///
    /// Returns the points awarded, `None` for a repeat.
    pub fn collect_shard(&mut self, id: &str, value: f64) -> Option<u64> {
        if !self.collected.insert(id.to_string()) {
            log::debug!("Shard {id} already collected");
            return None;
        }

        let combo = self.stats.current_combo;
        let points = scoring::shard_score(value, combo, self.modifiers.is_overclock_active());

        self.stats.shards_collected = (self.stats.shards_collected + 1).min(self.stats.total_shards);
        self.queue_event(
            EventKind::ShardCollected,
            EventData::ShardCollected {
                shard_id: id.to_string(),
                new_total: self.stats.shards_collected,
                combo_multiplier: combo_multiplier(combo),
                points,
            },
        );

        self.add_score(points);
        self.adjust_stability(stability::shard_heal(combo), StabilityReason::Heal);
        self.increment_combo();

        log::debug!(
            "Shard {id}: +{points} ({}/{})",
            self.stats.shards_collected,
            self.stats.total_shards
        );
        Some(points)
    }

    /// Combo +1, refresh the combo window
    pub fn increment_combo(&mut self) {
        let previous = self.stats.current_combo;
        self.stats.current_combo = previous.saturating_add(1);
        self.stats.max_combo = self.stats.max_combo.max(self.stats.current_combo);
        self.stats.combo_timer = self.config.combo_window;
        self.queue_event(
            EventKind::ComboIncreased,
            EventData::Combo {
                previous_combo: previous,
                new_combo: self.stats.current_combo,
                multiplier: combo_multiplier(self.stats.current_combo),
            },
        );
    }

    pub fn reset_combo(&mut self) {
        let previous = self.stats.current_combo;
        self.stats.current_combo = 0;
        self.stats.combo_timer = 0.0;
        if previous > 0 {
            self.queue_event(
                EventKind::ComboLost,
                EventData::Combo {
                    previous_combo: previous,
                    new_combo: 0,
                    multiplier: combo_multiplier(0),
                },
            );
        }
    }

    pub fn add_score(&mut self, points: u64) {
        if points == 0 {
            return;
        }
        self.stats.score = self.stats.score.saturating_add(points);
        self.queue_event(
            EventKind::ScoreUpdated,
            EventData::Score {
                score: self.stats.score,
                delta: points,
            },
        );
    }

    // --- Clock ---

    /// Advance run time; combo decays on the same clock
    pub fn update_time(&mut self, delta: f32) {
        if delta.is_nan() || delta <= 0.0 {
            return;
        }
        self.stats.time_remaining = (self.stats.time_remaining - delta).max(0.0);
        self.stats.time_elapsed += delta;

        if self.stats.combo_timer > 0.0 {
            self.stats.combo_timer = (self.stats.combo_timer - delta).max(0.0);
            if self.stats.combo_timer == 0.0 {
                self.reset_combo();
            }
        }
    }

    pub fn add_airtime(&mut self, delta: f32) {
        if delta.is_finite() && delta > 0.0 {
            self.stats.airtime += delta;
        }
    }

    pub fn update_max_speed(&mut self, speed: f32) {
        if speed.is_finite() {
            self.stats.max_speed = self.stats.max_speed.max(speed);
        }
    }

    // --- Stability ---

    /// Subtract `amount` (negative treated as zero); returns the applied loss
    pub fn damage_stability(&mut self, amount: f32, reason: StabilityReason) -> f32 {
        -self.adjust_stability(-non_negative(amount), reason)
    }

    /// Add `amount` (negative treated as zero); returns the applied gain
    pub fn heal_stability(&mut self, amount: f32) -> f32 {
        self.adjust_stability(non_negative(amount), StabilityReason::Heal)
    }

    /// Passive drain for `dt` seconds, overclock aware
    pub fn drain_stability(&mut self, dt: f32) -> f32 {
        let amount = stability::stability_drain(dt, self.modifiers.is_overclock_active());
        self.damage_stability(amount, StabilityReason::Drain)
    }

    fn adjust_stability(&mut self, delta: f32, reason: StabilityReason) -> f32 {
        let previous = self.stats.stability;
        let new = crate::clamp_finite(previous + delta, 0.0, self.stats.max_stability);
        self.stats.stability = new;
        let applied = new - previous;
        if applied != 0.0 {
            self.queue_event(
                EventKind::StabilityChanged,
                EventData::StabilityChanged {
                    previous,
                    new,
                    delta: applied,
                    reason,
                },
            );
        }
        applied
    }

    /// Count a contact; callers filter grazes before calling
    pub fn record_impact(&mut self) {
        self.stats.impact_count = self.stats.impact_count.saturating_add(1);
    }

    /// Wall or bumper hit: count it, apply tiered damage, note it on the orb
    pub fn register_impact(&mut self, force: f32) -> f32 {
        let force = non_negative(force);
        let damage = stability::impact_damage(force, self.modifiers.is_overclock_active());
        self.record_impact();
        self.orb.last_impact_time = self.stats.time_elapsed;
        self.orb.last_impact_force = force;
        self.queue_event(
            EventKind::Impact,
            EventData::Impact {
                force,
                severity: ImpactSeverity::from_force(force),
                damage,
            },
        );
        self.damage_stability(damage, StabilityReason::Impact)
    }

    /// Hazard contact: count it and apply the hazard's damage
    pub fn register_hazard(&mut self, kind: HazardKind) -> f32 {
        let damage = stability::hazard_damage(kind, self.modifiers.is_overclock_active());
        self.record_impact();
        self.orb.last_impact_time = self.stats.time_elapsed;
        self.queue_event(EventKind::HazardHit, EventData::HazardHit { kind, damage });
        self.damage_stability(damage, StabilityReason::Hazard)
    }

    // --- Orb sync ---

    /// Shallow merge of physics-reported fields
    pub fn update_orb_state(&mut self, update: OrbUpdate) {
        if let Some(position) = update.position {
            self.orb.position = position;
        }
        if let Some(velocity) = update.velocity {
            self.orb.velocity = velocity;
        }
        if let Some(speed) = update.speed {
            self.orb.speed = non_negative(speed);
            self.update_max_speed(self.orb.speed);
        }
        if let Some(grounded) = update.is_grounded {
            self.orb.is_grounded = grounded;
        }
        if let Some(inside) = update.is_in_exit_gate {
            if inside != self.orb.is_in_exit_gate {
                self.queue_event(EventKind::GateToggled, EventData::Gate { inside });
            }
            self.orb.is_in_exit_gate = inside;
        }
    }

    // --- Cooldowns ---

    pub fn start_cooldown(&mut self, ability: Ability, duration: f32) {
        self.cooldowns.start(ability, duration);
        self.queue_event(
            EventKind::CooldownStarted,
            EventData::Cooldown {
                ability,
                duration: Some(self.cooldowns.remaining(ability)),
            },
        );
    }

    /// Start the default cooldown if `ability` is ready; false when gated
    pub fn try_use_ability(&mut self, ability: Ability) -> bool {
        if !self.cooldowns.is_ready(ability) {
            return false;
        }
        self.start_cooldown(ability, ability.default_duration());
        true
    }

    pub fn is_cooldown_ready(&self, ability: Ability) -> bool {
        self.cooldowns.is_ready(ability)
    }

    pub fn tick_cooldowns(&mut self, dt: f32) {
        for ability in self.cooldowns.tick(dt) {
            self.queue_event(
                EventKind::CooldownEnded,
                EventData::Cooldown {
                    ability,
                    duration: None,
                },
            );
        }
    }

    // --- Modifiers ---

    pub fn apply_modifier(&mut self, id: ModifierId) -> bool {
        let applied = self.modifiers.apply(id);
        if applied {
            self.queue_event(EventKind::ModifierApplied, EventData::Modifier { id });
        }
        applied
    }

    pub fn remove_modifier(&mut self, id: ModifierId) -> bool {
        let removed = self.modifiers.remove(id);
        if removed {
            self.queue_event(EventKind::ModifierRemoved, EventData::Modifier { id });
        }
        removed
    }

    pub fn clear_modifiers(&mut self) {
        for id in self.modifiers.clear() {
            self.queue_event(EventKind::ModifierRemoved, EventData::Modifier { id });
        }
    }

    pub fn tick_modifiers(&mut self, dt: f32) -> Vec<ModifierEffect> {
        self.modifiers.tick(dt)
    }

    pub fn is_overclock_active(&self) -> bool {
        self.modifiers.is_overclock_active()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            stats: self.stats.clone(),
            orb: self.orb,
            cooldowns: self.cooldowns.entries().collect(),
            modifiers: self.modifiers.ids(),
            collected: self.collected.iter().cloned().collect(),
        }
    }
}

#[inline]
fn non_negative(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.max(0.0) }
}
