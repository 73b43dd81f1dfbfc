//! Rift card modifiers: the card pool, seeded draws and live instances
//!
//! Cards are static templates. Applying a card creates a
//! [`ModifierInstance`] owned by the run's [`ActiveModifiers`]; removing it
//! drops that state. Nothing here is global, so concurrent runs never share
//! modifier state.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::rng::SeededRng;

/// Modifier identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModifierId {
    LowFriction,
    GravityPulse,
    ShardShuffle,
    Overclock,
}

impl ModifierId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModifierId::LowFriction => "low-friction",
            ModifierId::GravityPulse => "gravity-pulse",
            ModifierId::ShardShuffle => "shard-shuffle",
            ModifierId::Overclock => "overclock",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "low-friction" => Some(ModifierId::LowFriction),
            "gravity-pulse" => Some(ModifierId::GravityPulse),
            "shard-shuffle" => Some(ModifierId::ShardShuffle),
            "overclock" => Some(ModifierId::Overclock),
            _ => None,
        }
    }

    pub fn card(&self) -> &'static ModCard {
        match self {
            ModifierId::LowFriction => &MODIFIER_POOL[0],
            ModifierId::GravityPulse => &MODIFIER_POOL[1],
            ModifierId::ShardShuffle => &MODIFIER_POOL[2],
            ModifierId::Overclock => &MODIFIER_POOL[3],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
}

/// Card template shown in the mod panel
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModCard {
    pub id: ModifierId,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub rarity: Rarity,
    /// Relative draw weight
    pub weight: f64,
}

/// The fixed card pool, in draw-walk order
pub static MODIFIER_POOL: [ModCard; 4] = [
    ModCard {
        id: ModifierId::LowFriction,
        name: "Oil Slick",
        description: "Random zones have reduced friction. Zones rotate every 10 seconds.",
        icon: "💧",
        rarity: Rarity::Common,
        weight: 1.0,
    },
    ModCard {
        id: ModifierId::GravityPulse,
        name: "Gravity Waves",
        description: "Gravity pulses between 60% and 140% strength every 5 seconds.",
        icon: "🌊",
        rarity: Rarity::Uncommon,
        weight: 0.8,
    },
    ModCard {
        id: ModifierId::ShardShuffle,
        name: "Quantum Flux",
        description: "Uncollected shards teleport to new positions every 15 seconds.",
        icon: "✨",
        rarity: Rarity::Uncommon,
        weight: 0.7,
    },
    ModCard {
        id: ModifierId::Overclock,
        name: "OVERCLOCK",
        description: "1.5x score multiplier, but 1.3x hazard damage and 1.2x stability drain.",
        icon: "⚡",
        rarity: Rarity::Rare,
        weight: 0.3,
    },
];

pub fn modifier_by_name(name: &str) -> Option<&'static ModCard> {
    ModifierId::from_name(name).map(|id| id.card())
}

/// Weighted draw without replacement
///
/// Reseeds on every call, so the same (seed, count) always yields the same
/// cards in the same order. `count` above the pool size is a soft cap.
pub fn draw_modifiers(seed: &str, count: usize) -> Vec<&'static ModCard> {
    let mut rng = SeededRng::new(seed);
    let mut pool: Vec<&'static ModCard> = MODIFIER_POOL.iter().collect();
    let mut drawn = Vec::with_capacity(count.min(pool.len()));

    while drawn.len() < count && !pool.is_empty() {
        let total: f64 = pool.iter().map(|card| card.weight).sum();
        let mut roll = rng.next_f64() * total;

        // Float error can leave the walk without a hit; take the last entry
        let mut picked = pool.len() - 1;
        for (i, card) in pool.iter().enumerate() {
            roll -= card.weight;
            if roll <= 0.0 {
                picked = i;
                break;
            }
        }
        drawn.push(pool.remove(picked));
    }

    drawn
}

/// Shuffled deck drawn from the top
///
/// `reset` refills and reshuffles with the RNG captured at creation, so each
/// recycle gives a new order while the whole reset sequence stays
/// reproducible from the seed.
#[derive(Debug, Clone)]
pub struct ModifierDeck {
    rng: SeededRng,
    cards: Vec<&'static ModCard>,
}

impl ModifierDeck {
    pub fn new(seed: &str) -> Self {
        let mut deck = Self {
            rng: SeededRng::new(seed),
            cards: Vec::new(),
        };
        deck.reset();
        deck
    }

    /// Take up to `count` cards off the top
    pub fn draw(&mut self, count: usize) -> Vec<&'static ModCard> {
        let n = count.min(self.cards.len());
        self.cards.drain(..n).collect()
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn reset(&mut self) {
        self.cards = MODIFIER_POOL.iter().collect();
        self.rng.shuffle(&mut self.cards);
    }
}

// ---------------------------------------------------------------------------
// Live modifier state
// ---------------------------------------------------------------------------

/// Ground friction outside oil zones
pub const DEFAULT_FRICTION: f32 = 0.6;
/// Ground friction inside an oil zone
pub const LOW_FRICTION_VALUE: f32 = 0.15;
const FRICTION_ROTATION_INTERVAL: f32 = 10.0;
const SHUFFLE_INTERVAL: f32 = 15.0;
/// Seconds before a shuffle that the HUD starts warning
const SHUFFLE_WARNING: f32 = 3.0;

/// Circular low-friction patch on the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrictionZone {
    pub x: f32,
    pub z: f32,
    pub radius: f32,
}

impl FrictionZone {
    pub fn contains(&self, x: f32, z: f32) -> bool {
        Vec2::new(x - self.x, z - self.z).length() < self.radius
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowFrictionState {
    pub zones: Vec<FrictionZone>,
    pub rotation_timer: f32,
}

impl Default for LowFrictionState {
    fn default() -> Self {
        Self {
            zones: vec![
                FrictionZone {
                    x: -5.0,
                    z: -5.0,
                    radius: 3.0,
                },
                FrictionZone {
                    x: 5.0,
                    z: 5.0,
                    radius: 3.0,
                },
            ],
            rotation_timer: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GravityPulseState {
    pub phase_timer: f32,
    pub cycle_time: f32,
    pub min_multiplier: f32,
    pub max_multiplier: f32,
    pub current_multiplier: f32,
}

impl Default for GravityPulseState {
    fn default() -> Self {
        Self {
            phase_timer: 0.0,
            cycle_time: 5.0,
            min_multiplier: 0.6,
            max_multiplier: 1.4,
            current_multiplier: 1.0,
        }
    }
}

impl GravityPulseState {
    /// Position in the current cycle, in [0, 1)
    pub fn phase(&self) -> f32 {
        (self.phase_timer % self.cycle_time) / self.cycle_time
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardShuffleState {
    pub shuffle_timer: f32,
    pub shuffle_interval: f32,
    pub shuffle_count: u32,
}

impl Default for ShardShuffleState {
    fn default() -> Self {
        Self {
            shuffle_timer: 0.0,
            shuffle_interval: SHUFFLE_INTERVAL,
            shuffle_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverclockState {
    pub score_multiplier: f32,
    pub hazard_multiplier: f32,
    pub drain_multiplier: f32,
    pub visual_intensity: f32,
}

impl Default for OverclockState {
    fn default() -> Self {
        Self {
            score_multiplier: 1.5,
            hazard_multiplier: 1.3,
            drain_multiplier: 1.2,
            visual_intensity: 1.5,
        }
    }
}

/// Live state for one applied modifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ModifierInstance {
    LowFriction(LowFrictionState),
    GravityPulse(GravityPulseState),
    ShardShuffle(ShardShuffleState),
    Overclock(OverclockState),
}

/// Side effects a modifier asks the run to carry out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModifierEffect {
    /// Relocate uncollected shards using this shuffle round
    ShuffleShards { iteration: u32 },
    /// Oil zones moved
    FrictionZonesRotated,
}

impl ModifierInstance {
    pub fn new(id: ModifierId) -> Self {
        match id {
            ModifierId::LowFriction => ModifierInstance::LowFriction(LowFrictionState::default()),
            ModifierId::GravityPulse => {
                ModifierInstance::GravityPulse(GravityPulseState::default())
            }
            ModifierId::ShardShuffle => {
                ModifierInstance::ShardShuffle(ShardShuffleState::default())
            }
            ModifierId::Overclock => ModifierInstance::Overclock(OverclockState::default()),
        }
    }

    pub fn id(&self) -> ModifierId {
        match self {
            ModifierInstance::LowFriction(_) => ModifierId::LowFriction,
            ModifierInstance::GravityPulse(_) => ModifierId::GravityPulse,
            ModifierInstance::ShardShuffle(_) => ModifierId::ShardShuffle,
            ModifierInstance::Overclock(_) => ModifierId::Overclock,
        }
    }

    /// Advance timers; returns an effect when one fires
    pub fn tick(&mut self, dt: f32) -> Option<ModifierEffect> {
        match self {
            ModifierInstance::LowFriction(state) => {
                state.rotation_timer += dt;
                if state.rotation_timer >= FRICTION_ROTATION_INTERVAL {
                    state.rotation_timer = 0.0;
                    // Quarter turn about the arena centre
                    for zone in &mut state.zones {
                        let (x, z) = (zone.x, zone.z);
                        zone.x = -z;
                        zone.z = x;
                    }
                    log::debug!("Low friction zones rotated");
                    return Some(ModifierEffect::FrictionZonesRotated);
                }
                None
            }
            ModifierInstance::GravityPulse(state) => {
                state.phase_timer += dt;
                let phase = state.phase_timer / state.cycle_time * std::f32::consts::TAU;
                let t = (phase.sin() + 1.0) / 2.0;
                state.current_multiplier =
                    state.min_multiplier + (state.max_multiplier - state.min_multiplier) * t;
                None
            }
            ModifierInstance::ShardShuffle(state) => {
                state.shuffle_timer += dt;
                if state.shuffle_timer >= state.shuffle_interval {
                    state.shuffle_timer = 0.0;
                    state.shuffle_count += 1;
                    log::debug!("Shard shuffle #{}", state.shuffle_count);
                    return Some(ModifierEffect::ShuffleShards {
                        iteration: state.shuffle_count,
                    });
                }
                None
            }
            ModifierInstance::Overclock(_) => None,
        }
    }
}

/// Modifiers live in the current run, in application order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveModifiers {
    instances: Vec<ModifierInstance>,
}

impl ActiveModifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create live state for `id`; rejects a second live instance
    pub fn apply(&mut self, id: ModifierId) -> bool {
        if self.is_active(id) {
            log::warn!("Modifier {} already active, ignoring apply", id.as_str());
            return false;
        }
        self.instances.push(ModifierInstance::new(id));
        log::info!("{} modifier applied", id.card().name);
        true
    }

    /// Drop live state for `id`; false if it was not active
    pub fn remove(&mut self, id: ModifierId) -> bool {
        let before = self.instances.len();
        self.instances.retain(|m| m.id() != id);
        let removed = self.instances.len() != before;
        if removed {
            log::info!("{} modifier removed", id.card().name);
        }
        removed
    }

    /// Remove everything, returning the ids that were live
    pub fn clear(&mut self) -> Vec<ModifierId> {
        self.instances.drain(..).map(|m| m.id()).collect()
    }

    pub fn is_active(&self, id: ModifierId) -> bool {
        self.instances.iter().any(|m| m.id() == id)
    }

    pub fn ids(&self) -> Vec<ModifierId> {
        self.instances.iter().map(|m| m.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, id: ModifierId) -> Option<&ModifierInstance> {
        self.instances.iter().find(|m| m.id() == id)
    }

    /// Tick every live modifier in application order
    pub fn tick(&mut self, dt: f32) -> Vec<ModifierEffect> {
        if dt.is_nan() || dt <= 0.0 {
            return Vec::new();
        }
        self.instances
            .iter_mut()
            .filter_map(|m| m.tick(dt))
            .collect()
    }

    // --- Queries used by rules and presentation ---

    pub fn overclock(&self) -> Option<&OverclockState> {
        self.instances.iter().find_map(|m| match m {
            ModifierInstance::Overclock(state) => Some(state),
            _ => None,
        })
    }

    pub fn is_overclock_active(&self) -> bool {
        self.overclock().is_some()
    }

    pub fn visual_intensity(&self) -> f32 {
        self.overclock().map_or(1.0, |s| s.visual_intensity)
    }

    fn gravity_pulse(&self) -> Option<&GravityPulseState> {
        self.instances.iter().find_map(|m| match m {
            ModifierInstance::GravityPulse(state) => Some(state),
            _ => None,
        })
    }

    pub fn gravity_multiplier(&self) -> f32 {
        self.gravity_pulse().map_or(1.0, |s| s.current_multiplier)
    }

    pub fn gravity_phase(&self) -> f32 {
        self.gravity_pulse().map_or(0.0, |s| s.phase())
    }

    pub fn is_gravity_increasing(&self) -> bool {
        self.gravity_phase() < 0.5
    }

    pub fn low_friction_zones(&self) -> &[FrictionZone] {
        self.instances
            .iter()
            .find_map(|m| match m {
                ModifierInstance::LowFriction(state) => Some(state.zones.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn is_in_low_friction_zone(&self, x: f32, z: f32) -> bool {
        self.low_friction_zones().iter().any(|zone| zone.contains(x, z))
    }

    /// Ground friction the physics layer should use at (x, z)
    pub fn friction_at(&self, x: f32, z: f32) -> f32 {
        if self.is_in_low_friction_zone(x, z) {
            LOW_FRICTION_VALUE
        } else {
            DEFAULT_FRICTION
        }
    }

    fn shard_shuffle(&self) -> Option<&ShardShuffleState> {
        self.instances.iter().find_map(|m| match m {
            ModifierInstance::ShardShuffle(state) => Some(state),
            _ => None,
        })
    }

    /// Seconds until the next shuffle, `None` when Quantum Flux is not live
    pub fn time_until_shuffle(&self) -> Option<f32> {
        self.shard_shuffle()
            .map(|s| s.shuffle_interval - s.shuffle_timer)
    }

    pub fn shuffle_count(&self) -> u32 {
        self.shard_shuffle().map_or(0, |s| s.shuffle_count)
    }

    pub fn is_shuffle_imminent(&self) -> bool {
        self.time_until_shuffle()
            .is_some_and(|t| t < SHUFFLE_WARNING)
    }
}
