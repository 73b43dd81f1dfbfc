//! Per-ability cooldown countdowns

use serde::{Deserialize, Serialize};

/// Abilities gated by a cooldown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ability {
    /// Ping impulse (mobile tap, also used by swipe)
    Tap,
    /// Brake field (mobile)
    DoubleTap,
    /// Gravity stabilize (mobile)
    LongPress,
    /// Pulse impulse (desktop SPACE)
    Pulse,
    /// Brake (desktop SHIFT)
    Brake,
    /// Painted vector field (desktop drag)
    VectorField,
}

impl Ability {
    pub const ALL: [Ability; 6] = [
        Ability::Tap,
        Ability::DoubleTap,
        Ability::LongPress,
        Ability::Pulse,
        Ability::Brake,
        Ability::VectorField,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Ability::Tap => "tap",
            Ability::DoubleTap => "double-tap",
            Ability::LongPress => "long-press",
            Ability::Pulse => "pulse",
            Ability::Brake => "brake",
            Ability::VectorField => "vector-field",
        }
    }

    /// Accepts kebab-case and the camelCase keys older clients send
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "tap" => Some(Ability::Tap),
            "double-tap" | "doubleTap" => Some(Ability::DoubleTap),
            "long-press" | "longPress" => Some(Ability::LongPress),
            "pulse" => Some(Ability::Pulse),
            "brake" => Some(Ability::Brake),
            "vector-field" | "vectorField" => Some(Ability::VectorField),
            _ => None,
        }
    }

    /// Standard cooldown after use (seconds)
    pub fn default_duration(&self) -> f32 {
        match self {
            Ability::Tap => 2.0,
            Ability::DoubleTap => 6.0,
            Ability::LongPress => 10.0,
            Ability::Pulse => 2.5,
            Ability::Brake => 0.1,
            Ability::VectorField => 8.0,
        }
    }

    #[inline]
    fn slot(self) -> usize {
        self as usize
    }
}

/// Remaining seconds per ability; 0 means ready
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CooldownTracker {
    remaining: [f32; 6],
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the remaining time (overwrites, does not stack)
    pub fn start(&mut self, ability: Ability, duration: f32) {
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        self.remaining[ability.slot()] = duration;
    }

    /// Advance every cooldown; returns abilities that became ready this tick
    pub fn tick(&mut self, dt: f32) -> Vec<Ability> {
        if dt.is_nan() || dt <= 0.0 {
            return Vec::new();
        }
        let mut ended = Vec::new();
        for ability in Ability::ALL {
            let slot = &mut self.remaining[ability.slot()];
            if *slot > 0.0 {
                *slot = (*slot - dt).max(0.0);
                if *slot == 0.0 {
                    ended.push(ability);
                }
            }
        }
        ended
    }

    pub fn is_ready(&self, ability: Ability) -> bool {
        self.remaining[ability.slot()] <= 0.0
    }

    pub fn remaining(&self, ability: Ability) -> f32 {
        self.remaining[ability.slot()]
    }

    /// Recharge fraction against the default duration (1.0 = ready)
    pub fn progress(&self, ability: Ability) -> f32 {
        let max = ability.default_duration();
        if self.is_ready(ability) || max <= 0.0 {
            return 1.0;
        }
        ((max - self.remaining(ability)) / max).clamp(0.0, 1.0)
    }

    /// Unknown names are never ready
    pub fn is_ready_named(&self, name: &str) -> bool {
        match Ability::from_name(name) {
            Some(ability) => self.is_ready(ability),
            None => {
                log::warn!("Unknown ability {name:?}, treating as not ready");
                false
            }
        }
    }

    /// Start by name; unknown names are ignored and return false
    pub fn start_named(&mut self, name: &str, duration: f32) -> bool {
        match Ability::from_name(name) {
            Some(ability) => {
                self.start(ability, duration);
                true
            }
            None => {
                log::warn!("Unknown ability {name:?}, cooldown not started");
                false
            }
        }
    }

    pub fn reset(&mut self) {
        self.remaining = [0.0; 6];
    }

    /// (ability, remaining) pairs for snapshots
    pub fn entries(&self) -> impl Iterator<Item = (Ability, f32)> + '_ {
        Ability::ALL.into_iter().map(|a| (a, self.remaining(a)))
    }
}
