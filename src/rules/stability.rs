//! Stability damage, drain and heal rules
//!
//! Pure functions. Results are clamped by the run state, never here.

use serde::{Deserialize, Serialize};

/// Damage multiplier while Overclock is live
pub const OVERCLOCK_DAMAGE_MULTIPLIER: f64 = 1.3;
/// Drain multiplier while Overclock is live
pub const OVERCLOCK_DRAIN_MULTIPLIER: f32 = 1.2;

/// Passive loss per second
pub const DRAIN_PER_SECOND: f32 = 0.5;

/// Heal for any shard pickup
pub const SHARD_HEAL: f32 = 5.0;
/// Extra heal per combo step at pickup time
pub const COMBO_HEAL_BONUS: f32 = 2.0;

/// Impact tiers by collision force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactSeverity {
    /// force < 2
    Light,
    /// 2 <= force < 5
    Medium,
    /// force >= 5
    Heavy,
}

impl ImpactSeverity {
    /// Negative and NaN forces count as zero (light)
    pub fn from_force(force: f32) -> Self {
        let force = if force.is_nan() { 0.0 } else { force.max(0.0) };
        if force < 2.0 {
            ImpactSeverity::Light
        } else if force < 5.0 {
            ImpactSeverity::Medium
        } else {
            ImpactSeverity::Heavy
        }
    }

    pub fn base_damage(&self) -> f32 {
        match self {
            ImpactSeverity::Light => 2.0,
            ImpactSeverity::Medium => 5.0,
            ImpactSeverity::Heavy => 15.0,
        }
    }
}

/// Hazard types placed on the course
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardKind {
    /// Burn line
    Burn,
    /// Router blade
    Blade,
    /// Static bumper
    Static,
}

impl HazardKind {
    pub const ALL: [HazardKind; 3] = [HazardKind::Burn, HazardKind::Blade, HazardKind::Static];

    pub fn base_damage(&self) -> f32 {
        match self {
            HazardKind::Burn => 10.0,
            HazardKind::Blade => 20.0,
            HazardKind::Static => 8.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HazardKind::Burn => "burn",
            HazardKind::Blade => "blade",
            HazardKind::Static => "static",
        }
    }
}

/// UI classification of the stability bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StabilityLevel {
    Critical,
    Low,
    Medium,
    High,
}

/// Damage for a physics impact
pub fn impact_damage(force: f32, overclock: bool) -> f32 {
    overclocked(ImpactSeverity::from_force(force).base_damage(), overclock)
}

/// Damage for touching a hazard
pub fn hazard_damage(kind: HazardKind, overclock: bool) -> f32 {
    overclocked(kind.base_damage(), overclock)
}

/// Passive drain over `dt` seconds (not floored)
pub fn stability_drain(dt: f32, overclock: bool) -> f32 {
    let dt = if dt.is_nan() { 0.0 } else { dt.max(0.0) };
    let drain = DRAIN_PER_SECOND * dt;
    if overclock {
        drain * OVERCLOCK_DRAIN_MULTIPLIER
    } else {
        drain
    }
}

/// Heal for a shard collected at `combo`
pub fn shard_heal(combo: u32) -> f32 {
    SHARD_HEAL + combo as f32 * COMBO_HEAL_BONUS
}

/// Bucket stability as a percentage of `max`
pub fn stability_level(stability: f32, max: f32) -> StabilityLevel {
    let percentage = if max > 0.0 { stability * 100.0 / max } else { 0.0 };
    if percentage <= 10.0 {
        StabilityLevel::Critical
    } else if percentage <= 25.0 {
        StabilityLevel::Low
    } else if percentage <= 50.0 {
        StabilityLevel::Medium
    } else {
        StabilityLevel::High
    }
}

/// Whether the HUD should flash a warning
pub fn should_warn(stability: f32, max: f32) -> bool {
    matches!(
        stability_level(stability, max),
        StabilityLevel::Critical | StabilityLevel::Low
    )
}

#[inline]
fn overclocked(damage: f32, overclock: bool) -> f32 {
    if overclock {
        // f64 so that 20 * 1.3 floors to 26, not 25
        (damage as f64 * OVERCLOCK_DAMAGE_MULTIPLIER).floor() as f32
    } else {
        damage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impact_tiers() {
        assert_eq!(impact_damage(0.0, false), 2.0);
        assert_eq!(impact_damage(1.99, false), 2.0);
        assert_eq!(impact_damage(2.0, false), 5.0);
        assert_eq!(impact_damage(4.99, false), 5.0);
        assert_eq!(impact_damage(5.0, false), 15.0);
    }

    #[test]
    fn test_heavy_impact_with_overclock() {
        assert_eq!(impact_damage(6.0, false), 15.0);
        assert_eq!(impact_damage(6.0, true), 19.0);
        assert_eq!(impact_damage(3.0, true), 6.0);
        assert_eq!(impact_damage(1.0, true), 2.0);
    }

    #[test]
    fn test_negative_force_is_light() {
        assert_eq!(impact_damage(-10.0, false), 2.0);
        assert_eq!(impact_damage(f32::NAN, false), 2.0);
    }

    #[test]
    fn test_hazard_damage() {
        assert_eq!(hazard_damage(HazardKind::Burn, false), 10.0);
        assert_eq!(hazard_damage(HazardKind::Blade, false), 20.0);
        assert_eq!(hazard_damage(HazardKind::Static, false), 8.0);
        assert_eq!(hazard_damage(HazardKind::Blade, true), 26.0);
        assert_eq!(hazard_damage(HazardKind::Static, true), 10.0);
    }

    #[test]
    fn test_drain() {
        assert!((stability_drain(2.0, false) - 1.0).abs() < 1e-6);
        assert!((stability_drain(2.0, true) - 1.2).abs() < 1e-6);
        assert_eq!(stability_drain(-1.0, false), 0.0);
    }

    #[test]
    fn test_shard_heal_grows_with_combo() {
        assert_eq!(shard_heal(0), 5.0);
        assert_eq!(shard_heal(3), 11.0);
    }

    #[test]
    fn test_levels() {
        assert_eq!(stability_level(10.0, 100.0), StabilityLevel::Critical);
        assert_eq!(stability_level(25.0, 100.0), StabilityLevel::Low);
        assert_eq!(stability_level(50.0, 100.0), StabilityLevel::Medium);
        assert_eq!(stability_level(50.1, 100.0), StabilityLevel::High);
        assert!(should_warn(20.0, 100.0));
        assert!(!should_warn(30.0, 100.0));
    }
}
