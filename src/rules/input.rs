//! Normalized input inbox
//!
//! Keyboard, touch, orientation and physics all write into one
//! [`InputInbox`]; the tick driver takes a single [`InputFrame`] per tick.
//! Tilt is last-write-wins and persists between frames; discrete inputs are
//! consumed with the frame.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::cooldown::Ability;
use super::stability::HazardKind;
use super::state::OrbUpdate;
use crate::clamp_tilt;
use crate::consts::GRAVITY;
use crate::settings::Settings;

/// Degrees of tilt ignored around the calibrated rest pose
pub const ORIENTATION_DEAD_ZONE: f32 = 3.0;
/// Degrees of tilt that map to full deflection
pub const MAX_TILT_DEGREES: f32 = 28.0;
/// EMA factor for orientation smoothing
pub const TILT_SMOOTHING: f32 = 0.12;

/// Touch gestures after recognition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gesture", rename_all = "kebab-case")]
pub enum Gesture {
    Tap,
    DoubleTap,
    LongPress,
    Swipe { direction: Vec2 },
}

impl Gesture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gesture::Tap => "tap",
            Gesture::DoubleTap => "double-tap",
            Gesture::LongPress => "long-press",
            Gesture::Swipe { .. } => "swipe",
        }
    }

    /// Cooldown slot gating this gesture (swipe shares the tap slot)
    pub fn ability(&self) -> Ability {
        match self {
            Gesture::Tap | Gesture::Swipe { .. } => Ability::Tap,
            Gesture::DoubleTap => Ability::DoubleTap,
            Gesture::LongPress => Ability::LongPress,
        }
    }
}

/// What the orb touched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContactKind {
    Wall,
    Bumper,
    Hazard { hazard: HazardKind },
    Shard { id: String },
    Gate { inside: bool },
    Plate,
}

/// Physics contact reported for this tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactEvent {
    pub kind: ContactKind,
    pub position: Vec3,
    /// Relative collision speed
    pub force: f32,
}

impl ContactEvent {
    pub fn new(kind: ContactKind, position: Vec3, force: f32) -> Self {
        Self {
            kind,
            position,
            force,
        }
    }
}

/// Held direction keys (WASD or arrows)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionKeys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// Keyboard tilt; diagonals are normalized to unit length
pub fn tilt_from_keys(keys: DirectionKeys) -> Vec2 {
    let axis = |neg: bool, pos: bool| (pos as i8 - neg as i8) as f32;
    Vec2::new(axis(keys.left, keys.right), axis(keys.down, keys.up)).normalize_or_zero()
}

/// Rest pose captured by the calibrate button
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub beta: f32,
    pub gamma: f32,
}

/// Dead zone, normalize by max tilt, then cubic easing
pub fn normalize_axis(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let adjusted = crate::deadzone(degrees, ORIENTATION_DEAD_ZONE);
    let normalized = (adjusted / MAX_TILT_DEGREES).clamp(-1.0, 1.0);
    normalized.signum() * normalized.abs().powi(3)
}

/// Device orientation (degrees) to tilt
///
/// `gamma` (left/right) drives x, `beta` (front/back) drives y. Sensitivity
/// can push an axis past 1; the result is clamped back into range.
pub fn tilt_from_orientation(
    beta: f32,
    gamma: f32,
    calibration: Calibration,
    settings: &Settings,
) -> Vec2 {
    let mut x = normalize_axis(gamma - calibration.gamma) * settings.tilt_sensitivity;
    let mut y = normalize_axis(beta - calibration.beta) * settings.tilt_sensitivity;
    if settings.invert_tilt_x {
        x = -x;
    }
    if settings.invert_tilt_y {
        y = -y;
    }
    clamp_tilt(Vec2::new(x, y))
}

/// Exponential smoothing for jittery orientation sensors
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TiltSmoother {
    value: Vec2,
}

impl TiltSmoother {
    pub fn update(&mut self, target: Vec2) -> Vec2 {
        self.value = self.value.lerp(clamp_tilt(target), TILT_SMOOTHING);
        self.value
    }

    pub fn value(&self) -> Vec2 {
        self.value
    }
}

/// Gravity request for the physics layer
pub fn gravity_for_tilt(tilt: Vec2, multiplier: f32) -> Vec3 {
    let tilt = clamp_tilt(tilt);
    Vec3::new(tilt.x * GRAVITY, -GRAVITY, tilt.y * GRAVITY) * multiplier
}

/// A painted stroke on the ground plane (x, z)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorStroke {
    pub start: Vec2,
    pub end: Vec2,
}

/// Everything the host hands the rules for one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputFrame {
    pub tilt: Vec2,
    pub gestures: Vec<Gesture>,
    pub pulse: bool,
    pub brake: bool,
    pub vector_field: Option<VectorStroke>,
    pub contacts: Vec<ContactEvent>,
    pub orb: Option<OrbUpdate>,
    /// Seconds the orb spent airborne this tick
    pub airtime: f32,
}

#[derive(Debug, Clone, Default)]
pub struct InputInbox {
    tilt: Vec2,
    frame: InputFrame,
}

impl InputInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write before `take` wins
    pub fn set_tilt(&mut self, tilt: Vec2) {
        self.tilt = clamp_tilt(tilt);
    }

    pub fn tilt(&self) -> Vec2 {
        self.tilt
    }

    pub fn push_gesture(&mut self, gesture: Gesture) {
        self.frame.gestures.push(gesture);
    }

    pub fn press_pulse(&mut self) {
        self.frame.pulse = true;
    }

    pub fn press_brake(&mut self) {
        self.frame.brake = true;
    }

    /// Later strokes in the same tick replace earlier ones
    pub fn paint_vector_field(&mut self, stroke: VectorStroke) {
        self.frame.vector_field = Some(stroke);
    }

    pub fn push_contact(&mut self, contact: ContactEvent) {
        self.frame.contacts.push(contact);
    }

    pub fn sync_orb(&mut self, update: OrbUpdate) {
        match &mut self.frame.orb {
            Some(pending) => pending.merge(update),
            None => self.frame.orb = Some(update),
        }
    }

    pub fn add_airtime(&mut self, seconds: f32) {
        if seconds.is_finite() && seconds > 0.0 {
            self.frame.airtime += seconds;
        }
    }

    /// Consume this tick's frame
    pub fn take(&mut self) -> InputFrame {
        let mut frame = std::mem::take(&mut self.frame);
        frame.tilt = self.tilt;
        frame
    }

    /// Drop pending input and level the tilt (focus loss, pause)
    pub fn clear(&mut self) {
        self.tilt = Vec2::ZERO;
        self.frame = InputFrame::default();
    }
}

// ---------------------------------------------------------------------------
// Painted vector fields
// ---------------------------------------------------------------------------

pub const FIELD_DURATION: f32 = 2.0;
pub const FIELD_STRENGTH: f32 = 3.0;
pub const FIELD_FALLOFF: f32 = 3.0;
pub const MAX_PAINT_LENGTH: f32 = 10.0;

/// A live wind field pushing along its stroke
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorField {
    pub start: Vec2,
    pub end: Vec2,
    pub remaining: f32,
}

impl VectorField {
    /// Strokes longer than [`MAX_PAINT_LENGTH`] are cut; zero-length strokes are rejected
    pub fn from_stroke(stroke: VectorStroke) -> Option<Self> {
        let delta = stroke.end - stroke.start;
        let length = delta.length();
        if !length.is_finite() || length <= f32::EPSILON {
            return None;
        }
        let end = stroke.start + delta / length * length.min(MAX_PAINT_LENGTH);
        Some(Self {
            start: stroke.start,
            end,
            remaining: FIELD_DURATION,
        })
    }

    pub fn direction(&self) -> Vec2 {
        (self.end - self.start).normalize_or_zero()
    }

    /// Push on a ground point, fading linearly to zero at the falloff radius
    pub fn force_at(&self, point: Vec2) -> Vec2 {
        let segment = self.end - self.start;
        let t = if segment.length_squared() > 0.0 {
            ((point - self.start).dot(segment) / segment.length_squared()).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let closest = self.start + segment * t;
        let falloff = (1.0 - point.distance(closest) / FIELD_FALLOFF).max(0.0);
        self.direction() * FIELD_STRENGTH * falloff
    }

    /// Count down; false once expired
    pub fn tick(&mut self, dt: f32) -> bool {
        if dt.is_finite() && dt > 0.0 {
            self.remaining = (self.remaining - dt).max(0.0);
        }
        self.remaining > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_normalize_diagonals() {
        let keys = DirectionKeys {
            up: true,
            right: true,
            ..Default::default()
        };
        let tilt = tilt_from_keys(keys);
        assert!((tilt.length() - 1.0).abs() < 1e-6);
        assert!(tilt.x > 0.0 && tilt.y > 0.0);

        let opposed = DirectionKeys {
            left: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(tilt_from_keys(opposed), Vec2::ZERO);
    }

    #[test]
    fn test_orientation_dead_zone_and_easing() {
        assert_eq!(normalize_axis(2.9), 0.0);
        assert_eq!(normalize_axis(-2.9), 0.0);
        assert_eq!(normalize_axis(31.0), 1.0);
        assert_eq!(normalize_axis(-90.0), -1.0);
        // Half deflection eases to one eighth
        assert!((normalize_axis(17.0) - 0.125).abs() < 1e-6);
        assert_eq!(normalize_axis(f32::NAN), 0.0);
    }

    #[test]
    fn test_orientation_settings() {
        let mut settings = Settings::default();
        let rest = Calibration {
            beta: 10.0,
            gamma: 0.0,
        };
        assert_eq!(tilt_from_orientation(10.0, 0.0, rest, &settings), Vec2::ZERO);

        settings.invert_tilt_x = true;
        settings.tilt_sensitivity = 2.0;
        let tilt = tilt_from_orientation(10.0, 17.0, rest, &settings);
        assert!((tilt.x + 0.25).abs() < 1e-6);
        assert_eq!(tilt.y, 0.0);

        let full = tilt_from_orientation(90.0, 0.0, rest, &settings);
        assert_eq!(full.y, 1.0);
    }

    #[test]
    fn test_smoother_converges() {
        let mut smoother = TiltSmoother::default();
        let first = smoother.update(Vec2::X);
        assert!((first.x - TILT_SMOOTHING).abs() < 1e-6);
        for _ in 0..200 {
            smoother.update(Vec2::X);
        }
        assert!((smoother.value().x - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_gravity_for_tilt() {
        assert_eq!(gravity_for_tilt(Vec2::ZERO, 1.0), Vec3::new(0.0, -9.8, 0.0));
        let g = gravity_for_tilt(Vec2::new(1.0, -0.5), 2.0);
        assert!((g - Vec3::new(19.6, -19.6, -9.8)).length() < 1e-4);
    }

    #[test]
    fn test_inbox_last_tilt_wins_and_persists() {
        let mut inbox = InputInbox::new();
        inbox.set_tilt(Vec2::new(0.2, 0.0));
        inbox.set_tilt(Vec2::new(-3.0, 0.5));
        inbox.press_pulse();
        inbox.push_gesture(Gesture::Tap);

        let frame = inbox.take();
        assert_eq!(frame.tilt, Vec2::new(-1.0, 0.5));
        assert!(frame.pulse);
        assert_eq!(frame.gestures, vec![Gesture::Tap]);

        let next = inbox.take();
        assert_eq!(next.tilt, Vec2::new(-1.0, 0.5));
        assert!(!next.pulse);
        assert!(next.gestures.is_empty());
    }

    #[test]
    fn test_inbox_merges_orb_syncs() {
        let mut inbox = InputInbox::new();
        inbox.sync_orb(OrbUpdate {
            speed: Some(1.0),
            is_grounded: Some(false),
            ..Default::default()
        });
        inbox.sync_orb(OrbUpdate {
            speed: Some(4.0),
            ..Default::default()
        });
        let orb = inbox.take().orb.unwrap_or_default();
        assert_eq!(orb.speed, Some(4.0));
        assert_eq!(orb.is_grounded, Some(false));
    }

    #[test]
    fn test_swipe_shares_tap_cooldown() {
        let swipe = Gesture::Swipe {
            direction: Vec2::X,
        };
        assert_eq!(swipe.ability(), Ability::Tap);
        assert_eq!(Gesture::LongPress.ability(), Ability::LongPress);
    }

    #[test]
    fn test_vector_field_force() {
        let field = VectorField::from_stroke(VectorStroke {
            start: Vec2::ZERO,
            end: Vec2::new(4.0, 0.0),
        })
        .expect("valid stroke");
        assert_eq!(field.force_at(Vec2::new(2.0, 0.0)), Vec2::new(3.0, 0.0));
        let side = field.force_at(Vec2::new(2.0, 1.5));
        assert!((side.x - 1.5).abs() < 1e-6);
        assert_eq!(field.force_at(Vec2::new(2.0, 5.0)), Vec2::ZERO);
        // Past the end, distance is measured to the endpoint
        assert!(field.force_at(Vec2::new(8.0, 0.0)).x == 0.0);
    }

    #[test]
    fn test_vector_field_limits() {
        assert!(
            VectorField::from_stroke(VectorStroke {
                start: Vec2::ONE,
                end: Vec2::ONE,
            })
            .is_none()
        );
        let long = VectorField::from_stroke(VectorStroke {
            start: Vec2::ZERO,
            end: Vec2::new(0.0, 25.0),
        })
        .expect("valid stroke");
        assert!((long.end.y - MAX_PAINT_LENGTH).abs() < 1e-5);

        let mut field = long;
        assert!(field.tick(1.0));
        assert!(!field.tick(1.0));
    }
}
