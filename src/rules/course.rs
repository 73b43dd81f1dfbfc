//! Seeded course layout: shard sockets, hazards, spawn and exit
//!
//! Sockets and hazard zones are fixed per level; the seed only decides which
//! sockets are used, in what order, and which zones carry a hazard.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::rng::SeededRng;
use super::stability::HazardKind;
use crate::consts::TOTAL_SHARDS;

/// Candidate shard sockets for the arena
pub const SHARD_SOCKETS: [Vec3; 16] = [
    Vec3::new(-8.0, 0.5, -10.0),
    Vec3::new(8.0, 0.5, -10.0),
    Vec3::new(-12.0, 0.5, 0.0),
    Vec3::new(12.0, 0.5, 0.0),
    Vec3::new(-8.0, 0.5, 10.0),
    Vec3::new(8.0, 0.5, 10.0),
    Vec3::new(0.0, 0.5, -15.0),
    Vec3::new(0.0, 0.5, 15.0),
    Vec3::new(-15.0, 0.5, -5.0),
    Vec3::new(15.0, 0.5, -5.0),
    Vec3::new(-15.0, 0.5, 5.0),
    Vec3::new(15.0, 0.5, 5.0),
    Vec3::new(0.0, 0.5, 0.0),
    Vec3::new(-5.0, 0.5, -5.0),
    Vec3::new(5.0, 0.5, 5.0),
    Vec3::new(-5.0, 0.5, 5.0),
];

/// Zones that may hold a hazard
pub const HAZARD_ZONES: [Vec3; 8] = [
    Vec3::new(-6.0, 0.1, -6.0),
    Vec3::new(6.0, 0.1, -6.0),
    Vec3::new(-6.0, 0.1, 6.0),
    Vec3::new(6.0, 0.1, 6.0),
    Vec3::new(0.0, 0.1, -8.0),
    Vec3::new(0.0, 0.1, 8.0),
    Vec3::new(-10.0, 0.1, 0.0),
    Vec3::new(10.0, 0.1, 0.0),
];

pub const SPAWN_POINT: Vec3 = Vec3::new(0.0, 1.0, -18.0);
pub const EXIT_POSITION: Vec3 = Vec3::new(0.0, 0.0, 18.0);

/// Default chance that a hazard zone is occupied
pub const DEFAULT_HAZARD_DENSITY: f64 = 0.5;

/// Hazard jitter half-extent (units) inside its zone
const HAZARD_JITTER: f64 = 1.0;

/// Generation knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CourseConfig {
    pub shard_count: u32,
    pub hazard_density: f64,
}

impl Default for CourseConfig {
    fn default() -> Self {
        Self {
            shard_count: TOTAL_SHARDS,
            hazard_density: DEFAULT_HAZARD_DENSITY,
        }
    }
}

/// A placed hazard
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardPlacement {
    pub kind: HazardKind,
    pub position: Vec3,
}

/// Everything the world layer needs to build a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseLayout {
    pub shard_sockets: Vec<Vec3>,
    pub hazards: Vec<HazardPlacement>,
    pub spawn_point: Vec3,
    pub exit_position: Vec3,
    pub course_length: f32,
}

impl CourseLayout {
    /// Stable shard id for a socket index (`shard-1` ...)
    pub fn shard_id(index: usize) -> String {
        format!("shard-{}", index + 1)
    }

    /// Shard count the run must collect
    pub fn total_shards(&self) -> u32 {
        self.shard_sockets.len() as u32
    }
}

/// Generate the default course for a seed
pub fn generate(seed: &str) -> CourseLayout {
    generate_with(seed, &CourseConfig::default())
}

/// Generate a course with explicit shard count and hazard density
pub fn generate_with(seed: &str, config: &CourseConfig) -> CourseLayout {
    let shard_sockets = shard_positions(seed, config.shard_count.max(1) as usize);
    let hazards = hazard_positions(seed, config.hazard_density);

    log::debug!(
        "Course {:?}: {} shards, {} hazards",
        seed,
        shard_sockets.len(),
        hazards.len()
    );

    CourseLayout {
        shard_sockets,
        hazards,
        spawn_point: SPAWN_POINT,
        exit_position: EXIT_POSITION,
        course_length: ground_distance(SPAWN_POINT, EXIT_POSITION),
    }
}

/// Shuffle the socket pool and keep the first `count`
pub fn shard_positions(seed: &str, count: usize) -> Vec<Vec3> {
    let mut rng = SeededRng::new(seed);
    let mut sockets = SHARD_SOCKETS.to_vec();
    rng.shuffle(&mut sockets);
    sockets.truncate(count.min(SHARD_SOCKETS.len()));
    sockets
}

/// Roll each hazard zone on the `-hazards` stream
pub fn hazard_positions(seed: &str, density: f64) -> Vec<HazardPlacement> {
    let mut rng = SeededRng::new(&format!("{seed}-hazards"));
    let mut hazards = Vec::new();

    for zone in HAZARD_ZONES {
        if rng.next_f64() < density {
            let kind = HazardKind::ALL[rng.index(HazardKind::ALL.len())];
            let dx = (rng.next_f64() - 0.5) * 2.0 * HAZARD_JITTER;
            let dz = (rng.next_f64() - 0.5) * 2.0 * HAZARD_JITTER;
            hazards.push(HazardPlacement {
                kind,
                position: Vec3::new(zone.x + dx as f32, zone.y, zone.z + dz as f32),
            });
        }
    }

    hazards
}

/// Reorder positions on the `-shuffle-<iteration>` stream
///
/// Depends only on (seed, iteration), never on earlier RNG use.
pub fn shuffle_positions(positions: &[Vec3], seed: &str, iteration: u32) -> Vec<Vec3> {
    let mut rng = SeededRng::new(&format!("{seed}-shuffle-{iteration}"));
    let mut shuffled = positions.to_vec();
    rng.shuffle(&mut shuffled);
    shuffled
}

/// Fraction of the spawn-to-exit axis covered by `position`, in [0, 1]
pub fn course_progress(layout: &CourseLayout, position: Vec3) -> f32 {
    if layout.course_length <= 0.0 {
        return 0.0;
    }
    let start = ground(layout.spawn_point);
    let axis = (ground(layout.exit_position) - start).normalize_or_zero();
    let travelled = (ground(position) - start).dot(axis);
    crate::clamp_finite(travelled / layout.course_length, 0.0, 1.0)
}

#[inline]
fn ground(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.z)
}

fn ground_distance(a: Vec3, b: Vec3) -> f32 {
    ground(a).distance(ground(b))
}
