//! Combo multipliers, shard scoring, final score and ranks

use serde::{Deserialize, Serialize};

use super::state::RunStats;
use crate::consts::SHARD_BASE_SCORE;

/// Multiplier per combo count (clamped to the last entry)
pub const COMBO_MULTIPLIERS: [f64; 7] = [1.0, 1.0, 1.2, 1.5, 2.0, 2.5, 3.0];

pub const SHARD_POINTS: i64 = 100;
pub const TIME_BONUS_PER_SECOND: i64 = 10;
pub const COMBO_BONUS: i64 = 200;
pub const DAMAGE_PENALTY: i64 = -50;
pub const AIRTIME_BONUS: i64 = 5;
pub const OVERCLOCK_SCORE_MULTIPLIER: f64 = 1.5;

/// Medal for a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Rank {
    pub const ALL: [Rank; 4] = [Rank::Bronze, Rank::Silver, Rank::Gold, Rank::Platinum];

    /// Score needed for this rank (bronze is also the floor)
    pub fn threshold(&self) -> u64 {
        match self {
            Rank::Bronze => 1000,
            Rank::Silver => 2500,
            Rank::Gold => 5000,
            Rank::Platinum => 8000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Bronze => "bronze",
            Rank::Silver => "silver",
            Rank::Gold => "gold",
            Rank::Platinum => "platinum",
        }
    }

    /// Single-letter code used in share links
    pub fn code(&self) -> char {
        match self {
            Rank::Bronze => 'b',
            Rank::Silver => 's',
            Rank::Gold => 'g',
            Rank::Platinum => 'p',
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "b" => Some(Rank::Bronze),
            "s" => Some(Rank::Silver),
            "g" => Some(Rank::Gold),
            "p" => Some(Rank::Platinum),
            _ => None,
        }
    }
}

/// Highest rank whose threshold the score meets, else bronze
pub fn rank_for_score(score: u64) -> Rank {
    [Rank::Platinum, Rank::Gold, Rank::Silver]
        .into_iter()
        .find(|rank| score >= rank.threshold())
        .unwrap_or(Rank::Bronze)
}

/// Inputs to the end-of-run tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreInput {
    pub shards_collected: u32,
    pub time_remaining: f32,
    pub max_combo: u32,
    pub impact_count: u32,
    pub airtime: f32,
}

impl From<&RunStats> for ScoreInput {
    fn from(stats: &RunStats) -> Self {
        Self {
            shards_collected: stats.shards_collected,
            time_remaining: stats.time_remaining,
            max_combo: stats.max_combo,
            impact_count: stats.impact_count,
            airtime: stats.airtime,
        }
    }
}

/// Itemized tally for the results screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub shard_points: i64,
    pub time_bonus: i64,
    pub combo_bonus: i64,
    /// Positive amount subtracted for impacts
    pub damage_penalty: i64,
    pub airtime_bonus: i64,
    pub overclock_bonus: i64,
    pub total: u64,
}

pub fn combo_multiplier(combo: u32) -> f64 {
    let index = (combo as usize).min(COMBO_MULTIPLIERS.len() - 1);
    COMBO_MULTIPLIERS[index]
}

/// Points for one shard at the given combo
pub fn shard_score(base: f64, combo: u32, overclock: bool) -> u64 {
    let base = if base.is_finite() { base.max(0.0) } else { 0.0 };
    let mut score = (base * combo_multiplier(combo)).floor();
    if overclock {
        score = (score * OVERCLOCK_SCORE_MULTIPLIER).floor();
    }
    score as u64
}

/// Shard score with the default base value
pub fn default_shard_score(combo: u32, overclock: bool) -> u64 {
    shard_score(SHARD_BASE_SCORE, combo, overclock)
}

/// End-of-run score, never negative
pub fn final_score(input: &ScoreInput, overclock: bool) -> u64 {
    let mut total = subtotal(input) as f64;
    if overclock {
        total = (total * OVERCLOCK_SCORE_MULTIPLIER).floor();
    }
    total.max(0.0) as u64
}

/// Score delta for a single impact, by force band
pub fn impact_penalty(force: f32) -> i64 {
    if force < 2.0 {
        (DAMAGE_PENALTY as f64 * 0.5).floor() as i64
    } else if force > 5.0 {
        (DAMAGE_PENALTY as f64 * 1.5).floor() as i64
    } else {
        DAMAGE_PENALTY
    }
}

/// Itemized version of [`final_score`]
pub fn score_breakdown(input: &ScoreInput, overclock: bool) -> ScoreBreakdown {
    let subtotal = subtotal(input);
    let overclock_bonus = if overclock {
        (subtotal as f64 * (OVERCLOCK_SCORE_MULTIPLIER - 1.0)).floor() as i64
    } else {
        0
    };

    ScoreBreakdown {
        shard_points: shard_points(input),
        time_bonus: time_bonus(input),
        combo_bonus: input.max_combo as i64 * COMBO_BONUS,
        damage_penalty: input.impact_count as i64 * DAMAGE_PENALTY.abs(),
        airtime_bonus: airtime_bonus(input),
        overclock_bonus,
        total: (subtotal + overclock_bonus).max(0) as u64,
    }
}

fn subtotal(input: &ScoreInput) -> i64 {
    shard_points(input)
        + time_bonus(input)
        + input.max_combo as i64 * COMBO_BONUS
        + input.impact_count as i64 * DAMAGE_PENALTY
        + airtime_bonus(input)
}

fn shard_points(input: &ScoreInput) -> i64 {
    input.shards_collected as i64 * SHARD_POINTS
}

fn time_bonus(input: &ScoreInput) -> i64 {
    whole_seconds(input.time_remaining) * TIME_BONUS_PER_SECOND
}

fn airtime_bonus(input: &ScoreInput) -> i64 {
    whole_seconds(input.airtime) * AIRTIME_BONUS
}

#[inline]
fn whole_seconds(seconds: f32) -> i64 {
    if seconds.is_finite() {
        seconds.max(0.0).floor() as i64
    } else {
        0
    }
}
