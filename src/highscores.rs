//! High score leaderboard
//!
//! Top 10 finished runs, best first. Persisted inside the player profile.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::persistence::PersistedData;
use crate::platform::Device;
use crate::rules::{Rank, RunSnapshot};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighScoreEntry {
    pub score: u64,
    pub rank: Rank,
    pub seed: String,
    pub device: Device,
    /// `YYYY-MM-DD` the run finished
    pub date: String,
    pub shards_collected: u32,
    pub time_remaining: f32,
}

impl HighScoreEntry {
    /// Entry for a finished run
    pub fn from_snapshot(snapshot: &RunSnapshot, seed: &str, device: Device, date: NaiveDate) -> Self {
        let stats = &snapshot.stats;
        Self {
            score: snapshot.final_score(),
            rank: snapshot.final_rank(),
            seed: seed.to_owned(),
            device,
            date: date.format("%Y-%m-%d").to_string(),
            shards_collected: stats.shards_collected,
            time_remaining: stats.time_remaining,
        }
    }
}

/// High score leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct HighScores {
    entries: Vec<HighScoreEntry>,
}

impl HighScores {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[HighScoreEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if a score would make the board
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Position a score would take (1-indexed, None if it doesn't qualify)
    pub fn potential_position(&self, score: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let pos = self.entries.iter().position(|e| score > e.score);
        Some(pos.unwrap_or(self.entries.len()) + 1)
    }

    /// Insert an entry, keeping the board sorted and capped
    ///
    /// Returns the 1-indexed position achieved, or None if it didn't qualify.
    pub fn add(&mut self, entry: HighScoreEntry) -> Option<usize> {
        let position = self.potential_position(entry.score)?;
        self.entries.insert(position - 1, entry);
        self.entries.truncate(MAX_HIGH_SCORES);
        Some(position)
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    pub fn personal_best(&self) -> Option<&HighScoreEntry> {
        self.entries.first()
    }

    /// Restore ordering and cap after loading untrusted data
    pub fn normalize(&mut self) {
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        self.entries.truncate(MAX_HIGH_SCORES);
    }

    pub fn load() -> Self {
        PersistedData::load().high_scores
    }

    /// Record an entry in the saved profile; returns the position achieved
    pub fn submit(entry: HighScoreEntry) -> Option<usize> {
        let mut position = None;
        let result = PersistedData::update(|data| position = data.high_scores.add(entry));
        match result {
            Ok(data) => {
                log::info!("High scores saved ({} entries)", data.high_scores.len());
                position
            }
            Err(err) => {
                log::warn!("Failed to save high score: {err}");
                None
            }
        }
    }
}

/// Format a record date relative to `today`
pub fn format_date(date: &str, today: NaiveDate) -> String {
    let Ok(date) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else {
        return "N/A".to_string();
    };
    match (today - date).num_days() {
        days if days <= 0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        days @ 2..=6 => format!("{} days ago", days),
        _ => format!("{}/{}/{:02}", date.month(), date.day(), date.year() % 100),
    }
}
