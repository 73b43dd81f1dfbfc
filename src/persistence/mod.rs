//! Persisted player profile
//!
//! Features:
//! - Versioned JSON envelope under a single storage key
//! - Missing fields merged with defaults on load
//! - Corrupt saves fall back to defaults instead of failing

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::highscores::{HighScoreEntry, HighScores};
use crate::platform::storage;
use crate::settings::Settings;
use crate::Result;

pub const STORAGE_KEY: &str = "tilt-rift-data";

/// Keys written by older builds that split the profile up
const LEGACY_KEYS: [&str; 2] = ["tilt-rift-settings", "tilt-rift-high-scores"];

pub const DATA_VERSION: u32 = 1;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedData {
    pub version: u32,
    pub settings: Settings,
    pub high_scores: HighScores,
    pub completed_runs: u32,
    pub has_seen_tutorial: bool,
    pub has_seen_cross_platform_prompt: bool,
    /// `YYYY-MM-DD`, empty before the first run
    pub last_played_date: String,
}

impl Default for PersistedData {
    fn default() -> Self {
        Self {
            version: DATA_VERSION,
            settings: Settings::default(),
            high_scores: HighScores::new(),
            completed_runs: 0,
            has_seen_tutorial: false,
            has_seen_cross_platform_prompt: false,
            last_played_date: String::new(),
        }
    }
}

impl PersistedData {
    pub fn from_json(json: &str) -> Result<Self> {
        let mut data: Self = serde_json::from_str(json)?;
        if data.version > DATA_VERSION {
            log::warn!(
                "Save version {} is newer than {}, loading known fields",
                data.version,
                DATA_VERSION
            );
        }
        data.version = DATA_VERSION;
        data.settings.sanitize();
        data.high_scores.normalize();
        Ok(data)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load the profile, or defaults if absent or unreadable
    pub fn load() -> Self {
        let Some(json) = storage::get(STORAGE_KEY) else {
            log::info!("No saved profile, using defaults");
            return Self::default();
        };
        match Self::from_json(&json) {
            Ok(data) => {
                log::info!(
                    "Loaded profile ({} runs, {} high scores)",
                    data.completed_runs,
                    data.high_scores.len()
                );
                data
            }
            Err(err) => {
                log::warn!("Discarding unreadable profile: {err}");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        storage::set(STORAGE_KEY, &self.to_json()?)
    }

    /// Load, modify and save in one step
    pub fn update(f: impl FnOnce(&mut Self)) -> Result<Self> {
        let mut data = Self::load();
        f(&mut data);
        data.save()?;
        Ok(data)
    }

    /// Remove the profile and any legacy keys
    pub fn clear() {
        storage::remove(STORAGE_KEY);
        for key in LEGACY_KEYS {
            storage::remove(key);
        }
        log::info!("Profile cleared");
    }

    /// Count a finished run and stamp the play date
    pub fn record_completed_run(&mut self, today: NaiveDate) {
        self.completed_runs = self.completed_runs.saturating_add(1);
        self.last_played_date = today.format(DATE_FORMAT).to_string();
    }

    pub fn mark_tutorial_seen(&mut self) {
        self.has_seen_tutorial = true;
    }

    pub fn mark_cross_platform_prompt_seen(&mut self) {
        self.has_seen_cross_platform_prompt = true;
    }

    pub fn last_played(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.last_played_date, DATE_FORMAT).ok()
    }

    pub fn personal_best(&self) -> Option<&HighScoreEntry> {
        self.high_scores.personal_best()
    }
}
