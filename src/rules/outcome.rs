//! Win/lose predicates over a run snapshot

use serde::{Deserialize, Serialize};

use super::state::RunSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoseReason {
    Stability,
    Time,
}

impl LoseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoseReason::Stability => "stability",
            LoseReason::Time => "time",
        }
    }
}

/// Every shard, inside the exit gate, still stable
pub fn check_win(snapshot: &RunSnapshot) -> bool {
    let stats = &snapshot.stats;
    stats.shards_collected == stats.total_shards
        && snapshot.orb.is_in_exit_gate
        && stats.stability > 0.0
}

pub fn check_lose(snapshot: &RunSnapshot) -> bool {
    lose_reason(snapshot).is_some()
}

/// Stability takes priority when both run out together
pub fn lose_reason(snapshot: &RunSnapshot) -> Option<LoseReason> {
    if snapshot.stats.stability <= 0.0 {
        Some(LoseReason::Stability)
    } else if snapshot.stats.time_remaining <= 0.0 {
        Some(LoseReason::Time)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::state::RunState;

    fn finished_run(stability: f32) -> RunSnapshot {
        let mut snapshot = RunState::default().snapshot();
        snapshot.stats.shards_collected = 12;
        snapshot.stats.total_shards = 12;
        snapshot.orb.is_in_exit_gate = true;
        snapshot.stats.stability = stability;
        snapshot
    }

    #[test]
    fn test_win_needs_all_three() {
        assert!(check_win(&finished_run(50.0)));

        let mut missing_shard = finished_run(50.0);
        missing_shard.stats.shards_collected = 11;
        assert!(!check_win(&missing_shard));

        let mut outside_gate = finished_run(50.0);
        outside_gate.orb.is_in_exit_gate = false;
        assert!(!check_win(&outside_gate));
    }

    #[test]
    fn test_zero_stability_loses() {
        let snapshot = finished_run(0.0);
        assert!(!check_win(&snapshot));
        assert!(check_lose(&snapshot));
        assert_eq!(lose_reason(&snapshot), Some(LoseReason::Stability));
    }

    #[test]
    fn test_stability_beats_time() {
        let mut snapshot = finished_run(0.0);
        snapshot.stats.time_remaining = 0.0;
        assert_eq!(lose_reason(&snapshot), Some(LoseReason::Stability));

        snapshot.stats.stability = 1.0;
        assert_eq!(lose_reason(&snapshot), Some(LoseReason::Time));
    }

    #[test]
    fn test_fresh_run_is_neither() {
        let snapshot = RunState::default().snapshot();
        assert!(!check_win(&snapshot));
        assert!(!check_lose(&snapshot));
        assert_eq!(lose_reason(&snapshot), None);
    }
}
