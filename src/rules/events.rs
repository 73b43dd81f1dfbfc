//! Typed publish/subscribe channel for rules outcomes
//!
//! The run state queues [`GameEvent`]s while a tick is in progress; the tick
//! driver publishes them here once the tick has finished. Presentation and
//! telemetry subscribe by [`EventKind`].

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::cooldown::Ability;
use super::input::Gesture;
use super::modifiers::ModifierId;
use super::outcome::LoseReason;
use super::scoring::Rank;
use super::stability::{HazardKind, ImpactSeverity};
use crate::{Error, Result};

/// Events kept for `history` / `last_event`
pub const HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    GameStarted,
    GamePaused,
    GameResumed,
    GameWon,
    GameLost,
    ShardCollected,
    ComboIncreased,
    ComboLost,
    StabilityChanged,
    Impact,
    HazardHit,
    GateToggled,
    PlateActivated,
    ModifierApplied,
    ModifierRemoved,
    CooldownStarted,
    CooldownEnded,
    GesturePerformed,
    ScoreUpdated,
    RankAchieved,
    ShardsShuffled,
}

impl EventKind {
    pub const ALL: [EventKind; 21] = [
        EventKind::GameStarted,
        EventKind::GamePaused,
        EventKind::GameResumed,
        EventKind::GameWon,
        EventKind::GameLost,
        EventKind::ShardCollected,
        EventKind::ComboIncreased,
        EventKind::ComboLost,
        EventKind::StabilityChanged,
        EventKind::Impact,
        EventKind::HazardHit,
        EventKind::GateToggled,
        EventKind::PlateActivated,
        EventKind::ModifierApplied,
        EventKind::ModifierRemoved,
        EventKind::CooldownStarted,
        EventKind::CooldownEnded,
        EventKind::GesturePerformed,
        EventKind::ScoreUpdated,
        EventKind::RankAchieved,
        EventKind::ShardsShuffled,
    ];

    /// Wire name, e.g. `SHARD_COLLECTED`
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::GameStarted => "GAME_STARTED",
            EventKind::GamePaused => "GAME_PAUSED",
            EventKind::GameResumed => "GAME_RESUMED",
            EventKind::GameWon => "GAME_WON",
            EventKind::GameLost => "GAME_LOST",
            EventKind::ShardCollected => "SHARD_COLLECTED",
            EventKind::ComboIncreased => "COMBO_INCREASED",
            EventKind::ComboLost => "COMBO_LOST",
            EventKind::StabilityChanged => "STABILITY_CHANGED",
            EventKind::Impact => "IMPACT",
            EventKind::HazardHit => "HAZARD_HIT",
            EventKind::GateToggled => "GATE_TOGGLED",
            EventKind::PlateActivated => "PLATE_ACTIVATED",
            EventKind::ModifierApplied => "MODIFIER_APPLIED",
            EventKind::ModifierRemoved => "MODIFIER_REMOVED",
            EventKind::CooldownStarted => "COOLDOWN_STARTED",
            EventKind::CooldownEnded => "COOLDOWN_ENDED",
            EventKind::GesturePerformed => "GESTURE_PERFORMED",
            EventKind::ScoreUpdated => "SCORE_UPDATED",
            EventKind::RankAchieved => "RANK_ACHIEVED",
            EventKind::ShardsShuffled => "SHARDS_SHUFFLED",
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownEventType(s.to_string()))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why stability moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StabilityReason {
    Impact,
    Hazard,
    Drain,
    Heal,
}

/// Payload carried by a [`GameEvent`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventData {
    None,
    ShardCollected {
        shard_id: String,
        new_total: u32,
        combo_multiplier: f64,
        points: u64,
    },
    Combo {
        previous_combo: u32,
        new_combo: u32,
        multiplier: f64,
    },
    StabilityChanged {
        previous: f32,
        new: f32,
        delta: f32,
        reason: StabilityReason,
    },
    Impact {
        force: f32,
        severity: ImpactSeverity,
        damage: f32,
    },
    HazardHit {
        kind: HazardKind,
        damage: f32,
    },
    Gate {
        inside: bool,
    },
    Plate {
        x: f32,
        y: f32,
        z: f32,
    },
    Modifier {
        id: ModifierId,
    },
    Cooldown {
        ability: Ability,
        duration: Option<f32>,
    },
    Gesture {
        gesture: Gesture,
    },
    Score {
        score: u64,
        delta: u64,
    },
    Rank {
        rank: Rank,
        score: u64,
    },
    Lost {
        reason: LoseReason,
    },
    Shuffled {
        iteration: u32,
        moved: u32,
    },
}

/// One published rules outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub kind: EventKind,
    /// Run clock in milliseconds
    pub timestamp: u64,
    pub data: EventData,
}

impl GameEvent {
    pub fn new(kind: EventKind, timestamp: u64, data: EventData) -> Self {
        Self {
            kind,
            timestamp,
            data,
        }
    }
}

/// Handle returned by [`EventBus::on`] / [`EventBus::once`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Box<dyn FnMut(&GameEvent)>;

struct Subscription {
    id: ListenerId,
    kind: EventKind,
    once: bool,
    listener: Listener,
}

#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    history: VecDeque<GameEvent>,
    next_id: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.subscriptions.len())
            .field("history", &self.history.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, kind: EventKind, listener: impl FnMut(&GameEvent) + 'static) -> ListenerId {
        self.subscribe(kind, false, Box::new(listener))
    }

    /// Listener removed after its first delivery
    pub fn once(
        &mut self,
        kind: EventKind,
        listener: impl FnMut(&GameEvent) + 'static,
    ) -> ListenerId {
        self.subscribe(kind, true, Box::new(listener))
    }

    fn subscribe(&mut self, kind: EventKind, once: bool, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.subscriptions.push(Subscription {
            id,
            kind,
            once,
            listener,
        });
        id
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Drop listeners for one kind, or all listeners when `kind` is `None`
    pub fn off_all(&mut self, kind: Option<EventKind>) {
        match kind {
            Some(kind) => self.subscriptions.retain(|s| s.kind != kind),
            None => self.subscriptions.clear(),
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.subscriptions.iter().filter(|s| s.kind == kind).count()
    }

    /// Record and deliver in subscription order
    pub fn emit(&mut self, event: GameEvent) {
        log::debug!("{} @{}ms", event.kind, event.timestamp);

        let mut fired_once = Vec::new();
        for sub in self.subscriptions.iter_mut().filter(|s| s.kind == event.kind) {
            (sub.listener)(&event);
            if sub.once {
                fired_once.push(sub.id);
            }
        }
        if !fired_once.is_empty() {
            self.subscriptions.retain(|s| !fired_once.contains(&s.id));
        }

        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(event);
    }

    pub fn emit_all(&mut self, events: impl IntoIterator<Item = GameEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    /// Oldest first, optionally filtered by kind
    pub fn history(&self, kind: Option<EventKind>) -> Vec<&GameEvent> {
        self.history
            .iter()
            .filter(|e| kind.is_none_or(|k| e.kind == k))
            .collect()
    }

    pub fn last_event(&self, kind: EventKind) -> Option<&GameEvent> {
        self.history.iter().rev().find(|e| e.kind == kind)
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
