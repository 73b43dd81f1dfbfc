//! Gameplay telemetry
//!
//! Records are `{type, timestamp, sessionId, data}` envelopes with a closed
//! set of event types. [`Analytics`] queues them and hands full batches to a
//! [`TelemetrySink`]; transport lives behind the sink.

use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::platform::{self, Device};
use crate::rules::{EventData, EventKind, GameEvent, ModifierId, RunSnapshot, StabilityReason};
use crate::settings::Settings;
use crate::{Error, Result};

/// Events queued before a flush is forced
pub const BATCH_SIZE: usize = 10;

/// Host flush cadence while a session is open
pub const FLUSH_INTERVAL_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryEventType {
    SessionStart,
    RunStart,
    RunComplete,
    ShardCollected,
    DamageTaken,
    ModifierActivated,
    CheckpointReached,
    Pause,
    Resume,
    SettingsChanged,
    Error,
}

impl TelemetryEventType {
    pub const ALL: [TelemetryEventType; 11] = [
        TelemetryEventType::SessionStart,
        TelemetryEventType::RunStart,
        TelemetryEventType::RunComplete,
        TelemetryEventType::ShardCollected,
        TelemetryEventType::DamageTaken,
        TelemetryEventType::ModifierActivated,
        TelemetryEventType::CheckpointReached,
        TelemetryEventType::Pause,
        TelemetryEventType::Resume,
        TelemetryEventType::SettingsChanged,
        TelemetryEventType::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TelemetryEventType::SessionStart => "session_start",
            TelemetryEventType::RunStart => "run_start",
            TelemetryEventType::RunComplete => "run_complete",
            TelemetryEventType::ShardCollected => "shard_collected",
            TelemetryEventType::DamageTaken => "damage_taken",
            TelemetryEventType::ModifierActivated => "modifier_activated",
            TelemetryEventType::CheckpointReached => "checkpoint_reached",
            TelemetryEventType::Pause => "pause",
            TelemetryEventType::Resume => "resume",
            TelemetryEventType::SettingsChanged => "settings_changed",
            TelemetryEventType::Error => "error",
        }
    }

    /// Types that are sent as soon as they are tracked
    pub fn flushes_immediately(&self) -> bool {
        matches!(self, TelemetryEventType::RunComplete | TelemetryEventType::Error)
    }
}

impl FromStr for TelemetryEventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownEventType(s.to_string()))
    }
}

impl fmt::Display for TelemetryEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    #[serde(rename = "type")]
    pub kind: TelemetryEventType,
    /// Unix time in milliseconds
    pub timestamp: i64,
    pub session_id: String,
    pub data: Value,
}

// === Payloads ===

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for Position {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartData {
    pub platform: Device,
    pub user_agent: String,
    pub screen_size: ScreenSize,
    pub has_gyroscope: bool,
    pub referrer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStartData {
    pub seed: String,
    pub is_daily: bool,
    pub modifiers: Vec<String>,
    pub difficulty: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Victory,
    Defeat,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCompleteData {
    pub seed: String,
    pub score: u64,
    pub shards_collected: u32,
    pub total_shards: u32,
    pub time_elapsed: f32,
    pub damages_taken: u32,
    pub modifiers_used: Vec<String>,
    pub platform: Device,
    pub outcome: RunOutcome,
    pub checkpoints_reached: u32,
}

impl RunCompleteData {
    /// Summary of a finished (or abandoned) run
    pub fn from_snapshot(seed: &str, snapshot: &RunSnapshot, outcome: RunOutcome, platform: Device) -> Self {
        let stats = &snapshot.stats;
        Self {
            seed: seed.to_owned(),
            score: snapshot.final_score(),
            shards_collected: stats.shards_collected,
            total_shards: stats.total_shards,
            time_elapsed: stats.time_elapsed,
            damages_taken: stats.impact_count,
            modifiers_used: snapshot.modifiers.iter().map(|id| id.as_str().to_owned()).collect(),
            platform,
            outcome,
            checkpoints_reached: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardCollectedData {
    pub shard_id: String,
    pub position: Position,
    pub time_in_run: f32,
    pub total_collected: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageTakenData {
    pub source: String,
    pub amount: f32,
    pub current_health: f32,
    pub position: Position,
    pub time_in_run: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierActivatedData {
    pub modifier_id: String,
    pub modifier_name: String,
    pub time_in_run: f32,
}

impl ModifierActivatedData {
    pub fn new(id: ModifierId, time_in_run: f32) -> Self {
        Self {
            modifier_id: id.as_str().to_owned(),
            modifier_name: id.card().name.to_owned(),
            time_in_run,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointReachedData {
    pub checkpoint_id: String,
    pub position: Position,
    pub time_in_run: f32,
    pub shards_collected: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsChangedData {
    pub setting: String,
    pub old_value: Value,
    pub new_value: Value,
}

impl SettingsChangedData {
    /// One record per field that differs, in wire-name order
    pub fn between(old: &Settings, new: &Settings) -> Vec<Self> {
        let (Ok(Value::Object(old)), Ok(Value::Object(new))) =
            (serde_json::to_value(old), serde_json::to_value(new))
        else {
            return Vec::new();
        };
        let mut changes: Vec<Self> = new
            .into_iter()
            .filter_map(|(setting, new_value)| {
                let old_value = old.get(&setting).cloned().unwrap_or(Value::Null);
                (old_value != new_value).then_some(Self {
                    setting,
                    old_value,
                    new_value,
                })
            })
            .collect();
        changes.sort_by(|a, b| a.setting.cmp(&b.setting));
        changes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorData {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub context: String,
}

// === Transport ===

/// Destination for telemetry batches
pub trait TelemetrySink {
    /// Deliver a batch; false means it should be retried later
    fn send(&mut self, events: &[TelemetryEvent]) -> bool;
}

/// Writes each record to the log
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl TelemetrySink for ConsoleSink {
    fn send(&mut self, events: &[TelemetryEvent]) -> bool {
        for event in events {
            log::info!(
                "[Telemetry] {} session={} t={} {}",
                event.kind,
                event.session_id,
                event.timestamp,
                event.data
            );
        }
        true
    }
}

/// Telemetry queue for one app session
#[derive(Debug)]
pub struct Analytics<S: TelemetrySink> {
    session_id: String,
    queue: Vec<TelemetryEvent>,
    sink: S,
    enabled: bool,
}

impl<S: TelemetrySink> Analytics<S> {
    pub fn new(sink: S) -> Self {
        Self::with_session_id(Uuid::new_v4().to_string(), sink)
    }

    pub fn with_session_id(session_id: impl Into<String>, sink: S) -> Self {
        Self {
            session_id: session_id.into(),
            queue: Vec::new(),
            sink,
            enabled: true,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn queued(&self) -> &[TelemetryEvent] {
        &self.queue
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Queue a record; returns false when disabled or the payload won't serialize
    pub fn track(&mut self, kind: TelemetryEventType, data: impl Serialize) -> bool {
        if !self.enabled {
            return false;
        }
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(err) => {
                log::warn!("Dropping {kind} telemetry: {err}");
                return false;
            }
        };
        self.queue.push(TelemetryEvent {
            kind,
            timestamp: platform::now_ms(),
            session_id: self.session_id.clone(),
            data,
        });

        if kind.flushes_immediately() || self.queue.len() >= BATCH_SIZE {
            self.flush();
        }
        true
    }

    /// Send everything queued; a failed batch goes back to the front
    pub fn flush(&mut self) -> bool {
        if self.queue.is_empty() {
            return true;
        }
        let batch = std::mem::take(&mut self.queue);
        if self.sink.send(&batch) {
            log::debug!("Flushed {} telemetry events", batch.len());
            true
        } else {
            log::warn!("Telemetry send failed, re-queueing {} events", batch.len());
            let newer = std::mem::replace(&mut self.queue, batch);
            self.queue.extend(newer);
            false
        }
    }

    pub fn track_session_start(&mut self, data: &SessionStartData) -> bool {
        self.track(TelemetryEventType::SessionStart, data)
    }

    pub fn track_run_start(&mut self, data: &RunStartData) -> bool {
        self.track(TelemetryEventType::RunStart, data)
    }

    pub fn track_run_complete(&mut self, data: &RunCompleteData) -> bool {
        self.track(TelemetryEventType::RunComplete, data)
    }

    pub fn track_shard_collected(&mut self, data: &ShardCollectedData) -> bool {
        self.track(TelemetryEventType::ShardCollected, data)
    }

    pub fn track_damage_taken(&mut self, data: &DamageTakenData) -> bool {
        self.track(TelemetryEventType::DamageTaken, data)
    }

    pub fn track_modifier_activated(&mut self, data: &ModifierActivatedData) -> bool {
        self.track(TelemetryEventType::ModifierActivated, data)
    }

    pub fn track_checkpoint_reached(&mut self, data: &CheckpointReachedData) -> bool {
        self.track(TelemetryEventType::CheckpointReached, data)
    }

    pub fn track_pause(&mut self) -> bool {
        self.track(TelemetryEventType::Pause, serde_json::json!({}))
    }

    pub fn track_resume(&mut self) -> bool {
        self.track(TelemetryEventType::Resume, serde_json::json!({}))
    }

    pub fn track_settings_changed(&mut self, data: &SettingsChangedData) -> bool {
        self.track(TelemetryEventType::SettingsChanged, data)
    }

    pub fn track_error(&mut self, data: &ErrorData) -> bool {
        self.track(TelemetryEventType::Error, data)
    }

    /// Translate a published rules event, if it has a telemetry counterpart
    ///
    /// Only impact and hazard losses count as damage; the idle drain would
    /// flood the queue.
    pub fn record_game_event(&mut self, event: &GameEvent, orb_position: Vec3) -> bool {
        let time_in_run = event.timestamp as f32 / 1000.0;
        match (&event.kind, &event.data) {
            (
                EventKind::ShardCollected,
                EventData::ShardCollected {
                    shard_id,
                    new_total,
                    ..
                },
            ) => self.track_shard_collected(&ShardCollectedData {
                shard_id: shard_id.clone(),
                position: orb_position.into(),
                time_in_run,
                total_collected: *new_total,
            }),
            (
                EventKind::StabilityChanged,
                EventData::StabilityChanged {
                    new, delta, reason, ..
                },
            ) if *delta < 0.0 => {
                let source = match reason {
                    StabilityReason::Impact => "impact",
                    StabilityReason::Hazard => "hazard",
                    StabilityReason::Drain | StabilityReason::Heal => return false,
                };
                self.track_damage_taken(&DamageTakenData {
                    source: source.to_owned(),
                    amount: -delta,
                    current_health: *new,
                    position: orb_position.into(),
                    time_in_run,
                })
            }
            (EventKind::ModifierApplied, EventData::Modifier { id }) => {
                self.track_modifier_activated(&ModifierActivatedData::new(*id, time_in_run))
            }
            (EventKind::GamePaused, _) => self.track_pause(),
            (EventKind::GameResumed, _) => self.track_resume(),
            _ => false,
        }
    }
}

// === Inbound validation ===

/// Result of checking an uploaded batch
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BatchReport {
    pub received: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip)]
    pub accepted: Vec<TelemetryEvent>,
}

/// Validate an uploaded body: one event or an array of them
///
/// Bad events are reported and skipped; only an unreadable body fails.
pub fn validate_batch(body: &str) -> Result<BatchReport> {
    let raw: Value = serde_json::from_str(body)?;
    let items = match raw {
        Value::Array(items) => items,
        item @ Value::Object(_) => vec![item],
        other => {
            return Err(Error::InvalidTelemetry(format!(
                "expected an event or an array of events, got {other}"
            )));
        }
    };

    let mut report = BatchReport::default();
    for item in &items {
        match validate_event(item) {
            Ok(event) => report.accepted.push(event),
            Err(message) => report.errors.push(message),
        }
    }
    report.received = report.accepted.len();
    Ok(report)
}

fn validate_event(item: &Value) -> std::result::Result<TelemetryEvent, String> {
    let type_name = item.get("type").and_then(Value::as_str).unwrap_or_default();
    let kind = type_name
        .parse::<TelemetryEventType>()
        .map_err(|_| format!("Invalid event type: {type_name}"))?;

    let session_id = match item.get("sessionId").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_owned(),
        _ => return Err("Missing or invalid sessionId".to_owned()),
    };

    let timestamp = match item.get("timestamp").and_then(Value::as_f64) {
        Some(t) if t != 0.0 => t as i64,
        _ => return Err("Missing or invalid timestamp".to_owned()),
    };

    let data = match item.get("data") {
        Some(Value::Null) | None => Value::Object(Default::default()),
        Some(data) => data.clone(),
    };

    Ok(TelemetryEvent {
        kind,
        timestamp,
        session_id,
        data,
    })
}
