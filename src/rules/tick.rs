//! Per-tick driver
//!
//! [`Game`] owns the session machine, run state, course layout and event
//! bus. The host loop hands it one [`InputFrame`] per tick and applies the
//! returned [`TickOutput`] to its physics world.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::cooldown::Ability;
use super::course::{self, CourseConfig, CourseLayout};
use super::events::{EventBus, EventData, EventKind};
use super::input::{ContactKind, Gesture, InputFrame, VectorField, gravity_for_tilt};
use super::modifiers::{self, ModCard, ModifierEffect, ModifierId};
use super::outcome::{self, LoseReason};
use super::scoring::Rank;
use super::session::{Phase, SessionEvent, SessionStateMachine};
use super::state::{OrbUpdate, RunConfig, RunSnapshot, RunState};
use crate::consts::{GRAVITY, GRAZE_FORCE};

/// Upward hop from a tap
pub const PING_IMPULSE: f32 = 2.0;
/// Push along the tilt direction from SPACE
pub const PULSE_IMPULSE: f32 = 5.0;
/// Push along a swipe
pub const SWIPE_IMPULSE: f32 = 3.0;
/// Velocity kept per brake application
pub const BRAKE_FACTOR: f32 = 0.5;
/// Seconds of level gravity after a long press
pub const STABILIZE_DURATION: f32 = 3.0;

/// Something the physics layer should do this tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhysicsRequest {
    Impulse { direction: Vec3, strength: f32 },
    Brake { factor: f32 },
    Wind { force: Vec3 },
    RelocateShard { id: String, position: Vec3 },
}

/// Result of one tick for the physics layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickOutput {
    pub gravity: Vec3,
    /// Ground friction under the orb
    pub friction: f32,
    pub requests: Vec<PhysicsRequest>,
}

impl TickOutput {
    fn idle() -> Self {
        Self {
            gravity: Vec3::new(0.0, -GRAVITY, 0.0),
            friction: modifiers::DEFAULT_FRICTION,
            requests: Vec::new(),
        }
    }
}

/// How the last run ended, with its final score and rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunResult {
    Won { score: u64, rank: Rank },
    Lost { reason: LoseReason, score: u64, rank: Rank },
}

impl RunResult {
    pub fn score(&self) -> u64 {
        match *self {
            RunResult::Won { score, .. } | RunResult::Lost { score, .. } => score,
        }
    }

    pub fn rank(&self) -> Rank {
        match *self {
            RunResult::Won { rank, .. } | RunResult::Lost { rank, .. } => rank,
        }
    }

    pub fn is_win(&self) -> bool {
        matches!(self, RunResult::Won { .. })
    }
}

#[derive(Debug)]
pub struct Game {
    seed: String,
    session: SessionStateMachine,
    run: RunState,
    layout: CourseLayout,
    /// Current shard positions by socket index (moves on reshuffle)
    shard_positions: Vec<Vec3>,
    bus: EventBus,
    fields: Vec<VectorField>,
    stabilize_timer: f32,
    result: Option<RunResult>,
}

impl Game {
    pub fn new(seed: &str) -> Self {
        Self::with_config(seed, RunConfig::default(), &CourseConfig::default())
    }

    pub fn with_config(seed: &str, run_config: RunConfig, course_config: &CourseConfig) -> Self {
        let layout = course::generate_with(seed, course_config);
        let mut run = RunState::new(run_config);
        run.set_total_shards(layout.total_shards());
        Self {
            seed: seed.to_string(),
            session: SessionStateMachine::new(),
            shard_positions: layout.shard_sockets.clone(),
            run,
            layout,
            bus: EventBus::new(),
            fields: Vec::new(),
            stabilize_timer: 0.0,
            result: None,
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    pub fn run(&self) -> &RunState {
        &self.run
    }

    pub fn layout(&self) -> &CourseLayout {
        &self.layout
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn session_mut(&mut self) -> &mut SessionStateMachine {
        &mut self.session
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.run.snapshot()
    }

    pub fn result(&self) -> Option<RunResult> {
        self.result
    }

    pub fn vector_fields(&self) -> &[VectorField] {
        &self.fields
    }

    /// Current position of a shard by id
    pub fn shard_position(&self, id: &str) -> Option<Vec3> {
        let index: usize = id.strip_prefix("shard-")?.parse().ok()?;
        self.shard_positions.get(index.checked_sub(1)?).copied()
    }

    /// Cards offered for this seed
    pub fn offered_modifiers(&self, count: usize) -> Vec<&'static ModCard> {
        modifiers::draw_modifiers(&self.seed, count)
    }

    // --- Session flow ---

    /// Boot -> Menu
    pub fn boot(&mut self) -> bool {
        self.session.dispatch(SessionEvent::Init)
    }

    /// Menu/Results -> Ready with a fresh run and the chosen modifiers
    pub fn start_run(&mut self, chosen: &[ModifierId]) -> bool {
        if !self.session.dispatch(SessionEvent::StartGame) {
            return false;
        }
        self.prepare_run(chosen);
        true
    }

    /// Results -> Ready, keeping the modifiers of the last run
    pub fn retry(&mut self) -> bool {
        let chosen = self.run.modifiers().ids();
        if !self.session.dispatch(SessionEvent::Retry) {
            return false;
        }
        self.prepare_run(&chosen);
        true
    }

    fn prepare_run(&mut self, chosen: &[ModifierId]) {
        self.run.reset_run();
        self.run.set_total_shards(self.layout.total_shards());
        self.shard_positions = self.layout.shard_sockets.clone();
        self.fields.clear();
        self.stabilize_timer = 0.0;
        self.result = None;
        for &id in chosen {
            self.run.apply_modifier(id);
        }
        log::info!(
            "Run ready on seed {:?} with {} modifier(s)",
            self.seed,
            self.run.modifiers().len()
        );
        self.publish();
    }

    /// Ready -> Countdown -> Playing; entering Playing starts the run
    pub fn countdown_complete(&mut self) -> bool {
        if !self.session.dispatch(SessionEvent::CountdownComplete) {
            return false;
        }
        if self.session.is_playing() {
            self.run.queue_event(EventKind::GameStarted, EventData::None);
            self.publish();
        }
        true
    }

    pub fn pause(&mut self) -> bool {
        self.phase_event(SessionEvent::Pause, EventKind::GamePaused)
    }

    pub fn resume(&mut self) -> bool {
        self.phase_event(SessionEvent::Resume, EventKind::GameResumed)
    }

    pub fn toggle_pause(&mut self) -> bool {
        match self.phase() {
            Phase::Playing => self.pause(),
            Phase::Paused => self.resume(),
            _ => false,
        }
    }

    pub fn show_results(&mut self) -> bool {
        self.session.dispatch(SessionEvent::ShowResults)
    }

    pub fn return_to_menu(&mut self) -> bool {
        self.session.dispatch(SessionEvent::ReturnToMenu)
    }

    fn phase_event(&mut self, event: SessionEvent, kind: EventKind) -> bool {
        if !self.session.dispatch(event) {
            return false;
        }
        self.run.queue_event(kind, EventData::None);
        self.publish();
        true
    }

    fn publish(&mut self) {
        let events = self.run.take_events();
        self.bus.emit_all(events);
    }

    // --- Tick ---

    /// Advance one tick; a no-op outside `Playing`
    pub fn tick(&mut self, input: &InputFrame, dt: f32) -> TickOutput {
        if !self.session.is_playing() {
            return TickOutput::idle();
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let mut requests = Vec::new();

        // Physics sync
        if let Some(update) = input.orb {
            self.run.update_orb_state(update);
        }
        self.run.add_airtime(input.airtime);

        // Abilities
        for gesture in &input.gestures {
            self.perform_gesture(*gesture, input.tilt, &mut requests);
        }
        if input.pulse && self.run.try_use_ability(Ability::Pulse) {
            requests.push(PhysicsRequest::Impulse {
                direction: ground_direction(input.tilt).unwrap_or(Vec3::Z),
                strength: PULSE_IMPULSE,
            });
        }
        if input.brake && self.run.try_use_ability(Ability::Brake) {
            requests.push(PhysicsRequest::Brake {
                factor: BRAKE_FACTOR,
            });
        }
        if let Some(stroke) = input.vector_field {
            match VectorField::from_stroke(stroke) {
                Some(field) if self.run.try_use_ability(Ability::VectorField) => {
                    self.fields.push(field);
                }
                Some(_) => {}
                None => log::debug!("Ignoring zero-length vector field"),
            }
        }

        // Contacts
        for contact in &input.contacts {
            match &contact.kind {
                ContactKind::Shard { id } => {
                    if self.shard_position(id).is_none() {
                        log::warn!("Ignoring contact with unknown shard {id:?}");
                        continue;
                    }
                    let value = self.run.config().shard_base_score;
                    self.run.collect_shard(id, value);
                }
                ContactKind::Hazard { hazard } => {
                    self.run.register_hazard(*hazard);
                }
                ContactKind::Wall | ContactKind::Bumper => {
                    if contact.force > GRAZE_FORCE {
                        self.run.register_impact(contact.force);
                    }
                }
                ContactKind::Gate { inside } => {
                    self.run.update_orb_state(OrbUpdate {
                        is_in_exit_gate: Some(*inside),
                        ..Default::default()
                    });
                }
                ContactKind::Plate => {
                    let p = contact.position;
                    self.run.queue_event(
                        EventKind::PlateActivated,
                        EventData::Plate {
                            x: p.x,
                            y: p.y,
                            z: p.z,
                        },
                    );
                }
            }
        }

        // Clocks
        self.run.update_time(dt);
        self.run.drain_stability(dt);
        self.run.tick_cooldowns(dt);
        for effect in self.run.tick_modifiers(dt) {
            if let ModifierEffect::ShuffleShards { iteration } = effect {
                self.reshuffle(iteration, &mut requests);
            }
        }
        self.fields.retain_mut(|field| field.tick(dt));
        self.stabilize_timer = (self.stabilize_timer - dt).max(0.0);

        let orb = *self.run.orb();
        let ground = Vec2::new(orb.position.x, orb.position.z);
        let wind: Vec2 = self.fields.iter().map(|f| f.force_at(ground)).sum();
        if wind != Vec2::ZERO {
            requests.push(PhysicsRequest::Wind {
                force: Vec3::new(wind.x, 0.0, wind.y),
            });
        }

        self.evaluate_outcome();
        self.publish();

        let tilt = if self.stabilize_timer > 0.0 {
            Vec2::ZERO
        } else {
            input.tilt
        };
        TickOutput {
            gravity: gravity_for_tilt(tilt, self.run.modifiers().gravity_multiplier()),
            friction: self.run.modifiers().friction_at(orb.position.x, orb.position.z),
            requests,
        }
    }

    fn perform_gesture(&mut self, gesture: Gesture, tilt: Vec2, requests: &mut Vec<PhysicsRequest>) {
        if !self.run.try_use_ability(gesture.ability()) {
            log::debug!("Gesture {} on cooldown", gesture.as_str());
            return;
        }
        self.run
            .queue_event(EventKind::GesturePerformed, EventData::Gesture { gesture });
        match gesture {
            Gesture::Tap => requests.push(PhysicsRequest::Impulse {
                direction: (Vec3::Y + ground_direction(tilt).unwrap_or(Vec3::ZERO))
                    .normalize_or(Vec3::Y),
                strength: PING_IMPULSE,
            }),
            Gesture::Swipe { direction } => {
                if let Some(direction) = ground_direction(direction) {
                    requests.push(PhysicsRequest::Impulse {
                        direction,
                        strength: SWIPE_IMPULSE,
                    });
                }
            }
            Gesture::DoubleTap => requests.push(PhysicsRequest::Brake {
                factor: BRAKE_FACTOR,
            }),
            Gesture::LongPress => self.stabilize_timer = STABILIZE_DURATION,
        }
    }

    /// Move uncollected shards onto each other's positions
    fn reshuffle(&mut self, iteration: u32, requests: &mut Vec<PhysicsRequest>) {
        let uncollected: Vec<usize> = (0..self.shard_positions.len())
            .filter(|&i| !self.run.is_collected(&CourseLayout::shard_id(i)))
            .collect();
        let current: Vec<Vec3> = uncollected.iter().map(|&i| self.shard_positions[i]).collect();
        let shuffled = course::shuffle_positions(&current, &self.seed, iteration);

        for (&index, position) in uncollected.iter().zip(shuffled) {
            self.shard_positions[index] = position;
            requests.push(PhysicsRequest::RelocateShard {
                id: CourseLayout::shard_id(index),
                position,
            });
        }
        self.run.queue_event(
            EventKind::ShardsShuffled,
            EventData::Shuffled {
                iteration,
                moved: uncollected.len() as u32,
            },
        );
    }

    fn evaluate_outcome(&mut self) {
        let snapshot = self.run.snapshot();
        if outcome::check_win(&snapshot) {
            let (score, rank) = (snapshot.final_score(), snapshot.final_rank());
            self.run
                .queue_event(EventKind::GameWon, EventData::Rank { rank, score });
            self.run
                .queue_event(EventKind::RankAchieved, EventData::Rank { rank, score });
            self.session.dispatch(SessionEvent::Win);
            self.result = Some(RunResult::Won { score, rank });
            log::info!("Run won: {score} ({})", rank.as_str());
        } else if let Some(reason) = outcome::lose_reason(&snapshot) {
            let (score, rank) = (snapshot.final_score(), snapshot.final_rank());
            self.run
                .queue_event(EventKind::GameLost, EventData::Lost { reason });
            self.session.dispatch(SessionEvent::Lose);
            self.result = Some(RunResult::Lost {
                reason,
                score,
                rank,
            });
            log::info!("Run lost: {} ({score})", reason.as_str());
        }
    }
}

/// Ground-plane direction for a tilt/swipe vector, if it has one
fn ground_direction(v: Vec2) -> Option<Vec3> {
    let dir = Vec3::new(v.x, 0.0, v.y);
    (dir.length_squared() > 0.0).then(|| dir.normalize())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::consts::SIM_DT;
    use crate::rules::input::{ContactEvent, VectorStroke};
    use crate::rules::scoring;
    use crate::rules::stability::HazardKind;

    fn playing(seed: &str, chosen: &[ModifierId]) -> Game {
        let mut game = Game::new(seed);
        assert!(game.boot());
        assert!(game.start_run(chosen));
        assert!(game.countdown_complete());
        assert!(game.countdown_complete());
        assert_eq!(game.phase(), Phase::Playing);
        game
    }

    fn contact(kind: ContactKind, force: f32) -> ContactEvent {
        ContactEvent::new(kind, Vec3::ZERO, force)
    }

    fn collect_all(game: &mut Game) -> InputFrame {
        InputFrame {
            contacts: (0..game.layout().shard_sockets.len())
                .map(|i| {
                    contact(
                        ContactKind::Shard {
                            id: CourseLayout::shard_id(i),
                        },
                        0.0,
                    )
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_tick_ignored_outside_playing() {
        let mut game = Game::new("idle");
        let out = game.tick(&InputFrame::default(), 1.0);
        assert_eq!(out, TickOutput::idle());
        assert_eq!(game.run().stats().time_elapsed, 0.0);
    }

    #[test]
    fn test_tick_advances_time_and_drains() {
        let mut game = playing("clock", &[]);
        game.tick(&InputFrame::default(), 1.0);
        let stats = game.run().stats();
        assert_eq!(stats.time_elapsed, 1.0);
        assert_eq!(stats.time_remaining, 179.0);
        assert_eq!(stats.stability, 99.5);
    }

    #[test]
    fn test_pause_stops_the_clock() {
        let mut game = playing("pause", &[]);
        game.tick(&InputFrame::default(), 1.0);
        assert!(game.toggle_pause());
        game.tick(&InputFrame::default(), 5.0);
        assert_eq!(game.run().stats().time_elapsed, 1.0);
        assert!(game.toggle_pause());
        assert_eq!(game.phase(), Phase::Playing);
    }

    #[test]
    fn test_grazes_are_not_impacts() {
        let mut game = playing("graze", &[]);
        let input = InputFrame {
            contacts: vec![
                contact(ContactKind::Wall, 0.2),
                contact(ContactKind::Bumper, 6.0),
            ],
            ..Default::default()
        };
        game.tick(&input, SIM_DT);
        assert_eq!(game.run().stats().impact_count, 1);
        assert!(game.run().stats().stability < 86.0);
    }

    #[test]
    fn test_hazard_contact() {
        let mut game = playing("hazard", &[ModifierId::Overclock]);
        let input = InputFrame {
            contacts: vec![contact(
                ContactKind::Hazard {
                    hazard: HazardKind::Blade,
                },
                0.0,
            )],
            ..Default::default()
        };
        game.tick(&input, 0.0);
        assert_eq!(game.run().stats().stability, 74.0);
    }

    #[test]
    fn test_gestures_respect_cooldowns() {
        let mut game = playing("gesture", &[]);
        let input = InputFrame {
            gestures: vec![Gesture::Tap, Gesture::Swipe { direction: Vec2::X }],
            pulse: true,
            ..Default::default()
        };
        let out = game.tick(&input, SIM_DT);
        // Swipe shares the tap slot, so only tap and pulse fire
        assert_eq!(out.requests.len(), 2);
        assert!(!game.run().is_cooldown_ready(Ability::Tap));
        assert!(!game.run().is_cooldown_ready(Ability::Pulse));
        let out = game.tick(&input, SIM_DT);
        assert!(out.requests.is_empty());
    }

    #[test]
    fn test_long_press_levels_gravity() {
        let mut game = playing("level", &[]);
        let tilted = InputFrame {
            tilt: Vec2::new(1.0, 0.0),
            ..Default::default()
        };
        let out = game.tick(&tilted, SIM_DT);
        assert_eq!(out.gravity.x, GRAVITY);

        let press = InputFrame {
            tilt: Vec2::new(1.0, 0.0),
            gestures: vec![Gesture::LongPress],
            ..Default::default()
        };
        let out = game.tick(&press, SIM_DT);
        assert_eq!(out.gravity, Vec3::new(0.0, -GRAVITY, 0.0));
    }

    #[test]
    fn test_vector_field_pushes_orb() {
        let mut game = playing("wind", &[]);
        let input = InputFrame {
            orb: Some(OrbUpdate {
                position: Some(Vec3::new(0.0, 1.0, 0.0)),
                ..Default::default()
            }),
            vector_field: Some(VectorStroke {
                start: Vec2::new(-2.0, 0.0),
                end: Vec2::new(2.0, 0.0),
            }),
            ..Default::default()
        };
        let out = game.tick(&input, SIM_DT);
        assert!(out.requests.contains(&PhysicsRequest::Wind {
            force: Vec3::new(3.0, 0.0, 0.0)
        }));
        assert_eq!(game.vector_fields().len(), 1);

        for _ in 0..200 {
            game.tick(&InputFrame::default(), SIM_DT);
        }
        assert!(game.vector_fields().is_empty());
    }

    #[test]
    fn test_win_settles_score_and_rank() {
        let mut game = playing("win", &[]);
        let ranks = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&ranks);
        game.bus_mut().on(EventKind::RankAchieved, move |e| {
            sink.borrow_mut().push(e.data.clone())
        });

        let input = collect_all(&mut game);
        game.tick(&input, SIM_DT);
        assert_eq!(game.phase(), Phase::Playing);
        assert_eq!(game.run().stats().shards_collected, 12);

        let enter_gate = InputFrame {
            contacts: vec![contact(ContactKind::Gate { inside: true }, 0.0)],
            ..Default::default()
        };
        game.tick(&enter_gate, SIM_DT);
        assert_eq!(game.phase(), Phase::Won);

        // 12 shards, 179s left, combo 12
        let expected = 1200 + 1790 + 12 * 200;
        assert_eq!(
            game.result(),
            Some(RunResult::Won {
                score: expected,
                rank: Rank::Gold
            })
        );
        assert_eq!(ranks.borrow().len(), 1);
        assert!(game.show_results());
    }

    #[test]
    fn test_time_out_loses() {
        let mut game = Game::with_config(
            "timeout",
            RunConfig {
                time_limit: 1.0,
                ..Default::default()
            },
            &CourseConfig::default(),
        );
        game.boot();
        game.start_run(&[]);
        game.countdown_complete();
        game.countdown_complete();
        game.tick(&InputFrame::default(), 0.6);
        game.tick(&InputFrame::default(), 0.6);
        assert_eq!(game.phase(), Phase::Lost);
        let result = game.result().unwrap();
        assert!(matches!(
            result,
            RunResult::Lost {
                reason: LoseReason::Time,
                ..
            }
        ));
        // Nothing collected and no time left
        assert_eq!(result.score(), 0);
        assert_eq!(result.rank(), Rank::Bronze);
        assert_eq!(
            game.bus().last_event(EventKind::GameLost).map(|e| e.data.clone()),
            Some(EventData::Lost {
                reason: LoseReason::Time
            })
        );
    }

    #[test]
    fn test_stability_loss() {
        let mut game = playing("crash", &[]);
        let heavy = InputFrame {
            contacts: vec![contact(ContactKind::Wall, 9.0); 7],
            ..Default::default()
        };
        game.tick(&heavy, SIM_DT);
        assert_eq!(game.phase(), Phase::Lost);
        let result = game.result().unwrap();
        assert!(matches!(
            result,
            RunResult::Lost {
                reason: LoseReason::Stability,
                ..
            }
        ));
        assert!(!result.is_win());
        assert_eq!(result.score(), game.snapshot().final_score());
    }

    #[test]
    fn test_result_uses_final_score_not_running_sum() {
        let mut game = Game::with_config(
            "dented",
            RunConfig {
                max_stability: 1000.0,
                ..Default::default()
            },
            &CourseConfig::default(),
        );
        game.boot();
        game.start_run(&[]);
        game.countdown_complete();
        game.countdown_complete();

        let bumps = InputFrame {
            contacts: vec![contact(ContactKind::Wall, 1.0); 70],
            ..Default::default()
        };
        game.tick(&bumps, 0.0);
        let input = collect_all(&mut game);
        game.tick(&input, 0.0);
        let enter_gate = InputFrame {
            contacts: vec![contact(ContactKind::Gate { inside: true }, 0.0)],
            ..Default::default()
        };
        game.tick(&enter_gate, 0.0);
        assert_eq!(game.phase(), Phase::Won);

        // Running sum over combos 0..11
        assert_eq!(game.run().stats().score, 2720);
        // 1200 shards + 1800 time + 2400 combo - 70 * 50 impacts
        let result = game.result().unwrap();
        assert_eq!(result.score(), 1900);
        assert_eq!(result.rank(), scoring::rank_for_score(1900));
        assert_eq!(
            game.bus().last_event(EventKind::GameWon).map(|e| e.data.clone()),
            Some(EventData::Rank {
                rank: result.rank(),
                score: 1900
            })
        );
    }

    #[test]
    fn test_unknown_shard_ids_are_ignored() {
        let mut game = playing("ghosts", &[]);
        let mut contacts: Vec<_> = (0..12)
            .map(|i| contact(ContactKind::Shard { id: format!("ghost-{i}") }, 0.0))
            .collect();
        contacts.push(contact(ContactKind::Shard { id: "shard-40".into() }, 0.0));
        contacts.push(contact(ContactKind::Shard { id: "shard-0".into() }, 0.0));
        contacts.push(contact(ContactKind::Gate { inside: true }, 0.0));
        game.tick(
            &InputFrame {
                contacts,
                ..Default::default()
            },
            SIM_DT,
        );

        assert_eq!(game.phase(), Phase::Playing);
        assert_eq!(game.run().stats().shards_collected, 0);
        assert_eq!(game.run().stats().score, 0);
        assert!(game.bus().last_event(EventKind::ShardCollected).is_none());
    }

    #[test]
    fn test_zero_shard_course_is_winnable() {
        let mut game = Game::with_config(
            "lonely",
            RunConfig::default(),
            &CourseConfig {
                shard_count: 0,
                ..Default::default()
            },
        );
        game.boot();
        game.start_run(&[]);
        game.countdown_complete();
        game.countdown_complete();
        assert_eq!(game.run().stats().total_shards, 1);

        let input = InputFrame {
            contacts: vec![
                contact(ContactKind::Shard { id: "shard-1".into() }, 0.0),
                contact(ContactKind::Gate { inside: true }, 0.0),
            ],
            ..Default::default()
        };
        game.tick(&input, SIM_DT);
        assert_eq!(game.phase(), Phase::Won);
    }

    #[test]
    fn test_shard_shuffle_moves_only_uncollected() {
        let mut game = playing("flux", &[ModifierId::ShardShuffle]);
        let before = game.shard_position("shard-1");
        let input = InputFrame {
            contacts: vec![contact(
                ContactKind::Shard {
                    id: "shard-1".to_string(),
                },
                0.0,
            )],
            ..Default::default()
        };
        game.tick(&input, SIM_DT);
        let out = game.tick(&InputFrame::default(), 15.0);

        let relocated: Vec<_> = out
            .requests
            .iter()
            .filter_map(|r| match r {
                PhysicsRequest::RelocateShard { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(relocated.len(), 11);
        assert!(!relocated.contains(&"shard-1"));
        assert_eq!(game.shard_position("shard-1"), before);
        assert!(game.bus().last_event(EventKind::ShardsShuffled).is_some());
    }

    #[test]
    fn test_events_published_after_tick() {
        let mut game = playing("publish", &[]);
        let input = InputFrame {
            contacts: vec![contact(
                ContactKind::Shard {
                    id: "shard-3".to_string(),
                },
                0.0,
            )],
            ..Default::default()
        };
        game.tick(&input, SIM_DT);
        assert!(game.run().clone().take_events().is_empty());
        assert!(game.bus().last_event(EventKind::ShardCollected).is_some());
        assert!(game.bus().last_event(EventKind::GameStarted).is_some());
    }

    #[test]
    fn test_retry_keeps_modifiers_and_resets_run() {
        let mut game = playing("again", &[ModifierId::Overclock]);
        game.tick(&InputFrame::default(), 200.0);
        assert_eq!(game.phase(), Phase::Lost);
        assert!(game.show_results());
        assert!(game.retry());
        assert_eq!(game.phase(), Phase::Ready);
        assert!(game.run().is_overclock_active());
        assert_eq!(game.run().stats().time_remaining, 180.0);
        assert_eq!(game.result(), None);
    }

    #[test]
    fn test_same_inputs_same_run() {
        let script = |game: &mut Game| {
            let mut trace = Vec::new();
            for step in 0..600u32 {
                let mut input = InputFrame {
                    tilt: Vec2::new((step as f32 * 0.05).sin(), 0.5),
                    pulse: step % 90 == 0,
                    ..Default::default()
                };
                if step % 40 == 0 {
                    input.contacts.push(contact(
                        ContactKind::Shard {
                            id: CourseLayout::shard_id((step / 40) as usize % 12),
                        },
                        0.0,
                    ));
                }
                if step % 25 == 0 {
                    input.contacts.push(contact(ContactKind::Bumper, 3.0));
                }
                trace.push(game.tick(&input, SIM_DT));
            }
            trace
        };

        let chosen = [ModifierId::GravityPulse, ModifierId::ShardShuffle];
        let mut a = playing("DET42", &chosen);
        let mut b = playing("DET42", &chosen);
        assert_eq!(script(&mut a), script(&mut b));
        assert_eq!(a.snapshot(), b.snapshot());
        let history_a: Vec<_> = a.bus().history(None).into_iter().cloned().collect();
        let history_b: Vec<_> = b.bus().history(None).into_iter().cloned().collect();
        assert_eq!(history_a, history_b);
    }
}
