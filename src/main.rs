//! TILT//RIFT entry point
//!
//! Native builds run a headless autopilot session on a seed (first argument,
//! or today's daily seed) and log what the rules core reports. The browser
//! build only boots logging; the host page drives the library.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(not(target_arch = "wasm32"))]
mod autopilot {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::{Vec2, Vec3};

    use tilt_rift::consts::SIM_DT;
    use tilt_rift::highscores::{HighScoreEntry, HighScores};
    use tilt_rift::persistence::PersistedData;
    use tilt_rift::platform::{self, Device};
    use tilt_rift::rules::{
        ContactEvent, ContactKind, CourseLayout, EventKind, Game, GameEvent, InputInbox, OrbUpdate,
        Phase, RunResult,
    };
    use tilt_rift::seed::{self, Seed};
    use tilt_rift::share::ShareData;
    use tilt_rift::telemetry::{
        Analytics, ConsoleSink, RunCompleteData, RunOutcome, RunStartData, ScreenSize,
        SessionStartData,
    };

    /// Orb ground speed while steering (m/s)
    const CRUISE_SPEED: f32 = 6.0;
    /// Distance at which a pickup or the gate counts as touched
    const REACH: f32 = 0.75;
    /// Seconds between scripted wall bumps
    const BUMP_INTERVAL: f32 = 7.0;
    const BUMP_FORCE: f32 = 3.0;
    /// Hard stop in case a run never resolves
    const MAX_TICKS: u32 = 60 * 600;

    pub fn run(seed: &Seed) {
        let device = platform::detect_device();
        let today = platform::today_utc();
        let mut analytics = Analytics::new(ConsoleSink);
        analytics.track_session_start(&SessionStartData {
            platform: device,
            user_agent: "native".into(),
            screen_size: ScreenSize {
                width: 0,
                height: 0,
            },
            has_gyroscope: false,
            referrer: String::new(),
        });

        let mut game = Game::new(seed.as_str());
        game.boot();

        let offered = game.offered_modifiers(3);
        for card in &offered {
            log::info!("Rift card: {} ({:?}) - {}", card.name, card.rarity, card.description);
        }
        let chosen: Vec<_> = offered.first().map(|card| card.id).into_iter().collect();

        let published = Rc::new(RefCell::new(Vec::<GameEvent>::new()));
        for kind in EventKind::ALL {
            let sink = Rc::clone(&published);
            game.bus_mut().on(kind, move |event| sink.borrow_mut().push(event.clone()));
        }

        game.start_run(&chosen);
        analytics.track_run_start(&RunStartData {
            seed: seed.to_string(),
            is_daily: *seed == seed::daily_seed(today),
            modifiers: chosen.iter().map(|id| id.as_str().to_owned()).collect(),
            difficulty: "normal".into(),
        });
        game.countdown_complete();
        game.countdown_complete();

        let mut inbox = InputInbox::new();
        let mut position = game.layout().spawn_point;
        let mut bump_timer = BUMP_INTERVAL;
        let mut ticks = 0;

        while game.phase() == Phase::Playing && ticks < MAX_TICKS {
            ticks += 1;
            let (target, contact) = next_target(&game);
            let offset = Vec2::new(target.x - position.x, target.z - position.z);
            let steer = offset.normalize_or_zero();
            inbox.set_tilt(steer);

            let step = (CRUISE_SPEED * SIM_DT).min(offset.length());
            position += Vec3::new(steer.x, 0.0, steer.y) * step;
            inbox.sync_orb(OrbUpdate {
                position: Some(position),
                speed: Some(CRUISE_SPEED),
                is_grounded: Some(true),
                ..Default::default()
            });

            if offset.length() <= REACH {
                inbox.push_contact(ContactEvent::new(contact, position, 0.0));
            }

            bump_timer -= SIM_DT;
            if bump_timer <= 0.0 {
                bump_timer = BUMP_INTERVAL;
                inbox.push_contact(ContactEvent::new(ContactKind::Wall, position, BUMP_FORCE));
            }

            let output = game.tick(&inbox.take(), SIM_DT);
            for request in &output.requests {
                log::debug!("Physics request: {request:?}");
            }

            for event in published.borrow_mut().drain(..) {
                analytics.record_game_event(&event, position);
            }
        }

        finish(&mut game, seed, device, today, &mut analytics);
    }

    /// Nearest uncollected shard, or the exit gate once all are in
    fn next_target(game: &Game) -> (Vec3, ContactKind) {
        let run = game.run();
        let position = run.orb().position;
        (0..game.layout().shard_sockets.len())
            .map(CourseLayout::shard_id)
            .filter(|id| !run.is_collected(id))
            .filter_map(|id| game.shard_position(&id).map(|p| (p, ContactKind::Shard { id })))
            .min_by(|(a, _), (b, _)| {
                a.distance_squared(position)
                    .total_cmp(&b.distance_squared(position))
            })
            .unwrap_or((game.layout().exit_position, ContactKind::Gate { inside: true }))
    }

    fn finish(
        game: &mut Game,
        seed: &Seed,
        device: Device,
        today: chrono::NaiveDate,
        analytics: &mut Analytics<ConsoleSink>,
    ) {
        let snapshot = game.snapshot();
        let outcome = match game.result() {
            Some(RunResult::Won { score, rank }) => {
                log::info!("Run won: {score} points, {} rank", rank.as_str());
                RunOutcome::Victory
            }
            Some(RunResult::Lost { reason, score, .. }) => {
                log::info!("Run lost ({}): {score} points", reason.as_str());
                RunOutcome::Defeat
            }
            None => {
                log::warn!("Run did not resolve, abandoning");
                RunOutcome::Quit
            }
        };
        analytics.track_run_complete(&RunCompleteData::from_snapshot(
            seed.as_str(),
            &snapshot,
            outcome,
            device,
        ));
        game.show_results();

        if let Err(err) = PersistedData::update(|data| data.record_completed_run(today)) {
            log::warn!("Could not record run: {err}");
        }
        let entry = HighScoreEntry::from_snapshot(&snapshot, seed.as_str(), device, today);
        if let Some(position) = HighScores::submit(entry) {
            log::info!("New high score at #{position}");
        }

        let share = ShareData {
            seed: seed.clone(),
            score: snapshot.final_score(),
            rank: snapshot.final_rank(),
            device,
        };
        match share.text() {
            Ok(text) => log::info!("{text}"),
            Err(err) => log::warn!("Could not build share link: {err}"),
        }
        game.return_to_menu();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    tilt_rift::platform::init_logging();
    log::info!(
        "TILT//RIFT rules core ready ({})",
        tilt_rift::platform::detect_device().as_str()
    );
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use tilt_rift::seed::{self, Seed};

    tilt_rift::platform::init_logging();
    log::info!("TILT//RIFT (native) starting...");

    let seed = std::env::args()
        .nth(1)
        .and_then(|raw| match Seed::parse(&raw) {
            Ok(seed) => Some(seed),
            Err(err) => {
                log::warn!("{err}; falling back to the daily seed");
                None
            }
        })
        .unwrap_or_else(|| seed::daily_seed(tilt_rift::platform::today_utc()));

    log::info!("Seed: {seed}");
    autopilot::run(&seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
