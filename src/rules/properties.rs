//! Property tests for the rules invariants

use proptest::prelude::*;

use super::course;
use super::events::StabilityReason;
use super::modifiers::{self, ModifierId};
use super::scoring::{ScoreInput, final_score, score_breakdown};
use super::session::{Phase, SessionEvent, SessionStateMachine, next_phase};
use super::state::RunState;

#[derive(Debug, Clone)]
enum Op {
    Collect(u8),
    Damage(f32),
    Heal(f32),
    Time(f32),
    Impact(f32),
    Combo,
    ResetCombo,
    Overclock(bool),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..16).prop_map(Op::Collect),
        (-50.0f32..200.0).prop_map(Op::Damage),
        (-50.0f32..200.0).prop_map(Op::Heal),
        (-1.0f32..5.0).prop_map(Op::Time),
        (-2.0f32..12.0).prop_map(Op::Impact),
        Just(Op::Combo),
        Just(Op::ResetCombo),
        any::<bool>().prop_map(Op::Overclock),
    ]
}

fn apply(run: &mut RunState, op: &Op) {
    match *op {
        Op::Collect(n) => {
            run.collect_shard(&format!("shard-{n}"), 100.0);
        }
        Op::Damage(amount) => {
            run.damage_stability(amount, StabilityReason::Impact);
        }
        Op::Heal(amount) => {
            run.heal_stability(amount);
        }
        Op::Time(dt) => run.update_time(dt),
        Op::Impact(force) => {
            run.register_impact(force);
        }
        Op::Combo => run.increment_combo(),
        Op::ResetCombo => run.reset_combo(),
        Op::Overclock(on) => {
            if on {
                run.apply_modifier(ModifierId::Overclock);
            } else {
                run.remove_modifier(ModifierId::Overclock);
            }
        }
    }
}

fn phase() -> impl Strategy<Value = Phase> {
    prop::sample::select(Phase::ALL.to_vec())
}

fn session_event() -> impl Strategy<Value = SessionEvent> {
    prop::sample::select(SessionEvent::ALL.to_vec())
}

proptest! {
    #[test]
    fn course_generation_is_deterministic(seed in "[a-zA-Z0-9]{0,32}") {
        prop_assert_eq!(course::generate(&seed), course::generate(&seed));
    }

    #[test]
    fn modifier_draw_is_deterministic(seed in "[a-zA-Z0-9]{0,32}", count in 0usize..6) {
        let a: Vec<_> = modifiers::draw_modifiers(&seed, count).iter().map(|c| c.id).collect();
        let b: Vec<_> = modifiers::draw_modifiers(&seed, count).iter().map(|c| c.id).collect();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn collecting_twice_equals_once(ops in prop::collection::vec(op(), 0..30), id in 0u8..16) {
        let mut once = RunState::default();
        for op in &ops {
            apply(&mut once, op);
        }
        let mut twice = once.clone();

        once.collect_shard(&format!("shard-{id}"), 100.0);
        twice.collect_shard(&format!("shard-{id}"), 100.0);
        twice.collect_shard(&format!("shard-{id}"), 100.0);
        prop_assert_eq!(once.snapshot(), twice.snapshot());
    }

    #[test]
    fn run_invariants_hold(ops in prop::collection::vec(op(), 0..80)) {
        let mut run = RunState::default();
        let mut last_impacts = 0;
        let mut last_score = 0;
        for op in &ops {
            apply(&mut run, op);
            let stats = run.stats();
            prop_assert!(stats.stability >= 0.0 && stats.stability <= stats.max_stability);
            prop_assert!(stats.max_combo >= stats.current_combo);
            prop_assert!(stats.shards_collected <= stats.total_shards);
            prop_assert!(stats.time_remaining >= 0.0);
            prop_assert!(stats.combo_timer >= 0.0);
            prop_assert!(stats.impact_count >= last_impacts);
            prop_assert!(stats.score >= last_score);
            last_impacts = stats.impact_count;
            last_score = stats.score;
        }
    }

    #[test]
    fn final_score_never_negative(
        shards in 0u32..100,
        time in -100.0f32..1000.0,
        combo in 0u32..100,
        impacts in 0u32..100_000,
        airtime in -10.0f32..1000.0,
        overclock in any::<bool>(),
    ) {
        let input = ScoreInput {
            shards_collected: shards,
            time_remaining: time,
            max_combo: combo,
            impact_count: impacts,
            airtime,
        };
        let score = final_score(&input, overclock);
        prop_assert_eq!(score, score_breakdown(&input, overclock).total);

        let positive = shards as i64 * 100
            + time.max(0.0).floor() as i64 * 10
            + combo as i64 * 200
            + airtime.max(0.0).floor() as i64 * 5;
        if impacts as i64 * 50 >= positive {
            prop_assert_eq!(score, 0);
        }
    }

    #[test]
    fn unmapped_events_are_rejected(from in phase(), event in session_event()) {
        let mut machine = SessionStateMachine::new();
        // Walk a legal path to `from`
        let path: &[SessionEvent] = match from {
            Phase::Boot => &[],
            Phase::Menu => &[SessionEvent::Init],
            Phase::Ready => &[SessionEvent::Init, SessionEvent::StartGame],
            Phase::Countdown => &[SessionEvent::Init, SessionEvent::StartGame, SessionEvent::CountdownComplete],
            Phase::Playing => &[SessionEvent::Init, SessionEvent::StartGame, SessionEvent::CountdownComplete, SessionEvent::CountdownComplete],
            Phase::Paused => &[SessionEvent::Init, SessionEvent::StartGame, SessionEvent::CountdownComplete, SessionEvent::CountdownComplete, SessionEvent::Pause],
            Phase::Won => &[SessionEvent::Init, SessionEvent::StartGame, SessionEvent::CountdownComplete, SessionEvent::CountdownComplete, SessionEvent::Win],
            Phase::Lost => &[SessionEvent::Init, SessionEvent::StartGame, SessionEvent::CountdownComplete, SessionEvent::CountdownComplete, SessionEvent::Lose],
            Phase::Results => &[SessionEvent::Init, SessionEvent::StartGame, SessionEvent::CountdownComplete, SessionEvent::CountdownComplete, SessionEvent::Lose, SessionEvent::ShowResults],
        };
        for &step in path {
            prop_assert!(machine.dispatch(step));
        }
        prop_assert_eq!(machine.phase(), from);

        let accepted = machine.dispatch(event);
        match next_phase(from, event) {
            Some(to) => {
                prop_assert!(accepted);
                prop_assert_eq!(machine.phase(), to);
            }
            None => {
                prop_assert!(!accepted);
                prop_assert_eq!(machine.phase(), from);
            }
        }
    }
}
