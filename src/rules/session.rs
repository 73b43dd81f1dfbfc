//! Session phase state machine
//!
//! One machine per app lifetime, starting at [`Phase::Boot`]. Results always
//! lead back to the menu or a retry, so sessions cycle indefinitely.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    #[default]
    Boot,
    Menu,
    Ready,
    Countdown,
    Playing,
    Paused,
    Won,
    Lost,
    Results,
}

impl Phase {
    pub const ALL: [Phase; 9] = [
        Phase::Boot,
        Phase::Menu,
        Phase::Ready,
        Phase::Countdown,
        Phase::Playing,
        Phase::Paused,
        Phase::Won,
        Phase::Lost,
        Phase::Results,
    ];
}

/// Discrete transition requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEvent {
    Init,
    StartGame,
    CountdownComplete,
    Pause,
    Resume,
    Win,
    Lose,
    ShowResults,
    ReturnToMenu,
    Retry,
}

impl SessionEvent {
    pub const ALL: [SessionEvent; 10] = [
        SessionEvent::Init,
        SessionEvent::StartGame,
        SessionEvent::CountdownComplete,
        SessionEvent::Pause,
        SessionEvent::Resume,
        SessionEvent::Win,
        SessionEvent::Lose,
        SessionEvent::ShowResults,
        SessionEvent::ReturnToMenu,
        SessionEvent::Retry,
    ];
}

/// Legal destinations from each phase
pub fn valid_transitions(from: Phase) -> &'static [Phase] {
    match from {
        Phase::Boot => &[Phase::Menu],
        Phase::Menu => &[Phase::Ready],
        Phase::Ready => &[Phase::Countdown],
        Phase::Countdown => &[Phase::Playing],
        Phase::Playing => &[Phase::Paused, Phase::Won, Phase::Lost],
        Phase::Paused => &[Phase::Playing, Phase::Menu],
        Phase::Won | Phase::Lost => &[Phase::Results],
        Phase::Results => &[Phase::Menu, Phase::Ready],
    }
}

pub fn can_transition(from: Phase, to: Phase) -> bool {
    valid_transitions(from).contains(&to)
}

/// Destination for `event` from `from`, if the event means anything there
pub fn next_phase(from: Phase, event: SessionEvent) -> Option<Phase> {
    use Phase::*;
    use SessionEvent as E;

    match (event, from) {
        (E::Init, Boot) => Some(Menu),
        (E::StartGame, Menu | Results) => Some(Ready),
        (E::CountdownComplete, Ready) => Some(Countdown),
        (E::CountdownComplete, Countdown) => Some(Playing),
        (E::Pause, Playing) => Some(Paused),
        (E::Resume, Paused) => Some(Playing),
        (E::Win, Playing) => Some(Won),
        (E::Lose, Playing) => Some(Lost),
        (E::ShowResults, Won | Lost) => Some(Results),
        (E::ReturnToMenu, Results | Paused) => Some(Menu),
        (E::Retry, Results) => Some(Ready),
        _ => None,
    }
}

/// Handle returned by [`SessionStateMachine::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Called with `(new, previous)` after every successful transition
pub type PhaseListener = Box<dyn FnMut(Phase, Phase)>;

#[derive(Default)]
pub struct SessionStateMachine {
    phase: Phase,
    listeners: Vec<(SubscriptionId, PhaseListener)>,
    next_id: u64,
}

impl fmt::Debug for SessionStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStateMachine")
            .field("phase", &self.phase)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.phase == Phase::Playing
    }

    /// Move directly to `to`; illegal edges warn and leave the phase alone
    pub fn transition(&mut self, to: Phase) -> bool {
        if !can_transition(self.phase, to) {
            log::warn!("Invalid transition: {:?} -> {:?}", self.phase, to);
            return false;
        }
        self.enter(to);
        true
    }

    /// Map `event` through the table; unmapped events warn and return false
    pub fn dispatch(&mut self, event: SessionEvent) -> bool {
        match next_phase(self.phase, event) {
            Some(to) => {
                self.enter(to);
                true
            }
            None => {
                log::warn!("Event {:?} has no transition from {:?}", event, self.phase);
                false
            }
        }
    }

    fn enter(&mut self, to: Phase) {
        let previous = self.phase;
        self.phase = to;
        log::info!("Phase {:?} -> {:?}", previous, to);
        for (_, listener) in &mut self.listeners {
            listener(to, previous);
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(Phase, Phase) + 'static) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Back to `Boot` without notifying listeners
    pub fn reset(&mut self) {
        self.phase = Phase::Boot;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn machine_at(phase: Phase) -> SessionStateMachine {
        let mut machine = SessionStateMachine::new();
        machine.phase = phase;
        machine
    }

    #[test]
    fn test_full_cycle() {
        let mut machine = SessionStateMachine::new();
        assert_eq!(machine.phase(), Phase::Boot);
        for event in [
            SessionEvent::Init,
            SessionEvent::StartGame,
            SessionEvent::CountdownComplete,
            SessionEvent::CountdownComplete,
            SessionEvent::Pause,
            SessionEvent::Resume,
            SessionEvent::Win,
            SessionEvent::ShowResults,
            SessionEvent::Retry,
        ] {
            assert!(machine.dispatch(event), "{event:?} from {:?}", machine.phase());
        }
        assert_eq!(machine.phase(), Phase::Ready);
    }

    #[test]
    fn test_event_targets_are_legal_edges() {
        for from in Phase::ALL {
            for event in SessionEvent::ALL {
                if let Some(to) = next_phase(from, event) {
                    assert!(can_transition(from, to), "{from:?} --{event:?}--> {to:?}");
                }
            }
        }
    }

    #[test]
    fn test_every_edge_reachable_by_some_event() {
        for from in Phase::ALL {
            for &to in valid_transitions(from) {
                assert!(
                    SessionEvent::ALL
                        .into_iter()
                        .any(|e| next_phase(from, e) == Some(to)),
                    "{from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn test_unmapped_events_leave_phase() {
        for from in Phase::ALL {
            for event in SessionEvent::ALL {
                if next_phase(from, event).is_none() {
                    let mut machine = machine_at(from);
                    assert!(!machine.dispatch(event));
                    assert_eq!(machine.phase(), from);
                }
            }
        }
    }

    #[test]
    fn test_direct_transition_rejects_illegal_edge() {
        let mut machine = machine_at(Phase::Menu);
        assert!(!machine.transition(Phase::Playing));
        assert_eq!(machine.phase(), Phase::Menu);
        assert!(machine.transition(Phase::Ready));
    }

    #[test]
    fn test_pause_can_quit_to_menu() {
        let mut machine = machine_at(Phase::Paused);
        assert!(machine.dispatch(SessionEvent::ReturnToMenu));
        assert_eq!(machine.phase(), Phase::Menu);
    }

    #[test]
    fn test_listeners_get_new_and_previous() {
        let mut machine = SessionStateMachine::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = machine.subscribe(move |new, prev| sink.borrow_mut().push((new, prev)));

        machine.dispatch(SessionEvent::Init);
        machine.dispatch(SessionEvent::Pause);
        assert_eq!(*seen.borrow(), vec![(Phase::Menu, Phase::Boot)]);

        assert!(machine.unsubscribe(id));
        machine.dispatch(SessionEvent::StartGame);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_reset() {
        let mut machine = machine_at(Phase::Results);
        machine.reset();
        assert_eq!(machine.phase(), Phase::Boot);
    }
}
