use thiserror::Error;

use crate::quiz::round::RoundPhase;

/// High-level phases the quiz can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    /// No session has been started yet.
    PreSession,
    /// A session is running; the round is in the given phase.
    InSession(RoundPhase),
    /// Every round has been played and the summary is displayed.
    Results,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizEvent {
    /// Player starts a session from the start screen or the results screen.
    StartSession,
    /// A wrong guess or a skip unlocked another hint.
    HintUnlocked {
        /// Whether the unlocked hint is the final one.
        last: bool,
    },
    /// The active round reached a verdict.
    RoundCompleted,
    /// The settle delay elapsed and the next round opened.
    NextRound,
    /// The settle delay elapsed after the last round.
    Finish,
    /// Player throws the current session away and starts a new one.
    Restart,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: QuizPhase,
    /// The event that cannot be applied from this phase.
    pub event: QuizEvent,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: QuizPhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
}

/// State machine implementing the screen and round flow of a quiz session.
#[derive(Debug, Clone)]
pub struct QuizStateMachine {
    phase: QuizPhase,
    version: usize,
}

impl Default for QuizStateMachine {
    fn default() -> Self {
        Self {
            phase: QuizPhase::PreSession,
            version: 0,
        }
    }
}

impl QuizStateMachine {
    /// Create a new state machine on the start screen.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
        }
    }

    /// Check whether an event could be applied without changing anything.
    pub fn can_apply(&self, event: QuizEvent) -> Result<QuizPhase, InvalidTransition> {
        self.compute_transition(event)
    }

    /// Apply an event, returning the phase reached.
    pub fn apply(&mut self, event: QuizEvent) -> Result<QuizPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        self.version += 1;
        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: QuizEvent) -> Result<QuizPhase, InvalidTransition> {
        use RoundPhase::{AwaitingInput, HintExhausted, RoundComplete};

        let next = match (self.phase, event) {
            (QuizPhase::PreSession | QuizPhase::Results, QuizEvent::StartSession) => {
                QuizPhase::InSession(AwaitingInput)
            }
            (_, QuizEvent::Restart) => QuizPhase::InSession(AwaitingInput),
            (QuizPhase::InSession(AwaitingInput), QuizEvent::HintUnlocked { last: false }) => {
                QuizPhase::InSession(AwaitingInput)
            }
            (QuizPhase::InSession(AwaitingInput), QuizEvent::HintUnlocked { last: true }) => {
                QuizPhase::InSession(HintExhausted)
            }
            (
                QuizPhase::InSession(AwaitingInput | HintExhausted),
                QuizEvent::RoundCompleted,
            ) => QuizPhase::InSession(RoundComplete),
            (QuizPhase::InSession(RoundComplete), QuizEvent::NextRound) => {
                QuizPhase::InSession(AwaitingInput)
            }
            (QuizPhase::InSession(RoundComplete), QuizEvent::Finish) => QuizPhase::Results,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
