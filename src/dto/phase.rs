use serde::Serialize;
use utoipa::ToSchema;

use crate::{quiz::round::RoundPhase, state::state_machine::QuizPhase};

/// Screen exposed to clients (REST/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleScreen {
    /// Start screen, no session yet.
    Start,
    /// A round is being played.
    Round,
    /// Final summary.
    Results,
}

impl From<&QuizPhase> for VisibleScreen {
    fn from(value: &QuizPhase) -> Self {
        match value {
            QuizPhase::PreSession => VisibleScreen::Start,
            QuizPhase::InSession(_) => VisibleScreen::Round,
            QuizPhase::Results => VisibleScreen::Results,
        }
    }
}

/// Round phase when a round is on screen.
pub fn visible_round_phase(value: &QuizPhase) -> Option<RoundPhase> {
    match value {
        QuizPhase::InSession(phase) => Some(*phase),
        QuizPhase::PreSession | QuizPhase::Results => None,
    }
}
