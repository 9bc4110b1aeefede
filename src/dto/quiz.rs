use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    catalog::HintLevel,
    dto::{
        format_timestamp,
        phase::{VisibleScreen, visible_round_phase},
        validation::validate_guess_text,
    },
    quiz::{
        QuizView,
        engine::{Feedback, FeedbackKind},
        matcher::Suggestion,
        round::RoundPhase,
        session::{PerformanceTier, ResultsSummary, RoundResult},
    },
};

/// Answer submitted for the current round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GuessRequest {
    /// Entity name, alias, or `Generic (<name>)` during a generic round.
    #[validate(length(min = 1, max = 128), custom(function = "validate_guess_text"))]
    pub guess: String,
}

/// Text typed so far in the answer box.
#[derive(Debug, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct SuggestionsQuery {
    /// Partial name, matched anywhere in entity names and aliases.
    #[validate(length(max = 128))]
    pub q: String,
}

/// Message shown after a guess or a skip.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FeedbackDto {
    pub kind: FeedbackKind,
    pub message: String,
}

impl From<Feedback> for FeedbackDto {
    fn from(value: Feedback) -> Self {
        Self {
            kind: value.kind,
            message: value.message,
        }
    }
}

/// One finished round as listed on the results screen.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundResultDto {
    pub round: usize,
    pub entity_id: String,
    pub entity_name: String,
    pub variant_id: String,
    /// The variant belongs to several entities.
    pub shared: bool,
    /// Guess log, skips included.
    pub guesses: Vec<String>,
    pub correct: bool,
    /// Hint level the round was won at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint_level: Option<HintLevel>,
    pub points: u32,
    /// Won with the generic category form.
    pub via_generic: bool,
    /// RFC 3339 timestamp.
    pub completed_at: String,
}

impl From<RoundResult> for RoundResultDto {
    fn from(value: RoundResult) -> Self {
        Self {
            round: value.round,
            entity_id: value.entity_id,
            entity_name: value.entity_name,
            variant_id: value.variant_id,
            shared: value.shared,
            guesses: value.guesses,
            correct: value.correct,
            hint_level: value.hint_level,
            points: value.points,
            via_generic: value.via_generic,
            completed_at: format_timestamp(value.completed_at),
        }
    }
}

/// Full quiz state, returned by every quiz route and pushed as `quiz.snapshot`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuizStateResponse {
    pub screen: VisibleScreen,
    /// Phase of the active round, absent outside a round.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_phase: Option<RoundPhase>,
    /// Bumped on every phase transition.
    pub version: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    /// Current round, 1-based; 0 before the first session.
    pub round: usize,
    pub total_rounds: usize,
    pub score: u32,
    /// Best possible score for the session.
    pub max_score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked_hint: Option<HintLevel>,
    /// Every hint the player may play right now.
    pub playable_hints: Vec<HintLevel>,
    pub guesses: Vec<String>,
    /// The round plays audio shared by several entities.
    pub generic_round: bool,
    pub playing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackDto>,
    pub accepting_input: bool,
    pub audio_error: bool,
    pub results: Vec<RoundResultDto>,
}

impl From<QuizView> for QuizStateResponse {
    fn from(view: QuizView) -> Self {
        let playable_hints = match view.unlocked_hint {
            Some(unlocked) if view.accepting_input => HintLevel::ALL
                .into_iter()
                .filter(|level| *level <= unlocked)
                .collect(),
            _ => Vec::new(),
        };

        Self {
            screen: VisibleScreen::from(&view.phase),
            round_phase: visible_round_phase(&view.phase),
            version: view.version,
            session_id: view.session_id,
            round: view.round_index,
            total_rounds: view.total_rounds,
            score: view.score,
            max_score: HintLevel::Far.points() * view.total_rounds as u32,
            unlocked_hint: view.unlocked_hint,
            playable_hints,
            guesses: view.guesses,
            generic_round: view.generic_round,
            playing: view.playing,
            audio_source: view.audio_source,
            feedback: view.feedback.map(FeedbackDto::from),
            accepting_input: view.accepting_input,
            audio_error: view.audio_error,
            results: view.results.into_iter().map(RoundResultDto::from).collect(),
        }
    }
}

/// Results screen: score, tier and per-round details.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResultsResponse {
    pub score: u32,
    pub max_score: u32,
    /// Integer percentage of `max_score`.
    pub percentage: u32,
    pub correct_rounds: usize,
    pub tier: PerformanceTier,
    pub rounds: Vec<RoundResultDto>,
}

impl From<ResultsSummary> for ResultsResponse {
    fn from(value: ResultsSummary) -> Self {
        Self {
            score: value.score,
            max_score: value.max_score,
            percentage: value.percentage,
            correct_rounds: value.correct_rounds,
            tier: value.tier,
            rounds: value.rounds.into_iter().map(RoundResultDto::from).collect(),
        }
    }
}

/// Autocomplete entry.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SuggestionDto {
    /// Text to submit when picked.
    pub display: String,
    pub entity_id: String,
    pub entity_name: String,
    pub generic: bool,
}

impl From<Suggestion> for SuggestionDto {
    fn from(value: Suggestion) -> Self {
        Self {
            display: value.display,
            entity_id: value.entity_id,
            entity_name: value.entity_name,
            generic: value.generic,
        }
    }
}

/// Response of the autocomplete route.
#[derive(Debug, Serialize, ToSchema)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<SuggestionDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guess_request_rejects_blank_and_oversized_text() {
        assert!(
            GuessRequest {
                guess: "The Nurse".into()
            }
            .validate()
            .is_ok()
        );
        assert!(GuessRequest { guess: "  ".into() }.validate().is_err());
        assert!(GuessRequest { guess: String::new() }.validate().is_err());
        assert!(
            GuessRequest {
                guess: "x".repeat(129)
            }
            .validate()
            .is_err()
        );
    }
}
