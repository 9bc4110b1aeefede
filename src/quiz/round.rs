//! Per-round state: hint progression, guess log and playback flags.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::{catalog::HintLevel, quiz::matcher::MatchOutcome};

/// Guess log entry recorded when the player skips a hint.
pub const SKIP_MARKER: &str = "Skipped";

/// Phase of the active round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Guesses accepted, at least one hint still locked.
    AwaitingInput,
    /// Every hint unlocked, one last verdict pending.
    HintExhausted,
    /// Verdict reached, waiting for the next round.
    RoundComplete,
}

/// Result of feeding a guess or a skip to a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundTransition {
    /// The guess identified the target.
    Correct {
        /// Latest unlocked level when the guess was made.
        level: HintLevel,
        /// Points awarded.
        points: u32,
        /// Whether the shared-audio category rule accepted the guess.
        via_generic: bool,
    },
    /// The next hint was unlocked.
    HintUnlocked(HintLevel),
    /// No hint left: the round is lost.
    Exhausted,
}

impl RoundTransition {
    /// Whether the transition ends the round.
    pub fn completes_round(&self) -> bool {
        !matches!(self, RoundTransition::HintUnlocked(_))
    }
}

/// Operations refused by a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RoundError {
    /// A verdict was already reached.
    #[error("round is already complete")]
    Complete,
    /// The requested hint has not been unlocked yet.
    #[error("hint `{requested}` is locked, latest unlocked is `{unlocked}`")]
    HintLocked {
        /// Level asked for.
        requested: HintLevel,
        /// Latest unlocked level.
        unlocked: HintLevel,
    },
}

/// Final verdict of a completed round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundVerdict {
    /// Level at which the target was found, `None` when it never was.
    pub level: Option<HintLevel>,
    /// Points awarded.
    pub points: u32,
    /// Whether the shared-audio category rule accepted the guess.
    pub via_generic: bool,
}

impl RoundVerdict {
    /// Whether the round was won.
    pub fn correct(&self) -> bool {
        self.level.is_some()
    }
}

/// Mutable state of the round being played.
#[derive(Debug, Clone)]
pub struct RoundState {
    /// Round number, 1-based.
    pub number: usize,
    /// Entity to identify.
    pub entity_id: String,
    /// Variant played.
    pub variant_id: String,
    /// Whether the variant is shared.
    pub shared: bool,
    hint: HintLevel,
    guesses: Vec<String>,
    playing: bool,
    hint_played: bool,
    verdict: Option<RoundVerdict>,
}

impl RoundState {
    /// Fresh round with the first hint unlocked.
    pub fn new(number: usize, entity_id: String, variant_id: String, shared: bool) -> Self {
        Self {
            number,
            entity_id,
            variant_id,
            shared,
            hint: HintLevel::Far,
            guesses: Vec::new(),
            playing: false,
            hint_played: false,
            verdict: None,
        }
    }

    /// Latest unlocked hint.
    pub fn hint(&self) -> HintLevel {
        self.hint
    }

    /// Guesses submitted so far, including skip markers.
    pub fn guesses(&self) -> &[String] {
        &self.guesses
    }

    /// Whether a segment is currently playing.
    pub fn playing(&self) -> bool {
        self.playing
    }

    /// Whether any hint has been played since the latest one was unlocked.
    pub fn hint_played(&self) -> bool {
        self.hint_played
    }

    /// Verdict, once the round is complete.
    pub fn verdict(&self) -> Option<RoundVerdict> {
        self.verdict
    }

    /// Current phase, derived from the verdict and the unlocked hint.
    pub fn phase(&self) -> RoundPhase {
        match (self.verdict, self.hint.is_last()) {
            (Some(_), _) => RoundPhase::RoundComplete,
            (None, true) => RoundPhase::HintExhausted,
            (None, false) => RoundPhase::AwaitingInput,
        }
    }

    /// Record a guess and its evaluation.
    pub fn register_guess(
        &mut self,
        guess: String,
        outcome: MatchOutcome,
    ) -> Result<RoundTransition, RoundError> {
        self.ensure_open()?;
        self.guesses.push(guess);

        if outcome.matched {
            let points = self.hint.points();
            self.verdict = Some(RoundVerdict {
                level: Some(self.hint),
                points,
                via_generic: outcome.via_generic,
            });
            self.playing = false;
            return Ok(RoundTransition::Correct {
                level: self.hint,
                points,
                via_generic: outcome.via_generic,
            });
        }

        Ok(self.advance_hint())
    }

    /// Record a skip: the guess log gets [`SKIP_MARKER`] and the next hint unlocks.
    pub fn register_skip(&mut self) -> Result<RoundTransition, RoundError> {
        self.ensure_open()?;
        self.guesses.push(SKIP_MARKER.to_string());
        Ok(self.advance_hint())
    }

    /// Mark the given hint as playing. Locked hints are refused.
    pub fn begin_playback(&mut self, level: HintLevel) -> Result<(), RoundError> {
        if level > self.hint {
            return Err(RoundError::HintLocked {
                requested: level,
                unlocked: self.hint,
            });
        }
        self.playing = true;
        self.hint_played = true;
        Ok(())
    }

    /// Mark playback as stopped.
    pub fn stop_playback(&mut self) {
        self.playing = false;
    }

    fn ensure_open(&self) -> Result<(), RoundError> {
        match self.verdict {
            Some(_) => Err(RoundError::Complete),
            None => Ok(()),
        }
    }

    fn advance_hint(&mut self) -> RoundTransition {
        self.playing = false;
        match self.hint.next() {
            Some(next) => {
                self.hint = next;
                self.hint_played = false;
                RoundTransition::HintUnlocked(next)
            }
            None => {
                self.verdict = Some(RoundVerdict {
                    level: None,
                    points: 0,
                    via_generic: false,
                });
                RoundTransition::Exhausted
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round() -> RoundState {
        RoundState::new(1, "nurse".into(), "TerrorRadius_Nurse".into(), false)
    }

    const MISS: MatchOutcome = MatchOutcome {
        matched: false,
        via_generic: false,
    };

    const HIT: MatchOutcome = MatchOutcome {
        matched: true,
        via_generic: false,
    };

    #[test]
    fn four_wrong_guesses_walk_every_hint_then_fail() {
        let mut round = round();
        let mut seen = vec![round.hint().index()];

        for attempt in 0..3 {
            let transition = round.register_guess(format!("wrong {attempt}"), MISS).unwrap();
            assert!(matches!(transition, RoundTransition::HintUnlocked(_)));
            seen.push(round.hint().index());
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(round.phase(), RoundPhase::HintExhausted);

        let last = round.register_guess("wrong 3".into(), MISS).unwrap();
        assert_eq!(last, RoundTransition::Exhausted);
        assert_eq!(round.phase(), RoundPhase::RoundComplete);
        assert_eq!(
            round.verdict(),
            Some(RoundVerdict {
                level: None,
                points: 0,
                via_generic: false
            })
        );
        assert_eq!(round.guesses().len(), 4);
    }

    #[test]
    fn correct_guess_scores_by_unlocked_level() {
        let mut round = round();
        round.register_guess("nope".into(), MISS).unwrap();

        let transition = round.register_guess("The Nurse".into(), HIT).unwrap();
        assert_eq!(
            transition,
            RoundTransition::Correct {
                level: HintLevel::Mid,
                points: 3,
                via_generic: false
            }
        );
        assert!(transition.completes_round());
        assert_eq!(round.guesses(), ["nope", "The Nurse"]);
    }

    #[test]
    fn skip_logs_marker_and_unlocks_next_hint() {
        let mut round = round();

        let transition = round.register_skip().unwrap();
        assert_eq!(transition, RoundTransition::HintUnlocked(HintLevel::Mid));
        assert_eq!(round.guesses(), [SKIP_MARKER]);
        assert!(round.verdict().is_none());
    }

    #[test]
    fn completed_round_refuses_further_input() {
        let mut round = round();
        round.register_guess("The Nurse".into(), HIT).unwrap();

        assert_eq!(round.register_skip(), Err(RoundError::Complete));
        assert_eq!(
            round.register_guess("again".into(), HIT),
            Err(RoundError::Complete)
        );
        assert_eq!(round.guesses().len(), 1);
    }

    #[test]
    fn locked_hints_cannot_be_played() {
        let mut round = round();

        assert_eq!(
            round.begin_playback(HintLevel::Close),
            Err(RoundError::HintLocked {
                requested: HintLevel::Close,
                unlocked: HintLevel::Far
            })
        );

        round.begin_playback(HintLevel::Far).unwrap();
        assert!(round.playing());
        assert!(round.hint_played());

        round.register_skip().unwrap();
        assert!(!round.playing());
        assert!(!round.hint_played());

        round.begin_playback(HintLevel::Far).unwrap();
        assert!(round.hint_played(), "replaying an older hint counts as listening");
    }
}
