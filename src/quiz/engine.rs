//! Event-driven quiz engine.
//!
//! Every public method handles one discrete event to completion and reports what the
//! caller has to do next through [`Effects`]: deferred actions to schedule, feedback and
//! round results to publish. Timers live outside the engine; a deferred action carries the
//! session and round it was scheduled for and is ignored once either has moved on.

use std::{sync::Arc, time::Duration};

use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    catalog::{Catalog, HintLevel, Segment},
    quiz::{
        audio::{AudioPlayer, PlaybackError},
        matcher::{self, Suggestion},
        round::{RoundError, RoundPhase, RoundState, RoundTransition},
        selector::SelectionError,
        session::{ResultsSummary, RoundResult, SessionProgress, SessionState},
    },
    state::state_machine::{InvalidTransition, QuizEvent, QuizPhase, QuizStateMachine},
};

/// Tunables of the engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Rounds per session.
    pub total_rounds: usize,
    /// Pause between a verdict and the next round.
    pub settle_delay: Duration,
    /// Delay before the first hint of a round plays on its own.
    pub round_autoplay_delay: Duration,
    /// Delay before a freshly unlocked hint plays on its own.
    pub hint_autoplay_delay: Duration,
    /// Prefix of audio source URLs.
    pub audio_base_url: String,
    /// Maximum number of autocomplete suggestions.
    pub suggestion_limit: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            total_rounds: 10,
            settle_delay: Duration::from_millis(2000),
            round_autoplay_delay: Duration::from_millis(300),
            hint_autoplay_delay: Duration::from_millis(500),
            audio_base_url: "/audio".into(),
            suggestion_limit: matcher::DEFAULT_SUGGESTION_LIMIT,
        }
    }
}

/// Errors surfaced to the caller of the engine.
#[derive(Debug, Error)]
pub enum QuizError {
    /// The session could not be set up.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// No session is running.
    #[error("no quiz session is running")]
    NoSession,
    /// The round is settling; input is ignored until the next one opens.
    #[error("input is disabled until the next round starts")]
    InputDisabled,
    /// The submitted guess is blank.
    #[error("guess must not be empty")]
    EmptyGuess,
    /// The round refused the request.
    #[error(transparent)]
    Round(#[from] RoundError),
    /// The event does not fit the current phase.
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
    /// The round references data missing from the catalog.
    #[error("catalog has no `{0}`")]
    MissingCatalogData(String),
}

/// Kind of feedback shown after a guess or a skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    /// The guess was right.
    Correct,
    /// The guess was wrong.
    Incorrect,
    /// The player skipped.
    Skip,
}

/// Message shown to the player after a guess or a skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    /// Tone of the message.
    pub kind: FeedbackKind,
    /// Text to display.
    pub message: String,
}

/// Work the engine wants done later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// Play a hint automatically, unless it was played in the meantime.
    PlayHint(HintLevel),
    /// Leave the settled round.
    AdvanceRound,
}

/// A deferred action bound to the session and round it was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledAction {
    /// Session that scheduled it.
    pub session_id: Uuid,
    /// Round that scheduled it.
    pub round: usize,
    /// How long to wait before running it.
    pub delay: Duration,
    /// What to run.
    pub action: DeferredAction,
}

/// What an event produced, for the caller to schedule and publish.
#[derive(Debug, Clone, Default)]
pub struct Effects {
    /// Actions to run after their delay.
    pub scheduled: Vec<ScheduledAction>,
    /// Pending actions from earlier rounds or sessions must be dropped.
    pub cancel_pending: bool,
    /// Feedback produced by the event.
    pub feedback: Option<Feedback>,
    /// Round result appended to the ledger.
    pub recorded: Option<RoundResult>,
    /// The session just reached the results screen.
    pub finished: bool,
}

/// Read-only picture of the engine state handed to presentation.
#[derive(Debug, Clone)]
pub struct QuizView {
    /// Current phase.
    pub phase: QuizPhase,
    /// Version of the phase machine, bumped on every transition.
    pub version: usize,
    /// Active session.
    pub session_id: Option<Uuid>,
    /// Current round, 1-based, 0 before the first session.
    pub round_index: usize,
    /// Rounds per session.
    pub total_rounds: usize,
    /// Cumulative score.
    pub score: u32,
    /// Latest unlocked hint.
    pub unlocked_hint: Option<HintLevel>,
    /// Guess log of the current round.
    pub guesses: Vec<String>,
    /// Whether the current round plays shared audio.
    pub generic_round: bool,
    /// Whether a segment is playing.
    pub playing: bool,
    /// Source loaded for the current round.
    pub audio_source: Option<String>,
    /// Latest feedback.
    pub feedback: Option<Feedback>,
    /// Whether guesses and skips are accepted.
    pub accepting_input: bool,
    /// Whether the audio device failed during this round.
    pub audio_error: bool,
    /// Completed rounds.
    pub results: Vec<RoundResult>,
}

/// Quiz state machine driving selection, rounds, scoring and playback.
pub struct QuizEngine<P, R> {
    catalog: Arc<Catalog>,
    settings: EngineSettings,
    player: P,
    rng: R,
    machine: QuizStateMachine,
    session: Option<SessionState>,
    feedback: Option<Feedback>,
    audio_error: bool,
    audio_source: Option<String>,
    source_loaded: bool,
    active_segment: Option<Segment>,
}

impl<P, R> QuizEngine<P, R>
where
    P: AudioPlayer,
    R: Rng,
{
    /// Build an engine on the start screen.
    pub fn new(catalog: Arc<Catalog>, settings: EngineSettings, player: P, rng: R) -> Self {
        Self {
            catalog,
            settings,
            player,
            rng,
            machine: QuizStateMachine::new(),
            session: None,
            feedback: None,
            audio_error: false,
            audio_source: None,
            source_loaded: false,
            active_segment: None,
        }
    }

    /// Catalog the engine draws from.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Engine tunables.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Current phase.
    pub fn phase(&self) -> QuizPhase {
        self.machine.phase()
    }

    /// Active session, if any.
    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    /// Playback device.
    pub fn player(&self) -> &P {
        &self.player
    }

    /// Mutable access to the playback device.
    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    /// Start a session from the start or results screen.
    ///
    /// Fails with [`SelectionError::InsufficientCatalog`] before anything changes when the
    /// catalog cannot fill a roster.
    pub fn start_session(&mut self) -> Result<Effects, QuizError> {
        self.machine.can_apply(QuizEvent::StartSession)?;
        let session =
            SessionState::start(&self.catalog, self.settings.total_rounds, &mut self.rng)?;
        self.halt_playback();
        self.session = Some(session);
        self.machine.apply(QuizEvent::StartSession)?;

        let mut effects = Effects {
            cancel_pending: true,
            ..Effects::default()
        };
        self.enter_round(&mut effects)?;
        Ok(effects)
    }

    /// Throw the current session away and start a fresh one.
    pub fn restart_session(&mut self) -> Result<Effects, QuizError> {
        let session =
            SessionState::start(&self.catalog, self.settings.total_rounds, &mut self.rng)?;
        self.halt_playback();
        if let Some(previous) = self.session.replace(session) {
            info!(previous = %previous.session_id, "session discarded");
        }
        self.machine.apply(QuizEvent::Restart)?;

        let mut effects = Effects {
            cancel_pending: true,
            ..Effects::default()
        };
        self.enter_round(&mut effects)?;
        Ok(effects)
    }

    /// Evaluate a guess for the current round.
    pub fn submit_guess(&mut self, guess: &str) -> Result<Effects, QuizError> {
        if guess.trim().is_empty() {
            return Err(QuizError::EmptyGuess);
        }
        self.ensure_accepting_input()?;
        self.halt_playback();

        let catalog = Arc::clone(&self.catalog);
        let round = self.round()?;
        let target = catalog
            .entity(&round.entity_id)
            .ok_or_else(|| QuizError::MissingCatalogData(round.entity_id.clone()))?;
        let variant = catalog
            .variant(&round.variant_id)
            .ok_or_else(|| QuizError::MissingCatalogData(round.variant_id.clone()))?;

        let outcome = matcher::evaluate(&catalog, guess, target, variant);
        debug!(
            guess = %guess.trim(),
            matched = outcome.matched,
            via_generic = outcome.via_generic,
            "guess evaluated"
        );

        let transition = self
            .round_mut()?
            .register_guess(guess.to_string(), outcome)?;
        self.handle_transition(transition, FeedbackKind::Incorrect)
    }

    /// Give up on the current hint.
    pub fn skip(&mut self) -> Result<Effects, QuizError> {
        self.ensure_accepting_input()?;
        self.halt_playback();

        let transition = self.round_mut()?.register_skip()?;
        self.handle_transition(transition, FeedbackKind::Skip)
    }

    /// Play the window of an unlocked hint.
    ///
    /// A device failure does not fail the call: it raises the audio error flag and leaves
    /// the round playable.
    pub fn play_hint(&mut self, level: HintLevel) -> Result<Effects, QuizError> {
        self.ensure_accepting_input()?;

        let round = self.round()?;
        if level > round.hint() {
            return Err(RoundError::HintLocked {
                requested: level,
                unlocked: round.hint(),
            }
            .into());
        }
        let segment = *self
            .catalog
            .variant(&round.variant_id)
            .ok_or_else(|| QuizError::MissingCatalogData(round.variant_id.clone()))?
            .segment(level);

        match self.start_segment(&segment) {
            Ok(()) => {
                self.round_mut()?.begin_playback(level)?;
                self.active_segment = Some(segment);
                debug!(hint = %level, window = %segment.window_label(), "hint playing");
            }
            Err(err) => {
                warn!(hint = %level, error = %err, "playback failed");
                self.audio_error = true;
                self.active_segment = None;
                self.round_mut()?.stop_playback();
            }
        }

        Ok(Effects::default())
    }

    /// Stop playback.
    pub fn stop_audio(&mut self) -> Result<Effects, QuizError> {
        if self.session.is_none() {
            return Err(QuizError::NoSession);
        }
        self.halt_playback();
        Ok(Effects::default())
    }

    /// Check the device position against the end of the playing window.
    ///
    /// Returns whether playback was halted.
    pub fn poll_playback(&mut self) -> bool {
        let Some(segment) = self.active_segment else {
            return false;
        };
        match self.player.position() {
            Some(position) if segment.is_past_end(position) => {
                debug!(position, "segment boundary reached");
                self.halt_playback();
                true
            }
            _ => false,
        }
    }

    /// The device reached the natural end of the source.
    pub fn on_playback_ended(&mut self) {
        if self.active_segment.is_some() {
            debug!("audio source ended");
        }
        self.active_segment = None;
        if let Some(session) = self.session.as_mut() {
            session.round_mut().stop_playback();
        }
    }

    /// The device reported an error while playing.
    pub fn on_playback_failed(&mut self, message: &str) {
        warn!(error = %message, "audio device reported a failure");
        self.audio_error = true;
        self.on_playback_ended();
    }

    /// Run a deferred action. Actions from an older session or round are ignored.
    pub fn run_deferred(&mut self, scheduled: ScheduledAction) -> Result<Effects, QuizError> {
        let current = self
            .session
            .as_ref()
            .map(|session| (session.session_id, session.round_index()));
        if current != Some((scheduled.session_id, scheduled.round)) {
            debug!(action = ?scheduled.action, "stale deferred action ignored");
            return Ok(Effects::default());
        }

        match scheduled.action {
            DeferredAction::PlayHint(level) => {
                let round = self.round()?;
                let due = self.accepting_input() && round.hint() == level && !round.hint_played();
                if !due {
                    return Ok(Effects::default());
                }
                self.play_hint(level)
            }
            DeferredAction::AdvanceRound => self.advance(),
        }
    }

    /// Autocomplete suggestions for the current round.
    pub fn suggestions(&self, query: &str) -> Vec<Suggestion> {
        let generic_round = self
            .session
            .as_ref()
            .is_some_and(|session| session.round().shared);
        matcher::suggest(
            &self.catalog,
            query,
            generic_round,
            self.settings.suggestion_limit,
        )
    }

    /// Results summary of the current session.
    pub fn summary(&self) -> Option<ResultsSummary> {
        self.session.as_ref().map(SessionState::summary)
    }

    /// Whether guesses, skips and hint requests are accepted.
    pub fn accepting_input(&self) -> bool {
        matches!(
            self.machine.phase(),
            QuizPhase::InSession(RoundPhase::AwaitingInput | RoundPhase::HintExhausted)
        )
    }

    /// Read-only picture of the current state.
    pub fn view(&self) -> QuizView {
        let snapshot = self.machine.snapshot();
        let session = self.session.as_ref();
        let round = session.map(SessionState::round);

        QuizView {
            phase: snapshot.phase,
            version: snapshot.version,
            session_id: session.map(|s| s.session_id),
            round_index: session.map(SessionState::round_index).unwrap_or_default(),
            total_rounds: session
                .map(SessionState::total_rounds)
                .unwrap_or(self.settings.total_rounds),
            score: session.map(SessionState::score).unwrap_or_default(),
            unlocked_hint: round.map(RoundState::hint),
            guesses: round.map(|r| r.guesses().to_vec()).unwrap_or_default(),
            generic_round: round.is_some_and(|r| r.shared),
            playing: round.is_some_and(RoundState::playing),
            audio_source: self.audio_source.clone(),
            feedback: self.feedback.clone(),
            accepting_input: self.accepting_input(),
            audio_error: self.audio_error,
            results: session.map(|s| s.ledger().to_vec()).unwrap_or_default(),
        }
    }

    fn advance(&mut self) -> Result<Effects, QuizError> {
        let session = self.session.as_mut().ok_or(QuizError::NoSession)?;
        let mut effects = Effects::default();

        match session.advance(&self.catalog, &mut self.rng)? {
            SessionProgress::NextRound(number) => {
                self.machine.apply(QuizEvent::NextRound)?;
                debug!(round = number, "next round");
                self.enter_round(&mut effects)?;
            }
            SessionProgress::Finished => {
                self.machine.apply(QuizEvent::Finish)?;
                self.halt_playback();
                effects.finished = true;
            }
        }

        Ok(effects)
    }

    /// Reset per-round flags, load the round's audio and queue its first hint.
    fn enter_round(&mut self, effects: &mut Effects) -> Result<(), QuizError> {
        self.feedback = None;
        self.audio_error = false;
        self.active_segment = None;

        let round = self.round()?;
        let source = format!(
            "{}/{}.ogg",
            self.settings.audio_base_url.trim_end_matches('/'),
            round.variant_id
        );
        let number = round.number;

        self.source_loaded = match self.player.load(&source) {
            Ok(()) => true,
            Err(err) => {
                warn!(source = %source, error = %err, "failed to load audio source");
                self.audio_error = true;
                false
            }
        };
        self.audio_source = Some(source);

        effects.scheduled.push(self.schedule(
            number,
            self.settings.round_autoplay_delay,
            DeferredAction::PlayHint(HintLevel::Far),
        )?);
        Ok(())
    }

    fn handle_transition(
        &mut self,
        transition: RoundTransition,
        miss_kind: FeedbackKind,
    ) -> Result<Effects, QuizError> {
        let entity_name = self.target_name()?;
        let number = self.round()?.number;
        let mut effects = Effects::default();

        let feedback = match transition {
            RoundTransition::Correct {
                points,
                via_generic,
                ..
            } => {
                let plural = if points == 1 { "" } else { "s" };
                let message = if via_generic {
                    format!("Correct! Generic theme - {entity_name} (+{points} point{plural})")
                } else {
                    format!("Correct! It was {entity_name} (+{points} point{plural})")
                };
                Feedback {
                    kind: FeedbackKind::Correct,
                    message,
                }
            }
            RoundTransition::HintUnlocked(level) => {
                let prefix = match miss_kind {
                    FeedbackKind::Skip => "Skipped!",
                    _ => "Wrong!",
                };
                Feedback {
                    kind: miss_kind,
                    message: format!(
                        "{prefix} Next hint unlocked: {}",
                        level.label().to_uppercase()
                    ),
                }
            }
            RoundTransition::Exhausted => {
                let message = match miss_kind {
                    FeedbackKind::Skip => format!("Skipped! It was {entity_name}"),
                    _ => format!("Out of hints! It was {entity_name}"),
                };
                Feedback {
                    kind: miss_kind,
                    message,
                }
            }
        };

        match transition {
            RoundTransition::HintUnlocked(level) => {
                self.machine.apply(QuizEvent::HintUnlocked {
                    last: level.is_last(),
                })?;
                effects.scheduled.push(self.schedule(
                    number,
                    self.settings.hint_autoplay_delay,
                    DeferredAction::PlayHint(level),
                )?);
            }
            RoundTransition::Correct { .. } | RoundTransition::Exhausted => {
                self.machine.apply(QuizEvent::RoundCompleted)?;
                let session = self.session.as_mut().ok_or(QuizError::NoSession)?;
                let verdict = session
                    .round()
                    .verdict()
                    .ok_or(QuizError::Round(RoundError::Complete))?;
                let recorded = session.record(&self.catalog, verdict).clone();
                info!(
                    round = recorded.round,
                    entity = %recorded.entity_id,
                    correct = recorded.correct,
                    points = recorded.points,
                    score = session.score(),
                    "round complete"
                );
                effects.recorded = Some(recorded);
                effects.scheduled.push(self.schedule(
                    number,
                    self.settings.settle_delay,
                    DeferredAction::AdvanceRound,
                )?);
            }
        }

        self.feedback = Some(feedback.clone());
        effects.feedback = Some(feedback);
        Ok(effects)
    }

    fn schedule(
        &self,
        round: usize,
        delay: Duration,
        action: DeferredAction,
    ) -> Result<ScheduledAction, QuizError> {
        let session = self.session.as_ref().ok_or(QuizError::NoSession)?;
        Ok(ScheduledAction {
            session_id: session.session_id,
            round,
            delay,
            action,
        })
    }

    fn start_segment(&mut self, segment: &Segment) -> Result<(), PlaybackError> {
        if !self.source_loaded {
            let source = self.audio_source.as_deref().ok_or(PlaybackError::NoSource)?;
            self.player.load(source)?;
            self.source_loaded = true;
        }
        self.player.seek_and_play(segment.start)
    }

    fn halt_playback(&mut self) {
        let was_playing = self.active_segment.take().is_some()
            || self
                .session
                .as_ref()
                .is_some_and(|session| session.round().playing());
        if let Some(session) = self.session.as_mut() {
            session.round_mut().stop_playback();
        }
        if was_playing {
            if let Err(err) = self.player.pause() {
                warn!(error = %err, "failed to pause audio");
            }
        }
    }

    fn ensure_accepting_input(&self) -> Result<(), QuizError> {
        match self.machine.phase() {
            QuizPhase::InSession(RoundPhase::AwaitingInput | RoundPhase::HintExhausted) => Ok(()),
            QuizPhase::InSession(RoundPhase::RoundComplete) => Err(QuizError::InputDisabled),
            QuizPhase::PreSession | QuizPhase::Results => Err(QuizError::NoSession),
        }
    }

    fn target_name(&self) -> Result<String, QuizError> {
        let round = self.round()?;
        self.catalog
            .entity(&round.entity_id)
            .map(|entity| entity.name.clone())
            .ok_or_else(|| QuizError::MissingCatalogData(round.entity_id.clone()))
    }

    fn round(&self) -> Result<&RoundState, QuizError> {
        self.session
            .as_ref()
            .map(SessionState::round)
            .ok_or(QuizError::NoSession)
    }

    fn round_mut(&mut self) -> Result<&mut RoundState, QuizError> {
        self.session
            .as_mut()
            .map(SessionState::round_mut)
            .ok_or(QuizError::NoSession)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        catalog::fixtures,
        quiz::{
            audio::fake::{FakePlayer, PlayerCall},
            round::SKIP_MARKER,
        },
    };

    type TestEngine = QuizEngine<FakePlayer, StdRng>;

    fn engine_with(catalog: Catalog, seed: u64) -> TestEngine {
        QuizEngine::new(
            Arc::new(catalog),
            EngineSettings::default(),
            FakePlayer::default(),
            StdRng::seed_from_u64(seed),
        )
    }

    fn engine(seed: u64) -> TestEngine {
        engine_with(Catalog::builtin().unwrap(), seed)
    }

    fn target(engine: &TestEngine) -> (String, String) {
        let round = engine.session().unwrap().round();
        let entity = engine.catalog().entity(&round.entity_id).unwrap();
        (entity.id.clone(), entity.name.clone())
    }

    fn wrong_answer(engine: &TestEngine) -> &'static str {
        let (id, _) = target(engine);
        if id == "nurse" { "The Doctor" } else { "The Nurse" }
    }

    fn only_scheduled(effects: &Effects) -> ScheduledAction {
        assert_eq!(effects.scheduled.len(), 1, "{effects:?}");
        effects.scheduled[0]
    }

    #[test]
    fn starting_a_session_loads_audio_and_queues_first_hint() {
        let mut engine = engine(1);
        let effects = engine.start_session().unwrap();

        assert_eq!(
            engine.phase(),
            QuizPhase::InSession(RoundPhase::AwaitingInput)
        );
        assert!(effects.cancel_pending);
        let scheduled = only_scheduled(&effects);
        assert_eq!(scheduled.action, DeferredAction::PlayHint(HintLevel::Far));
        assert_eq!(scheduled.delay, Duration::from_millis(300));
        assert_eq!(scheduled.round, 1);

        let variant = engine.session().unwrap().round().variant_id.clone();
        assert_eq!(
            engine.player().calls,
            vec![PlayerCall::Load(format!("/audio/{variant}.ogg"))]
        );

        engine.run_deferred(scheduled).unwrap();
        let far = engine
            .catalog()
            .variant(&variant)
            .unwrap()
            .segment(HintLevel::Far)
            .start;
        assert_eq!(engine.player().plays(), vec![far]);
        assert!(engine.view().playing);
    }

    #[test]
    fn four_wrong_guesses_unlock_every_hint_then_fail_the_round() {
        let mut engine = engine(2);
        engine.start_session().unwrap();
        let (entity, name) = target(&engine);
        let wrong = wrong_answer(&engine);

        let mut hints = vec![engine.view().unlocked_hint.unwrap().index()];
        for _ in 0..3 {
            let effects = engine.submit_guess(wrong).unwrap();
            let level = engine.view().unlocked_hint.unwrap();
            hints.push(level.index());
            assert_eq!(
                only_scheduled(&effects).action,
                DeferredAction::PlayHint(level)
            );
            assert_eq!(
                effects.feedback.unwrap().message,
                format!("Wrong! Next hint unlocked: {}", level.label().to_uppercase())
            );
        }
        assert_eq!(hints, vec![0, 1, 2, 3]);
        assert_eq!(
            engine.phase(),
            QuizPhase::InSession(RoundPhase::HintExhausted)
        );

        let effects = engine.submit_guess(wrong).unwrap();
        let result = effects.recorded.as_ref().unwrap();
        assert_eq!(result.entity_id, entity);
        assert!(!result.correct);
        assert_eq!(result.hint_level, None);
        assert_eq!(result.points, 0);
        assert_eq!(result.guesses.len(), 4);
        assert_eq!(
            effects.feedback.as_ref().unwrap().message,
            format!("Out of hints! It was {name}")
        );
        assert_eq!(
            only_scheduled(&effects).action,
            DeferredAction::AdvanceRound
        );
        assert!(!engine.accepting_input());
    }

    #[test]
    fn correct_guess_scores_and_disables_input_until_next_round() {
        let mut engine = engine(3);
        engine.start_session().unwrap();
        let wrong = wrong_answer(&engine);
        let (_, name) = target(&engine);

        engine.submit_guess(wrong).unwrap();
        let effects = engine.submit_guess(&name.to_uppercase()).unwrap();

        let result = effects.recorded.as_ref().unwrap();
        assert!(result.correct);
        assert_eq!(result.hint_level, Some(HintLevel::Mid));
        assert_eq!(result.points, 3);
        assert_eq!(
            effects.feedback.as_ref().unwrap().message,
            format!("Correct! It was {name} (+3 points)")
        );
        assert_eq!(engine.view().score, 3);

        assert!(matches!(
            engine.submit_guess(&name),
            Err(QuizError::InputDisabled)
        ));
        assert!(matches!(engine.skip(), Err(QuizError::InputDisabled)));

        let advance = only_scheduled(&effects);
        assert_eq!(advance.delay, Duration::from_millis(2000));
        let next = engine.run_deferred(advance).unwrap();
        assert_eq!(engine.view().round_index, 2);
        assert_eq!(engine.view().unlocked_hint, Some(HintLevel::Far));
        assert!(engine.view().guesses.is_empty());
        assert!(engine.view().feedback.is_none());
        assert_eq!(
            only_scheduled(&next).action,
            DeferredAction::PlayHint(HintLevel::Far)
        );
    }

    #[test]
    fn skip_logs_marker_and_keeps_score() {
        let mut engine = engine(4);
        engine.start_session().unwrap();

        let effects = engine.skip().unwrap();

        let view = engine.view();
        assert_eq!(view.guesses, vec![SKIP_MARKER.to_string()]);
        assert_eq!(view.unlocked_hint, Some(HintLevel::Mid));
        assert_eq!(view.score, 0);
        let feedback = effects.feedback.unwrap();
        assert_eq!(feedback.kind, FeedbackKind::Skip);
        assert_eq!(feedback.message, "Skipped! Next hint unlocked: MID");
    }

    #[test]
    fn skipping_the_last_hint_reveals_the_answer() {
        let mut engine = engine(5);
        engine.start_session().unwrap();
        let (_, name) = target(&engine);

        for _ in 0..3 {
            engine.skip().unwrap();
        }
        let effects = engine.skip().unwrap();

        assert_eq!(
            effects.feedback.unwrap().message,
            format!("Skipped! It was {name}")
        );
        let result = effects.recorded.unwrap();
        assert_eq!(result.guesses, vec![SKIP_MARKER.to_string(); 4]);
    }

    #[test]
    fn playback_stops_at_segment_boundary() {
        let mut engine = engine(6);
        engine.start_session().unwrap();
        let variant = engine.session().unwrap().round().variant_id.clone();
        let far = *engine
            .catalog()
            .variant(&variant)
            .unwrap()
            .segment(HintLevel::Far);
        let end = far.end.unwrap();

        engine.play_hint(HintLevel::Far).unwrap();
        engine.player_mut().advance_to(end - 0.5);
        assert!(!engine.poll_playback());
        assert!(engine.view().playing);

        engine.player_mut().advance_to(end);
        assert!(engine.poll_playback());
        assert!(!engine.view().playing);
        assert_eq!(engine.player().calls.last(), Some(&PlayerCall::Pause));
        assert!(!engine.poll_playback());
    }

    #[test]
    fn open_ended_segment_plays_until_the_source_ends() {
        let mut engine = engine(7);
        engine.start_session().unwrap();
        for _ in 0..3 {
            engine.skip().unwrap();
        }

        engine.play_hint(HintLevel::Chase).unwrap();
        engine.player_mut().advance_to(10_000.0);
        assert!(!engine.poll_playback());
        assert!(engine.view().playing);

        engine.on_playback_ended();
        assert!(!engine.view().playing);
    }

    #[test]
    fn locked_hints_are_refused() {
        let mut engine = engine(8);
        engine.start_session().unwrap();

        let err = engine.play_hint(HintLevel::Close).unwrap_err();
        assert!(matches!(
            err,
            QuizError::Round(RoundError::HintLocked { .. })
        ));
        assert!(engine.player().plays().is_empty());
    }

    #[test]
    fn playback_failure_flags_audio_error_and_keeps_input_open() {
        let mut engine = engine(9);
        engine.start_session().unwrap();
        engine.player_mut().fail_play = true;

        engine.play_hint(HintLevel::Far).unwrap();

        let view = engine.view();
        assert!(view.audio_error);
        assert!(view.accepting_input);
        assert!(!view.playing);
        assert_eq!(view.unlocked_hint, Some(HintLevel::Far));

        let wrong = wrong_answer(&engine);
        engine.submit_guess(wrong).unwrap();
        assert_eq!(engine.view().unlocked_hint, Some(HintLevel::Mid));
    }

    #[test]
    fn deferred_actions_from_a_previous_session_are_ignored() {
        let mut engine = engine(10);
        let first = engine.start_session().unwrap();
        let stale = only_scheduled(&first);

        let restarted = engine.restart_session().unwrap();
        assert!(restarted.cancel_pending);
        assert_ne!(
            engine.session().unwrap().session_id,
            stale.session_id
        );

        engine.run_deferred(stale).unwrap();
        assert!(engine.player().plays().is_empty());
    }

    #[test]
    fn autoplay_skips_a_hint_already_played() {
        let mut engine = engine(11);
        engine.start_session().unwrap();
        let wrong = wrong_answer(&engine);

        let effects = engine.submit_guess(wrong).unwrap();
        engine.play_hint(HintLevel::Mid).unwrap();
        let plays = engine.player().plays().len();

        engine.run_deferred(only_scheduled(&effects)).unwrap();
        assert_eq!(engine.player().plays().len(), plays);
    }

    #[test]
    fn restart_discards_score_and_ledger() {
        let mut engine = engine(12);
        engine.start_session().unwrap();
        let (_, name) = target(&engine);
        engine.submit_guess(&name).unwrap();
        assert_eq!(engine.view().score, 4);

        engine.restart_session().unwrap();

        let view = engine.view();
        assert_eq!(view.score, 0);
        assert!(view.results.is_empty());
        assert_eq!(view.round_index, 1);
        assert!(view.accepting_input);
    }

    #[test]
    fn whole_session_reaches_results() {
        let mut engine = engine(13);
        engine.start_session().unwrap();

        let mut finished = false;
        while !finished {
            let (_, name) = target(&engine);
            let effects = engine.submit_guess(&name).unwrap();
            let advance = only_scheduled(&effects);
            finished = engine.run_deferred(advance).unwrap().finished;
        }

        assert_eq!(engine.phase(), QuizPhase::Results);
        let summary = engine.summary().unwrap();
        assert_eq!(summary.score, 40);
        assert_eq!(summary.correct_rounds, 10);
        assert!(matches!(engine.skip(), Err(QuizError::NoSession)));

        engine.start_session().unwrap();
        assert_eq!(engine.view().score, 0);
    }

    #[test]
    fn generic_guess_is_accepted_on_shared_audio() {
        let catalog = Arc::new(Catalog::builtin().unwrap());
        let mut engine = (0..500)
            .map(|seed| {
                let mut engine = QuizEngine::new(
                    Arc::clone(&catalog),
                    EngineSettings::default(),
                    FakePlayer::default(),
                    StdRng::seed_from_u64(seed),
                );
                engine.start_session().unwrap();
                engine
            })
            .find(|engine| engine.session().unwrap().round().shared)
            .expect("some seed opens on shared audio");

        let (target_id, name) = target(&engine);
        let other = if target_id == "trapper" { "The Wraith" } else { "The Trapper" };
        assert!(engine.suggestions("trap").iter().all(|s| s.generic));

        let effects = engine.submit_guess(&format!("Generic ({other})")).unwrap();
        let result = effects.recorded.unwrap();
        assert!(result.correct);
        assert!(result.via_generic);
        assert_eq!(
            effects.feedback.unwrap().message,
            format!("Correct! Generic theme - {name} (+4 points)")
        );
    }

    #[test]
    fn empty_guess_and_missing_session_are_errors() {
        let mut engine = engine(14);
        assert!(matches!(engine.submit_guess("x"), Err(QuizError::NoSession)));
        assert!(matches!(engine.stop_audio(), Err(QuizError::NoSession)));

        engine.start_session().unwrap();
        assert!(matches!(engine.submit_guess("   "), Err(QuizError::EmptyGuess)));
        assert!(engine.view().guesses.is_empty());
    }

    #[test]
    fn replaying_an_older_hint_cancels_the_pending_autoplay() {
        let mut engine = engine(16);
        engine.start_session().unwrap();

        let effects = engine.skip().unwrap();
        let autoplay = only_scheduled(&effects);
        assert_eq!(autoplay.action, DeferredAction::PlayHint(HintLevel::Mid));

        engine.play_hint(HintLevel::Far).unwrap();
        let plays = engine.player().plays().len();
        engine.run_deferred(autoplay).unwrap();
        assert_eq!(engine.player().plays().len(), plays);
    }

    #[test]
    fn guess_log_keeps_the_text_as_typed() {
        let mut engine = engine(15);
        engine.start_session().unwrap();
        let (_, name) = target(&engine);

        engine.submit_guess("  zzz nobody  ").unwrap();
        assert_eq!(engine.view().guesses, vec!["  zzz nobody  ".to_string()]);

        let padded = format!("\t{name}  ");
        let effects = engine.submit_guess(&padded).unwrap();
        let result = effects.recorded.as_ref().unwrap();
        assert!(result.correct);
        assert_eq!(result.guesses, vec!["  zzz nobody  ".to_string(), padded]);
    }

    #[test]
    fn small_catalog_refuses_to_start() {
        let mut engine = engine_with(fixtures::catalog(4, 0, 0), 0);

        let err = engine.start_session().unwrap_err();
        assert!(matches!(
            err,
            QuizError::Selection(SelectionError::InsufficientCatalog { .. })
        ));
        assert_eq!(engine.phase(), QuizPhase::PreSession);
    }
}
