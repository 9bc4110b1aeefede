//! Quiz operations exposed over HTTP and the audio socket.
//!
//! Each operation handles one event while holding the engine lock, then publishes what the
//! engine reported: timers to arm or drop, feedback, results and a fresh snapshot.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    catalog::HintLevel,
    dto::quiz::{
        GuessRequest, QuizStateResponse, ResultsResponse, SuggestionDto, SuggestionsResponse,
    },
    error::ServiceError,
    quiz::{Effects, QuizError, engine::ScheduledAction},
    services::sse_events,
    state::{SharedEngine, SharedState},
};

/// Start a session from the start or results screen.
pub async fn start(state: &SharedState) -> Result<QuizStateResponse, ServiceError> {
    let response = run_event(state, "start", SharedEngine::start_session).await?;
    info!(session = ?response.session_id, rounds = response.total_rounds, "quiz session started");
    Ok(response)
}

/// Throw the running session away and start over.
pub async fn restart(state: &SharedState) -> Result<QuizStateResponse, ServiceError> {
    let response = run_event(state, "restart", SharedEngine::restart_session).await?;
    info!(session = ?response.session_id, "quiz session restarted");
    Ok(response)
}

/// Submit a guess for the current round.
pub async fn guess(
    state: &SharedState,
    request: &GuessRequest,
) -> Result<QuizStateResponse, ServiceError> {
    run_event(state, "guess", |engine| engine.submit_guess(&request.guess)).await
}

/// Skip the current hint.
pub async fn skip(state: &SharedState) -> Result<QuizStateResponse, ServiceError> {
    run_event(state, "skip", SharedEngine::skip).await
}

/// Play an unlocked hint window.
pub async fn play_hint(
    state: &SharedState,
    level: HintLevel,
) -> Result<QuizStateResponse, ServiceError> {
    run_event(state, "play_hint", |engine| engine.play_hint(level)).await
}

/// Stop playback.
pub async fn stop_audio(state: &SharedState) -> Result<QuizStateResponse, ServiceError> {
    run_event(state, "stop_audio", SharedEngine::stop_audio).await
}

/// Current quiz state, without publishing anything.
pub async fn current_state(state: &SharedState) -> QuizStateResponse {
    let engine = state.quiz().lock().await;
    engine.view().into()
}

/// Summary of the current or last session.
pub async fn results(state: &SharedState) -> Result<ResultsResponse, ServiceError> {
    let engine = state.quiz().lock().await;
    engine
        .summary()
        .map(ResultsResponse::from)
        .ok_or_else(|| ServiceError::NotFound("no quiz session has been played".into()))
}

/// Autocomplete suggestions for the current round.
pub async fn suggestions(state: &SharedState, query: &str) -> SuggestionsResponse {
    let engine = state.quiz().lock().await;
    SuggestionsResponse {
        suggestions: engine
            .suggestions(query)
            .into_iter()
            .map(SuggestionDto::from)
            .collect(),
    }
}

/// Run a deferred action whose timer fired.
pub async fn run_deferred(
    state: &SharedState,
    scheduled: ScheduledAction,
) -> Result<(), ServiceError> {
    let mut engine = state.quiz().lock().await;
    let effects = engine.run_deferred(scheduled)?;
    publish(state, &engine, effects);
    Ok(())
}

/// An audio device reported its position; halt playback at the end of the window.
pub async fn playback_progress(state: &SharedState) {
    let mut engine = state.quiz().lock().await;
    if engine.poll_playback() {
        publish(state, &engine, Effects::default());
    }
}

/// An audio device played the source to its end.
pub async fn playback_ended(state: &SharedState) {
    let mut engine = state.quiz().lock().await;
    engine.on_playback_ended();
    publish(state, &engine, Effects::default());
}

/// An audio device failed to play.
pub async fn playback_failed(state: &SharedState, message: &str) {
    let mut engine = state.quiz().lock().await;
    engine.on_playback_failed(message);
    publish(state, &engine, Effects::default());
}

async fn run_event<F>(
    state: &SharedState,
    event: &'static str,
    handler: F,
) -> Result<QuizStateResponse, ServiceError>
where
    F: FnOnce(&mut SharedEngine) -> Result<Effects, QuizError>,
{
    let mut engine = state.quiz().lock().await;
    let effects = handler(&mut *engine).map_err(|err| {
        debug!(event, error = %err, "quiz event refused");
        ServiceError::from(err)
    })?;
    Ok(publish(state, &engine, effects))
}

/// Arm or drop timers and broadcast what the event produced. Runs under the engine lock
/// so events reach subscribers in the order they were handled.
fn publish(state: &SharedState, engine: &SharedEngine, effects: Effects) -> QuizStateResponse {
    if effects.cancel_pending {
        let cancelled = state.scheduler().cancel_all();
        if cancelled > 0 {
            debug!(cancelled, "pending quiz timers dropped");
        }
    }
    for scheduled in effects.scheduled {
        schedule(state, scheduled);
    }

    let view = engine.view();
    let round = view.round_index;
    if let Some(feedback) = effects.feedback {
        sse_events::broadcast_feedback(state, round, feedback.into());
    }
    if let Some(recorded) = effects.recorded {
        sse_events::broadcast_round_result(state, recorded.into());
    }
    if effects.finished {
        if let Some(summary) = engine.summary() {
            info!(
                score = summary.score,
                percentage = summary.percentage,
                tier = ?summary.tier,
                "quiz session finished"
            );
            sse_events::broadcast_session_finished(state, summary.into());
        }
    }

    let response = QuizStateResponse::from(view);
    sse_events::broadcast_snapshot(state, &response);
    response
}

fn schedule(state: &SharedState, scheduled: ScheduledAction) {
    let id = state.scheduler().reserve();
    let task_state = Arc::clone(state);
    let handle = tokio::spawn(async move {
        tokio::time::sleep(scheduled.delay).await;
        task_state.scheduler().complete(id);
        if let Err(err) = run_deferred(&task_state, scheduled).await {
            warn!(action = ?scheduled.action, error = %err, "deferred quiz action failed");
        }
    });
    state.scheduler().track(id, handle.abort_handle());
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        catalog::Catalog, config::AppConfig, dto::phase::VisibleScreen, quiz::round::RoundPhase,
        state::AppState,
    };

    fn seeded_state(rounds: usize) -> SharedState {
        let config = AppConfig::from_json_str(&format!(
            r#"{{ "total_rounds": {rounds}, "rng_seed": 7 }}"#
        ))
        .unwrap();
        AppState::new(config, Catalog::builtin().unwrap())
    }

    async fn target_name(state: &SharedState) -> String {
        let engine = state.quiz().lock().await;
        let id = engine.session().unwrap().round().entity_id.clone();
        state.catalog().entity(&id).unwrap().name.clone()
    }

    fn guess_of(text: impl Into<String>) -> GuessRequest {
        GuessRequest { guess: text.into() }
    }

    #[tokio::test]
    async fn guess_without_session_is_a_conflict() {
        let state = seeded_state(3);
        let err = guess(&state, &guess_of("The Nurse")).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let err = results(&state).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn correct_guess_advances_after_settle_delay() {
        let state = seeded_state(2);
        let started = start(&state).await.unwrap();
        assert_eq!(started.round, 1);
        assert_eq!(started.screen, VisibleScreen::Round);

        let name = target_name(&state).await;
        let settled = guess(&state, &guess_of(name)).await.unwrap();
        assert_eq!(settled.round_phase, Some(RoundPhase::RoundComplete));
        assert_eq!(settled.score, 4);
        assert!(!settled.accepting_input);

        let err = skip(&state).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        tokio::time::sleep(Duration::from_millis(2100)).await;
        let next = current_state(&state).await;
        assert_eq!(next.round, 2);
        assert_eq!(next.round_phase, Some(RoundPhase::AwaitingInput));
        assert_eq!(next.results.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn last_round_opens_the_results_screen() {
        let state = seeded_state(1);
        start(&state).await.unwrap();
        for _ in 0..4 {
            skip(&state).await.unwrap();
        }

        tokio::time::sleep(Duration::from_millis(2100)).await;
        let finished = current_state(&state).await;
        assert_eq!(finished.screen, VisibleScreen::Results);

        let summary = results(&state).await.unwrap();
        assert_eq!(summary.score, 0);
        assert_eq!(summary.max_score, 4);
        assert_eq!(summary.rounds[0].guesses, vec!["Skipped"; 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_drops_pending_timers() {
        let state = seeded_state(3);
        start(&state).await.unwrap();
        let name = target_name(&state).await;
        guess(&state, &guess_of(name)).await.unwrap();

        let restarted = restart(&state).await.unwrap();
        assert_eq!(restarted.round, 1);
        assert_eq!(restarted.score, 0);
        assert_eq!(state.scheduler().pending(), 1);

        tokio::time::sleep(Duration::from_millis(2100)).await;
        let current = current_state(&state).await;
        assert_eq!(current.round, 1);
        assert_eq!(current.session_id, restarted.session_id);
        assert!(current.accepting_input);
    }

    #[tokio::test(start_paused = true)]
    async fn round_autoplay_without_device_raises_audio_error() {
        let state = seeded_state(3);
        let started = start(&state).await.unwrap();
        assert!(!started.audio_error);

        tokio::time::sleep(Duration::from_millis(400)).await;
        let current = current_state(&state).await;
        assert!(current.audio_error);
        assert!(!current.playing);
        assert!(current.accepting_input);
    }

    #[tokio::test]
    async fn events_are_published_in_handling_order() {
        let state = seeded_state(3);
        let mut receiver = state.public_sse().subscribe();

        start(&state).await.unwrap();
        guess(&state, &guess_of("zzz")).await.unwrap();

        let names: Vec<String> = std::iter::from_fn(|| receiver.try_recv().ok())
            .filter_map(|event| event.event)
            .collect();
        assert_eq!(
            names,
            vec!["quiz.snapshot", "quiz.feedback", "quiz.snapshot"]
        );
    }

    #[tokio::test]
    async fn hints_beyond_the_unlocked_one_are_refused() {
        let state = seeded_state(3);
        start(&state).await.unwrap();

        let err = play_hint(&state, HintLevel::Close).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }
}
