use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    catalog::HintLevel,
    dto::quiz::{
        GuessRequest, QuizStateResponse, ResultsResponse, SuggestionsQuery,
        SuggestionsResponse,
    },
    error::AppError,
    services::quiz_service,
    state::SharedState,
};

/// Routes driving the quiz session.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/quiz/state", get(get_state))
        .route("/quiz/start", post(start_session))
        .route("/quiz/restart", post(restart_session))
        .route("/quiz/guess", post(submit_guess))
        .route("/quiz/skip", post(skip_hint))
        .route("/quiz/hints/{level}/play", post(play_hint))
        .route("/quiz/audio/stop", post(stop_audio))
        .route("/quiz/results", get(get_results))
        .route("/quiz/suggestions", get(get_suggestions))
}

/// Current quiz state.
#[utoipa::path(
    get,
    path = "/quiz/state",
    tag = "quiz",
    responses(
        (status = 200, description = "Current quiz state", body = QuizStateResponse)
    )
)]
pub async fn get_state(State(state): State<SharedState>) -> Json<QuizStateResponse> {
    Json(quiz_service::current_state(&state).await)
}

/// Start a session from the start or results screen.
#[utoipa::path(
    post,
    path = "/quiz/start",
    tag = "quiz",
    responses(
        (status = 200, description = "Session started", body = QuizStateResponse),
        (status = 409, description = "A session is running or the catalog is too small")
    )
)]
pub async fn start_session(
    State(state): State<SharedState>,
) -> Result<Json<QuizStateResponse>, AppError> {
    let response = quiz_service::start(&state).await?;
    Ok(Json(response))
}

/// Discard the running session and start a new one.
#[utoipa::path(
    post,
    path = "/quiz/restart",
    tag = "quiz",
    responses(
        (status = 200, description = "Session restarted", body = QuizStateResponse),
        (status = 409, description = "The catalog is too small")
    )
)]
pub async fn restart_session(
    State(state): State<SharedState>,
) -> Result<Json<QuizStateResponse>, AppError> {
    let response = quiz_service::restart(&state).await?;
    Ok(Json(response))
}

/// Submit a guess for the current round.
#[utoipa::path(
    post,
    path = "/quiz/guess",
    tag = "quiz",
    request_body = GuessRequest,
    responses(
        (status = 200, description = "Guess evaluated", body = QuizStateResponse),
        (status = 400, description = "Blank or oversized guess"),
        (status = 409, description = "No round is accepting input")
    )
)]
pub async fn submit_guess(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<GuessRequest>>,
) -> Result<Json<QuizStateResponse>, AppError> {
    let response = quiz_service::guess(&state, &payload).await?;
    Ok(Json(response))
}

/// Skip the current hint.
#[utoipa::path(
    post,
    path = "/quiz/skip",
    tag = "quiz",
    responses(
        (status = 200, description = "Hint skipped", body = QuizStateResponse),
        (status = 409, description = "No round is accepting input")
    )
)]
pub async fn skip_hint(
    State(state): State<SharedState>,
) -> Result<Json<QuizStateResponse>, AppError> {
    let response = quiz_service::skip(&state).await?;
    Ok(Json(response))
}

/// Play the window of an unlocked hint.
#[utoipa::path(
    post,
    path = "/quiz/hints/{level}/play",
    tag = "quiz",
    params(("level" = HintLevel, Path, description = "Hint level to play: far, mid, close or chase")),
    responses(
        (status = 200, description = "Playback requested; check `audio_error`", body = QuizStateResponse),
        (status = 400, description = "Unknown hint level"),
        (status = 409, description = "Hint locked or no round is accepting input")
    )
)]
pub async fn play_hint(
    State(state): State<SharedState>,
    Path(level): Path<HintLevel>,
) -> Result<Json<QuizStateResponse>, AppError> {
    let response = quiz_service::play_hint(&state, level).await?;
    Ok(Json(response))
}

/// Stop playback.
#[utoipa::path(
    post,
    path = "/quiz/audio/stop",
    tag = "quiz",
    responses(
        (status = 200, description = "Playback stopped", body = QuizStateResponse),
        (status = 409, description = "No session")
    )
)]
pub async fn stop_audio(
    State(state): State<SharedState>,
) -> Result<Json<QuizStateResponse>, AppError> {
    let response = quiz_service::stop_audio(&state).await?;
    Ok(Json(response))
}

/// Score, performance tier and per-round details of the current or last session.
#[utoipa::path(
    get,
    path = "/quiz/results",
    tag = "quiz",
    responses(
        (status = 200, description = "Results summary", body = ResultsResponse),
        (status = 404, description = "No session has been played")
    )
)]
pub async fn get_results(
    State(state): State<SharedState>,
) -> Result<Json<ResultsResponse>, AppError> {
    let response = quiz_service::results(&state).await?;
    Ok(Json(response))
}

/// Autocomplete suggestions for the answer box.
#[utoipa::path(
    get,
    path = "/quiz/suggestions",
    tag = "quiz",
    params(SuggestionsQuery),
    responses(
        (status = 200, description = "Matching names", body = SuggestionsResponse)
    )
)]
pub async fn get_suggestions(
    State(state): State<SharedState>,
    Valid(Query(query)): Valid<Query<SuggestionsQuery>>,
) -> Json<SuggestionsResponse> {
    Json(quiz_service::suggestions(&state, &query.q).await)
}
