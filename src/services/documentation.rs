use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Dread Quiz Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::websocket::ws_handler,
        crate::routes::quiz::get_state,
        crate::routes::quiz::start_session,
        crate::routes::quiz::restart_session,
        crate::routes::quiz::submit_guess,
        crate::routes::quiz::skip_hint,
        crate::routes::quiz::play_hint,
        crate::routes::quiz::stop_audio,
        crate::routes::quiz::get_results,
        crate::routes::quiz::get_suggestions,
        crate::routes::catalog::list_entities,
        crate::routes::catalog::get_entity,
        crate::routes::catalog::get_stats,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::ws::AudioDeviceInbound,
            crate::dto::ws::AudioDeviceAck,
            crate::dto::ws::AudioCommand,
            crate::dto::sse::Handshake,
            crate::dto::sse::FeedbackEvent,
            crate::dto::sse::AudioDevicesEvent,
            crate::dto::quiz::GuessRequest,
            crate::dto::quiz::QuizStateResponse,
            crate::dto::quiz::ResultsResponse,
            crate::dto::quiz::RoundResultDto,
            crate::dto::quiz::FeedbackDto,
            crate::dto::quiz::SuggestionsResponse,
            crate::dto::catalog::EntityListResponse,
            crate::dto::catalog::EntityDetailResponse,
            crate::dto::catalog::CatalogStatsResponse,
            crate::catalog::HintLevel,
            crate::catalog::EntityFilter,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "quiz", description = "Quiz session, rounds and results"),
        (name = "catalog", description = "Entities, variants and hint windows"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "audio", description = "WebSocket operations for audio devices"),
    )
)]
pub struct ApiDoc;
