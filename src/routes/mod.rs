use axum::Router;
use tower_http::services::ServeDir;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

pub mod catalog;
pub mod health;
pub mod quiz;
pub mod sse;
pub mod websocket;

/// Mount point of the optional audio directory.
const AUDIO_MOUNT: &str = "/audio";
/// Location of the generated OpenAPI document, rendered by the Swagger UI at `/docs`.
const OPENAPI_PATH: &str = "/api-doc/openapi.json";

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let mut api_router = health::router()
        .merge(sse::router())
        .merge(websocket::router())
        .merge(quiz::router())
        .merge(catalog::router());

    if let Some(dir) = state.config().audio_dir() {
        info!(dir = %dir.display(), mount = AUDIO_MOUNT, "serving audio files");
        api_router = api_router.nest_service(AUDIO_MOUNT, ServeDir::new(dir));
    }

    api_router
        .merge(SwaggerUi::new("/docs").url(OPENAPI_PATH, ApiDoc::openapi()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::{catalog::Catalog, config::AppConfig, state::AppState};

    fn app() -> Router<()> {
        let config = AppConfig::from_json_str(r#"{ "rng_seed": 11 }"#).unwrap();
        router(AppState::new(config, Catalog::builtin().unwrap()))
    }

    async fn send(app: &Router<()>, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn healthcheck_reports_missing_audio_device() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/healthcheck", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["audio_devices"], 0);
    }

    #[tokio::test]
    async fn quiz_flow_over_http() {
        let app = app();

        let (status, body) = send(&app, Method::GET, "/quiz/state", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["screen"], "start");

        let (status, body) =
            send(&app, Method::POST, "/quiz/guess", Some(r#"{"guess":"The Nurse"}"#)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["message"].as_str().unwrap().contains("no quiz session"));

        let (status, body) = send(&app, Method::POST, "/quiz/start", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["screen"], "round");
        assert_eq!(body["round"], 1);
        assert_eq!(body["round_phase"], "awaiting_input");
        assert_eq!(body["unlocked_hint"], "far");

        let (status, _) = send(&app, Method::POST, "/quiz/start", None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, Method::POST, "/quiz/guess", Some(r#"{"guess":"   "}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, Method::POST, "/quiz/skip", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["unlocked_hint"], "mid");
        assert_eq!(body["guesses"][0], "Skipped");
        assert_eq!(body["feedback"]["kind"], "skip");

        let (status, _) =
            send(&app, Method::POST, "/quiz/hints/chase/play", None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) =
            send(&app, Method::POST, "/quiz/hints/mid/play", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["audio_error"], true);

        let (status, _) = send(&app, Method::POST, "/quiz/hints/loudest/play", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, Method::POST, "/quiz/audio/stop", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["playing"], false);

        let (status, body) = send(&app, Method::GET, "/quiz/results", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["max_score"], 40);
        assert_eq!(body["score"], 0);
    }

    #[tokio::test]
    async fn suggestions_and_catalog_are_browsable() {
        let app = app();

        let (status, body) = send(&app, Method::GET, "/quiz/suggestions?q=freddy", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["suggestions"][0]["display"], "The Nightmare");

        let (status, body) = send(&app, Method::GET, "/catalog/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entities"], 40);

        let (status, body) =
            send(&app, Method::GET, "/catalog?filter=bonus", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entities"].as_array().unwrap().len(), 6);

        let (status, _) = send(&app, Method::GET, "/catalog/entities/butcher", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/api-doc/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/quiz/guess"].is_object());
    }
}
