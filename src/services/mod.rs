/// Catalog browsing.
pub mod catalog_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Quiz operations and deferred actions.
pub mod quiz_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// WebSocket connection and message handling for audio devices.
pub mod websocket_service;
