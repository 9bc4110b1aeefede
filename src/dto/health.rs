use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of audio devices currently connected.
    pub audio_devices: usize,
}

impl HealthResponse {
    /// Healthy when at least one audio device can play rounds.
    pub fn from_devices(audio_devices: usize) -> Self {
        let status = if audio_devices == 0 { "degraded" } else { "ok" };
        Self {
            status: status.to_string(),
            audio_devices,
        }
    }
}
