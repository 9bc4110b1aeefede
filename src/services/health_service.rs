use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether an audio device is available to play rounds.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let devices = state.audio_devices().len();
    if devices == 0 {
        warn!("no audio device connected (degraded mode)");
    }
    HealthResponse::from_devices(devices)
}
