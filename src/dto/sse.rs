use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::quiz::{FeedbackDto, QuizStateResponse, ResultsResponse, RoundResultDto};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Build an event carrying a raw text payload.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream.
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether an audio device is available to play rounds.
    pub audio_available: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast after every event that changed the quiz state.
pub struct QuizSnapshotEvent(pub QuizStateResponse);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after a guess or a skip.
pub struct FeedbackEvent {
    pub round: usize,
    pub feedback: FeedbackDto,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast when a round is appended to the ledger.
pub struct RoundResultEvent(pub RoundResultDto);

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast when the last round settled and the results screen opens.
pub struct SessionFinishedEvent(pub ResultsResponse);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when audio devices connect or disconnect.
pub struct AudioDevicesEvent {
    pub connected: usize,
}
