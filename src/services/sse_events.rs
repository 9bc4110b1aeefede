use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        quiz::{FeedbackDto, QuizStateResponse, ResultsResponse, RoundResultDto},
        sse::{
            AudioDevicesEvent, FeedbackEvent, QuizSnapshotEvent, RoundResultEvent, ServerEvent,
            SessionFinishedEvent,
        },
    },
    state::SharedState,
};

pub(crate) const EVENT_QUIZ_SNAPSHOT: &str = "quiz.snapshot";
const EVENT_QUIZ_FEEDBACK: &str = "quiz.feedback";
const EVENT_ROUND_RESULT: &str = "quiz.round_result";
const EVENT_SESSION_FINISHED: &str = "quiz.finished";
const EVENT_AUDIO_DEVICES: &str = "audio.devices";

/// Broadcast the full quiz state.
pub fn broadcast_snapshot(state: &SharedState, snapshot: &QuizStateResponse) {
    let payload = QuizSnapshotEvent(snapshot.clone());
    send_public_event(state, EVENT_QUIZ_SNAPSHOT, &payload);
}

/// Broadcast the feedback of a guess or a skip.
pub fn broadcast_feedback(state: &SharedState, round: usize, feedback: FeedbackDto) {
    let payload = FeedbackEvent { round, feedback };
    send_public_event(state, EVENT_QUIZ_FEEDBACK, &payload);
}

/// Broadcast a round freshly appended to the ledger.
pub fn broadcast_round_result(state: &SharedState, result: RoundResultDto) {
    send_public_event(state, EVENT_ROUND_RESULT, &RoundResultEvent(result));
}

/// Broadcast the summary of a finished session.
pub fn broadcast_session_finished(state: &SharedState, summary: ResultsResponse) {
    send_public_event(state, EVENT_SESSION_FINISHED, &SessionFinishedEvent(summary));
}

/// Broadcast the number of connected audio devices.
pub fn broadcast_audio_devices(state: &SharedState) {
    let payload = AudioDevicesEvent {
        connected: state.audio_devices().len(),
    };
    send_public_event(state, EVENT_AUDIO_DEVICES, &payload);
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}
