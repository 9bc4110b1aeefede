use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    dto::ws::{AudioCommand, AudioDeviceAck, AudioDeviceInbound},
    services::{quiz_service, sse_events},
    state::SharedState,
};

const IDENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Writer channel of a socket closed while a message was queued.
#[derive(Debug, Error)]
#[error("connection closed")]
struct ConnectionClosed;

/// Handle the full lifecycle for an individual audio device WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(IDENT_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("websocket identification timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let inbound = match AudioDeviceInbound::from_json_str(&initial_message) {
        Ok(message) => message,
        Err(err) => {
            warn!(error = %err, "failed to parse or validate audio device message");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let AudioDeviceInbound::Identification { id: device_id } = inbound else {
        warn!("first message was not identification");
        let _ = outbound_tx.send(Message::Close(None));
        finalize(writer_task, outbound_tx).await;
        return;
    };

    state
        .audio_devices()
        .insert(device_id.clone(), outbound_tx.clone());
    info!(id = %device_id, "audio device connected");
    sse_events::broadcast_audio_devices(&state);

    if greet_device(&state, &device_id, &outbound_tx).await.is_err() {
        info!(id = %device_id, "connection closed during greeting, terminating");
        state.audio_devices().remove(&device_id);
        finalize(writer_task, outbound_tx).await;
        return;
    }

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match AudioDeviceInbound::from_json_str(&text) {
                Ok(AudioDeviceInbound::Progress { position }) => {
                    state.audio_devices().record_position(&device_id, position);
                    quiz_service::playback_progress(&state).await;
                }
                Ok(AudioDeviceInbound::Ended) => {
                    debug!(id = %device_id, "audio device reached the end of the source");
                    quiz_service::playback_ended(&state).await;
                }
                Ok(AudioDeviceInbound::Error { message }) => {
                    warn!(id = %device_id, error = %message, "audio device failed to play");
                    quiz_service::playback_failed(&state, &message).await;
                }
                Ok(AudioDeviceInbound::Identification { .. }) => {
                    warn!(id = %device_id, "ignoring duplicate identification message");
                }
                Ok(AudioDeviceInbound::Unknown) => {
                    debug!(id = %device_id, payload = %text, "ignoring unknown audio device message");
                }
                Err(err) => {
                    warn!(id = %device_id, error = %err, "failed to parse or validate audio device message");
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(id = %device_id, "audio device closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(id = %device_id, error = %err, "websocket error");
                break;
            }
        }
    }

    state.audio_devices().remove(&device_id);
    info!(id = %device_id, "audio device disconnected");
    sse_events::broadcast_audio_devices(&state);

    finalize(writer_task, outbound_tx).await;
}

/// Acknowledge the identification and preload the source of the running round, if any.
async fn greet_device(
    state: &SharedState,
    device_id: &str,
    tx: &mpsc::UnboundedSender<Message>,
) -> Result<(), ConnectionClosed> {
    send_message_to_websocket(
        tx,
        &AudioDeviceAck {
            id: device_id.to_string(),
            status: "connected".into(),
        },
    )?;

    let source = quiz_service::current_state(state).await.audio_source;
    if let Some(src) = source {
        send_message_to_websocket(tx, &AudioCommand::Load { src })?;
    }
    Ok(())
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Serialization failures are logged and swallowed; only a closed writer is reported.
fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
) -> Result<(), ConnectionClosed>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
