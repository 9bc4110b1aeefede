use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Reasons an inbound audio device message is refused.
#[derive(Debug, Error)]
pub enum InboundMessageError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("device id must not be empty")]
    EmptyId,
    #[error("playback position must be a non-negative number (got {0})")]
    InvalidPosition(f64),
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from audio device WebSocket clients.
#[serde(tag = "type")]
pub enum AudioDeviceInbound {
    #[serde(rename = "identification")]
    Identification { id: String },
    /// Current playback position, in seconds.
    #[serde(rename = "progress")]
    Progress { position: f64 },
    /// The loaded source played to its end.
    #[serde(rename = "ended")]
    Ended,
    /// The device could not play the loaded source.
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(other)]
    Unknown,
}

impl AudioDeviceInbound {
    /// Parse a text frame and check its fields.
    pub fn from_json_str(text: &str) -> Result<Self, InboundMessageError> {
        let message: Self = serde_json::from_str(text)?;
        match &message {
            Self::Identification { id } if id.trim().is_empty() => {
                Err(InboundMessageError::EmptyId)
            }
            Self::Progress { position } if !position.is_finite() || *position < 0.0 => {
                Err(InboundMessageError::InvalidPosition(*position))
            }
            _ => Ok(message),
        }
    }

    pub fn identification_id(&self) -> Option<&str> {
        match self {
            Self::Identification { id } => Some(id.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Positive acknowledgement sent to an audio device after successful identification.
pub struct AudioDeviceAck {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
/// Commands pushed to audio devices.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AudioCommand {
    /// Preload a source.
    Load { src: String },
    /// Seek `src` to `offset` seconds and play.
    Play { src: String, offset: f64 },
    /// Stop playing.
    Pause,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_messages_are_tagged_by_type() {
        let progress: AudioDeviceInbound =
            serde_json::from_str(r#"{"type":"progress","position":12.5}"#).unwrap();
        assert!(matches!(progress, AudioDeviceInbound::Progress { position } if position == 12.5));

        let unknown: AudioDeviceInbound = serde_json::from_str(r#"{"type":"volume"}"#).unwrap();
        assert!(matches!(unknown, AudioDeviceInbound::Unknown));

        let ident =
            AudioDeviceInbound::from_json_str(r#"{"type":"identification","id":"tab-1"}"#)
                .unwrap();
        assert_eq!(ident.identification_id(), Some("tab-1"));
    }

    #[test]
    fn invalid_fields_are_refused() {
        assert!(matches!(
            AudioDeviceInbound::from_json_str(r#"{"type":"identification","id":" "}"#),
            Err(InboundMessageError::EmptyId)
        ));
        assert!(matches!(
            AudioDeviceInbound::from_json_str(r#"{"type":"progress","position":-1.0}"#),
            Err(InboundMessageError::InvalidPosition(_))
        ));
        assert!(matches!(
            AudioDeviceInbound::from_json_str("not json"),
            Err(InboundMessageError::Malformed(_))
        ));
    }
}
