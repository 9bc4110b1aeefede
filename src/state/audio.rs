use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    dto::ws::AudioCommand,
    quiz::{AudioPlayer, PlaybackError},
};

#[derive(Clone)]
/// Handle used to push commands to a connected audio device.
pub struct AudioDevice {
    /// Identifier announced by the device.
    pub id: String,
    /// Writer channel of the device socket.
    pub tx: mpsc::UnboundedSender<Message>,
    /// Latest position reported by the device, in seconds.
    pub position: Option<f64>,
}

/// Registry of browser tabs able to play quiz audio, keyed by their identifier.
#[derive(Default)]
pub struct AudioDevices {
    devices: DashMap<String, AudioDevice>,
}

impl AudioDevices {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device, replacing any previous connection with the same identifier.
    pub fn insert(&self, id: String, tx: mpsc::UnboundedSender<Message>) {
        self.devices.insert(
            id.clone(),
            AudioDevice {
                id,
                tx,
                position: None,
            },
        );
    }

    /// Forget a device.
    pub fn remove(&self, id: &str) {
        self.devices.remove(id);
    }

    /// Number of connected devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether no device is connected.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Store the playback position reported by a device.
    pub fn record_position(&self, id: &str, position: f64) {
        if let Some(mut device) = self.devices.get_mut(id) {
            device.position = Some(position);
        }
    }

    /// Furthest position reported by any device.
    pub fn position(&self) -> Option<f64> {
        self.devices
            .iter()
            .filter_map(|device| device.position)
            .reduce(f64::max)
    }

    /// Send a command to every device, returning how many accepted it.
    ///
    /// Devices whose writer is gone are dropped from the registry.
    pub fn broadcast(&self, command: &AudioCommand) -> usize {
        let payload = match serde_json::to_string(command) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "failed to serialize audio command `{command:?}`");
                return 0;
            }
        };

        let mut closed = Vec::new();
        let mut delivered = 0;
        for device in self.devices.iter() {
            match device.tx.send(Message::Text(payload.clone().into())) {
                Ok(()) => delivered += 1,
                Err(_) => closed.push(device.id.clone()),
            }
        }
        for id in closed {
            warn!(id = %id, "audio device writer closed, removing device");
            self.devices.remove(&id);
        }
        delivered
    }

    fn reset_positions(&self, position: Option<f64>) {
        for mut device in self.devices.iter_mut() {
            device.position = position;
        }
    }
}

/// [`AudioPlayer`] forwarding every request to the connected audio devices.
pub struct RemoteAudioPlayer {
    devices: std::sync::Arc<AudioDevices>,
    source: Option<String>,
}

impl RemoteAudioPlayer {
    /// Player backed by the given device registry.
    pub fn new(devices: std::sync::Arc<AudioDevices>) -> Self {
        Self {
            devices,
            source: None,
        }
    }
}

impl AudioPlayer for RemoteAudioPlayer {
    fn load(&mut self, source: &str) -> Result<(), PlaybackError> {
        self.source = Some(source.to_string());
        self.devices.reset_positions(None);
        let delivered = self.devices.broadcast(&AudioCommand::Load {
            src: source.to_string(),
        });
        debug!(source, delivered, "audio source loaded");
        Ok(())
    }

    fn seek_and_play(&mut self, offset: f64) -> Result<(), PlaybackError> {
        let src = self.source.clone().ok_or(PlaybackError::NoSource)?;
        if self.devices.is_empty() {
            return Err(PlaybackError::NoDevice);
        }
        self.devices.reset_positions(Some(offset));
        match self.devices.broadcast(&AudioCommand::Play { src, offset }) {
            0 => Err(PlaybackError::NoDevice),
            _ => Ok(()),
        }
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        self.devices.broadcast(&AudioCommand::Pause);
        Ok(())
    }

    fn position(&self) -> Option<f64> {
        self.devices.position()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn text(message: Message) -> serde_json::Value {
        match message {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn play_without_device_is_rejected() {
        let devices = Arc::new(AudioDevices::new());
        let mut player = RemoteAudioPlayer::new(devices);

        player.load("/audio/TerrorRadius_Nurse.ogg").unwrap();
        assert_eq!(player.seek_and_play(0.0), Err(PlaybackError::NoDevice));
    }

    #[test]
    fn commands_reach_connected_devices() {
        let devices = Arc::new(AudioDevices::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        devices.insert("tab-1".into(), tx);
        let mut player = RemoteAudioPlayer::new(devices.clone());

        player.load("/audio/TerrorRadius_Nurse.ogg").unwrap();
        player.seek_and_play(22.0).unwrap();
        player.pause().unwrap();

        assert_eq!(text(rx.try_recv().unwrap())["type"], "load");
        let play = text(rx.try_recv().unwrap());
        assert_eq!(play["type"], "play");
        assert_eq!(play["offset"], 22.0);
        assert_eq!(play["src"], "/audio/TerrorRadius_Nurse.ogg");
        assert_eq!(text(rx.try_recv().unwrap())["type"], "pause");

        assert_eq!(player.position(), Some(22.0));
        devices.record_position("tab-1", 30.5);
        assert_eq!(player.position(), Some(30.5));
    }

    #[test]
    fn closed_devices_are_dropped() {
        let devices = AudioDevices::new();
        let (tx, rx) = mpsc::unbounded_channel();
        devices.insert("tab-1".into(), tx);
        drop(rx);

        assert_eq!(devices.broadcast(&AudioCommand::Pause), 0);
        assert!(devices.is_empty());
    }
}
