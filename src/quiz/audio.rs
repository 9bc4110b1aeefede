//! Audio playback capability used by the engine.

use thiserror::Error;

/// Failures reported by a playback device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// Nothing is able to play audio right now.
    #[error("no audio device is connected")]
    NoDevice,
    /// `seek_and_play` was called before any source was loaded.
    #[error("no audio source loaded")]
    NoSource,
    /// The device refused or failed the request.
    #[error("audio device rejected the request: {0}")]
    Rejected(String),
}

/// Something able to play a variant's audio.
///
/// Calls are fire-and-forget: a successful return means the request was accepted, not that
/// audio is audible yet. Progress comes back through [`AudioPlayer::position`].
pub trait AudioPlayer: Send {
    /// Select the audio source to play next.
    fn load(&mut self, source: &str) -> Result<(), PlaybackError>;

    /// Seek to `offset` seconds in the loaded source and start playing.
    fn seek_and_play(&mut self, offset: f64) -> Result<(), PlaybackError>;

    /// Halt playback.
    fn pause(&mut self) -> Result<(), PlaybackError>;

    /// Latest known playback position, in seconds.
    fn position(&self) -> Option<f64>;
}
