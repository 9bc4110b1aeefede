//! Quiz core: selection, guess matching, round and session state, and the engine tying
//! them to an audio device.

pub mod audio;
pub mod engine;
pub mod matcher;
pub mod round;
pub mod selector;
pub mod session;

pub use self::{
    audio::{AudioPlayer, PlaybackError},
    engine::{Effects, EngineSettings, QuizEngine, QuizError, QuizView},
};
