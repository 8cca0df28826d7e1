use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Could not decode audio: {0}")]
    Decode(String),

    #[error("Invalid playback state: {0}")]
    InvalidState(&'static str),

    #[error("Playback is not running")]
    NotPlaying,

    #[error("Note at {time:.2}s is too close to the previous note at {last:.2}s")]
    TooClose { time: f64, last: f64 },

    #[error("No note at index {index} (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No notes to save!")]
    EmptyStore,

    #[error("Audio device error: {0}")]
    Audio(String),
}

pub type Result<T> = std::result::Result<T, EditorError>;
