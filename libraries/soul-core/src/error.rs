/// Core error types for the Soul headless player
use thiserror::Error;

/// Result type alias using `SoulError`
pub type Result<T> = std::result::Result<T, SoulError>;

/// Core error type shared by the audio graph, the queue and the controller
#[derive(Error, Debug)]
pub enum SoulError {
    /// Bad argument (out-of-range volume/rate/seek, empty queue, malformed gain vector)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested equalizer preset is not in the preset table
    #[error("Unknown equalizer preset: {0}")]
    UnknownPreset(String),

    /// A second controller was requested while one is still alive
    #[error("A playback controller already owns this media sink")]
    SingletonViolation,

    /// Host audio or streaming engine could not be constructed
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The sink refused to start playback (e.g. needs a user gesture)
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    /// Any other failure reported by the media sink or a collaborator
    #[error("Media sink error: {0}")]
    Sink(String),

    /// The controller has been destroyed
    #[error("Controller destroyed")]
    Destroyed,
}

impl SoulError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an engine unavailable error
    pub fn engine_unavailable(msg: impl Into<String>) -> Self {
        Self::EngineUnavailable(msg.into())
    }

    /// Create a sink error
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Create a playback rejected error
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::PlaybackRejected(msg.into())
    }
}
