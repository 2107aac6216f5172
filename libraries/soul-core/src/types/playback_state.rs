/// Player state snapshots broadcast to subscribers
use crate::traits::Merge;
use crate::types::Track;
use serde::{Deserialize, Serialize};

/// Observable playback state
///
/// `TrackChanged` and `DurationChanged` are pulses layered on top of the
/// steady states. `QueueEnded` is terminal for the queue, not the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Buffering,
    Ready,
    Playing,
    Paused,
    Stalled,
    Ended,
    TrackChanged,
    DurationChanged,
    QueueEnded,
    Error,
}

impl PlaybackStatus {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Buffering => "buffering",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Stalled => "stalled",
            Self::Ended => "ended",
            Self::TrackChanged => "trackchanged",
            Self::DurationChanged => "durationchanged",
            Self::QueueEnded => "queueended",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable snapshot of the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub playback_state: PlaybackStatus,

    pub current_track: Option<Track>,

    /// Index of the current track in the queue
    pub current_index: Option<usize>,

    /// Volume level (0-100)
    pub volume: u8,

    pub playback_rate: f64,

    /// Seconds buffered ahead of the start of the media
    pub buffered_duration: f64,

    /// Playback position in seconds
    pub progress: f64,

    /// Media duration in seconds, once known
    pub duration: Option<f64>,

    pub error: Option<String>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            playback_state: PlaybackStatus::Idle,
            current_track: None,
            current_index: None,
            volume: 100,
            playback_rate: 1.0,
            buffered_duration: 0.0,
            progress: 0.0,
            duration: None,
            error: None,
        }
    }
}

/// Partial update merged into a [`PlayerState`]
///
/// Shallow-merge semantics: every `Some` field overrides, `None` keeps the
/// previous value. Nullable fields use a nested `Option` so they can be
/// cleared explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerStatePatch {
    pub playback_state: Option<PlaybackStatus>,
    pub current_track: Option<Option<Track>>,
    pub current_index: Option<Option<usize>>,
    pub volume: Option<u8>,
    pub playback_rate: Option<f64>,
    pub buffered_duration: Option<f64>,
    pub progress: Option<f64>,
    pub duration: Option<Option<f64>>,
    pub error: Option<Option<String>>,
}

impl PlayerStatePatch {
    /// Patch that only changes the playback state
    pub fn status(status: PlaybackStatus) -> Self {
        Self {
            playback_state: Some(status),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = Some(error);
        self
    }
}

impl Merge for PlayerState {
    type Patch = PlayerStatePatch;

    fn merge(&self, patch: &PlayerStatePatch) -> Self {
        let mut next = self.clone();
        if let Some(status) = patch.playback_state {
            next.playback_state = status;
        }
        if let Some(track) = &patch.current_track {
            next.current_track.clone_from(track);
        }
        if let Some(index) = patch.current_index {
            next.current_index = index;
        }
        if let Some(volume) = patch.volume {
            next.volume = volume;
        }
        if let Some(rate) = patch.playback_rate {
            next.playback_rate = rate;
        }
        if let Some(buffered) = patch.buffered_duration {
            next.buffered_duration = buffered;
        }
        if let Some(progress) = patch.progress {
            next.progress = progress;
        }
        if let Some(duration) = patch.duration {
            next.duration = duration;
        }
        if let Some(error) = &patch.error {
            next.error.clone_from(error);
        }
        next
    }
}
