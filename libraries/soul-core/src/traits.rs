/// Collaborator traits for the headless player
///
/// The controller never talks to a concrete audio element, demuxer or OS
/// integration. Each of them is a capability expressed here and supplied by
/// the platform layer.
use crate::error::Result;
use crate::types::{CrossOrigin, PreloadStrategy, Track};
use async_trait::async_trait;
use std::sync::Arc;

/// Shallow-merge of a partial update into a value
///
/// Implementers produce a fresh value; `self` is never mutated.
pub trait Merge: Clone + Default {
    /// Partial update type
    type Patch;

    /// Return `self` with every field present in `patch` overridden
    fn merge(&self, patch: &Self::Patch) -> Self;
}

/// How much media the sink has available, ordered by readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ReadyState {
    #[default]
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// Events reported by a media sink
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    LoadStart,
    /// Playback halted waiting for data
    Waiting,
    CanPlay,
    CanPlayThrough,
    Playing,
    Pause,
    Ended,
    Stalled,
    /// New duration in seconds
    DurationChange(f64),
    /// Current position in seconds
    TimeUpdate(f64),
    /// Seconds buffered
    Progress(f64),
    VolumeChange,
    RateChange,
    Error(String),
}

/// Handle returned by [`MediaSink::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Callback registered against a media sink
pub type SinkListener = Arc<dyn Fn(&SinkEvent) + Send + Sync>;

/// Media decode/render engine
///
/// Source assignment, load and play may suspend. Everything else is a
/// synchronous property access. Implementations use interior mutability so a
/// single sink can be shared between the controller and a streaming
/// collaborator.
///
/// Listeners must be invoked without any internal lock held: they call back
/// into the sink's getters.
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Assign the media source, `None` clears it
    async fn set_source(&self, uri: Option<&str>) -> Result<()>;

    /// Begin loading the assigned source
    async fn load(&self) -> Result<()>;

    /// Start playback
    ///
    /// # Errors
    /// `PlaybackRejected` when the engine refuses (e.g. autoplay policy)
    async fn play(&self) -> Result<()>;

    fn pause(&self);

    /// Seek to a position in seconds
    fn seek(&self, position: f64);

    /// Current position in seconds
    fn current_time(&self) -> f64;

    /// Media duration in seconds, once known
    fn duration(&self) -> Option<f64>;

    /// Seconds buffered
    fn buffered(&self) -> f64;

    fn ready_state(&self) -> ReadyState;

    fn is_paused(&self) -> bool;

    fn has_source(&self) -> bool;

    /// Volume (0.0 - 1.0)
    fn volume(&self) -> f64;

    fn set_volume(&self, volume: f64);

    fn playback_rate(&self) -> f64;

    fn set_playback_rate(&self, rate: f64);

    fn is_muted(&self) -> bool;

    fn set_muted(&self, muted: bool);

    /// Preload hint
    fn set_preload(&self, strategy: PreloadStrategy) {
        let _ = strategy;
    }

    /// CORS mode for subsequent sources
    fn set_cross_origin(&self, mode: CrossOrigin) {
        let _ = mode;
    }

    /// Whether the sink plays HLS manifests without a streaming collaborator
    fn supports_native_hls(&self) -> bool {
        false
    }

    /// Readiness threshold for starting playback
    fn can_start(&self) -> bool {
        self.ready_state() >= ReadyState::HaveFutureData
    }

    /// Register an event listener
    fn add_listener(&self, listener: SinkListener) -> ListenerId;

    /// Remove a previously registered listener
    fn remove_listener(&self, id: ListenerId);
}

/// Adaptive-stream demuxer used where the sink lacks native manifest support
#[async_trait]
pub trait StreamingSource: Send + Sync {
    /// Receive the opaque `hls_config` from the player configuration
    fn configure(&self, config: &serde_json::Value) {
        let _ = config;
    }

    /// Bind the demuxer to a sink
    async fn attach(&self, sink: Arc<dyn MediaSink>) -> Result<()>;

    /// Load a manifest into the attached sink
    async fn load_manifest(&self, uri: &str) -> Result<()>;

    /// Release the sink
    fn detach(&self);
}

/// Resolves a media locator for a track registered without one
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, track: &Track) -> Result<String>;
}

/// Playback state reported to the OS session surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPlaybackState {
    None,
    Paused,
    Playing,
}

/// Position reported to the OS session surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionState {
    pub duration: Option<f64>,
    pub playback_rate: f64,
    pub position: f64,
}

/// Action requested from lock-screen / notification controls
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionAction {
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
    /// Absolute position in seconds
    SeekTo(f64),
}

/// Handler invoked for every session action
pub type SessionActionHandler = Arc<dyn Fn(SessionAction) + Send + Sync>;

/// OS-level media controls (lock screen, notification shade)
pub trait SessionSurface: Send + Sync {
    fn set_metadata(&self, track: &Track);

    fn set_playback_state(&self, state: SessionPlaybackState);

    fn set_position_state(&self, position: PositionState);

    fn register_action_handler(&self, handler: SessionActionHandler);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_state_is_ordered() {
        assert!(ReadyState::HaveEnoughData > ReadyState::HaveFutureData);
        assert!(ReadyState::HaveMetadata < ReadyState::HaveCurrentData);
        assert_eq!(ReadyState::default(), ReadyState::HaveNothing);
    }
}
