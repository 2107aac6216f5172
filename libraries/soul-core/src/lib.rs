//! Soul Player Core
//!
//! Platform-agnostic core types, collaborator traits, and error handling for
//! the Soul headless player.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `PlayerState`, `PlayerConfiguration`
//! - **Collaborator Traits**: `MediaSink`, `StreamingSource`, `SessionSurface`,
//!   `SourceFetcher`
//! - **Error Handling**: Unified `SoulError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use soul_core::types::{Artwork, Track};
//! use std::time::Duration;
//!
//! let track = Track::new("t1", "My Favorite Song")
//!     .with_artist("Artist Name")
//!     .with_source("https://cdn.example.com/song.mp3")
//!     .with_artwork(Artwork::new("https://cdn.example.com/cover.png"))
//!     .with_duration(Duration::from_secs(180));
//!
//! assert!(!track.is_manifest());
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SoulError};
pub use traits::{
    ListenerId, MediaSink, Merge, PositionState, ReadyState, SessionAction, SessionActionHandler,
    SessionPlaybackState, SessionSurface, SinkEvent, SinkListener, SourceFetcher, StreamingSource,
};

// Export all types
pub use types::{
    Artwork, CrossOrigin, Environment, PlaybackStatus, PlayerConfiguration, PlayerState,
    PlayerStatePatch, PreloadStrategy, Track,
};
