mod config;
mod playback_state;
mod track;

pub use config::{CrossOrigin, Environment, PlayerConfiguration, PreloadStrategy};
pub use playback_state::{PlaybackStatus, PlayerState, PlayerStatePatch};
pub use track::{is_manifest_uri, Artwork, Track};
