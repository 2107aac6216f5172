/// Player configuration
use serde::{Deserialize, Serialize};

/// Media-engine preload hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreloadStrategy {
    None,
    Metadata,
    #[default]
    Auto,
}

/// CORS mode requested from the media engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CrossOrigin {
    #[serde(rename = "anonymous")]
    Anonymous,
    #[serde(rename = "use-credentials")]
    UseCredentials,
    /// Attribute left unset on the sink
    #[default]
    #[serde(rename = "null")]
    Unset,
}

/// Runtime environment, decides the singleton policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// A second controller request returns the existing one with a warning
    Development,
    /// A second controller request fails with `SingletonViolation`
    Production,
}

impl Default for Environment {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Development
        } else {
            Self::Production
        }
    }
}

/// Options recognised by `PlaybackController::initialize`
///
/// Field names are snake_case; the camelCase spellings used by web callers
/// are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfiguration {
    #[serde(alias = "preloadStrategy")]
    pub preload_strategy: PreloadStrategy,

    /// Start playback as soon as a loaded track is ready
    #[serde(alias = "autoPlay")]
    pub auto_play: bool,

    /// Attach the baseline diagnostics listener to the sink
    #[serde(alias = "useDefaultEventListeners")]
    pub use_default_event_listeners: bool,

    /// Activate the OS session surface collaborator
    #[serde(alias = "showNotificationActions")]
    pub show_notification_actions: bool,

    /// Accumulate per-track listening time
    #[serde(alias = "enablePlayLog")]
    pub enable_play_log: bool,

    /// Activate the streaming collaborator for HLS manifests
    #[serde(alias = "enableHls")]
    pub enable_hls: bool,

    /// Activate the equalizer signal chain
    #[serde(alias = "enableEqualizer")]
    pub enable_equalizer: bool,

    #[serde(alias = "crossOrigin")]
    pub cross_origin: CrossOrigin,

    /// Opaque pass-through to the streaming collaborator
    #[serde(alias = "hlsConfig")]
    pub hls_config: serde_json::Value,
}

impl Default for PlayerConfiguration {
    fn default() -> Self {
        Self {
            preload_strategy: PreloadStrategy::Auto,
            auto_play: false,
            use_default_event_listeners: true,
            show_notification_actions: false,
            enable_play_log: false,
            enable_hls: false,
            enable_equalizer: false,
            cross_origin: CrossOrigin::Unset,
            hls_config: serde_json::Value::Null,
        }
    }
}
