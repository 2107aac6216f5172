/// Headless player configuration
use crate::error::{HeadlessError, Result};
use serde::{Deserialize, Serialize};
use soul_core::{Environment, PlayerConfiguration, Track};
use soul_playback::{LoopMode, OrderMode};
use std::path::Path;
use std::time::Duration;

/// File read when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "headless.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HeadlessConfig {
    #[serde(default)]
    pub player: PlayerConfiguration,

    #[serde(default)]
    pub runtime: RuntimeSettings,

    #[serde(default)]
    pub demo: DemoSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuntimeSettings {
    #[serde(default)]
    pub environment: Environment,

    /// Wall-clock interval between simulated sink ticks
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Media seconds played per wall-clock second
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DemoSettings {
    #[serde(default = "default_tracks")]
    pub tracks: Vec<DemoTrack>,

    #[serde(default)]
    pub order: OrderMode,

    #[serde(default)]
    pub loop_mode: LoopMode,

    #[serde(default = "default_volume")]
    pub volume: f64,

    #[serde(default)]
    pub equalizer_preset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DemoTrack {
    pub id: String,
    pub title: String,

    #[serde(default)]
    pub artist: Option<String>,

    pub source: String,

    /// Length the simulated sink reports for this source
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
}

impl DemoTrack {
    pub fn to_track(&self) -> Track {
        let mut track = Track::new(self.id.clone(), self.title.clone())
            .with_source(self.source.clone())
            .with_duration(Duration::from_secs(self.duration_secs));
        if let Some(artist) = &self.artist {
            track = track.with_artist(artist.clone());
        }
        track
    }
}

impl HeadlessConfig {
    /// Load configuration from `path` (if it exists) and environment
    ///
    /// Environment overrides use the `SOUL_HEADLESS_` prefix with `__`
    /// between nesting levels, e.g. `SOUL_HEADLESS_RUNTIME__TICK_MS=50`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(HeadlessError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path));
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("SOUL_HEADLESS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| HeadlessError::Config(e.to_string()))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| HeadlessError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.runtime.tick_ms == 0 {
            return Err(HeadlessError::Config(
                "runtime.tick_ms must be greater than zero".to_string(),
            ));
        }

        if !self.runtime.time_scale.is_finite() || self.runtime.time_scale <= 0.0 {
            return Err(HeadlessError::Config(format!(
                "runtime.time_scale must be positive, got {}",
                self.runtime.time_scale
            )));
        }

        if let Some(track) = self.demo.tracks.iter().find(|t| t.id.trim().is_empty()) {
            return Err(HeadlessError::Config(format!(
                "demo track '{}' has an empty id",
                track.title
            )));
        }

        Ok(())
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.demo.tracks.iter().map(DemoTrack::to_track).collect()
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.runtime.tick_ms)
    }
}

// Default values
impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            tick_ms: default_tick_ms(),
            time_scale: default_time_scale(),
            sample_rate: default_sample_rate(),
        }
    }
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            tracks: default_tracks(),
            order: OrderMode::Default,
            loop_mode: LoopMode::Off,
            volume: default_volume(),
            equalizer_preset: None,
        }
    }
}

fn default_tick_ms() -> u64 {
    100
}

fn default_time_scale() -> f64 {
    1.0
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_volume() -> f64 {
    80.0
}

fn default_duration_secs() -> u64 {
    30
}

fn default_tracks() -> Vec<DemoTrack> {
    ["A", "B", "C"]
        .iter()
        .map(|name| DemoTrack {
            id: name.to_lowercase(),
            title: format!("Track {}", name),
            artist: None,
            source: format!("https://cdn.example.com/{}.mp3", name.to_lowercase()),
            duration_secs: default_duration_secs(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use soul_core::PreloadStrategy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_are_valid() {
        let config = HeadlessConfig::default();
        config.validate().unwrap();
        assert_eq!(config.tracks().len(), 3);
        assert_eq!(config.tick(), Duration::from_millis(100));
        assert_eq!(config.demo.loop_mode, LoopMode::Off);
    }

    #[test]
    fn loads_sections_from_file() {
        let file = write_config(
            r#"
[player]
preload_strategy = "metadata"
enable_equalizer = true
enable_play_log = true

[runtime]
environment = "production"
tick_ms = 20
time_scale = 10.0

[demo]
order = "reverse"
loop_mode = "queue"
volume = 55.0
equalizer_preset = "rock"

[[demo.tracks]]
id = "intro"
title = "Intro"
artist = "Nobody"
source = "https://cdn.example.com/intro.mp3"
duration_secs = 12

[[demo.tracks]]
id = "outro"
title = "Outro"
source = "https://cdn.example.com/outro.m3u8"
"#,
        );

        let config = HeadlessConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.player.preload_strategy, PreloadStrategy::Metadata);
        assert!(config.player.enable_equalizer);
        assert!(config.player.enable_play_log);
        // Unset player fields keep their defaults
        assert!(config.player.use_default_event_listeners);

        assert_eq!(config.runtime.environment, Environment::Production);
        assert_eq!(config.runtime.tick_ms, 20);
        assert_eq!(config.runtime.time_scale, 10.0);

        assert_eq!(config.demo.order, OrderMode::Reverse);
        assert_eq!(config.demo.loop_mode, LoopMode::Queue);
        assert_eq!(config.demo.equalizer_preset.as_deref(), Some("rock"));

        let tracks = config.tracks();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].artist.as_deref(), Some("Nobody"));
        assert_eq!(tracks[0].duration(), Some(Duration::from_secs(12)));
        assert_eq!(tracks[1].duration(), Some(Duration::from_secs(30)));
        assert!(tracks[1].is_manifest());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = HeadlessConfig::load(Some(dir.path().join("absent.toml").as_path()));
        assert!(matches!(result, Err(HeadlessError::Config(_))));
    }

    #[test]
    fn rejects_zero_tick() {
        let file = write_config("[runtime]\ntick_ms = 0\n");
        let result = HeadlessConfig::load(Some(file.path()));
        assert!(matches!(result, Err(HeadlessError::Config(_))));
    }

    #[test]
    fn rejects_blank_track_id() {
        let mut config = HeadlessConfig::default();
        config.demo.tracks[0].id = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
