//! Demo run loop
//!
//! Wires a controller to the simulated sink and a software audio backend,
//! queues the configured tracks and ticks the sink clock until the queue
//! ends or shutdown is requested.

use crate::config::HeadlessConfig;
use crate::error::Result;
use crate::sink::SimulatedSink;
use serde::Serialize;
use soul_audio::SoftwareBackend;
use soul_core::{PlaybackStatus, PlayerState};
use soul_playback::{Collaborators, ControllerFactory, PlayLogEntry, PlaybackController};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// What happened during a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Track ids in the order they were loaded
    pub tracks_started: Vec<String>,

    /// True when the run stopped because the queue ran out
    pub queue_ended: bool,

    pub final_status: PlaybackStatus,
    pub play_log: Vec<PlayLogEntry>,
}

pub struct HeadlessPlayer {
    config: HeadlessConfig,
    sink: Arc<SimulatedSink>,
    controller: PlaybackController,
}

impl HeadlessPlayer {
    /// Build and initialize a controller for `config`
    ///
    /// Must be called inside a tokio runtime so the controller can schedule
    /// auto-advance.
    pub fn new(config: HeadlessConfig) -> Result<Self> {
        Self::with_sink(config, Arc::new(SimulatedSink::new()))
    }

    /// Build a player around an existing sink
    ///
    /// Fails with `SingletonViolation` in production when the sink already
    /// has a live controller.
    pub fn with_sink(config: HeadlessConfig, sink: Arc<SimulatedSink>) -> Result<Self> {
        for track in &config.demo.tracks {
            sink.register_duration(track.source.clone(), track.duration_secs as f64);
        }

        let backend = SoftwareBackend::new(config.runtime.sample_rate);
        let collaborators = Collaborators::new().with_audio(Arc::new(backend.clone()));
        let factory =
            ControllerFactory::new(sink.clone(), collaborators, config.runtime.environment);

        let controller = factory.create()?;
        controller.initialize(config.player.clone())?;

        if let Some(graph) = backend.last_graph() {
            debug!("Routing simulated output through the equalizer graph");
            sink.route_through(graph);
        }

        Ok(Self {
            config,
            sink,
            controller,
        })
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn sink(&self) -> &Arc<SimulatedSink> {
        &self.sink
    }

    /// Queue the demo tracks and start the first one
    pub async fn start(&self) -> Result<()> {
        let demo = &self.config.demo;

        self.controller.set_volume(demo.volume)?;
        self.controller.set_loop_mode(demo.loop_mode)?;
        if let Some(preset) = &demo.equalizer_preset {
            if let Err(e) = self.controller.set_equalizer_preset(preset) {
                warn!("Equalizer preset '{}' not applied: {}", preset, e);
            }
        }

        self.controller.set_queue(self.config.tracks(), demo.order)?;
        self.controller.play_track_at(0).await?;
        Ok(())
    }

    /// Start playback and drive the sink until the queue ends or `shutdown`
    /// resolves, then destroy the controller
    pub async fn run<F>(&self, shutdown: F) -> Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        let finished = Arc::new(Notify::new());
        let started = Arc::new(Mutex::new(Vec::new()));

        let subscription = {
            let finished = Arc::clone(&finished);
            let started = Arc::clone(&started);
            self.controller.on_state_change(move |state: &PlayerState| {
                log_state(state);
                match state.playback_state {
                    PlaybackStatus::TrackChanged => {
                        if let Some(track) = &state.current_track {
                            started
                                .lock()
                                .unwrap_or_else(|e| e.into_inner())
                                .push(track.id.clone());
                        }
                    }
                    PlaybackStatus::QueueEnded => finished.notify_one(),
                    _ => {}
                }
            })
        };

        self.start().await?;

        let tick = self.config.tick();
        let step = tick.as_secs_f64() * self.config.runtime.time_scale;
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);
        let queue_ended = loop {
            tokio::select! {
                () = finished.notified() => {
                    info!("Queue finished");
                    break true;
                }
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    break false;
                }
                _ = interval.tick() => {
                    self.sink.tick(step);
                }
            }
        };
        subscription.unsubscribe();

        let summary = RunSummary {
            tracks_started: started.lock().unwrap_or_else(|e| e.into_inner()).clone(),
            queue_ended,
            final_status: self.controller.get_current_state().playback_state,
            play_log: self.controller.play_log(),
        };
        self.controller.destroy();
        Ok(summary)
    }
}

fn log_state(state: &PlayerState) {
    match state.playback_state {
        PlaybackStatus::TrackChanged => {
            let title = state.current_track.as_ref().map_or("-", |t| t.title.as_str());
            info!(index = ?state.current_index, "Now playing: {}", title);
        }
        PlaybackStatus::QueueEnded => info!("Queue ended"),
        PlaybackStatus::Error => {
            warn!(
                "Playback error: {}",
                state.error.as_deref().unwrap_or("unknown")
            );
        }
        status => debug!(
            status = status.as_str(),
            progress = state.progress,
            "Player state"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DemoTrack;
    use crate::error::HeadlessError;
    use soul_core::{Environment, SoulError};
    use soul_playback::LoopMode;
    use std::time::Duration;

    fn short_demo(ids: &[&str]) -> HeadlessConfig {
        let mut config = HeadlessConfig::default();
        config.runtime.environment = Environment::Production;
        config.runtime.tick_ms = 100;
        config.player.enable_play_log = true;
        config.demo.tracks = ids
            .iter()
            .map(|id| DemoTrack {
                id: (*id).to_string(),
                title: format!("Track {}", id),
                artist: None,
                source: format!("mem://{}", id),
                duration_secs: 1,
            })
            .collect();
        config
    }

    #[tokio::test(start_paused = true)]
    async fn plays_the_queue_to_the_end() {
        let player = HeadlessPlayer::new(short_demo(&["a", "b", "c"])).unwrap();
        let summary = player.run(std::future::pending()).await.unwrap();

        assert!(summary.queue_ended);
        assert_eq!(summary.tracks_started, vec!["a", "b", "c"]);
        assert_eq!(summary.play_log.len(), 3);
        assert!(player.controller().is_destroyed());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_a_looping_queue() {
        let mut config = short_demo(&["a", "b"]);
        config.demo.loop_mode = LoopMode::Queue;
        let player = HeadlessPlayer::new(config).unwrap();

        let summary = player
            .run(tokio::time::sleep(Duration::from_millis(3500)))
            .await
            .unwrap();

        assert!(!summary.queue_ended);
        // Wrapped around at least once
        assert!(summary.tracks_started.len() >= 3);
        assert_eq!(summary.tracks_started[2], "a");
    }

    #[tokio::test(start_paused = true)]
    async fn equalizer_shapes_the_output() {
        let mut config = short_demo(&["a"]);
        config.player.enable_equalizer = true;
        config.demo.equalizer_preset = Some("rock".to_string());
        let player = HeadlessPlayer::new(config).unwrap();
        player.start().await.unwrap();

        let equalizer = player.controller().get_equalizer_state();
        assert_eq!(equalizer.preset.as_deref(), Some("ROCK"));
        player.sink().tick(0.1);
        assert!(player.sink().last_peak() > 0.0);
    }

    #[tokio::test]
    async fn second_player_on_a_sink_is_rejected() {
        let sink = Arc::new(SimulatedSink::new());
        let first = HeadlessPlayer::with_sink(short_demo(&["a"]), Arc::clone(&sink)).unwrap();

        let second = HeadlessPlayer::with_sink(short_demo(&["b"]), Arc::clone(&sink));
        assert!(matches!(
            second,
            Err(HeadlessError::Player(SoulError::SingletonViolation))
        ));

        first.controller().destroy();
        assert!(HeadlessPlayer::with_sink(short_demo(&["b"]), sink).is_ok());
    }
}
