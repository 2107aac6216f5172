//! Playback controller
//!
//! Orchestrates a [`MediaSink`] together with the queue, the equalizer
//! signal chain and the optional collaborators (streaming demuxer, OS session
//! surface), and publishes every observable change on a [`StateBus`].
//!
//! Lock discipline: the controller state sits behind a `std::sync::Mutex`
//! that is never held across an `.await`, while calling a sink method that
//! may emit events, or while publishing. Sink events re-enter the controller
//! through the listener registered when the controller is created.

use crate::bus::{StateBus, Subscription, PLAYER_STATE};
use crate::events;
use crate::play_log::{PlayLog, PlayLogEntry};
use crate::queue::QueueManager;
use crate::types::{LoopMode, OrderMode};
use crate::validation;
use soul_audio::equalizer::DEFAULT_BASS_BOOST_DB;
use soul_audio::{AudioBackend, CompressorSettings, EqualizerState, SignalChain};
use soul_core::types::is_manifest_uri;
use soul_core::{
    ListenerId, MediaSink, PlaybackStatus, PlayerConfiguration, PlayerState, PlayerStatePatch,
    PositionState, Result, SessionAction, SessionActionHandler, SessionPlaybackState,
    SessionSurface, SinkEvent, SoulError, SourceFetcher, StreamingSource, Track,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Optional platform capabilities handed to the controller
#[derive(Clone, Default)]
pub struct Collaborators {
    /// Adaptive-stream demuxer for sinks without native HLS
    pub streaming: Option<Arc<dyn StreamingSource>>,

    /// Host audio engine for the equalizer
    pub audio: Option<Arc<dyn AudioBackend>>,

    /// Lock-screen / notification controls
    pub session: Option<Arc<dyn SessionSurface>>,
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_streaming(mut self, streaming: Arc<dyn StreamingSource>) -> Self {
        self.streaming = Some(streaming);
        self
    }

    #[must_use]
    pub fn with_audio(mut self, audio: Arc<dyn AudioBackend>) -> Self {
        self.audio = Some(audio);
        self
    }

    #[must_use]
    pub fn with_session(mut self, session: Arc<dyn SessionSurface>) -> Self {
        self.session = Some(session);
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("streaming", &self.streaming.is_some())
            .field("audio", &self.audio.is_some())
            .field("session", &self.session.is_some())
            .finish()
    }
}

/// Position of the current track in the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// Nothing from the queue has been loaded
    Unset,

    At(usize),

    /// The current track was removed; `next` is the entry that followed it
    Detached { next: usize },
}

impl Cursor {
    fn index(self) -> Option<usize> {
        match self {
            Self::At(index) => Some(index),
            Self::Unset | Self::Detached { .. } => None,
        }
    }
}

struct ControllerState {
    config: PlayerConfiguration,
    destroyed: bool,

    // Queue
    queue: QueueManager,
    cursor: Cursor,
    loop_mode: LoopMode,
    queue_ended: bool,
    current_track: Option<Track>,

    /// Lazy source resolvers keyed by track id
    fetchers: HashMap<String, Arc<dyn SourceFetcher>>,

    // Subsystems
    equalizer: SignalChain,
    equalizer_enabled: bool,
    streaming_active: bool,
    streaming_attached: bool,
    session_active: bool,
    session_handler_registered: bool,
    play_log: Option<PlayLog>,

    // Sink wiring
    listeners: Vec<ListenerId>,
    diagnostics: Option<ListenerId>,

    /// Deferred plays waiting for the sink to become ready
    readiness_waiters: Vec<oneshot::Sender<()>>,
}

impl ControllerState {
    fn new() -> Self {
        Self {
            config: PlayerConfiguration::default(),
            destroyed: false,
            queue: QueueManager::new(),
            cursor: Cursor::Unset,
            loop_mode: LoopMode::Off,
            queue_ended: false,
            current_track: None,
            fetchers: HashMap::new(),
            equalizer: SignalChain::detached(),
            equalizer_enabled: false,
            streaming_active: false,
            streaming_attached: false,
            session_active: false,
            session_handler_registered: false,
            play_log: None,
            listeners: Vec::new(),
            diagnostics: None,
            readiness_waiters: Vec::new(),
        }
    }
}

pub(crate) struct Shared {
    sink: Arc<dyn MediaSink>,
    collaborators: Collaborators,
    bus: StateBus<PlayerState>,

    /// Bumped by every load, reset and destroy; deferred work compares it
    generation: AtomicU64,

    runtime: Option<Handle>,
    state: Mutex<ControllerState>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        let listeners: Vec<ListenerId> = state
            .listeners
            .drain(..)
            .chain(state.diagnostics.take())
            .collect();
        for id in listeners {
            self.sink.remove_listener(id);
        }
    }
}

/// Headless playback controller
///
/// Cloning yields another handle to the same controller.
#[derive(Clone)]
pub struct PlaybackController {
    shared: Arc<Shared>,
}

impl PlaybackController {
    /// Create a controller driving `sink`
    ///
    /// Only [`ControllerFactory`](crate::ControllerFactory) constructs
    /// controllers. Background continuations (auto-play, auto-advance,
    /// session actions) run on `runtime`, falling back to the runtime current
    /// when they are spawned.
    pub(crate) fn with_runtime(
        sink: Arc<dyn MediaSink>,
        collaborators: Collaborators,
        runtime: Option<Handle>,
    ) -> Self {
        let shared = Arc::new(Shared {
            sink,
            collaborators,
            bus: StateBus::new(),
            generation: AtomicU64::new(0),
            runtime,
            state: Mutex::new(ControllerState::new()),
        });

        let weak = Arc::downgrade(&shared);
        let id = shared.sink.add_listener(Arc::new(move |event: &SinkEvent| {
            if let Some(shared) = weak.upgrade() {
                PlaybackController { shared }.handle_sink_event(event);
            }
        }));

        let controller = Self { shared };
        controller.state().listeners.push(id);
        controller.emit(controller.sink_levels());
        debug!("Playback controller created");
        controller
    }

    pub(crate) fn downgrade(&self) -> Weak<Shared> {
        Arc::downgrade(&self.shared)
    }

    pub(crate) fn upgrade(weak: &Weak<Shared>) -> Option<Self> {
        weak.upgrade().map(|shared| Self { shared })
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn live_state(&self) -> Result<MutexGuard<'_, ControllerState>> {
        let state = self.state();
        if state.destroyed {
            return Err(SoulError::Destroyed);
        }
        Ok(state)
    }

    fn ensure_alive(&self) -> Result<()> {
        self.live_state().map(drop)
    }

    fn emit(&self, patch: PlayerStatePatch) {
        self.shared.bus.publish(PLAYER_STATE, Some(&patch));
    }

    fn next_generation(&self) -> u64 {
        self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.shared.generation.load(Ordering::SeqCst) == generation && !self.state().destroyed
    }

    fn sink_levels(&self) -> PlayerStatePatch {
        let sink = &self.shared.sink;
        PlayerStatePatch {
            volume: Some((sink.volume() * 100.0).round().clamp(0.0, 100.0) as u8),
            playback_rate: Some(sink.playback_rate()),
            ..PlayerStatePatch::default()
        }
    }

    fn session(&self) -> Option<Arc<dyn SessionSurface>> {
        if !self.state().session_active {
            return None;
        }
        self.shared.collaborators.session.clone()
    }

    fn session_state(&self, state: SessionPlaybackState) {
        if let Some(session) = self.session() {
            session.set_playback_state(state);
        }
    }

    /// Run `task` on the controller's runtime
    fn spawn<F>(&self, what: &'static str, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let runtime = self
            .shared
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok());
        match runtime {
            Some(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = task.await {
                        warn!("{} failed: {}", what, e);
                    }
                });
            }
            None => warn!("No tokio runtime available, {} skipped", what),
        }
    }

    // ===== Lifecycle =====

    /// Apply a configuration
    ///
    /// May be called again; listeners and the session handler are never
    /// registered twice.
    pub fn initialize(&self, config: PlayerConfiguration) -> Result<()> {
        self.ensure_alive()?;
        let sink = &self.shared.sink;
        let collaborators = &self.shared.collaborators;

        sink.set_preload(config.preload_strategy);
        sink.set_cross_origin(config.cross_origin);

        let streaming_active = config.enable_hls
            && match &collaborators.streaming {
                Some(streaming) => {
                    streaming.configure(&config.hls_config);
                    true
                }
                None => {
                    warn!("HLS enabled but no streaming source was supplied");
                    false
                }
            };

        let session_active = match (
            config.show_notification_actions,
            collaborators.session.is_some(),
        ) {
            (true, true) => true,
            (true, false) => {
                warn!("Notification actions enabled but no session surface was supplied");
                false
            }
            (false, _) => false,
        };

        let (register_session, add_diagnostics, remove_diagnostics) = {
            let mut state = self.live_state()?;
            state.streaming_active = streaming_active;
            state.session_active = session_active;

            let register_session = session_active && !state.session_handler_registered;
            state.session_handler_registered |= register_session;

            let (add, remove) = match (config.use_default_event_listeners, state.diagnostics) {
                (true, None) => (true, None),
                (false, Some(id)) => {
                    state.diagnostics = None;
                    (false, Some(id))
                }
                _ => (false, None),
            };

            if config.enable_equalizer && !state.equalizer_enabled {
                match &collaborators.audio {
                    Some(audio) => {
                        // Re-enabling must not leak the graph opened last time
                        state.equalizer.destroy();
                        state.equalizer = SignalChain::open(audio.as_ref());
                    }
                    None => warn!("Equalizer enabled but no audio backend was supplied"),
                }
            }
            state.equalizer_enabled = config.enable_equalizer;

            match (config.enable_play_log, state.play_log.is_some()) {
                (true, false) => state.play_log = Some(PlayLog::new()),
                (false, true) => state.play_log = None,
                _ => {}
            }

            state.config = config;
            (register_session, add, remove)
        };

        if let Some(id) = remove_diagnostics {
            sink.remove_listener(id);
        }
        if add_diagnostics {
            let id = sink.add_listener(events::diagnostics_listener());
            self.state().diagnostics = Some(id);
        }
        if register_session {
            if let Some(session) = &collaborators.session {
                session.register_action_handler(self.session_handler());
            }
        }

        self.emit(self.sink_levels());
        info!(
            hls = streaming_active,
            session = session_active,
            "Playback controller initialized"
        );
        Ok(())
    }

    /// Stop playback, forget the current track and return to `idle`
    ///
    /// The queue is kept.
    pub async fn reset(&self) -> Result<()> {
        let was_attached = {
            let mut state = self.live_state()?;
            state.readiness_waiters.clear();
            state.current_track = None;
            state.cursor = Cursor::Unset;
            state.queue_ended = false;
            std::mem::take(&mut state.streaming_attached)
        };
        self.next_generation();

        self.shared.sink.pause();
        if was_attached {
            self.detach_streaming();
        }
        self.shared.sink.set_source(None).await?;

        self.emit(idle_patch());
        self.session_state(SessionPlaybackState::None);
        debug!("Playback reset");
        Ok(())
    }

    /// Tear the controller down
    ///
    /// Idempotent. Every later operation fails with `Destroyed`.
    pub fn destroy(&self) {
        let (listeners, was_attached, session_active) = {
            let mut state = self.state();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.readiness_waiters.clear();
            state.equalizer.destroy();
            state.current_track = None;

            let mut listeners = std::mem::take(&mut state.listeners);
            listeners.extend(state.diagnostics.take());
            (
                listeners,
                std::mem::take(&mut state.streaming_attached),
                state.session_active,
            )
        };
        self.next_generation();

        let sink = &self.shared.sink;
        for id in listeners {
            sink.remove_listener(id);
        }
        sink.pause();
        if was_attached {
            self.detach_streaming();
        }
        if session_active {
            if let Some(session) = &self.shared.collaborators.session {
                session.set_playback_state(SessionPlaybackState::None);
            }
        }

        self.shared.bus.clear();
        info!("Playback controller destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.state().destroyed
    }

    fn detach_streaming(&self) {
        if let Some(streaming) = &self.shared.collaborators.streaming {
            streaming.detach();
        }
    }

    // ===== Loading =====

    /// Load `track` into the sink
    ///
    /// Starts playback once the sink is ready when `auto_play` is configured.
    pub async fn load_track(&self, track: Track) -> Result<()> {
        self.load_with_auto_play(track, None).await
    }

    /// Load a track whose source is resolved by `fetcher`
    ///
    /// The fetcher is kept for the track id and reused by later loads.
    pub async fn load_track_with_fetcher(
        &self,
        track: Track,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> Result<()> {
        self.load_with_auto_play(track, Some(fetcher)).await
    }

    async fn load_with_auto_play(
        &self,
        track: Track,
        fetcher: Option<Arc<dyn SourceFetcher>>,
    ) -> Result<()> {
        let Some(generation) = self.load_inner(track, fetcher, None).await? else {
            return Ok(());
        };
        if self.state().config.auto_play {
            let controller = self.clone();
            self.spawn("auto-play", async move {
                controller.play_when_ready(generation).await
            });
        }
        Ok(())
    }

    /// Register a source resolver for tracks with `track_id`
    pub fn register_fetcher(
        &self,
        track_id: impl Into<String>,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> Result<()> {
        self.live_state()?.fetchers.insert(track_id.into(), fetcher);
        Ok(())
    }

    /// Load `track` and start playback once the sink is ready
    ///
    /// Returns `Ok` without playing when a later load supersedes this one.
    pub async fn load_and_play(&self, track: Track) -> Result<()> {
        match self.load_inner(track, None, None).await? {
            Some(generation) => self.play_when_ready(generation).await,
            None => Ok(()),
        }
    }

    /// Returns the load's generation, or `None` when it was superseded or
    /// fell back to `idle`
    async fn load_inner(
        &self,
        mut track: Track,
        fetcher: Option<Arc<dyn SourceFetcher>>,
        index: Option<usize>,
    ) -> Result<Option<u64>> {
        validation::track(&track)?;
        let generation = {
            let mut state = self.live_state()?;
            state.readiness_waiters.clear();
            if let Some(fetcher) = fetcher {
                state.fetchers.insert(track.id.clone(), fetcher);
            }
            self.next_generation()
        };

        let source = match track.source.clone() {
            Some(source) => source,
            None => {
                let fetcher = self.state().fetchers.get(&track.id).cloned();
                let Some(fetcher) = fetcher else {
                    return Err(SoulError::invalid_input(format!(
                        "track '{}' has no source and no fetcher",
                        track.id
                    )));
                };
                let uri = fetcher.fetch(&track).await?;
                validation::source(&uri)?.to_string()
            }
        };
        if !self.is_current(generation) {
            debug!("Load of '{}' superseded", track.id);
            return Ok(None);
        }
        track.source = Some(source.clone());

        let (index, streaming_active) = {
            let mut state = self.state();
            let index = index.or_else(|| state.queue.position_of(&track.id));
            state.cursor = index.map_or(Cursor::Unset, Cursor::At);
            state.queue_ended = false;
            if let Some(log) = state.play_log.as_mut() {
                log.track_loaded(&track.id);
            }
            state.current_track = Some(track.clone());
            (index, state.streaming_active)
        };

        let sink = &self.shared.sink;
        let delegate = is_manifest_uri(&source) && !sink.supports_native_hls();

        if delegate {
            let streaming = self
                .shared
                .collaborators
                .streaming
                .clone()
                .filter(|_| streaming_active);
            let Some(streaming) = streaming else {
                warn!(
                    "Track '{}' is an HLS manifest but no streaming source is active, resetting",
                    track.id
                );
                sink.pause();
                sink.set_source(None).await?;
                self.state().current_track = None;
                self.emit(PlayerStatePatch {
                    playback_state: Some(PlaybackStatus::Idle),
                    current_track: Some(None),
                    current_index: Some(index),
                    progress: Some(0.0),
                    duration: Some(None),
                    ..PlayerStatePatch::default()
                });
                return Ok(None);
            };

            let needs_attach = !self.state().streaming_attached;
            if needs_attach {
                streaming.attach(Arc::clone(sink)).await?;
                self.state().streaming_attached = true;
            }
            if !self.is_current(generation) {
                return Ok(None);
            }
            self.emit(track_changed(&track, index));
            if let Err(e) = streaming.load_manifest(&source).await {
                return Err(self.load_failed(e));
            }
        } else {
            let was_attached = std::mem::take(&mut self.state().streaming_attached);
            if was_attached {
                self.detach_streaming();
            }
            sink.set_source(Some(&source)).await?;
            if !self.is_current(generation) {
                return Ok(None);
            }
            self.emit(track_changed(&track, index));
            if let Err(e) = sink.load().await {
                return Err(self.load_failed(e));
            }
        }

        if let Some(session) = self.session() {
            session.set_metadata(&track);
        }
        debug!(track = %track.id, ?index, "Track loaded");
        Ok(Some(generation))
    }

    fn load_failed(&self, error: SoulError) -> SoulError {
        warn!("Load failed: {}", error);
        self.emit(
            PlayerStatePatch::status(PlaybackStatus::Error).with_error(Some(error.to_string())),
        );
        error
    }

    /// Wait until the sink can start, then play, unless superseded meanwhile
    async fn play_when_ready(&self, generation: u64) -> Result<()> {
        let ready = {
            let mut state = self.live_state()?;
            if self.shared.sink.can_start() {
                None
            } else {
                let (tx, rx) = oneshot::channel();
                state.readiness_waiters.push(tx);
                Some(rx)
            }
        };

        if let Some(ready) = ready {
            if ready.await.is_err() {
                debug!("Deferred play superseded");
                return Ok(());
            }
        }
        if !self.is_current(generation) {
            debug!("Deferred play superseded");
            return Ok(());
        }
        self.play().await
    }

    // ===== Transport =====

    /// Start or resume playback
    ///
    /// Does nothing unless the sink is paused, has a source and is ready.
    /// A rejection by the sink leaves the player `paused` and is not an error.
    pub async fn play(&self) -> Result<()> {
        self.ensure_alive()?;
        let sink = &self.shared.sink;
        if !sink.is_paused() || !sink.has_source() || !sink.can_start() {
            debug!(
                paused = sink.is_paused(),
                has_source = sink.has_source(),
                "play() ignored"
            );
            return Ok(());
        }

        match sink.play().await {
            Ok(()) => {}
            Err(SoulError::PlaybackRejected(reason)) => {
                warn!("Playback rejected by the sink: {}", reason);
                self.emit(PlayerStatePatch::status(PlaybackStatus::Paused));
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        {
            let mut state = self.state();
            if state.equalizer_enabled {
                if let Err(e) = state.equalizer.attach() {
                    warn!("Equalizer unavailable: {}", e);
                }
            }
        }
        self.session_state(SessionPlaybackState::Playing);
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        self.ensure_alive()?;
        self.shared.sink.pause();
        self.session_state(SessionPlaybackState::Paused);
        Ok(())
    }

    /// Pause and rewind to the start of the current track
    pub fn stop(&self) -> Result<()> {
        self.ensure_alive()?;
        let sink = &self.shared.sink;
        sink.pause();
        sink.seek(0.0);
        self.emit(PlayerStatePatch::status(PlaybackStatus::Idle).with_progress(0.0));
        self.session_state(SessionPlaybackState::None);
        Ok(())
    }

    async fn restart_track(&self) -> Result<()> {
        self.ensure_alive()?;
        self.shared.sink.seek(0.0);
        self.emit(PlayerStatePatch::default().with_progress(0.0));
        self.play().await
    }

    // ===== Volume & Rate =====

    /// Set volume (0-100), stored rounded to the nearest step
    pub fn set_volume(&self, volume: f64) -> Result<()> {
        self.ensure_alive()?;
        let level = validation::volume(volume)?;
        self.shared.sink.set_volume(volume / 100.0);
        self.emit(PlayerStatePatch {
            volume: Some(level),
            ..PlayerStatePatch::default()
        });
        Ok(())
    }

    /// Current volume level (0-100)
    pub fn get_volume(&self) -> u8 {
        self.get_current_state().volume
    }

    pub fn set_playback_rate(&self, rate: f64) -> Result<()> {
        self.ensure_alive()?;
        let rate = validation::playback_rate(rate)?;
        self.shared.sink.set_playback_rate(rate);
        self.emit(PlayerStatePatch {
            playback_rate: Some(rate),
            ..PlayerStatePatch::default()
        });
        Ok(())
    }

    pub fn get_playback_rate(&self) -> f64 {
        self.get_current_state().playback_rate
    }

    pub fn mute(&self) -> Result<()> {
        self.ensure_alive()?;
        self.shared.sink.set_muted(true);
        Ok(())
    }

    pub fn unmute(&self) -> Result<()> {
        self.ensure_alive()?;
        self.shared.sink.set_muted(false);
        Ok(())
    }

    pub fn is_muted(&self) -> bool {
        self.shared.sink.is_muted()
    }

    // ===== Seek =====

    /// Seek to `seconds`, clamped to the media duration
    pub fn seek_to_time(&self, seconds: f64) -> Result<()> {
        self.ensure_alive()?;
        let sink = &self.shared.sink;
        let requested = validation::seek_time(seconds)?;
        let target = sink
            .duration()
            .filter(|d| d.is_finite())
            .map_or(requested, |d| requested.min(d));

        // The sink reports the new position synchronously, so the log has to
        // close the old segment first
        let from = sink.current_time();
        if let Some(log) = self.state().play_log.as_mut() {
            log.seeked(from, target);
        }
        sink.seek(target);

        self.emit(PlayerStatePatch::default().with_progress(target));
        if let Some(session) = self.session() {
            session.set_position_state(PositionState {
                duration: sink.duration(),
                playback_rate: sink.playback_rate(),
                position: target,
            });
        }
        Ok(())
    }

    /// Seek relative to the current position; never before the start
    pub fn seek_by_time(&self, offset: f64) -> Result<()> {
        self.ensure_alive()?;
        let offset = validation::seek_offset(offset)?;
        let target = (self.shared.sink.current_time() + offset).max(0.0);
        self.seek_to_time(target)
    }

    // ===== Queue Management =====

    /// Replace the queue
    ///
    /// The cursor follows the current track when it is part of the new queue.
    pub fn set_queue(&self, tracks: Vec<Track>, mode: OrderMode) -> Result<()> {
        validation::tracks(&tracks)?;
        let (index, ended) = {
            let mut state = self.live_state()?;
            state.queue.set_queue(tracks, mode)?;
            let index = state
                .current_track
                .as_ref()
                .and_then(|track| state.queue.position_of(&track.id));
            state.cursor = index.map_or(Cursor::Unset, Cursor::At);
            (index, std::mem::take(&mut state.queue_ended))
        };

        let mut patch = index_patch(index);
        if ended {
            patch.playback_state = Some(PlaybackStatus::Idle);
        }
        self.emit(patch);
        Ok(())
    }

    /// Append tracks to the queue
    pub fn add_to_queue(&self, tracks: Vec<Track>) -> Result<()> {
        tracks.iter().try_for_each(validation::track)?;
        self.live_state()?.queue.add_to_queue(tracks);
        Ok(())
    }

    /// Remove every entry with `track_id`
    ///
    /// Removing the current track detaches the cursor: `current_index`
    /// becomes `None` while the track keeps playing, and the next
    /// `play_next` plays the entry that followed it.
    pub fn remove_from_queue(&self, track_id: &str) -> Result<bool> {
        let index = {
            let mut state = self.live_state()?;
            let queue = &state.queue;
            let cursor = match state.cursor {
                Cursor::At(i) if queue.get(i).is_some_and(|t| t.id == track_id) => {
                    Cursor::Detached {
                        next: i - queue.count_before(track_id, i),
                    }
                }
                Cursor::At(i) => Cursor::At(i - queue.count_before(track_id, i)),
                Cursor::Detached { next } => Cursor::Detached {
                    next: next - queue.count_before(track_id, next),
                },
                Cursor::Unset => Cursor::Unset,
            };

            if !state.queue.remove_by_id(track_id) {
                debug!("remove_from_queue: '{}' not queued", track_id);
                return Ok(false);
            }
            state.cursor = if state.queue.is_empty() {
                Cursor::Unset
            } else {
                cursor
            };
            state.cursor.index()
        };

        self.emit(index_patch(index));
        Ok(true)
    }

    /// Empty the queue; the current track keeps playing
    pub fn clear_queue(&self) -> Result<()> {
        {
            let mut state = self.live_state()?;
            state.queue.clear();
            state.cursor = Cursor::Unset;
        }
        self.emit(index_patch(None));
        Ok(())
    }

    pub fn get_queue(&self) -> Vec<Track> {
        self.state().queue.tracks().to_vec()
    }

    /// Queue index of the current track
    pub fn get_current_track_index(&self) -> Option<usize> {
        self.state().cursor.index()
    }

    pub fn current_track(&self) -> Option<Track> {
        self.state().current_track.clone()
    }

    // ===== Navigation =====

    /// Load and play the queue entry at `index`
    pub async fn play_track_at(&self, index: usize) -> Result<()> {
        let track = {
            let state = self.live_state()?;
            let index = validation::queue_index(index, state.queue.len())?;
            state.queue.tracks()[index].clone()
        };
        match self.load_inner(track, None, Some(index)).await? {
            Some(generation) => self.play_when_ready(generation).await,
            None => Ok(()),
        }
    }

    /// Advance per the loop mode; at the end of the queue emits `queueended`
    pub async fn play_next(&self) -> Result<()> {
        let next = {
            let state = self.live_state()?;
            let len = state.queue.len();
            match state.cursor {
                Cursor::Unset => (len > 0).then_some(0),
                Cursor::At(i) => state.queue.next_index(i, state.loop_mode),
                Cursor::Detached { next } if next < len => Some(next),
                Cursor::Detached { .. } => {
                    (state.loop_mode == LoopMode::Queue && len > 0).then_some(0)
                }
            }
        };

        match next {
            Some(index) => self.play_track_at(index).await,
            None => {
                self.finish_queue();
                Ok(())
            }
        }
    }

    /// Step back one entry; at the start of the queue this is a no-op
    pub async fn play_previous(&self) -> Result<()> {
        let previous = {
            let state = self.live_state()?;
            match state.cursor {
                Cursor::Unset => None,
                Cursor::At(i) => state.queue.previous_index(i),
                Cursor::Detached { next } => {
                    next.checked_sub(1).filter(|i| *i < state.queue.len())
                }
            }
        };

        match previous {
            Some(index) => self.play_track_at(index).await,
            None => {
                debug!("No previous track");
                Ok(())
            }
        }
    }

    fn finish_queue(&self) {
        {
            let mut state = self.state();
            state.readiness_waiters.clear();
            state.queue_ended = true;
        }
        self.next_generation();
        self.shared.sink.pause();
        self.emit(PlayerStatePatch::status(PlaybackStatus::QueueEnded));
        self.session_state(SessionPlaybackState::Paused);
        info!("Queue ended");
    }

    // ===== Shuffle & Loop =====

    /// Shuffle the queue around the current track, or restore the
    /// pre-shuffle order; repeated toggles are no-ops
    pub fn enable_shuffle(&self, enabled: bool) -> Result<()> {
        let index = {
            let mut state = self.live_state()?;
            let current_id = state.current_track.as_ref().map(|t| t.id.clone());
            let changed = if enabled {
                state.queue.enable_shuffle(current_id.as_deref())
            } else {
                state.queue.disable_shuffle()
            };
            if !changed {
                debug!(enabled, "Shuffle unchanged");
                return Ok(());
            }

            let index = current_id.and_then(|id| state.queue.position_of(&id));
            state.cursor = index.map_or(Cursor::Unset, Cursor::At);
            index
        };

        self.emit(index_patch(index));
        Ok(())
    }

    pub fn is_shuffle_active(&self) -> bool {
        self.state().queue.is_shuffled()
    }

    pub fn set_loop_mode(&self, mode: LoopMode) -> Result<()> {
        self.live_state()?.loop_mode = mode;
        debug!(?mode, "Loop mode set");
        Ok(())
    }

    pub fn get_loop_mode(&self) -> LoopMode {
        self.state().loop_mode
    }

    // ===== Equalizer =====

    pub fn get_equalizer_presets(&self) -> Vec<&'static str> {
        SignalChain::preset_names()
    }

    pub fn set_equalizer_preset(&self, name: &str) -> Result<()> {
        self.live_state()?.equalizer.apply_preset(name)
    }

    /// Apply ten band gains (dB), clamped to ±12
    pub fn set_custom_equalizer(&self, gains: &[f32]) -> Result<()> {
        self.live_state()?.equalizer.set_custom_gains(gains)
    }

    /// Toggle the bass shelf; `amount_db` defaults to 6 dB
    pub fn enable_bass_boost(&self, enabled: bool, amount_db: Option<f32>) -> Result<()> {
        self.live_state()?
            .equalizer
            .set_bass_boost(enabled, amount_db.unwrap_or(DEFAULT_BASS_BOOST_DB))
    }

    pub fn set_compressor(&self, settings: CompressorSettings) -> Result<()> {
        self.live_state()?.equalizer.set_compressor(settings)
    }

    pub fn get_equalizer_state(&self) -> EqualizerState {
        self.state().equalizer.state()
    }

    // ===== State =====

    /// Subscribe to player state changes
    pub fn on_state_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PlayerState) + Send + Sync + 'static,
    {
        self.shared.bus.subscribe(PLAYER_STATE, callback)
    }

    /// Latest published state
    pub fn get_current_state(&self) -> PlayerState {
        self.shared.bus.latest(PLAYER_STATE).unwrap_or_default()
    }

    /// Listening log; empty unless `enable_play_log` is configured
    pub fn play_log(&self) -> Vec<PlayLogEntry> {
        self.state()
            .play_log
            .as_ref()
            .map(PlayLog::entries)
            .unwrap_or_default()
    }

    // ===== Sink & Session Events =====

    fn handle_sink_event(&self, event: &SinkEvent) {
        let loop_mode = {
            let mut state = self.state();
            if state.destroyed {
                return;
            }
            let sink = &self.shared.sink;
            match event {
                SinkEvent::CanPlay | SinkEvent::CanPlayThrough => {
                    for waiter in state.readiness_waiters.drain(..) {
                        let _ = waiter.send(());
                    }
                }
                SinkEvent::Playing => {
                    if let Some(log) = state.play_log.as_mut() {
                        log.playing(sink.current_time());
                    }
                }
                SinkEvent::Pause | SinkEvent::Ended => {
                    if let Some(log) = state.play_log.as_mut() {
                        log.stopped(sink.current_time());
                    }
                }
                SinkEvent::TimeUpdate(position) => {
                    if let Some(log) = state.play_log.as_mut() {
                        log.progress(*position);
                    }
                }
                _ => {}
            }
            state.loop_mode
        };

        if let Some(patch) = events::patch_for(event) {
            self.emit(patch);
        }

        if *event == SinkEvent::Ended {
            // A load issued before the task runs supersedes it
            let generation = self.shared.generation.load(Ordering::SeqCst);
            let controller = self.clone();
            if loop_mode == LoopMode::Single {
                self.spawn("repeat track", async move {
                    if !controller.is_current(generation) {
                        debug!("Repeat superseded");
                        return Ok(());
                    }
                    controller.restart_track().await
                });
            } else {
                self.spawn("advance queue", async move {
                    if !controller.is_current(generation) {
                        debug!("Auto-advance superseded");
                        return Ok(());
                    }
                    controller.play_next().await
                });
            }
        }
    }

    fn session_handler(&self) -> SessionActionHandler {
        let weak = self.downgrade();
        Arc::new(move |action: SessionAction| {
            let Some(controller) = Self::upgrade(&weak) else {
                return;
            };
            let task = controller.clone();
            controller.spawn("session action", async move {
                task.handle_session_action(action).await
            });
        })
    }

    async fn handle_session_action(&self, action: SessionAction) -> Result<()> {
        debug!(?action, "Session action");
        match action {
            SessionAction::Play => self.play().await,
            SessionAction::Pause => self.pause(),
            SessionAction::NextTrack => self.play_next().await,
            SessionAction::PreviousTrack => self.play_previous().await,
            SessionAction::SeekTo(position) => self.seek_to_time(position),
        }
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("PlaybackController")
            .field("generation", &self.shared.generation.load(Ordering::SeqCst))
            .field("destroyed", &state.destroyed)
            .field("queue_len", &state.queue.len())
            .field("cursor", &state.cursor)
            .field("collaborators", &self.shared.collaborators)
            .finish()
    }
}

fn index_patch(index: Option<usize>) -> PlayerStatePatch {
    PlayerStatePatch {
        current_index: Some(index),
        ..PlayerStatePatch::default()
    }
}

fn track_changed(track: &Track, index: Option<usize>) -> PlayerStatePatch {
    PlayerStatePatch {
        playback_state: Some(PlaybackStatus::TrackChanged),
        current_track: Some(Some(track.clone())),
        current_index: Some(index),
        buffered_duration: Some(0.0),
        progress: Some(0.0),
        duration: Some(track.duration().map(|d| d.as_secs_f64())),
        error: Some(None),
        ..PlayerStatePatch::default()
    }
}

fn idle_patch() -> PlayerStatePatch {
    PlayerStatePatch {
        playback_state: Some(PlaybackStatus::Idle),
        current_track: Some(None),
        current_index: Some(None),
        buffered_duration: Some(0.0),
        progress: Some(0.0),
        duration: Some(None),
        error: Some(None),
        ..PlayerStatePatch::default()
    }
}
