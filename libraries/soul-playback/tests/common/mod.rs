//! Shared fakes for controller integration tests
//!
//! `FakeSink` behaves like a well-mannered media element: loads complete
//! immediately, events are dispatched synchronously with no lock held.

#![allow(dead_code)]

use async_trait::async_trait;
use soul_core::{
    CrossOrigin, Environment, ListenerId, MediaSink, PlaybackStatus, PlayerState, PreloadStrategy,
    ReadyState, Result, SinkEvent, SinkListener, SoulError, SourceFetcher, StreamingSource, Track,
};
use soul_playback::{Collaborators, ControllerFactory, PlaybackController};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Length reported for every loaded source, in seconds
pub const MEDIA_DURATION: f64 = 180.0;

// ===== Fake Media Sink =====

struct SinkInner {
    source: Option<String>,
    paused: bool,
    current_time: f64,
    duration: Option<f64>,
    ready: ReadyState,
    volume: f64,
    rate: f64,
    muted: bool,
    preload: PreloadStrategy,
    cross_origin: CrossOrigin,

    reject_play: bool,
    manual_ready: bool,
    loads: Vec<String>,
    play_calls: usize,
}

pub struct FakeSink {
    inner: Mutex<SinkInner>,
    listeners: Mutex<Vec<(ListenerId, SinkListener)>>,
    next_listener: AtomicU64,
    native_hls: bool,
}

impl FakeSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(false))
    }

    /// Sink that plays HLS manifests itself
    pub fn with_native_hls() -> Arc<Self> {
        Arc::new(Self::build(true))
    }

    fn build(native_hls: bool) -> Self {
        Self {
            inner: Mutex::new(SinkInner {
                source: None,
                paused: true,
                current_time: 0.0,
                duration: None,
                ready: ReadyState::HaveNothing,
                volume: 1.0,
                rate: 1.0,
                muted: false,
                preload: PreloadStrategy::Auto,
                cross_origin: CrossOrigin::Unset,
                reject_play: false,
                manual_ready: false,
                loads: Vec::new(),
                play_calls: 0,
            }),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            native_hls,
        }
    }

    fn emit(&self, event: SinkEvent) {
        let listeners: Vec<SinkListener> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&event);
        }
    }

    /// Refuse every `play()` like an autoplay policy would
    pub fn reject_play(&self, reject: bool) {
        self.inner.lock().unwrap().reject_play = reject;
    }

    /// Loads stop at metadata until `become_ready` is called
    pub fn set_manual_ready(&self, manual: bool) {
        self.inner.lock().unwrap().manual_ready = manual;
    }

    pub fn become_ready(&self) {
        self.inner.lock().unwrap().ready = ReadyState::HaveEnoughData;
        self.emit(SinkEvent::CanPlay);
        self.emit(SinkEvent::CanPlayThrough);
    }

    /// Play forward by `seconds`
    pub fn advance(&self, seconds: f64) {
        let position = {
            let mut inner = self.inner.lock().unwrap();
            inner.current_time += seconds;
            inner.current_time
        };
        self.emit(SinkEvent::TimeUpdate(position));
    }

    /// Reach the end of the media
    pub fn finish(&self) {
        let end = {
            let mut inner = self.inner.lock().unwrap();
            let end = inner.duration.unwrap_or(MEDIA_DURATION);
            inner.current_time = end;
            inner.paused = true;
            end
        };
        self.emit(SinkEvent::TimeUpdate(end));
        self.emit(SinkEvent::Ended);
    }

    pub fn fail(&self, message: &str) {
        self.emit(SinkEvent::Error(message.to_string()));
    }

    pub fn source(&self) -> Option<String> {
        self.inner.lock().unwrap().source.clone()
    }

    pub fn loads(&self) -> Vec<String> {
        self.inner.lock().unwrap().loads.clone()
    }

    pub fn play_calls(&self) -> usize {
        self.inner.lock().unwrap().play_calls
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    pub fn preload(&self) -> PreloadStrategy {
        self.inner.lock().unwrap().preload
    }

    pub fn cross_origin(&self) -> CrossOrigin {
        self.inner.lock().unwrap().cross_origin
    }
}

#[async_trait]
impl MediaSink for FakeSink {
    async fn set_source(&self, uri: Option<&str>) -> Result<()> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.source = uri.map(str::to_string);
            inner.ready = ReadyState::HaveNothing;
            inner.current_time = 0.0;
            inner.duration = None;
        }
        if uri.is_some() {
            self.emit(SinkEvent::LoadStart);
        }
        Ok(())
    }

    async fn load(&self) -> Result<()> {
        let manual = {
            let mut inner = self.inner.lock().unwrap();
            let Some(source) = inner.source.clone() else {
                return Err(SoulError::sink("no source assigned"));
            };
            inner.loads.push(source);
            // Loading a new resource always leaves the element paused
            inner.paused = true;
            inner.current_time = 0.0;
            inner.duration = Some(MEDIA_DURATION);
            inner.ready = if inner.manual_ready {
                ReadyState::HaveMetadata
            } else {
                ReadyState::HaveEnoughData
            };
            inner.manual_ready
        };

        self.emit(SinkEvent::DurationChange(MEDIA_DURATION));
        if !manual {
            self.emit(SinkEvent::CanPlay);
        }
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.reject_play {
                return Err(SoulError::rejected("user gesture required"));
            }
            inner.paused = false;
            inner.play_calls += 1;
        }
        self.emit(SinkEvent::Playing);
        Ok(())
    }

    fn pause(&self) {
        let was_playing = {
            let mut inner = self.inner.lock().unwrap();
            !std::mem::replace(&mut inner.paused, true)
        };
        if was_playing {
            self.emit(SinkEvent::Pause);
        }
    }

    fn seek(&self, position: f64) {
        self.inner.lock().unwrap().current_time = position;
        self.emit(SinkEvent::TimeUpdate(position));
    }

    fn current_time(&self) -> f64 {
        self.inner.lock().unwrap().current_time
    }

    fn duration(&self) -> Option<f64> {
        self.inner.lock().unwrap().duration
    }

    fn buffered(&self) -> f64 {
        self.inner.lock().unwrap().duration.unwrap_or(0.0)
    }

    fn ready_state(&self) -> ReadyState {
        self.inner.lock().unwrap().ready
    }

    fn is_paused(&self) -> bool {
        self.inner.lock().unwrap().paused
    }

    fn has_source(&self) -> bool {
        self.inner.lock().unwrap().source.is_some()
    }

    fn volume(&self) -> f64 {
        self.inner.lock().unwrap().volume
    }

    fn set_volume(&self, volume: f64) {
        self.inner.lock().unwrap().volume = volume;
        self.emit(SinkEvent::VolumeChange);
    }

    fn playback_rate(&self) -> f64 {
        self.inner.lock().unwrap().rate
    }

    fn set_playback_rate(&self, rate: f64) {
        self.inner.lock().unwrap().rate = rate;
        self.emit(SinkEvent::RateChange);
    }

    fn is_muted(&self) -> bool {
        self.inner.lock().unwrap().muted
    }

    fn set_muted(&self, muted: bool) {
        self.inner.lock().unwrap().muted = muted;
        self.emit(SinkEvent::VolumeChange);
    }

    fn set_preload(&self, strategy: PreloadStrategy) {
        self.inner.lock().unwrap().preload = strategy;
    }

    fn set_cross_origin(&self, mode: CrossOrigin) {
        self.inner.lock().unwrap().cross_origin = mode;
    }

    fn supports_native_hls(&self) -> bool {
        self.native_hls
    }

    fn add_listener(&self, listener: SinkListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        self.listeners.lock().unwrap().push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.lock().unwrap().retain(|(l, _)| *l != id);
    }
}

// ===== Fake Streaming Source =====

/// Demuxer that feeds manifests straight into the attached sink
#[derive(Default)]
pub struct FakeStreaming {
    sink: Mutex<Option<Arc<dyn MediaSink>>>,
    pub attaches: AtomicUsize,
    pub detaches: AtomicUsize,
    pub manifests: Mutex<Vec<String>>,
    pub config: Mutex<Option<serde_json::Value>>,
}

impl FakeStreaming {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl StreamingSource for FakeStreaming {
    fn configure(&self, config: &serde_json::Value) {
        *self.config.lock().unwrap() = Some(config.clone());
    }

    async fn attach(&self, sink: Arc<dyn MediaSink>) -> Result<()> {
        self.attaches.fetch_add(1, Ordering::SeqCst);
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    async fn load_manifest(&self, uri: &str) -> Result<()> {
        self.manifests.lock().unwrap().push(uri.to_string());
        let sink = self.sink.lock().unwrap().clone();
        let sink = sink.ok_or_else(|| SoulError::sink("streaming source not attached"))?;
        sink.set_source(Some(uri)).await?;
        sink.load().await
    }

    fn detach(&self) {
        self.detaches.fetch_add(1, Ordering::SeqCst);
        self.sink.lock().unwrap().take();
    }
}

// ===== Fake Fetcher =====

/// Resolves every track to `https://resolved.test/<id>.mp3`
#[derive(Default)]
pub struct FakeFetcher {
    pub calls: AtomicUsize,
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn fetch(&self, track: &Track) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("https://resolved.test/{}.mp3", track.id))
    }
}

// ===== Test Helpers =====

pub fn create_test_track(id: &str) -> Track {
    Track::new(id, format!("Track {}", id)).with_source(format!("https://cdn.test/{}.mp3", id))
}

pub fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| create_test_track(id)).collect()
}

/// The production controller for `sink`
pub fn create_controller(sink: &Arc<FakeSink>, collaborators: Collaborators) -> PlaybackController {
    ControllerFactory::new(sink.clone(), collaborators, Environment::Production)
        .create()
        .unwrap()
}

pub fn queue_ids(controller: &PlaybackController) -> Vec<String> {
    controller.get_queue().into_iter().map(|t| t.id).collect()
}

/// Every published state, in order
pub fn record_states(controller: &PlaybackController) -> Arc<Mutex<Vec<PlayerState>>> {
    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&states);
    // Kept for the controller's lifetime
    let _subscription = controller.on_state_change(move |state: &PlayerState| {
        sink.lock().unwrap().push(state.clone());
    });
    states
}

pub fn statuses(states: &Mutex<Vec<PlayerState>>) -> Vec<PlaybackStatus> {
    let mut out: Vec<PlaybackStatus> = Vec::new();
    for state in states.lock().unwrap().iter() {
        if out.last() != Some(&state.playback_state) {
            out.push(state.playback_state);
        }
    }
    out
}

/// Let spawned continuations (auto-advance, auto-play) run
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
