//! Simulated media sink
//!
//! A clock-driven stand-in for a media element. Nothing is decoded: every
//! source resolves immediately, reports the duration registered for it and
//! plays a test tone that can be routed through a [`SoftwareGraph`] so the
//! equalizer chain is audible in the level meter.

use async_trait::async_trait;
use soul_audio::SoftwareGraph;
use soul_core::{
    CrossOrigin, ListenerId, MediaSink, PreloadStrategy, ReadyState, Result, SinkEvent,
    SinkListener, SoulError,
};
use std::collections::HashMap;
use std::f32::consts::TAU;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, trace};

/// Length reported for sources with no registered duration, in seconds
pub const DEFAULT_DURATION: f64 = 30.0;

const TONE_HZ: f32 = 440.0;
const TONE_AMPLITUDE: f32 = 0.25;

struct SinkState {
    source: Option<String>,
    paused: bool,
    position: f64,
    duration: Option<f64>,
    ready: ReadyState,
    volume: f64,
    rate: f64,
    muted: bool,
    preload: PreloadStrategy,
    cross_origin: CrossOrigin,
    durations: HashMap<String, f64>,
    graph: Option<SoftwareGraph>,
    phase: f32,
    peak: f32,
}

pub struct SimulatedSink {
    state: Mutex<SinkState>,
    listeners: Mutex<Vec<(ListenerId, SinkListener)>>,
    next_listener: AtomicU64,
}

impl Default for SimulatedSink {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSink {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SinkState {
                source: None,
                paused: true,
                position: 0.0,
                duration: None,
                ready: ReadyState::HaveNothing,
                volume: 1.0,
                rate: 1.0,
                muted: false,
                preload: PreloadStrategy::Auto,
                cross_origin: CrossOrigin::Unset,
                durations: HashMap::new(),
                graph: None,
                phase: 0.0,
                peak: 0.0,
            }),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: &SinkEvent) {
        let listeners: Vec<SinkListener> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Report `seconds` as the length of `uri`
    pub fn register_duration(&self, uri: impl Into<String>, seconds: f64) {
        self.lock().durations.insert(uri.into(), seconds);
    }

    /// Route the test tone through `graph`
    pub fn route_through(&self, graph: SoftwareGraph) {
        self.lock().graph = Some(graph);
    }

    /// Peak output level of the last tick
    pub fn last_peak(&self) -> f32 {
        self.lock().peak
    }

    pub fn source(&self) -> Option<String> {
        self.lock().source.clone()
    }

    pub fn preload(&self) -> PreloadStrategy {
        self.lock().preload
    }

    pub fn cross_origin(&self) -> CrossOrigin {
        self.lock().cross_origin
    }

    /// Play forward by `elapsed` wall-clock seconds
    ///
    /// Emits `TimeUpdate`, and `Ended` once the position reaches the
    /// duration. A paused or unready sink does not move.
    pub fn tick(&self, elapsed: f64) {
        let (position, ended) = {
            let mut state = self.lock();
            if state.paused || state.ready < ReadyState::HaveFutureData || elapsed <= 0.0 {
                return;
            }

            let step = elapsed * state.rate;
            let end = state.duration.unwrap_or(DEFAULT_DURATION);
            state.position = (state.position + step).min(end);
            render_tone(&mut state, step);

            let ended = state.position >= end;
            if ended {
                state.paused = true;
            }
            (state.position, ended)
        };

        trace!("Simulated sink at {:.2}s", position);
        self.emit(&SinkEvent::TimeUpdate(position));
        self.emit(&SinkEvent::Progress(position));
        if ended {
            debug!("Simulated sink reached the end of the source");
            self.emit(&SinkEvent::Ended);
        }
    }
}

/// Render `seconds` of tone and record its output peak
fn render_tone(state: &mut SinkState, seconds: f64) {
    let gain = if state.muted { 0.0 } else { state.volume as f32 };
    let Some(graph) = state.graph.clone() else {
        state.peak = TONE_AMPLITUDE * gain;
        return;
    };

    let sample_rate = graph.sample_rate();
    let frames = ((seconds * f64::from(sample_rate)) as usize).max(1);
    let step = TAU * TONE_HZ / sample_rate as f32;

    let mut buffer = Vec::with_capacity(frames * 2);
    for _ in 0..frames {
        let sample = state.phase.sin() * TONE_AMPLITUDE * gain;
        state.phase = (state.phase + step) % TAU;
        buffer.push(sample);
        buffer.push(sample);
    }

    graph.process(&mut buffer);
    state.peak = buffer.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
}

#[async_trait]
impl MediaSink for SimulatedSink {
    async fn set_source(&self, uri: Option<&str>) -> Result<()> {
        {
            let mut state = self.lock();
            state.source = uri.map(str::to_string);
            state.paused = true;
            state.position = 0.0;
            state.duration = None;
            state.ready = ReadyState::HaveNothing;
        }
        if uri.is_some() {
            self.emit(&SinkEvent::LoadStart);
        }
        Ok(())
    }

    async fn load(&self) -> Result<()> {
        let duration = {
            let mut state = self.lock();
            let Some(source) = state.source.clone() else {
                return Err(SoulError::sink("no source assigned"));
            };
            let duration = state
                .durations
                .get(&source)
                .copied()
                .unwrap_or(DEFAULT_DURATION);
            state.paused = true;
            state.position = 0.0;
            state.duration = Some(duration);
            state.ready = ReadyState::HaveEnoughData;
            duration
        };

        self.emit(&SinkEvent::DurationChange(duration));
        self.emit(&SinkEvent::CanPlay);
        self.emit(&SinkEvent::CanPlayThrough);
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        {
            let mut state = self.lock();
            if state.source.is_none() {
                return Err(SoulError::rejected("no source to play"));
            }
            state.paused = false;
        }
        self.emit(&SinkEvent::Playing);
        Ok(())
    }

    fn pause(&self) {
        let was_playing = {
            let mut state = self.lock();
            !std::mem::replace(&mut state.paused, true)
        };
        if was_playing {
            self.emit(&SinkEvent::Pause);
        }
    }

    fn seek(&self, position: f64) {
        let position = {
            let mut state = self.lock();
            let end = state.duration.unwrap_or(DEFAULT_DURATION);
            state.position = position.clamp(0.0, end);
            state.position
        };
        self.emit(&SinkEvent::TimeUpdate(position));
    }

    fn current_time(&self) -> f64 {
        self.lock().position
    }

    fn duration(&self) -> Option<f64> {
        self.lock().duration
    }

    fn buffered(&self) -> f64 {
        self.lock().duration.unwrap_or(0.0)
    }

    fn ready_state(&self) -> ReadyState {
        self.lock().ready
    }

    fn is_paused(&self) -> bool {
        self.lock().paused
    }

    fn has_source(&self) -> bool {
        self.lock().source.is_some()
    }

    fn volume(&self) -> f64 {
        self.lock().volume
    }

    fn set_volume(&self, volume: f64) {
        self.lock().volume = volume.clamp(0.0, 1.0);
        self.emit(&SinkEvent::VolumeChange);
    }

    fn playback_rate(&self) -> f64 {
        self.lock().rate
    }

    fn set_playback_rate(&self, rate: f64) {
        self.lock().rate = rate;
        self.emit(&SinkEvent::RateChange);
    }

    fn is_muted(&self) -> bool {
        self.lock().muted
    }

    fn set_muted(&self, muted: bool) {
        self.lock().muted = muted;
        self.emit(&SinkEvent::VolumeChange);
    }

    fn set_preload(&self, strategy: PreloadStrategy) {
        self.lock().preload = strategy;
    }

    fn set_cross_origin(&self, mode: CrossOrigin) {
        self.lock().cross_origin = mode;
    }

    fn add_listener(&self, listener: SinkListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(existing, _)| *existing != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder(sink: &SimulatedSink) -> Arc<Mutex<Vec<SinkEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::clone(&events);
        sink.add_listener(Arc::new(move |event: &SinkEvent| {
            store.lock().unwrap().push(event.clone());
        }));
        events
    }

    #[tokio::test]
    async fn load_reports_registered_duration() {
        let sink = SimulatedSink::new();
        sink.register_duration("mem://a", 12.0);
        let events = recorder(&sink);

        sink.set_source(Some("mem://a")).await.unwrap();
        sink.load().await.unwrap();

        assert_eq!(sink.duration(), Some(12.0));
        assert!(sink.can_start());
        let events = events.lock().unwrap();
        assert_eq!(events[0], SinkEvent::LoadStart);
        assert!(events.contains(&SinkEvent::DurationChange(12.0)));
        assert!(events.contains(&SinkEvent::CanPlay));
    }

    #[tokio::test]
    async fn load_without_source_fails() {
        let sink = SimulatedSink::new();
        assert!(sink.load().await.is_err());
    }

    #[tokio::test]
    async fn tick_runs_to_the_end() {
        let sink = SimulatedSink::new();
        sink.register_duration("mem://a", 1.0);
        sink.set_source(Some("mem://a")).await.unwrap();
        sink.load().await.unwrap();

        // Paused sinks hold still
        sink.tick(0.5);
        assert_eq!(sink.current_time(), 0.0);

        sink.play().await.unwrap();
        let events = recorder(&sink);
        sink.tick(0.5);
        assert_eq!(sink.current_time(), 0.5);
        sink.tick(0.75);
        assert_eq!(sink.current_time(), 1.0);
        assert!(sink.is_paused());

        let events = events.lock().unwrap();
        assert_eq!(events.last(), Some(&SinkEvent::Ended));
        assert!(events.contains(&SinkEvent::TimeUpdate(1.0)));
    }

    #[tokio::test]
    async fn rate_scales_the_clock() {
        let sink = SimulatedSink::new();
        sink.set_source(Some("mem://a")).await.unwrap();
        sink.load().await.unwrap();
        sink.set_playback_rate(2.0);
        sink.play().await.unwrap();

        sink.tick(1.0);
        assert_eq!(sink.current_time(), 2.0);
    }

    #[tokio::test]
    async fn tone_goes_through_the_graph() {
        let sink = SimulatedSink::new();
        sink.set_source(Some("mem://a")).await.unwrap();
        sink.load().await.unwrap();
        sink.play().await.unwrap();

        sink.tick(0.1);
        assert!((sink.last_peak() - TONE_AMPLITUDE).abs() < 1e-6);

        // An empty running graph has no path to the output
        sink.route_through(SoftwareGraph::new(8000));
        sink.tick(0.1);
        assert_eq!(sink.last_peak(), 0.0);
    }

    #[tokio::test]
    async fn muted_sink_is_silent() {
        let sink = SimulatedSink::new();
        sink.set_source(Some("mem://a")).await.unwrap();
        sink.load().await.unwrap();
        sink.play().await.unwrap();
        sink.set_muted(true);

        sink.tick(0.1);
        assert_eq!(sink.last_peak(), 0.0);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let sink = SimulatedSink::new();
        let id = sink.add_listener(Arc::new(|_: &SinkEvent| panic!("removed")));
        sink.remove_listener(id);
        sink.seek(3.0);
    }
}
