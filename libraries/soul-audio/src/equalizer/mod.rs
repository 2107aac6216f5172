//! Equalizer signal chain
//!
//! A fixed topology built once on the host graph:
//!
//! ```text
//! source -> band 1 .. band 10 -> bass shelf -> compressor -> master gain -> destination
//! ```
//!
//! After [`SignalChain::attach`] only parameter values change, always through
//! exponential ramps on the graph clock so retuning never clicks.
//!
//! A chain whose graph could not be opened, or that has been destroyed, is
//! `Closed`. Every mutating call still validates its input, then records the
//! requested settings and returns `Ok(())` without touching a graph.

mod presets;

use crate::effects::CompressorSettings;
use crate::graph::{AudioBackend, AudioGraph, EngineState, NodeId, NodeKind, Param};
use soul_core::{Result, SoulError};
use tracing::{debug, warn};

pub use presets::FLAT;

/// Number of peaking bands
pub const BAND_COUNT: usize = 10;

/// Center frequency of each band (Hz)
pub const BAND_FREQUENCIES: [f32; BAND_COUNT] = [
    32.0, 64.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// Quality factor shared by all bands
pub const BAND_Q: f32 = 1.0;

/// Per-band gain range (dB)
pub const MAX_BAND_GAIN_DB: f32 = 12.0;

/// Bass shelf corner frequency (Hz)
pub const BASS_SHELF_FREQUENCY: f32 = 100.0;

pub const MAX_BASS_BOOST_DB: f32 = 12.0;

pub const DEFAULT_BASS_BOOST_DB: f32 = 6.0;

/// Ramp time constants (seconds)
const GAIN_TIME_CONSTANT: f64 = 0.05;
const BASS_TIME_CONSTANT: f64 = 0.05;
const COMPRESSOR_TIME_CONSTANT: f64 = 0.05;
const MASTER_TIME_CONSTANT: f64 = 0.01;

/// Lifecycle of the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualizerStatus {
    /// Graph open, chain not wired yet
    Ideal,
    Running,
    /// Host engine paused (e.g. awaiting a user gesture)
    Suspended,
    /// Engine unavailable or chain destroyed
    Closed,
}

impl EqualizerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ideal => "IDEAL",
            Self::Running => "RUNNING",
            Self::Suspended => "SUSPENDED",
            Self::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for EqualizerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot returned by [`SignalChain::state`]
#[derive(Debug, Clone, PartialEq)]
pub struct EqualizerState {
    pub status: EqualizerStatus,
    /// Last preset applied; `None` after custom gains
    pub preset: Option<String>,
    /// Live band gains (dB)
    pub gains: [f32; BAND_COUNT],
    pub bass_boost_enabled: bool,
    pub bass_boost_db: f32,
    pub master_volume: f32,
    pub compressor: CompressorSettings,
}

/// Requested settings; applied to the graph whenever it is live
#[derive(Debug, Clone)]
struct Settings {
    gains: [f32; BAND_COUNT],
    preset: Option<String>,
    bass_boost_enabled: bool,
    bass_boost_db: f32,
    master_volume: f32,
    compressor: CompressorSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gains: [0.0; BAND_COUNT],
            preset: Some(FLAT.to_string()),
            bass_boost_enabled: false,
            bass_boost_db: DEFAULT_BASS_BOOST_DB,
            master_volume: 1.0,
            compressor: CompressorSettings::new(),
        }
    }
}

impl Settings {
    fn shelf_gain(&self) -> f32 {
        if self.bass_boost_enabled {
            self.bass_boost_db
        } else {
            0.0
        }
    }
}

struct ChainNodes {
    bands: [NodeId; BAND_COUNT],
    bass_shelf: NodeId,
    compressor: NodeId,
    master: NodeId,
}

/// Ten-band equalizer with bass shelf, compressor and master gain
pub struct SignalChain {
    graph: Option<Box<dyn AudioGraph>>,
    nodes: Option<ChainNodes>,
    settings: Settings,
    destroyed: bool,
}

impl SignalChain {
    /// Open a graph on `backend`
    ///
    /// An unavailable engine does not fail construction; the chain starts
    /// `Closed` instead.
    pub fn open(backend: &dyn AudioBackend) -> Self {
        let graph = match backend.open() {
            Ok(graph) => Some(graph),
            Err(e) => {
                warn!("Equalizer disabled: {}", e);
                None
            }
        };

        Self {
            graph,
            nodes: None,
            settings: Settings::default(),
            destroyed: false,
        }
    }

    /// Chain without a graph; it only records settings and reports `Closed`
    pub fn detached() -> Self {
        Self {
            graph: None,
            nodes: None,
            settings: Settings::default(),
            destroyed: false,
        }
    }

    /// Build a chain on an already opened graph
    pub fn with_graph(graph: Box<dyn AudioGraph>) -> Self {
        Self {
            graph: Some(graph),
            nodes: None,
            settings: Settings::default(),
            destroyed: false,
        }
    }

    /// All preset names
    pub fn preset_names() -> Vec<&'static str> {
        presets::names()
    }

    /// Gain vector of a preset
    pub fn preset_gains(name: &str) -> Result<[f32; BAND_COUNT]> {
        presets::lookup(name)
            .map(|(_, gains)| gains)
            .ok_or_else(|| SoulError::UnknownPreset(name.to_string()))
    }

    pub fn is_attached(&self) -> bool {
        self.nodes.is_some()
    }

    /// Graph that can take parameter changes, if any
    fn live_graph(&mut self) -> Option<(&mut Box<dyn AudioGraph>, &ChainNodes)> {
        if self.destroyed {
            return None;
        }
        match (self.graph.as_mut(), self.nodes.as_ref()) {
            (Some(graph), Some(nodes)) if graph.state() != EngineState::Closed => {
                Some((graph, nodes))
            }
            _ => None,
        }
    }

    /// Wire the chain and apply the stored settings
    ///
    /// Attaching twice, or attaching a closed chain, does nothing.
    pub fn attach(&mut self) -> Result<()> {
        if self.destroyed || self.nodes.is_some() {
            return Ok(());
        }
        let Some(graph) = self.graph.as_mut() else {
            debug!("Equalizer closed, attach skipped");
            return Ok(());
        };

        match build_chain(&mut **graph) {
            Ok(nodes) => {
                self.nodes = Some(nodes);
                debug!("Equalizer attached");
                self.apply_all()
            }
            Err(e) => {
                warn!("Equalizer attach failed, disabling: {}", e);
                graph.close();
                self.graph = None;
                Err(e)
            }
        }
    }

    fn apply_all(&mut self) -> Result<()> {
        self.apply_gains()?;
        self.apply_bass()?;
        self.apply_compressor()?;
        self.apply_master()
    }

    fn apply_gains(&mut self) -> Result<()> {
        let gains = self.settings.gains;
        if let Some((graph, nodes)) = self.live_graph() {
            let now = graph.current_time();
            for (node, gain) in nodes.bands.iter().zip(gains) {
                graph.set_target_at_time(*node, Param::Gain, gain, now, GAIN_TIME_CONSTANT)?;
            }
        }
        Ok(())
    }

    fn apply_bass(&mut self) -> Result<()> {
        let gain = self.settings.shelf_gain();
        if let Some((graph, nodes)) = self.live_graph() {
            let now = graph.current_time();
            graph.set_target_at_time(
                nodes.bass_shelf,
                Param::Gain,
                gain,
                now,
                BASS_TIME_CONSTANT,
            )?;
        }
        Ok(())
    }

    fn apply_compressor(&mut self) -> Result<()> {
        let settings = self.settings.compressor;
        if let Some((graph, nodes)) = self.live_graph() {
            let now = graph.current_time();
            let params = [
                (Param::Threshold, settings.threshold_db),
                (Param::Knee, settings.knee_db),
                (Param::Ratio, settings.ratio),
                (Param::Attack, settings.attack),
                (Param::Release, settings.release),
            ];
            for (param, value) in params {
                graph.set_target_at_time(
                    nodes.compressor,
                    param,
                    value,
                    now,
                    COMPRESSOR_TIME_CONSTANT,
                )?;
            }
        }
        Ok(())
    }

    fn apply_master(&mut self) -> Result<()> {
        let level = self.settings.master_volume;
        if let Some((graph, nodes)) = self.live_graph() {
            let now = graph.current_time();
            graph.set_target_at_time(
                nodes.master,
                Param::Gain,
                level,
                now,
                MASTER_TIME_CONSTANT,
            )?;
        }
        Ok(())
    }

    /// Apply a named preset (case-insensitive)
    ///
    /// # Errors
    /// `UnknownPreset` when the name is not in the table
    pub fn apply_preset(&mut self, name: &str) -> Result<()> {
        let (canonical, gains) =
            presets::lookup(name).ok_or_else(|| SoulError::UnknownPreset(name.to_string()))?;

        self.set_custom_gains(&gains)?;
        self.settings.preset = Some(canonical.to_string());
        debug!("Equalizer preset {}", canonical);
        Ok(())
    }

    /// Set all ten band gains, clamped to +/-12 dB
    ///
    /// # Errors
    /// `InvalidInput` unless exactly ten values are given
    pub fn set_custom_gains(&mut self, gains: &[f32]) -> Result<()> {
        if gains.len() != BAND_COUNT {
            return Err(SoulError::invalid_input(format!(
                "expected {} band gains, got {}",
                BAND_COUNT,
                gains.len()
            )));
        }
        if gains.iter().any(|g| g.is_nan()) {
            return Err(SoulError::invalid_input("band gain is NaN"));
        }

        for (slot, gain) in self.settings.gains.iter_mut().zip(gains) {
            *slot = gain.clamp(-MAX_BAND_GAIN_DB, MAX_BAND_GAIN_DB);
        }
        self.settings.preset = None;
        self.apply_gains()
    }

    /// Enable or disable the bass shelf; disabled always means 0 dB
    pub fn set_bass_boost(&mut self, enabled: bool, amount_db: f32) -> Result<()> {
        if amount_db.is_nan() {
            return Err(SoulError::invalid_input("bass boost is NaN"));
        }
        self.settings.bass_boost_enabled = enabled;
        self.settings.bass_boost_db = amount_db.clamp(0.0, MAX_BASS_BOOST_DB);
        self.apply_bass()
    }

    /// Master level in [0, 1], clamped
    pub fn set_master_volume(&mut self, level: f32) -> Result<()> {
        if level.is_nan() {
            return Err(SoulError::invalid_input("master volume is NaN"));
        }
        self.settings.master_volume = level.clamp(0.0, 1.0);
        self.apply_master()
    }

    /// Compressor parameters, clamped to the host ranges
    pub fn set_compressor(&mut self, settings: CompressorSettings) -> Result<()> {
        let values = [
            settings.threshold_db,
            settings.knee_db,
            settings.ratio,
            settings.attack,
            settings.release,
        ];
        if values.iter().any(|v| v.is_nan()) {
            return Err(SoulError::invalid_input("compressor setting is NaN"));
        }
        self.settings.compressor = settings.validated();
        self.apply_compressor()
    }

    /// Flatten bands and shelf, master back to unity
    pub fn reset(&mut self) -> Result<()> {
        self.settings.gains = [0.0; BAND_COUNT];
        self.settings.preset = Some(FLAT.to_string());
        self.settings.bass_boost_enabled = false;
        self.settings.master_volume = 1.0;
        self.apply_gains()?;
        self.apply_bass()?;
        self.apply_master()
    }

    /// Current status
    ///
    /// Observing `Suspended` asks the engine to resume; the call still reports
    /// `Suspended`, later calls see the result.
    pub fn status(&mut self) -> EqualizerStatus {
        if self.destroyed {
            return EqualizerStatus::Closed;
        }
        let Some(graph) = self.graph.as_mut() else {
            return EqualizerStatus::Closed;
        };

        match graph.state() {
            EngineState::Closed => EqualizerStatus::Closed,
            _ if self.nodes.is_none() => EqualizerStatus::Ideal,
            EngineState::Running => EqualizerStatus::Running,
            EngineState::Suspended => {
                if let Err(e) = graph.resume() {
                    warn!("Failed to resume audio engine: {}", e);
                }
                EqualizerStatus::Suspended
            }
        }
    }

    /// Live band gains, or the requested ones when nothing is attached
    pub fn current_gains(&self) -> [f32; BAND_COUNT] {
        let mut gains = self.settings.gains;
        if self.destroyed {
            return gains;
        }
        if let (Some(graph), Some(nodes)) = (self.graph.as_ref(), self.nodes.as_ref()) {
            if graph.state() != EngineState::Closed {
                for (slot, node) in gains.iter_mut().zip(nodes.bands) {
                    if let Some(value) = graph.param_value(node, Param::Gain) {
                        *slot = value;
                    }
                }
            }
        }
        gains
    }

    pub fn state(&mut self) -> EqualizerState {
        EqualizerState {
            status: self.status(),
            preset: self.settings.preset.clone(),
            gains: self.current_gains(),
            bass_boost_enabled: self.settings.bass_boost_enabled,
            bass_boost_db: self.settings.bass_boost_db,
            master_volume: self.settings.master_volume,
            compressor: self.settings.compressor,
        }
    }

    /// Tear down the graph; later calls are no-ops
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.nodes = None;
        if let Some(mut graph) = self.graph.take() {
            graph.disconnect_all();
            graph.close();
        }
        debug!("Equalizer destroyed");
    }
}

impl std::fmt::Debug for SignalChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalChain")
            .field("attached", &self.nodes.is_some())
            .field("destroyed", &self.destroyed)
            .field("settings", &self.settings)
            .finish()
    }
}

fn build_chain(graph: &mut dyn AudioGraph) -> Result<ChainNodes> {
    let source = graph.create_node(NodeKind::MediaSource)?;

    let mut bands = [source; BAND_COUNT];
    for (slot, frequency) in bands.iter_mut().zip(BAND_FREQUENCIES) {
        *slot = graph.create_node(NodeKind::Peaking {
            frequency,
            q: BAND_Q,
        })?;
    }
    let bass_shelf = graph.create_node(NodeKind::LowShelf {
        frequency: BASS_SHELF_FREQUENCY,
    })?;
    let compressor = graph.create_node(NodeKind::Compressor)?;
    let master = graph.create_node(NodeKind::Gain)?;
    let destination = graph.create_node(NodeKind::Destination)?;

    let mut previous = source;
    for node in bands
        .iter()
        .copied()
        .chain([bass_shelf, compressor, master, destination])
    {
        graph.connect(previous, node)?;
        previous = node;
    }

    Ok(ChainNodes {
        bands,
        bass_shelf,
        compressor,
        master,
    })
}
