//! Host audio-processing graph capability
//!
//! The signal chain never processes samples itself. It builds nodes on an
//! [`AudioGraph`] and schedules parameter automation on the graph's own clock.
//! [`SoftwareGraph`] is the in-process implementation; platform layers can
//! provide their own (e.g. a browser AudioContext bridge).

mod automation;
mod software;

pub use automation::AutomatedParam;
pub use software::{SoftwareBackend, SoftwareGraph};

use soul_core::Result;

/// Node handle within one graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// Kinds of node the signal chain needs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// Output of the media sink
    MediaSource,
    /// Peaking (bell) filter
    Peaking { frequency: f32, q: f32 },
    /// Low-shelf filter
    LowShelf { frequency: f32 },
    /// Dynamics compressor
    Compressor,
    /// Linear gain
    Gain,
    /// Audio output
    Destination,
}

/// Automatable parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    /// dB for filters, linear for gain nodes
    Gain,
    Frequency,
    Q,
    Threshold,
    Knee,
    Ratio,
    Attack,
    Release,
}

/// Lifecycle of the host engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Running,
    /// Paused by the host, e.g. waiting for a user gesture
    Suspended,
    Closed,
}

/// Audio-processing graph owned by the host engine
pub trait AudioGraph: Send {
    fn state(&self) -> EngineState;

    /// Ask a suspended engine to resume
    fn resume(&mut self) -> Result<()>;

    /// Engine clock in seconds
    fn current_time(&self) -> f64;

    fn create_node(&mut self, kind: NodeKind) -> Result<NodeId>;

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()>;

    /// Remove every connection
    fn disconnect_all(&mut self);

    /// Exponentially approach `target` from `start_time` with `time_constant`
    /// seconds
    fn set_target_at_time(
        &mut self,
        node: NodeId,
        param: Param,
        target: f32,
        start_time: f64,
        time_constant: f64,
    ) -> Result<()>;

    /// Value of a parameter at the current engine time
    fn param_value(&self, node: NodeId, param: Param) -> Option<f32>;

    /// Release the engine; the graph is unusable afterwards
    fn close(&mut self);
}

/// Factory for audio graphs
pub trait AudioBackend: Send + Sync {
    /// Open a graph on the host engine
    ///
    /// # Errors
    /// `EngineUnavailable` when the host has no audio engine
    fn open(&self) -> Result<Box<dyn AudioGraph>>;
}
