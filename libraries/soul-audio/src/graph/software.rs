//! In-process audio graph
//!
//! Nodes run the crate's own DSP on interleaved stereo f32 buffers. The clock
//! only moves when audio is processed or when [`SoftwareGraph::advance`] is
//! called, which keeps parameter automation deterministic.

use super::{AudioBackend, AudioGraph, AutomatedParam, EngineState, NodeId, NodeKind, Param};
use crate::effects::{Biquad, Compressor, CompressorSettings, Response};
use soul_core::{Result, SoulError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Frames per automation step while processing
const BLOCK_FRAMES: usize = 64;

const DEFAULT_SAMPLE_RATE: u32 = 48000;

enum Processor {
    Passthrough,
    Filter(Biquad),
    Compressor(Compressor),
    Gain,
}

struct Node {
    kind: NodeKind,
    params: HashMap<Param, AutomatedParam>,
    processor: Processor,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        let mut params = HashMap::new();
        let processor = match kind {
            NodeKind::MediaSource | NodeKind::Destination => Processor::Passthrough,
            NodeKind::Peaking { frequency, q } => {
                params.insert(Param::Frequency, AutomatedParam::new(frequency, 10.0, 24000.0));
                params.insert(Param::Q, AutomatedParam::new(q, 0.0001, 1000.0));
                params.insert(Param::Gain, AutomatedParam::new(0.0, -40.0, 40.0));
                Processor::Filter(Biquad::new())
            }
            NodeKind::LowShelf { frequency } => {
                params.insert(Param::Frequency, AutomatedParam::new(frequency, 10.0, 24000.0));
                params.insert(Param::Gain, AutomatedParam::new(0.0, -40.0, 40.0));
                Processor::Filter(Biquad::new())
            }
            NodeKind::Compressor => {
                let defaults = CompressorSettings::new();
                params.insert(
                    Param::Threshold,
                    AutomatedParam::new(defaults.threshold_db, -100.0, 0.0),
                );
                params.insert(Param::Knee, AutomatedParam::new(defaults.knee_db, 0.0, 40.0));
                params.insert(Param::Ratio, AutomatedParam::new(defaults.ratio, 1.0, 20.0));
                params.insert(Param::Attack, AutomatedParam::new(defaults.attack, 0.0, 1.0));
                params.insert(Param::Release, AutomatedParam::new(defaults.release, 0.0, 1.0));
                Processor::Compressor(Compressor::new())
            }
            NodeKind::Gain => {
                params.insert(Param::Gain, AutomatedParam::new(1.0, 0.0, 10.0));
                Processor::Gain
            }
        };

        Self {
            kind,
            params,
            processor,
        }
    }

    fn value(&self, param: Param, time: f64) -> f32 {
        self.params
            .get(&param)
            .map(|p| p.value_at(time))
            .unwrap_or_default()
    }

    fn process(&mut self, buffer: &mut [f32], time: f64, sample_rate: u32) {
        match self.kind {
            NodeKind::Peaking { .. } => {
                let response = Response::Peaking {
                    frequency: self.value(Param::Frequency, time),
                    q: self.value(Param::Q, time),
                    gain_db: self.value(Param::Gain, time),
                };
                if let Processor::Filter(filter) = &mut self.processor {
                    filter.configure(response, sample_rate);
                    filter.process(buffer);
                }
            }
            NodeKind::LowShelf { .. } => {
                let response = Response::LowShelf {
                    frequency: self.value(Param::Frequency, time),
                    gain_db: self.value(Param::Gain, time),
                };
                if let Processor::Filter(filter) = &mut self.processor {
                    filter.configure(response, sample_rate);
                    filter.process(buffer);
                }
            }
            NodeKind::Compressor => {
                let settings = CompressorSettings {
                    threshold_db: self.value(Param::Threshold, time),
                    knee_db: self.value(Param::Knee, time),
                    ratio: self.value(Param::Ratio, time),
                    attack: self.value(Param::Attack, time),
                    release: self.value(Param::Release, time),
                };
                if let Processor::Compressor(comp) = &mut self.processor {
                    comp.configure(settings, sample_rate);
                    comp.process(buffer);
                }
            }
            NodeKind::Gain => {
                let gain = self.value(Param::Gain, time);
                for sample in buffer.iter_mut() {
                    *sample *= gain;
                }
            }
            NodeKind::MediaSource | NodeKind::Destination => {}
        }
    }

    fn reset(&mut self) {
        match &mut self.processor {
            Processor::Filter(filter) => filter.reset(),
            Processor::Compressor(comp) => comp.reset(),
            Processor::Passthrough | Processor::Gain => {}
        }
    }
}

struct GraphInner {
    sample_rate: u32,
    state: EngineState,
    frames: u64,
    nodes: Vec<Node>,
    edges: Vec<(NodeId, NodeId)>,
}

impl GraphInner {
    fn time(&self) -> f64 {
        self.frames as f64 / f64::from(self.sample_rate)
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| SoulError::invalid_input(format!("unknown node {}", id.0)))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == EngineState::Closed {
            return Err(SoulError::engine_unavailable("audio graph is closed"));
        }
        Ok(())
    }

    /// Node order such that every edge points forward (Kahn)
    /// Whether `to` is reachable from `from` along existing edges
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![from];
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if std::mem::replace(&mut seen[node.0], true) {
                continue;
            }
            stack.extend(
                self.edges
                    .iter()
                    .filter(|(src, _)| *src == node)
                    .map(|(_, dst)| *dst),
            );
        }
        false
    }

    fn topological_order(&self) -> Vec<usize> {
        let mut indegree = vec![0usize; self.nodes.len()];
        for (_, to) in &self.edges {
            indegree[to.0] += 1;
        }

        let mut ready: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| indegree[i] == 0)
            .rev()
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(index) = ready.pop() {
            order.push(index);
            for (from, to) in &self.edges {
                if from.0 == index {
                    indegree[to.0] -= 1;
                    if indegree[to.0] == 0 {
                        ready.push(to.0);
                    }
                }
            }
        }

        order
    }

    /// Run one block through the graph and return what reaches the destinations
    fn render_block(&mut self, input: &[f32], order: &[usize]) -> Vec<f32> {
        let time = self.time();
        let sample_rate = self.sample_rate;
        let mut outputs: Vec<Option<Vec<f32>>> = vec![None; self.nodes.len()];
        let mut mixed = vec![0.0f32; input.len()];

        for &index in order {
            let mut buffer = if self.nodes[index].kind == NodeKind::MediaSource {
                input.to_vec()
            } else {
                let mut sum = vec![0.0f32; input.len()];
                for (from, to) in &self.edges {
                    if to.0 == index {
                        if let Some(upstream) = &outputs[from.0] {
                            for (acc, sample) in sum.iter_mut().zip(upstream) {
                                *acc += sample;
                            }
                        }
                    }
                }
                sum
            };

            self.nodes[index].process(&mut buffer, time, sample_rate);

            if self.nodes[index].kind == NodeKind::Destination {
                for (acc, sample) in mixed.iter_mut().zip(&buffer) {
                    *acc += sample;
                }
            }
            outputs[index] = Some(buffer);
        }

        mixed
    }
}

/// Software implementation of [`AudioGraph`]
///
/// Cloning yields another handle to the same graph, so a test or host can keep
/// driving audio after handing the graph to a signal chain.
#[derive(Clone)]
pub struct SoftwareGraph {
    inner: Arc<Mutex<GraphInner>>,
}

impl SoftwareGraph {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(GraphInner {
                sample_rate: sample_rate.max(1),
                state: EngineState::Running,
                frames: 0,
                nodes: Vec::new(),
                edges: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GraphInner> {
        // A panic while holding the lock leaves the graph structurally intact
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn sample_rate(&self) -> u32 {
        self.lock().sample_rate
    }

    /// Simulate the host suspending the engine
    pub fn suspend(&self) {
        let mut inner = self.lock();
        if inner.state == EngineState::Running {
            inner.state = EngineState::Suspended;
        }
    }

    /// Move the clock forward without producing audio
    pub fn advance(&self, seconds: f64) {
        let mut inner = self.lock();
        if inner.state != EngineState::Running || seconds <= 0.0 {
            return;
        }
        let frames = (seconds * f64::from(inner.sample_rate)).round() as u64;
        inner.frames += frames;
    }

    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.lock().nodes.get(node.0).map(|n| n.kind)
    }

    pub fn connections(&self) -> Vec<(NodeId, NodeId)> {
        self.lock().edges.clone()
    }

    /// Process interleaved stereo audio in place
    ///
    /// The buffer is fed into every media source node and replaced with the
    /// sum of what reaches the destinations. A graph that is not running
    /// outputs silence and keeps its clock.
    pub fn process(&self, buffer: &mut [f32]) {
        let mut inner = self.lock();
        if inner.state != EngineState::Running {
            buffer.iter_mut().for_each(|s| *s = 0.0);
            return;
        }

        let order = inner.topological_order();
        for block in buffer.chunks_mut(BLOCK_FRAMES * 2) {
            let rendered = inner.render_block(block, &order);
            block.copy_from_slice(&rendered);
            inner.frames += (block.len() / 2) as u64;
        }
    }
}

impl Default for SoftwareGraph {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl AudioGraph for SoftwareGraph {
    fn state(&self) -> EngineState {
        self.lock().state
    }

    fn resume(&mut self) -> Result<()> {
        let mut inner = self.lock();
        match inner.state {
            EngineState::Closed => Err(SoulError::engine_unavailable("audio graph is closed")),
            _ => {
                inner.state = EngineState::Running;
                Ok(())
            }
        }
    }

    fn current_time(&self) -> f64 {
        self.lock().time()
    }

    fn create_node(&mut self, kind: NodeKind) -> Result<NodeId> {
        let mut inner = self.lock();
        inner.ensure_open()?;
        inner.nodes.push(Node::new(kind));
        Ok(NodeId(inner.nodes.len() - 1))
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        let mut inner = self.lock();
        inner.ensure_open()?;
        inner.node(from)?;
        let target = inner.node(to)?;
        if target.kind == NodeKind::MediaSource {
            return Err(SoulError::invalid_input("media source has no input"));
        }
        if inner.reaches(to, from) {
            return Err(SoulError::invalid_input("connection would create a cycle"));
        }
        if !inner.edges.contains(&(from, to)) {
            inner.edges.push((from, to));
        }
        Ok(())
    }

    fn disconnect_all(&mut self) {
        let mut inner = self.lock();
        inner.edges.clear();
        inner.nodes.iter_mut().for_each(Node::reset);
    }

    fn set_target_at_time(
        &mut self,
        node: NodeId,
        param: Param,
        target: f32,
        start_time: f64,
        time_constant: f64,
    ) -> Result<()> {
        let mut inner = self.lock();
        inner.ensure_open()?;
        if !target.is_finite() {
            return Err(SoulError::invalid_input(format!(
                "non-finite target for {:?}",
                param
            )));
        }
        let slot = inner
            .nodes
            .get_mut(node.0)
            .ok_or_else(|| SoulError::invalid_input(format!("unknown node {}", node.0)))?
            .params
            .get_mut(&param)
            .ok_or_else(|| {
                SoulError::invalid_input(format!("node {} has no {:?} parameter", node.0, param))
            })?;
        slot.set_target_at_time(target, start_time, time_constant);
        Ok(())
    }

    fn param_value(&self, node: NodeId, param: Param) -> Option<f32> {
        let inner = self.lock();
        let time = inner.time();
        inner
            .nodes
            .get(node.0)
            .and_then(|n| n.params.get(&param))
            .map(|p| p.value_at(time))
    }

    fn close(&mut self) {
        let mut inner = self.lock();
        inner.state = EngineState::Closed;
        inner.edges.clear();
    }
}

/// Opens [`SoftwareGraph`]s and keeps a handle to each one
#[derive(Clone)]
pub struct SoftwareBackend {
    sample_rate: u32,
    start_suspended: bool,
    available: bool,
    opened: Arc<Mutex<Vec<SoftwareGraph>>>,
}

impl SoftwareBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            start_suspended: false,
            available: true,
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Graphs start suspended, as hosts do before a user gesture
    #[must_use]
    pub fn suspended(mut self) -> Self {
        self.start_suspended = true;
        self
    }

    /// A host without an audio engine
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::default()
        }
    }

    /// Most recently opened graph
    pub fn last_graph(&self) -> Option<SoftwareGraph> {
        self.opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl AudioBackend for SoftwareBackend {
    fn open(&self) -> Result<Box<dyn AudioGraph>> {
        if !self.available {
            return Err(SoulError::engine_unavailable("no audio engine on this host"));
        }

        let graph = SoftwareGraph::new(self.sample_rate);
        if self.start_suspended {
            graph.suspend();
        }
        self.opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(graph.clone());

        Ok(Box::new(graph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::tests::{generate_sine, rms};

    fn passthrough_graph() -> (SoftwareGraph, NodeId) {
        let mut graph = SoftwareGraph::new(44100);
        let source = graph.create_node(NodeKind::MediaSource).unwrap();
        let gain = graph.create_node(NodeKind::Gain).unwrap();
        let dest = graph.create_node(NodeKind::Destination).unwrap();
        graph.connect(source, gain).unwrap();
        graph.connect(gain, dest).unwrap();
        (graph, gain)
    }

    #[test]
    fn unity_chain_is_transparent() {
        let (graph, _) = passthrough_graph();
        let input = generate_sine(440.0, 44100, 0.1);
        let mut output = input.clone();
        graph.process(&mut output);
        assert_eq!(input, output);
    }

    #[test]
    fn processing_advances_clock() {
        let (graph, _) = passthrough_graph();
        let mut buffer = vec![0.0; 44100 * 2];
        graph.process(&mut buffer);
        assert!((graph.current_time() - 1.0).abs() < 1e-9);

        graph.advance(0.5);
        assert!((graph.current_time() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn gain_automation_ramps_output() {
        let (mut graph, gain) = passthrough_graph();
        graph
            .set_target_at_time(gain, Param::Gain, 0.25, 0.0, 0.01)
            .unwrap();

        graph.advance(1.0);
        assert_eq!(graph.param_value(gain, Param::Gain), Some(0.25));

        let input = generate_sine(440.0, 44100, 0.1);
        let mut output = input.clone();
        graph.process(&mut output);
        let ratio = rms(&output) / rms(&input);
        assert!((ratio - 0.25).abs() < 1e-3);
    }

    #[test]
    fn disconnected_graph_is_silent() {
        let (mut graph, _) = passthrough_graph();
        graph.disconnect_all();
        let mut buffer = generate_sine(440.0, 44100, 0.05);
        graph.process(&mut buffer);
        assert!(buffer.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn suspended_graph_outputs_silence_until_resumed() {
        let (mut graph, _) = passthrough_graph();
        graph.suspend();
        assert_eq!(graph.state(), EngineState::Suspended);

        let mut buffer = generate_sine(440.0, 44100, 0.05);
        graph.process(&mut buffer);
        assert!(buffer.iter().all(|s| *s == 0.0));
        assert_eq!(graph.current_time(), 0.0);

        graph.resume().unwrap();
        assert_eq!(graph.state(), EngineState::Running);
    }

    #[test]
    fn closed_graph_rejects_changes() {
        let (mut graph, gain) = passthrough_graph();
        graph.close();

        assert!(graph.create_node(NodeKind::Gain).is_err());
        assert!(graph
            .set_target_at_time(gain, Param::Gain, 0.5, 0.0, 0.01)
            .is_err());
        assert!(graph.resume().is_err());
        assert!(graph.connections().is_empty());
    }

    #[test]
    fn rejects_invalid_connections() {
        let mut graph = SoftwareGraph::default();
        let source = graph.create_node(NodeKind::MediaSource).unwrap();
        let gain = graph.create_node(NodeKind::Gain).unwrap();

        assert!(graph.connect(gain, source).is_err());
        assert!(graph.connect(gain, gain).is_err());
        assert!(graph.connect(gain, NodeId(42)).is_err());

        graph.connect(source, gain).unwrap();
        graph.connect(source, gain).unwrap();
        assert_eq!(graph.connections().len(), 1);
    }

    #[test]
    fn rejects_longer_cycles() {
        let mut graph = SoftwareGraph::default();
        let first = graph.create_node(NodeKind::Gain).unwrap();
        let second = graph.create_node(NodeKind::Gain).unwrap();
        let third = graph.create_node(NodeKind::Gain).unwrap();

        graph.connect(first, second).unwrap();
        graph.connect(second, third).unwrap();
        assert!(matches!(
            graph.connect(third, first),
            Err(SoulError::InvalidInput(_))
        ));
        assert_eq!(graph.connections().len(), 2);

        graph.connect(first, third).unwrap();
        assert_eq!(graph.connections().len(), 3);
    }

    #[test]
    fn unknown_parameter_is_an_error() {
        let (mut graph, gain) = passthrough_graph();
        assert!(graph
            .set_target_at_time(gain, Param::Threshold, -10.0, 0.0, 0.01)
            .is_err());
        assert_eq!(graph.param_value(gain, Param::Q), None);
    }

    #[test]
    fn backend_tracks_opened_graphs() {
        let backend = SoftwareBackend::new(44100).suspended();
        let graph = backend.open().unwrap();
        assert_eq!(graph.state(), EngineState::Suspended);
        assert_eq!(backend.last_graph().map(|g| g.sample_rate()), Some(44100));

        assert!(matches!(
            SoftwareBackend::unavailable().open(),
            Err(SoulError::EngineUnavailable(_))
        ));
    }
}
