//! Soul Audio
//!
//! Audio processing for the Soul headless player.
//!
//! This crate provides:
//! - The host audio graph capability ([`AudioGraph`], [`AudioBackend`])
//! - A software graph with real DSP (RBJ biquads, soft-knee compressor, gain)
//! - The equalizer [`SignalChain`]: ten peaking bands, bass shelf, compressor
//!   and master gain, retuned through smoothed parameter ramps
//!
//! # Example
//!
//! ```rust
//! use soul_audio::{SignalChain, SoftwareBackend};
//!
//! let backend = SoftwareBackend::new(44100);
//! let mut chain = SignalChain::open(&backend);
//! chain.attach().unwrap();
//! chain.apply_preset("rock").unwrap();
//!
//! // Let the ramps settle, then run audio through the chain
//! let graph = backend.last_graph().unwrap();
//! graph.advance(1.0);
//! let mut buffer = vec![0.0f32; 1024];
//! graph.process(&mut buffer);
//! ```

#![forbid(unsafe_code)]

pub mod effects;
pub mod equalizer;
pub mod graph;

pub use effects::CompressorSettings;
pub use equalizer::{EqualizerState, EqualizerStatus, SignalChain, BAND_COUNT, BAND_FREQUENCIES};
pub use graph::{
    AudioBackend, AudioGraph, EngineState, NodeId, NodeKind, Param, SoftwareBackend,
    SoftwareGraph,
};
