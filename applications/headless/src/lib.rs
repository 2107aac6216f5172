//! Soul Headless - drives the playback controller without a UI
//!
//! The binary loads [`config::HeadlessConfig`], builds a
//! [`player::HeadlessPlayer`] around a [`sink::SimulatedSink`] and plays the
//! configured demo queue in simulated time.

pub mod config;
pub mod error;
pub mod player;
pub mod sink;

pub use config::HeadlessConfig;
pub use error::{HeadlessError, Result};
pub use player::{HeadlessPlayer, RunSummary};
pub use sink::SimulatedSink;
