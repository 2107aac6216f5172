//! Soul Player - Headless Playback Control
//!
//! Drives a platform media sink without any UI.
//!
//! This crate provides:
//! - Ordered play queue (default, reverse, shuffle; duplicates allowed)
//! - Loop modes (Off, Single, Queue)
//! - Keyed state bus with shallow-merge publishing
//! - Playback controller with HLS delegation, equalizer and session surface
//! - Per-sink singleton factory
//! - Listening-time log
//!
//! # Architecture
//!
//! `soul-playback` never talks to a concrete audio element. The sink, the
//! streaming demuxer, the host audio engine and the OS session surface are
//! traits from `soul-core` / `soul-audio`, supplied by the platform layer.
//!
//! # Example: Queue
//!
//! ```rust
//! use soul_core::Track;
//! use soul_playback::{LoopMode, OrderMode, QueueManager};
//!
//! let mut queue = QueueManager::new();
//! queue
//!     .set_queue(
//!         vec![Track::new("a", "A"), Track::new("b", "B")],
//!         OrderMode::Reverse,
//!     )
//!     .unwrap();
//!
//! assert_eq!(queue.get(0).unwrap().id, "b");
//! assert_eq!(queue.next_index(1, LoopMode::Queue), Some(0));
//! assert_eq!(queue.next_index(1, LoopMode::Off), None);
//! ```
//!
//! # Example: Controller
//!
//! ```rust,no_run
//! use soul_core::{Environment, MediaSink, PlayerConfiguration, Track};
//! use soul_playback::{Collaborators, ControllerFactory, OrderMode};
//! use std::sync::Arc;
//!
//! async fn run(sink: Arc<dyn MediaSink>) -> soul_playback::Result<()> {
//!     let factory = ControllerFactory::new(sink, Collaborators::new(), Environment::Production);
//!     let controller = factory.create()?;
//!     controller.initialize(PlayerConfiguration::default())?;
//!
//!     let _sub = controller.on_state_change(|state| {
//!         println!("{} at {:.1}s", state.playback_state, state.progress);
//!     });
//!
//!     let tracks = vec![Track::new("a", "A").with_source("https://cdn.example.com/a.mp3")];
//!     controller.set_queue(tracks, OrderMode::Default)?;
//!     controller.play_track_at(0).await
//! }
//! ```

#![forbid(unsafe_code)]

pub mod bus;
pub mod controller;
pub mod events;
pub mod factory;
pub mod play_log;
pub mod queue;
pub mod shuffle;
pub mod types;
pub mod validation;

pub use bus::{StateBus, Subscription, PLAYER_STATE};
pub use controller::{Collaborators, PlaybackController};
pub use factory::ControllerFactory;
pub use play_log::{PlayLog, PlayLogEntry};
pub use queue::QueueManager;
pub use types::{LoopMode, OrderMode};

pub use soul_core::{Result, SoulError};
