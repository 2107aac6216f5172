//! Controller construction with a one-controller-per-sink policy

use crate::controller::{Collaborators, PlaybackController, Shared};
use soul_core::{Environment, MediaSink, Result, SoulError};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Live controllers in this process, keyed by the address of their sink
///
/// Shared by every factory, so wrapping one sink in two factories still
/// yields a single controller.
static LIVE: Mutex<Vec<(usize, Weak<Shared>)>> = Mutex::new(Vec::new());

fn sink_key(sink: &Arc<dyn MediaSink>) -> usize {
    Arc::as_ptr(sink).cast::<()>() as usize
}

/// Hands out the controller for one media sink
///
/// While a controller for the sink is alive and not destroyed, a second
/// `create()` (from this or any other factory) fails with
/// `SingletonViolation` in `Production` and returns the existing controller
/// (with a warning) in `Development`.
pub struct ControllerFactory {
    sink: Arc<dyn MediaSink>,
    collaborators: Collaborators,
    environment: Environment,
    runtime: Option<Handle>,
}

impl ControllerFactory {
    /// Captures the current tokio runtime, if any, for the controllers'
    /// background work
    pub fn new(
        sink: Arc<dyn MediaSink>,
        collaborators: Collaborators,
        environment: Environment,
    ) -> Self {
        Self {
            sink,
            collaborators,
            environment,
            runtime: Handle::try_current().ok(),
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn create(&self) -> Result<PlaybackController> {
        let key = sink_key(&self.sink);
        let mut live = LIVE.lock().unwrap_or_else(PoisonError::into_inner);
        live.retain(|(_, weak)| weak.strong_count() > 0);

        let existing = live
            .iter()
            .filter(|(sink, _)| *sink == key)
            .filter_map(|(_, weak)| PlaybackController::upgrade(weak))
            .find(|controller| !controller.is_destroyed());
        if let Some(existing) = existing {
            return match self.environment {
                Environment::Production => Err(SoulError::SingletonViolation),
                Environment::Development => {
                    warn!("A playback controller already exists for this sink, reusing it");
                    Ok(existing)
                }
            };
        }

        let controller = PlaybackController::with_runtime(
            Arc::clone(&self.sink),
            self.collaborators.clone(),
            self.runtime.clone(),
        );
        live.retain(|(sink, _)| *sink != key);
        live.push((key, controller.downgrade()));
        debug!(environment = ?self.environment, "Playback controller issued");
        Ok(controller)
    }
}

impl std::fmt::Debug for ControllerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerFactory")
            .field("environment", &self.environment)
            .field("collaborators", &self.collaborators)
            .finish_non_exhaustive()
    }
}
