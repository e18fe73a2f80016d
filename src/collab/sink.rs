//! GlitchSink: where outbound notifications go

use super::events::GlitchEvent;
use std::sync::{Arc, Mutex, MutexGuard};

/// Receives every event the aggregator emits.
///
/// Emission is fire-and-forget: a sink cannot reject or fail an event.
pub trait GlitchSink {
    fn emit(&mut self, event: GlitchEvent);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl GlitchSink for NullSink {
    fn emit(&mut self, _event: GlitchEvent) {}
}

/// Collects events in memory.
///
/// Clones share the same buffer, so a host or test can keep a handle
/// and inspect what the aggregator emitted.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<GlitchEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<GlitchEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<GlitchEvent> {
        self.lock().clone()
    }

    /// Remove and return everything recorded so far
    pub fn drain(&self) -> Vec<GlitchEvent> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Count of recorded events with the given `GlitchEvent::name`
    pub fn count(&self, name: &str) -> usize {
        self.lock().iter().filter(|e| e.name() == name).count()
    }
}

impl GlitchSink for RecordingSink {
    fn emit(&mut self, event: GlitchEvent) {
        self.lock().push(event);
    }
}

/// Sends every event to both sinks, in order
impl<A: GlitchSink, B: GlitchSink> GlitchSink for (A, B) {
    fn emit(&mut self, event: GlitchEvent) {
        self.0.emit(event.clone());
        self.1.emit(event);
    }
}

/// Logs events through `tracing`.
///
/// Lifecycle events log at debug, overloads at info, and the high-volume
/// per-tick events at trace.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl GlitchSink for TracingSink {
    fn emit(&mut self, event: GlitchEvent) {
        match &event {
            GlitchEvent::Overload {
                active_count,
                reduction_factor,
            } => {
                tracing::info!(active_count, reduction_factor, "glitch overload");
            }
            GlitchEvent::EntityCreated {
                id,
                category,
                intensity,
                generation,
                ..
            } => {
                tracing::debug!(%id, %category, intensity, generation, "entity created");
            }
            GlitchEvent::EntityRemoved { id } => {
                tracing::debug!(%id, "entity removed");
            }
            GlitchEvent::Harvested { id, by } => {
                tracing::debug!(%id, by = by.as_str(), "entity harvested");
            }
            GlitchEvent::CollectiveDistortion { id, sources, .. } => {
                tracing::debug!(%id, sources = sources.len(), "collective distortion");
            }
            other => {
                tracing::trace!(event = other.name(), "glitch event");
            }
        }
    }
}
