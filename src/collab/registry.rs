//! Source registry: the queried collaborator
//!
//! The aggregator asks the registry where a source is and, when
//! decorating side effects, for a memory or the current dream. Lookups
//! are never validated or retried; a `None` skips the dependent step.

use crate::geometry::Vec2;
use crate::glitch::{DreamDepth, DreamSymbol, SourceId};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Current position and traits of a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProfile {
    pub id: SourceId,
    pub name: String,
    pub position: Vec2,
    #[serde(default)]
    pub attributes: HashMap<String, f64>,
}

impl SourceProfile {
    pub fn new(id: impl Into<SourceId>, position: Vec2) -> Self {
        let id = id.into();
        Self {
            name: format!("Agent-{}", id),
            id,
            position,
            attributes: HashMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: f64) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// A remembered item a memory fragment can surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<f64>,
}

impl Memory {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            importance: None,
        }
    }

    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = Some(importance);
        self
    }
}

/// A source's current dream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DreamState {
    pub depth: DreamDepth,
    pub symbols: Vec<DreamSymbol>,
}

/// Resolves source ids for the aggregator.
pub trait SourceRegistry {
    /// Current profile of a source, if it still exists
    fn profile(&self, id: &SourceId) -> Option<SourceProfile>;

    /// Every registered source
    fn sources(&self) -> Vec<SourceProfile>;

    /// A representative memory of the source, chosen with `rng`
    fn random_memory(&self, id: &SourceId, rng: &mut dyn RngCore) -> Option<Memory>;

    /// The source's dream, if it is dreaming
    fn dream_state(&self, id: &SourceId) -> Option<DreamState>;
}

/// A registry that knows no sources
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRegistry;

impl SourceRegistry for NullRegistry {
    fn profile(&self, _id: &SourceId) -> Option<SourceProfile> {
        None
    }

    fn sources(&self) -> Vec<SourceProfile> {
        Vec::new()
    }

    fn random_memory(&self, _id: &SourceId, _rng: &mut dyn RngCore) -> Option<Memory> {
        None
    }

    fn dream_state(&self, _id: &SourceId) -> Option<DreamState> {
        None
    }
}

#[derive(Debug, Clone)]
struct RegistryEntry {
    profile: SourceProfile,
    memories: Vec<Memory>,
    dream: Option<DreamState>,
}

/// Shared in-memory registry.
///
/// Clones share the same table, so a host can keep one handle to move
/// sources around while the aggregator reads through another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    entries: Arc<RwLock<HashMap<SourceId, RegistryEntry>>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SourceId, RegistryEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SourceId, RegistryEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add or replace a source, keeping its memories and dream
    pub fn register(&self, profile: SourceProfile) {
        let mut entries = self.write();
        match entries.get_mut(&profile.id) {
            Some(entry) => entry.profile = profile,
            None => {
                entries.insert(
                    profile.id.clone(),
                    RegistryEntry {
                        profile,
                        memories: Vec::new(),
                        dream: None,
                    },
                );
            }
        }
    }

    pub fn remove(&self, id: &SourceId) -> Option<SourceProfile> {
        self.write().remove(id).map(|entry| entry.profile)
    }

    /// Move a source; returns false if it is unknown
    pub fn set_position(&self, id: &SourceId, position: Vec2) -> bool {
        match self.write().get_mut(id) {
            Some(entry) => {
                entry.profile.position = position;
                true
            }
            None => false,
        }
    }

    pub fn add_memory(&self, id: &SourceId, memory: Memory) -> bool {
        match self.write().get_mut(id) {
            Some(entry) => {
                entry.memories.push(memory);
                true
            }
            None => false,
        }
    }

    /// Set or clear (`None`) a source's dream
    pub fn set_dream(&self, id: &SourceId, dream: Option<DreamState>) -> bool {
        match self.write().get_mut(id) {
            Some(entry) => {
                entry.dream = dream;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl SourceRegistry for InMemoryRegistry {
    fn profile(&self, id: &SourceId) -> Option<SourceProfile> {
        self.read().get(id).map(|entry| entry.profile.clone())
    }

    fn sources(&self) -> Vec<SourceProfile> {
        let mut profiles: Vec<SourceProfile> =
            self.read().values().map(|entry| entry.profile.clone()).collect();
        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        profiles
    }

    fn random_memory(&self, id: &SourceId, rng: &mut dyn RngCore) -> Option<Memory> {
        let entries = self.read();
        let memories = &entries.get(id)?.memories;
        if memories.is_empty() {
            return None;
        }
        Some(memories[rng.gen_range(0..memories.len())].clone())
    }

    fn dream_state(&self, id: &SourceId) -> Option<DreamState> {
        self.read().get(id)?.dream.clone()
    }
}
