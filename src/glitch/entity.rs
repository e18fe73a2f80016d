//! Glitch entities and their archive records

use super::category::{Effect, GlitchCategory, NodeCategory};
use super::node::SourceId;
use crate::geometry::{Rgb, Vec2};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Intensity at or below which an entity fades out
pub const MIN_INTENSITY: f64 = 0.1;

/// Hard ceiling on entity intensity (bonuses may push past 1.0)
pub const MAX_INTENSITY: f64 = 1.5;

/// Unique identifier for an entity, e.g. `emergent_1b4e...`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create a prefixed id from random bytes drawn from `rng`
    pub fn generate<R: Rng + ?Sized>(prefix: &str, rng: &mut R) -> Self {
        let uuid = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
        Self(format!("{}_{}", prefix, uuid.simple()))
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How an entity came to exist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityOrigin {
    /// Spawned from a qualifying cluster of contribution nodes
    Emergent {
        contributing_nodes: usize,
        source_categories: Vec<NodeCategory>,
    },
    /// Born from two interacting entities
    Child {
        parents: [EntityId; 2],
        parent_categories: [GlitchCategory; 2],
    },
    /// Created directly by a user
    User { user_id: String },
    /// Chaos pulse thrown off by another entity
    Pulse { parent: EntityId },
}

impl EntityOrigin {
    /// Id prefix for entities of this origin
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityOrigin::Emergent { .. } => "emergent",
            EntityOrigin::Child { .. } => "child",
            EntityOrigin::User { .. } => "user",
            EntityOrigin::Pulse { .. } => "pulse",
        }
    }
}

/// Interaction state flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityFlags {
    /// Stabilization lapses once the clock passes this time (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stabilized_until: Option<u64>,
    #[serde(default)]
    pub amplified: bool,
    #[serde(default)]
    pub amplification_count: u32,
    #[serde(default)]
    pub disrupted: bool,
}

/// A synthetic glitch effect instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlitchEntity {
    pub id: EntityId,
    pub origin: EntityOrigin,
    /// Logical position, used for clustering and interaction
    pub position: Vec2,
    /// Cosmetic position drifting around `position`
    pub visual_position: Vec2,
    pub category: GlitchCategory,
    /// 0.0 - 1.5
    pub intensity: f64,
    pub radius: f64,
    pub color: Rgb,
    /// Intensity lost per second
    pub decay_rate: f64,
    pub contributors: Vec<SourceId>,
    /// 0 for root entities, parent generation + 1 for children
    pub generation: u32,
    pub flags: EntityFlags,
    pub effects: Vec<Effect>,
    /// Simulation time of creation (ms)
    pub created_ms: u64,
}

impl GlitchEntity {
    /// Start an entity of `category` with table-derived color and effects
    pub fn new(
        id: EntityId,
        origin: EntityOrigin,
        category: GlitchCategory,
        position: Vec2,
        created_ms: u64,
    ) -> Self {
        Self {
            id,
            origin,
            position,
            visual_position: position,
            category,
            intensity: 0.0,
            radius: 0.0,
            color: category.color(),
            decay_rate: 0.0,
            contributors: Vec::new(),
            generation: 0,
            flags: EntityFlags::default(),
            effects: category.effects(),
            created_ms,
        }
    }

    pub fn with_intensity(mut self, intensity: f64) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_decay(mut self, decay_rate: f64) -> Self {
        self.decay_rate = decay_rate;
        self
    }

    pub fn with_contributors(mut self, contributors: Vec<SourceId>) -> Self {
        self.contributors = contributors;
        self
    }

    pub fn with_generation(mut self, generation: u32) -> Self {
        self.generation = generation;
        self
    }

    pub fn is_stabilized(&self) -> bool {
        self.flags.stabilized_until.is_some()
    }

    pub fn is_user_created(&self) -> bool {
        matches!(self.origin, EntityOrigin::User { .. })
    }

    /// Whether the entity has faded to the removal threshold
    pub fn is_spent(&self) -> bool {
        self.intensity <= MIN_INTENSITY
    }

    /// Whether dream manifestations may appear around this entity
    pub fn is_dreamlike(&self) -> bool {
        if self.category.is_dreamlike() {
            return true;
        }
        matches!(
            &self.origin,
            EntityOrigin::Emergent { source_categories, .. }
                if source_categories.contains(&NodeCategory::Dream)
        )
    }

    /// Multiply intensity, radius and every effect strength by `factor`
    pub fn rescale(&mut self, factor: f64) {
        self.intensity = (self.intensity * factor).clamp(0.0, MAX_INTENSITY);
        self.radius *= factor;
        for effect in &mut self.effects {
            effect.strength *= factor;
        }
    }
}

/// Why an entity left the active list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EndReason {
    /// Decayed to the intensity floor
    Faded,
    /// Captured by a user
    Harvested { by: String },
    /// Dropped by a sandbox reset
    Cleared,
}

/// Archive entry for an entity, appended at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// The entity as it was when created
    pub entity: GlitchEntity,
    pub started_ms: u64,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_reason: Option<EndReason>,
}

impl HistoryRecord {
    pub fn open(entity: GlitchEntity, now_ms: u64) -> Self {
        Self {
            entity,
            started_ms: now_ms,
            started_at: Utc::now(),
            ended_ms: None,
            ended_at: None,
            end_reason: None,
        }
    }

    /// Stamp the end of this record; a record is only closed once
    pub fn close(&mut self, now_ms: u64, reason: EndReason) {
        if self.ended_ms.is_some() {
            return;
        }
        self.ended_ms = Some(now_ms);
        self.ended_at = Some(Utc::now());
        self.end_reason = Some(reason);
    }

    pub fn is_open(&self) -> bool {
        self.ended_ms.is_none()
    }
}

/// An entity captured by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestedEntity {
    pub entity: GlitchEntity,
    pub harvested_ms: u64,
    pub harvested_at: DateTime<Utc>,
    pub harvested_by: String,
}
