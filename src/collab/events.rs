//! Outbound notifications
//!
//! One enum covers everything the aggregator reports: entity lifecycle,
//! per-source notices, side effects, graph snapshots and visual refreshes.

use crate::geometry::Vec2;
use crate::glitch::{
    DreamSymbol, Effect, EntityId, GlitchCategory, GraphSnapshot, SourceId, SymbolKind,
};
use crate::collab::{InteractionKind, Memory};
use serde::{Deserialize, Serialize};

/// Render payload for one active entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualUpdate {
    pub id: EntityId,
    pub position: Vec2,
    pub intensity: f64,
    pub radius: f64,
    pub effects: Vec<Effect>,
    pub generation: u32,
}

/// How a created entity came about, as told to its sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreationKind {
    Emergent,
    Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    Major,
    Moderate,
}

impl Significance {
    pub fn for_intensity(intensity: f64) -> Self {
        if intensity > 0.8 {
            Significance::Major
        } else {
            Significance::Moderate
        }
    }
}

/// Something a single source is told about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceNotice {
    /// An entity the source contributed to was born
    GlitchCreated {
        kind: CreationKind,
        entity: EntityId,
        category: GlitchCategory,
        collaborators: Vec<SourceId>,
        intensity: f64,
        significance: Significance,
    },
    /// A user amplified an entity the source contributed to
    ConsciousnessInfluenced { entity: EntityId, intensity: f64 },
    /// A user disrupted an entity the source contributed to
    GlitchDisrupted { entity: EntityId, intensity: f64 },
    /// A user-created entity appeared nearby
    UserGlitchDetected {
        entity: EntityId,
        category: GlitchCategory,
        intensity: f64,
        distance: f64,
    },
    /// One of the source's dream symbols manifested
    DreamManifesting { symbol: String, intensity: f64 },
}

/// Movement and fade style of a dream manifestation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestationBehavior {
    pub movement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulse_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expansion_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turbulence: Option<f64>,
    pub fade: String,
}

impl ManifestationBehavior {
    fn new(movement: &str, fade: &str) -> Self {
        Self {
            movement: movement.to_string(),
            speed: None,
            pulse_rate: None,
            expansion_rate: None,
            turbulence: None,
            fade: fade.to_string(),
        }
    }

    /// Behavior table keyed on the symbol's kind
    pub fn for_symbol(kind: SymbolKind) -> Self {
        match kind {
            SymbolKind::Person => Self {
                speed: Some(0.3),
                ..Self::new("wander", "dissolve")
            },
            SymbolKind::Creature => Self {
                speed: Some(0.5),
                ..Self::new("circle", "scatter")
            },
            SymbolKind::Object => Self {
                pulse_rate: Some(0.2),
                ..Self::new("stationary", "fade")
            },
            SymbolKind::Landscape => Self {
                expansion_rate: Some(0.1),
                ..Self::new("grow", "sink")
            },
            SymbolKind::Abstract => Self {
                turbulence: Some(0.4),
                ..Self::new("float", "pixelate")
            },
            SymbolKind::Other => Self::new("float", "fade"),
        }
    }
}

/// A downstream effect requested by an active entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SideEffect {
    TemporalDistortion {
        entity: EntityId,
        position: Vec2,
        radius: f64,
        factor: f64,
    },
    RealityBlur {
        entity: EntityId,
        position: Vec2,
        radius: f64,
        intensity: f64,
    },
    MemoryFragment {
        entity: EntityId,
        source: SourceId,
        position: Vec2,
        memory: Memory,
        visual_intensity: f64,
        duration_ms: f64,
        velocity: Vec2,
    },
    DreamManifestation {
        entity: EntityId,
        source: SourceId,
        position: Vec2,
        symbol: DreamSymbol,
        visual_intensity: f64,
        duration_ms: f64,
        behavior: ManifestationBehavior,
    },
}

/// An event emitted by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GlitchEvent {
    /// An entity joined the active list
    EntityCreated {
        id: EntityId,
        category: GlitchCategory,
        position: Vec2,
        intensity: f64,
        generation: u32,
    },
    /// A single entity changed outside the tick loop
    EntityUpdated(VisualUpdate),
    /// An entity faded out
    EntityRemoved { id: EntityId },
    /// A user captured an entity
    Harvested { id: EntityId, by: String },
    /// Result of a user interaction
    Feedback {
        kind: InteractionKind,
        id: EntityId,
        position: Vec2,
        intensity: f64,
        elapsed_ms: u64,
    },
    /// A cluster of sources produced an emergent entity
    CollectiveDistortion {
        id: EntityId,
        sources: Vec<SourceId>,
        category: GlitchCategory,
        intensity: f64,
        position: Vec2,
    },
    /// Too many active entities; everything was damped
    Overload {
        active_count: usize,
        reduction_factor: f64,
    },
    /// A notice addressed to one source
    SourceNotified {
        source: SourceId,
        notice: SourceNotice,
    },
    SideEffect(SideEffect),
    /// Fresh graph view after a mutation
    GraphUpdated(GraphSnapshot),
    /// Per-tick render payload for every active entity
    VisualsRefreshed { updates: Vec<VisualUpdate> },
}

impl GlitchEvent {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            GlitchEvent::EntityCreated { .. } => "entity_created",
            GlitchEvent::EntityUpdated(_) => "entity_updated",
            GlitchEvent::EntityRemoved { .. } => "entity_removed",
            GlitchEvent::Harvested { .. } => "harvested",
            GlitchEvent::Feedback { .. } => "feedback",
            GlitchEvent::CollectiveDistortion { .. } => "collective_distortion",
            GlitchEvent::Overload { .. } => "overload",
            GlitchEvent::SourceNotified { .. } => "source_notified",
            GlitchEvent::SideEffect(_) => "side_effect",
            GlitchEvent::GraphUpdated(_) => "graph_updated",
            GlitchEvent::VisualsRefreshed { .. } => "visuals_refreshed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn significance_threshold() {
        assert_eq!(Significance::for_intensity(0.8), Significance::Moderate);
        assert_eq!(Significance::for_intensity(0.81), Significance::Major);
    }

    #[test]
    fn behavior_table() {
        let b = ManifestationBehavior::for_symbol(SymbolKind::Creature);
        assert_eq!(b.movement, "circle");
        assert_eq!(b.speed, Some(0.5));
        assert_eq!(b.fade, "scatter");

        let other = ManifestationBehavior::for_symbol(SymbolKind::Other);
        assert_eq!(other.movement, "float");
        assert_eq!(other.fade, "fade");
    }

    #[test]
    fn event_serializes_with_tag() {
        let event = GlitchEvent::EntityRemoved {
            id: EntityId::from_string("child_1"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "entity_removed");
        assert_eq!(json["id"], "child_1");
    }
}
