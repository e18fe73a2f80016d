//! Inbound events delivered by the host simulation

use crate::geometry::Vec2;
use crate::glitch::{DreamDepth, DreamSymbol, EntityId, NodeCategory, SourceId};
use serde::{Deserialize, Serialize};

/// A source's memory distorted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistortionEvent {
    pub source: SourceId,
    pub position: Vec2,
    #[serde(default = "default_category")]
    pub category: NodeCategory,
    #[serde(default = "default_distortion_level")]
    pub distortion_level: f64,
    /// What was distorted, kept on the node for inspection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

fn default_category() -> NodeCategory {
    NodeCategory::Spatial
}

fn default_distortion_level() -> f64 {
    0.5
}

/// A source entered or deepened a dream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DreamEvent {
    pub source: SourceId,
    pub position: Vec2,
    pub intensity: f64,
    #[serde(default)]
    pub depth: DreamDepth,
    #[serde(default)]
    pub symbols: Vec<DreamSymbol>,
}

/// Several sources synchronised
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub participants: Vec<SourceId>,
    pub midpoint: Vec2,
    pub strength: f64,
}

impl SyncEvent {
    /// Build from participant positions; the midpoint is their centroid
    pub fn from_positions(participants: &[(SourceId, Vec2)], strength: f64) -> Self {
        Self {
            participants: participants.iter().map(|(id, _)| id.clone()).collect(),
            midpoint: Vec2::centroid(participants.iter().map(|(_, p)| *p)).unwrap_or_default(),
            strength,
        }
    }
}

/// What a user did to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Harvest,
    Amplify,
    Stabilize,
    Disrupt,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Harvest => "harvest",
            Self::Amplify => "amplify",
            Self::Stabilize => "stabilize",
            Self::Disrupt => "disrupt",
        }
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional knobs for interactions and user-created entities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionOptions {
    /// Amplify: intensity added (default 0.2)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<f64>,
    /// Stabilize: how long the entity stays stable (default 30 s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// User entities: decay per second (default 0.03)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl InteractionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_decay(mut self, decay: f64) -> Self {
        self.decay = Some(decay);
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// A user's interaction with one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInteraction {
    pub entity: EntityId,
    pub kind: InteractionKind,
    #[serde(default)]
    pub options: InteractionOptions,
}

/// Any event the aggregator ingests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InboundEvent {
    Distortion(DistortionEvent),
    Dream(DreamEvent),
    Sync(SyncEvent),
    Environment { intensity: f64 },
    Interaction(UserInteraction),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_midpoint_is_centroid() {
        let event = SyncEvent::from_positions(
            &[
                (SourceId::new("a"), Vec2::new(0.0, 0.0)),
                (SourceId::new("b"), Vec2::new(20.0, 10.0)),
            ],
            0.5,
        );
        assert_eq!(event.midpoint, Vec2::new(10.0, 5.0));
        assert_eq!(event.participants.len(), 2);
    }

    #[test]
    fn distortion_defaults_when_deserialized() {
        let event: InboundEvent = serde_json::from_str(
            r#"{"event":"distortion","source":"4","position":{"x":1.0,"y":2.0}}"#,
        )
        .unwrap();
        match event {
            InboundEvent::Distortion(d) => {
                assert_eq!(d.category, NodeCategory::Spatial);
                assert_eq!(d.distortion_level, 0.5);
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }
}
