//! Contribution nodes: one source's momentary distortion signal

use super::category::NodeCategory;
use crate::geometry::{Rgb, Vec2};
use serde::{Deserialize, Serialize};

/// Identifier of an event source (an agent in the host simulation)
///
/// Serializes as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Key under which a node is stored.
///
/// A source holds at most one distortion node and one dream node at a
/// time; sync nodes are keyed by their whole (sorted) participant set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "sources", rename_all = "snake_case")]
pub enum NodeKey {
    Distortion(SourceId),
    Dream(SourceId),
    Sync(Vec<SourceId>),
}

impl NodeKey {
    /// Composite key for a sync event; participants are sorted and deduplicated
    pub fn sync<I>(participants: I) -> Self
    where
        I: IntoIterator<Item = SourceId>,
    {
        let mut ids: Vec<SourceId> = participants.into_iter().collect();
        ids.sort();
        ids.dedup();
        NodeKey::Sync(ids)
    }

    /// Every source this key covers
    pub fn sources(&self) -> &[SourceId] {
        match self {
            NodeKey::Distortion(id) | NodeKey::Dream(id) => std::slice::from_ref(id),
            NodeKey::Sync(ids) => ids,
        }
    }

    /// The owning source when the key names exactly one
    pub fn single_source(&self) -> Option<&SourceId> {
        match self {
            NodeKey::Distortion(id) | NodeKey::Dream(id) => Some(id),
            NodeKey::Sync(_) => None,
        }
    }

    pub fn origin(&self) -> NodeOrigin {
        match self {
            NodeKey::Distortion(_) => NodeOrigin::Memory,
            NodeKey::Dream(_) => NodeOrigin::Dream,
            NodeKey::Sync(_) => NodeOrigin::Sync,
        }
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKey::Distortion(id) => write!(f, "{}", id),
            NodeKey::Dream(id) => write!(f, "dream_{}", id),
            NodeKey::Sync(ids) => {
                f.write_str("sync")?;
                for id in ids {
                    write!(f, "_{}", id)?;
                }
                Ok(())
            }
        }
    }
}

/// What kind of event produced a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeOrigin {
    Memory,
    Dream,
    Sync,
}

/// Depth of a dreaming source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DreamDepth {
    #[default]
    Shallow,
    Deep,
    Lucid,
}

/// What a dream symbol depicts; drives manifestation behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Person,
    Creature,
    Object,
    Landscape,
    Abstract,
    #[serde(other)]
    Other,
}

/// A symbol surfacing in a source's dream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DreamSymbol {
    pub name: String,
    pub kind: SymbolKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
}

impl DreamSymbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            kind,
            intensity: None,
        }
    }

    pub fn with_intensity(mut self, intensity: f64) -> Self {
        self.intensity = Some(intensity);
        self
    }
}

/// Strength class of a sync link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeKind {
    EmpathicLink,
    QuantumBridge,
}

impl BridgeKind {
    pub fn for_strength(strength: f64) -> Self {
        if strength > 0.7 {
            BridgeKind::QuantumBridge
        } else {
            BridgeKind::EmpathicLink
        }
    }
}

/// Origin-specific payload of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum NodeDetail {
    Memory {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    Dream {
        symbols: Vec<DreamSymbol>,
        depth: DreamDepth,
    },
    Sync {
        bridge: BridgeKind,
        strength: f64,
    },
}

/// A single source's (or sync group's) momentary distortion signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionNode {
    pub key: NodeKey,
    pub position: Vec2,
    pub category: NodeCategory,
    /// 0.0 - 1.0
    pub intensity: f64,
    pub radius: f64,
    pub color: Rgb,
    /// Simulation time the node was recorded (ms)
    pub created_ms: u64,
    /// Insertion order, breaks timestamp ties during eviction
    pub seq: u64,
    pub detail: NodeDetail,
}

impl ContributionNode {
    pub fn origin(&self) -> NodeOrigin {
        self.key.origin()
    }

    pub fn sources(&self) -> &[SourceId] {
        self.key.sources()
    }

    /// Whether the node is older than `window_ms` at `now_ms`
    pub fn expired(&self, now_ms: u64, window_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_ms) > window_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_key_is_sorted_and_deduplicated() {
        let key = NodeKey::sync(vec!["c".into(), "a".into(), "b".into(), "a".into()]);
        assert_eq!(key.sources(), &["a".into(), "b".into(), "c".into()] as &[SourceId]);
        assert_eq!(key.to_string(), "sync_a_b_c");
        assert_eq!(key, NodeKey::sync(vec!["b".into(), "c".into(), "a".into()]));
    }

    #[test]
    fn dream_and_distortion_keys_differ() {
        let id = SourceId::new("7");
        assert_ne!(NodeKey::Distortion(id.clone()), NodeKey::Dream(id.clone()));
        assert_eq!(NodeKey::Dream(id).to_string(), "dream_7");
    }

    #[test]
    fn bridge_kind_threshold() {
        assert_eq!(BridgeKind::for_strength(0.7), BridgeKind::EmpathicLink);
        assert_eq!(BridgeKind::for_strength(0.71), BridgeKind::QuantumBridge);
    }
}
