//! Graph snapshot: nodes, entities and the connections between them

use super::category::{GlitchCategory, NodeCategory};
use super::entity::{EntityId, GlitchEntity};
use super::node::{ContributionNode, NodeKey, NodeOrigin, SourceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of link in the snapshot graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    /// Source node feeding an entity
    Contribution,
    /// Two entities within reach of each other
    Interaction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub id: String,
    pub category: NodeCategory,
    pub intensity: f64,
    pub position: [f64; 2],
    pub radius: f64,
    pub origin: NodeOrigin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntity {
    pub id: EntityId,
    pub category: GlitchCategory,
    pub intensity: f64,
    pub position: [f64; 2],
    pub radius: f64,
    pub contributors: Vec<SourceId>,
    pub generation: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
    /// 0.0 - 1.0
    pub strength: f64,
    #[serde(rename = "type")]
    pub kind: ConnectionKind,
}

/// Adjacency view over the aggregator's current state.
///
/// Pure function of nodes and entities: building it twice without an
/// intervening mutation yields equal snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<SnapshotNode>,
    pub entities: Vec<SnapshotEntity>,
    pub connections: Vec<Connection>,
}

impl GraphSnapshot {
    pub fn build(nodes: &BTreeMap<NodeKey, ContributionNode>, entities: &[GlitchEntity]) -> Self {
        let snapshot_nodes = nodes
            .values()
            .map(|n| SnapshotNode {
                id: n.key.to_string(),
                category: n.category,
                intensity: n.intensity,
                position: n.position.to_array(),
                radius: n.radius * 0.5,
                origin: n.origin(),
            })
            .collect();

        let snapshot_entities = entities
            .iter()
            .map(|e| SnapshotEntity {
                id: e.id.clone(),
                category: e.category,
                intensity: e.intensity,
                position: e.position.to_array(),
                radius: e.radius * 0.7,
                contributors: e.contributors.clone(),
                generation: e.generation,
            })
            .collect();

        let mut connections = Vec::new();
        for entity in entities {
            for source in &entity.contributors {
                let node = nodes
                    .get(&NodeKey::Distortion(source.clone()))
                    .or_else(|| nodes.get(&NodeKey::Dream(source.clone())));
                if let Some(node) = node {
                    connections.push(Connection {
                        from: source.to_string(),
                        to: entity.id.to_string(),
                        strength: (node.intensity * 0.7).clamp(0.0, 1.0),
                        kind: ConnectionKind::Contribution,
                    });
                }
            }
        }

        for (i, a) in entities.iter().enumerate() {
            for b in &entities[i + 1..] {
                let reach = a.radius + b.radius;
                if reach <= 0.0 {
                    continue;
                }
                let distance = a.position.distance(b.position);
                if distance < reach {
                    connections.push(Connection {
                        from: a.id.to_string(),
                        to: b.id.to_string(),
                        strength: ((1.0 - distance / reach) * 0.8).clamp(0.0, 1.0),
                        kind: ConnectionKind::Interaction,
                    });
                }
            }
        }

        Self {
            nodes: snapshot_nodes,
            entities: snapshot_entities,
            connections,
        }
    }

    pub fn connections_of(&self, kind: ConnectionKind) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| c.kind == kind)
    }
}
