//! Core glitch data structures and the aggregator

mod aggregator;
mod category;
mod cluster;
mod entity;
mod node;
mod snapshot;


pub use aggregator::{GlitchAggregator, GlitchError, GlitchResult};
pub use category::{Effect, EffectKind, GlitchCategory, NodeCategory};
pub use cluster::{CLUSTER_DISTANCE, MIN_CLUSTER_SIZE};
pub use entity::{
    EndReason, EntityFlags, EntityId, EntityOrigin, GlitchEntity, HarvestedEntity, HistoryRecord,
    MAX_INTENSITY, MIN_INTENSITY,
};
pub use node::{
    BridgeKind, ContributionNode, DreamDepth, DreamSymbol, NodeDetail, NodeKey, NodeOrigin,
    SourceId, SymbolKind,
};
pub use snapshot::{Connection, ConnectionKind, GraphSnapshot, SnapshotEntity, SnapshotNode};
