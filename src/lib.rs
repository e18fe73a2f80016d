//! Glitchfield: Collective Glitch Aggregation Engine
//!
//! Turns the memory distortions, dreams and syncs of a population of
//! simulated agents into shared, decaying "glitch" effects.
//!
//! # Core Concepts
//!
//! - **Contribution nodes**: one source's momentary distortion signal, kept
//!   for a persistence window
//! - **Glitch entities**: spawned when nearby nodes cluster with enough
//!   intensity; they decay, interact, breed children and emit side effects
//! - **Sources**: the agents, reached through a [`SourceRegistry`] and told
//!   about entities through a [`GlitchSink`]
//!
//! # Example
//!
//! ```
//! use glitchfield::{AggregatorConfig, GlitchAggregator, NodeCategory, SourceId, Vec2};
//!
//! let mut aggregator = GlitchAggregator::new(AggregatorConfig::default().with_seed(7)).unwrap();
//! for (i, x) in [0.0, 20.0, 40.0].into_iter().enumerate() {
//!     aggregator.record_distortion(
//!         SourceId::new(i.to_string()),
//!         Vec2::new(x, 0.0),
//!         NodeCategory::Temporal,
//!         0.9,
//!     );
//! }
//! assert_eq!(aggregator.active_count(), 1);
//! aggregator.tick(16.0);
//! ```

pub mod collab;
pub mod config;
pub mod driver;
pub mod geometry;
mod glitch;

pub use collab::{
    GlitchEvent, GlitchSink, InMemoryRegistry, InboundEvent, InteractionKind, InteractionOptions,
    NullRegistry, NullSink, RecordingSink, SourceProfile, SourceRegistry, TracingSink,
};
pub use config::AggregatorConfig;
pub use driver::{Environment, SyntheticPopulation};
pub use geometry::{Noise2D, Rgb, Vec2};
pub use glitch::{
    BridgeKind, Connection, ConnectionKind, ContributionNode, DreamDepth, DreamSymbol, Effect,
    EffectKind, EndReason, EntityFlags, EntityId, EntityOrigin, GlitchAggregator, GlitchCategory,
    GlitchEntity, GlitchError, GlitchResult, GraphSnapshot, HarvestedEntity, HistoryRecord,
    NodeCategory, NodeDetail, NodeKey, NodeOrigin, SnapshotEntity, SnapshotNode, SourceId,
    SymbolKind, CLUSTER_DISTANCE, MAX_INTENSITY, MIN_CLUSTER_SIZE, MIN_INTENSITY,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
