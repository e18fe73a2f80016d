//! Common test utilities for glitchfield integration tests
//!
//! Helpers for building seeded aggregators, registries with sources at
//! known positions, and picking events out of a recording sink.

#![allow(dead_code)]

use glitchfield::collab::SourceNotice;
use glitchfield::{
    AggregatorConfig, GlitchAggregator, GlitchEvent, InMemoryRegistry, NodeCategory,
    RecordingSink, SourceId, SourceProfile, Vec2,
};

/// Seed used when a test does not care which one
pub const SEED: u64 = 0x5EED;

/// Aggregator with a fixed seed and default settings
pub fn seeded_aggregator() -> GlitchAggregator {
    aggregator_with(AggregatorConfig::default())
}

/// Aggregator with `config`, seeded if it is not already
pub fn aggregator_with(config: AggregatorConfig) -> GlitchAggregator {
    let seed = config.rng_seed.unwrap_or(SEED);
    GlitchAggregator::new(config.with_seed(seed)).expect("valid test config")
}

/// Aggregator wired to a fresh registry and recording sink
pub fn observed_aggregator() -> (GlitchAggregator, InMemoryRegistry, RecordingSink) {
    let registry = InMemoryRegistry::new();
    let sink = RecordingSink::new();
    let aggregator = seeded_aggregator()
        .with_registry(registry.clone())
        .with_sink(sink.clone());
    (aggregator, registry, sink)
}

/// Register sources named `ids` at `positions`
pub fn register_sources(registry: &InMemoryRegistry, sources: &[(&str, Vec2)]) {
    for (id, position) in sources {
        registry.register(SourceProfile::new(*id, *position));
    }
}

pub fn source(id: &str) -> SourceId {
    SourceId::new(id)
}

/// Record one distortion per `(id, x, y)` with the given level
pub fn distort_all(aggregator: &mut GlitchAggregator, points: &[(&str, f64, f64)], category: NodeCategory, level: f64) {
    for (id, x, y) in points {
        aggregator.record_distortion(source(id), Vec2::new(*x, *y), category, level);
    }
}

/// Every `(source, notice)` pair in `events`
pub fn notices(events: &[GlitchEvent]) -> Vec<(SourceId, SourceNotice)> {
    events
        .iter()
        .filter_map(|e| match e {
            GlitchEvent::SourceNotified { source, notice } => Some((source.clone(), notice.clone())),
            _ => None,
        })
        .collect()
}
