//! Collaborator contracts
//!
//! The aggregator consumes inbound events, queries a source registry to
//! decorate side effects, and pushes outbound notifications into a sink.
//! Every call is synchronous and fire-and-forget.

mod events;
mod inbound;
mod registry;
mod sink;

pub use events::{
    CreationKind, GlitchEvent, ManifestationBehavior, Significance, SideEffect,
    SourceNotice, VisualUpdate,
};
pub use inbound::{
    DistortionEvent, DreamEvent, InboundEvent, InteractionKind, InteractionOptions,
    SyncEvent, UserInteraction,
};
pub use registry::{
    DreamState, InMemoryRegistry, Memory, NullRegistry, SourceProfile, SourceRegistry,
};
pub use sink::{GlitchSink, NullSink, RecordingSink, TracingSink};
