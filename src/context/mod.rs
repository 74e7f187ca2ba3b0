//! Context domain: composite context model, aggregation, conversation window,
//! compression, and prompt rendering.

pub mod aggregator;
pub mod compressor;
pub mod render;
pub mod types;
pub mod window;

pub use aggregator::{AggregatorConfig, ContextAggregator};
pub use compressor::{compress, project, ContextCompressor, EntityKind, DEFAULT_BUDGET_BYTES};
pub use render::{render_context, render_record};
pub use types::{
    CompositeContext, ContextMetadata, ContextRequest, Role, SubjectContext, Turn,
};
pub use window::{ConversationLog, ConversationWindow};
