//! Document lifecycle and annotation scheduling.
//!
//! # Architecture
//!
//! * [`document`]: Document Tree Cache (parse on open, incremental re-parse on edit)
//! * [`scheduling`]: Single-shot debounce timers for the rebuild and refresh stages
//! * [`engine`]: The context object tying cache, registry and stages together
//! * [`render`], [`semantic_tokens`]: Rendering adapters
//!
//! The engine never blocks: language initialization is requested through
//! [`HighlightEngine::take_load_requests`] and delivered back with
//! [`HighlightEngine::language_ready`]; [`HighlightEngine::run`] does both on
//! a tokio runtime.

pub mod document;
pub mod engine;
pub mod event;
pub mod render;
pub mod scheduling;
pub mod semantic_tokens;
pub mod stats;

pub use document::{BuiltAnnotations, Document, DocumentError, DocumentTreeCache, EditOutcome};
pub use engine::HighlightEngine;
pub use event::{DocumentId, EditorId, HostEvent, TextEdit, VisibleEditor};
pub use render::{DecorationSink, split_buckets, split_multiline};
pub use scheduling::{DebounceTimer, Stage, StageTimers};
pub use semantic_tokens::encode_semantic_tokens;
pub use stats::SchedulerStats;
