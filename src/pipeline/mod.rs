// src/pipeline/mod.rs

//! Pipeline ordering.
//!
//! - [`PipelineDefinition`] holds the canonical, declared run order.
//! - [`ScheduledSet`] accumulates requested job names inside a debounce
//!   window; membership matters, insertion order does not.
//!
//! The execution list for a pass is the pipeline filtered to members of the
//! scheduled set, in pipeline order. This is what enforces dependency
//! ordering: an earlier-declared job always executes before a later one
//! within the same pass, independent of which change arrived first or which
//! rule fired first.

pub mod definition;
pub mod scheduled_set;

pub use definition::PipelineDefinition;
pub use scheduled_set::ScheduledSet;
