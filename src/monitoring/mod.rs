//! Execution Monitoring Module
//!
//! Provides the per-instance execution timeline used to observe what a
//! workflow run dispatched, skipped, and where it failed.
//!
//! # Components
//!
//! - [`ExecutionTimeline`]: Ordered step events for one instance

pub mod timeline;

pub use timeline::{EventType, ExecutionTimeline, StepEvent};
