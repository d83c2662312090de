//! Trace layout and navigation engine
//!
//! Turns a flat batch of span records into:
//! - a [`TraceIndex`]: parent/child links, chronological child order and a
//!   deterministic pre-order (`dfs_order`)
//! - a [`LayoutMap`]: horizontal extents as fractions of the trace duration
//!   and vertical tracks such that overlapping siblings never share a track
//! - a [`NavigationIndex`] plus scrubbing helpers for moving a selection
//!   through the trace chronologically, by peer, by sibling or along the
//!   call stack
//!
//! Everything is synchronous and side-effect free. A new batch is handled by
//! building a new index; derived structures are never patched in place.

pub mod cursor;
pub mod layout;
pub mod navigation;
pub mod rows;
pub mod summary;
pub mod tree;

#[cfg(test)]
mod testing;

pub use cursor::{build_stack_for_call, scrub, scrubber_state, step, Navigator, StackState};
pub use layout::{layout, LayoutMap};
pub use navigation::{navigation_index, NavigationIndex};
pub use rows::TraceRow;
pub use summary::TraceSummary;
pub use tree::{build_trace, BuildDiagnostics, TraceIndex, TraceNode, TIMELINE_UNIT_MS};
pub use trace_types::{LayoutNode, NavigationMode, ScrubberState, SpanId, SpanRecord};
