//! trace-inspect - text front-end for the trace engine
//!
//! Loads a batch of span records from disk, builds the trace index and
//! layout, and renders them as plain text: a summary, a track timeline, the
//! call tree and the navigation state around one selected span.

pub mod config;
pub mod error;
pub mod loader;
pub mod render;
