//! Merge guidance: facet diffs and resolution strategies.

pub mod diff;
pub mod engine;

pub use diff::{KeyDelta, LineDelta};
pub use engine::GuidanceEngine;
