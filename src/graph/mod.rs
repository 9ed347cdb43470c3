//! Dependency graph over package objects.
//!
//! A best-effort, string-pattern-based reference graph built from the
//! vendor snapshot map. Edges point from an object to the objects it
//! depends on.

pub mod references;
pub mod builder;

pub use references::{ExtractedReferences, NameIndex, PatternReferenceExtractor, ReferenceExtractor};
pub use builder::{DependencyGraph, DependencyGraphBuilder, ReverseAdjacency};
