//! # reconcile-kernel
//!
//! Deterministic three-way reconciliation of configuration packages.
//!
//! Given a Base package (A), a Customer-modified package (B) and a new
//! Vendor package (C), the kernel answers:
//!
//! > Which objects changed, do vendor and customer changes collide, in what
//! > order should a reviewer address them, and how should each be resolved?
//!
//! ## Core Contract
//!
//! 1. Classify every changed object into exactly one of four buckets
//! 2. Order reviewed objects so dependencies come before their dependents
//! 3. Attach facet-level guidance and a recommended strategy to each
//! 4. Produce a **plan fingerprint** so identical inputs are recognizable
//!
//! ## Architecture
//!
//! ```text
//! VendorChangeSet + CustomerChangeSet → ClassificationEngine → buckets
//! vendor snapshots → DependencyGraphBuilder → DependencyGraph
//!                 buckets + graph → ReviewOrderer → review order
//!         review order + A/B/C snapshots → GuidanceEngine → ReconcilePlan
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same change-sets + same snapshots + same policy → identical plan fingerprint
//! - Buckets are sorted by object identifier
//! - Ties in review order break lexicographically
//! - Facet diffs are set operations, insensitive to line and key order

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod content;
pub mod canonical;
pub mod policy;
pub mod classify;
pub mod graph;
pub mod order;
pub mod guidance;
pub mod stats;
pub mod reconciler;
pub mod error;

// Re-exports
pub use types::{
    ObjectId, ObjectType, FieldDef, Relationship, ObjectSnapshot, SnapshotMap,
    PackageVersion, PackageSnapshots, SnapshotTriple,
    ChangeKind, ChangeSide, ContentDetail, ChangeEntry, ChangeSet,
    VendorChangeSet, CustomerChangeSet,
    Classification, ClassifiedChange,
    Strategy, Facet, FacetChange, ConflictSection, Guidance,
    DependencyRef, ResolvedDependencies, OrderedChange,
};
pub use types::diagnostic::{
    Severity, Stage, DiagnosticKind, Diagnostic,
    DiagnosticSink, NoOpSink, CollectingSink,
};
pub use error::ReconcileError;
pub use policy::{ReconcilePolicyV1, ReferenceKinds};
pub use classify::{ClassificationEngine, ClassificationResult};
pub use graph::{
    DependencyGraph, DependencyGraphBuilder, ReverseAdjacency, NameIndex,
    ReferenceExtractor, PatternReferenceExtractor, ExtractedReferences,
};
pub use order::{
    TopologicalOrderer, TopoOutcome, CycleBreaker, LastEdgeCycleBreaker, BrokenEdge,
    ReviewOrderer, ReviewOrder,
};
pub use guidance::GuidanceEngine;
pub use stats::{ClassificationCounts, ReconcileStats};
pub use reconciler::{Reconciler, ReconcileInput, ReconcilePlan, RunContext};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex, plan_fingerprint};
pub use content::{normalize_text, line_set, text_digest};

/// Schema version for all plan types.
/// Increment on breaking changes to any schema type.
pub const RECONCILE_SCHEMA_VERSION: &str = "1.0.0";

/// Default policy version identifier.
pub const DEFAULT_POLICY_VERSION: &str = "reconcile_policy_v1";
