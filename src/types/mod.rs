//! Core data contracts for the reconciliation engine.

pub mod snapshot;
pub mod change;
pub mod classified;
pub mod guidance;
pub mod ordered;
pub mod diagnostic;

pub use snapshot::{
    ObjectId, ObjectType, FieldDef, Relationship, ObjectSnapshot, SnapshotMap,
    PackageVersion, PackageSnapshots, SnapshotTriple,
};
pub use change::{
    ChangeKind, ChangeSide, ContentDetail, ChangeEntry, ChangeSet, ChangeIndex,
    VendorChangeSet, CustomerChangeSet,
};
pub use classified::{Classification, ClassifiedChange};
pub use guidance::{Strategy, Facet, FacetChange, ConflictSection, Guidance};
pub use ordered::{DependencyRef, ResolvedDependencies, OrderedChange};
pub use diagnostic::{
    Severity, Stage, DiagnosticKind, Diagnostic, DiagnosticSink, NoOpSink, CollectingSink,
};
