//! Review order composition.
//!
//! The working set is the concatenation of:
//!
//! 1. NO_CONFLICT, grouped by type (types and names lexicographic)
//! 2. CONFLICT, in dependency order
//! 3. REMOVED_BUT_CUSTOMIZED, by name
//!
//! CUSTOMER_ONLY changes are not reviewed and never appear.

use std::collections::BTreeMap;

use super::topo::{CycleBreaker, LastEdgeCycleBreaker, TopoOutcome, TopologicalOrderer};
use crate::classify::ClassificationResult;
use crate::graph::{DependencyGraph, ReverseAdjacency};
use crate::policy::{sort_by_name, sort_by_type_group};
use crate::types::{
    ClassifiedChange, DependencyRef, ObjectId, ObjectType, PackageSnapshots, ResolvedDependencies,
};

/// Changes in review order, with display positions.
#[derive(Debug, Clone)]
pub struct ReviewOrder<'a> {
    /// Changes in review order; index is the display order.
    pub sequence: Vec<&'a ClassifiedChange>,
    /// Ordering outcome of the CONFLICT bucket.
    pub conflict_outcome: TopoOutcome,
    positions: BTreeMap<&'a ObjectId, usize>,
}

impl<'a> ReviewOrder<'a> {
    /// Display order of an identifier, if reviewed.
    pub fn position(&self, id: &ObjectId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Number of reviewed changes.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Whether nothing needs review.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Composes the review order from classified buckets and the dependency graph.
#[derive(Debug, Clone, Default)]
pub struct ReviewOrderer<B: CycleBreaker = LastEdgeCycleBreaker> {
    orderer: TopologicalOrderer<B>,
}

impl ReviewOrderer<LastEdgeCycleBreaker> {
    /// Create a review orderer with the default cycle breaker.
    pub fn new() -> Self {
        Self {
            orderer: TopologicalOrderer::new(),
        }
    }
}

impl<B: CycleBreaker> ReviewOrderer<B> {
    /// Create a review orderer around a custom topological orderer.
    pub fn with_orderer(orderer: TopologicalOrderer<B>) -> Self {
        Self { orderer }
    }

    /// Place every reviewed change.
    pub fn order<'a>(&self, classification: &'a ClassificationResult, graph: &DependencyGraph) -> ReviewOrder<'a> {
        let mut no_conflict: Vec<&ClassifiedChange> = classification.no_conflict.iter().collect();
        sort_by_type_group(&mut no_conflict);

        let conflict_ids: Vec<ObjectId> = classification.conflict.iter().map(|c| c.id.clone()).collect();
        let conflict_outcome = self.orderer.order(&conflict_ids, graph);
        let by_id: BTreeMap<&ObjectId, &ClassifiedChange> =
            classification.conflict.iter().map(|c| (&c.id, c)).collect();
        let conflicts = conflict_outcome.order.iter().filter_map(|id| by_id.get(id).copied());

        let mut removed: Vec<&ClassifiedChange> = classification.removed_but_customized.iter().collect();
        sort_by_name(&mut removed);

        let sequence: Vec<&ClassifiedChange> = no_conflict
            .into_iter()
            .chain(conflicts)
            .chain(removed)
            .collect();
        let positions = sequence.iter().enumerate().map(|(i, c)| (&c.id, i)).collect();

        tracing::info!(
            reviewed = sequence.len(),
            skipped_customer_only = classification.customer_only.len(),
            broken_edges = conflict_outcome.broken_edges.len(),
            "review order composed"
        );

        ReviewOrder {
            sequence,
            conflict_outcome,
            positions,
        }
    }
}

/// Resolve the parents and children of one reviewed change.
///
/// Names come from the vendor snapshot, then customer, then base; objects
/// unknown to every package keep their identifier as name. Children are
/// read from `dependents`, the graph's [`DependencyGraph::reversed`] map,
/// so callers resolving many changes build it once.
pub fn resolve_dependencies(
    id: &ObjectId,
    graph: &DependencyGraph,
    dependents: &ReverseAdjacency<'_>,
    snapshots: &PackageSnapshots,
    order: &ReviewOrder<'_>,
) -> ResolvedDependencies {
    let to_ref = |other: &ObjectId| {
        let (name, object_type) = snapshots
            .label(other)
            .map(|(n, t)| (n.to_string(), t))
            .unwrap_or_else(|| (other.to_string(), ObjectType::Unknown));
        let display_order = order.position(other);
        DependencyRef {
            id: other.clone(),
            name,
            object_type,
            in_working_set: display_order.is_some(),
            display_order,
        }
    };

    ResolvedDependencies {
        parents: graph.parents_of(id).map(to_ref).collect(),
        children: dependents.get(id).into_iter().flatten().map(|child| to_ref(*child)).collect(),
    }
}
