//! Dependency graph construction.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::references::{ExtractedReferences, NameIndex, PatternReferenceExtractor, ReferenceExtractor};
use crate::policy::ReconcilePolicyV1;
use crate::types::{Diagnostic, DiagnosticKind, ObjectId, ObjectSnapshot, SnapshotMap, Stage};

/// Parent → objects depending on it, as returned by [`DependencyGraph::reversed`].
pub type ReverseAdjacency<'g> = BTreeMap<&'g ObjectId, BTreeSet<&'g ObjectId>>;

/// Adjacency map: object → objects it depends on (its parents).
///
/// Uses BTreeMap/BTreeSet for deterministic iteration order.
/// Self-edges never appear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    edges: BTreeMap<ObjectId, BTreeSet<ObjectId>>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `child → parent` edge. Self-edges are ignored.
    ///
    /// Returns whether the edge was new.
    pub fn add_edge(&mut self, child: ObjectId, parent: ObjectId) -> bool {
        if child == parent {
            return false;
        }
        self.edges.entry(child).or_default().insert(parent)
    }

    /// Remove a `child → parent` edge. Returns whether it existed.
    pub fn remove_edge(&mut self, child: &ObjectId, parent: &ObjectId) -> bool {
        let Some(parents) = self.edges.get_mut(child) else {
            return false;
        };
        let removed = parents.remove(parent);
        if parents.is_empty() {
            self.edges.remove(child);
        }
        removed
    }

    /// Whether `child` depends on `parent`.
    pub fn contains_edge(&self, child: &ObjectId, parent: &ObjectId) -> bool {
        self.edges.get(child).is_some_and(|p| p.contains(parent))
    }

    /// Objects `id` depends on, sorted.
    pub fn parents_of(&self, id: &ObjectId) -> impl Iterator<Item = &ObjectId> {
        self.edges.get(id).into_iter().flatten()
    }

    /// All `(child, parent)` edges in canonical order.
    pub fn edges(&self) -> impl Iterator<Item = (&ObjectId, &ObjectId)> {
        self.edges
            .iter()
            .flat_map(|(child, parents)| parents.iter().map(move |p| (child, p)))
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Reverse adjacency: parent → children, over the whole graph.
    ///
    /// Build once and reuse; every call walks all edges.
    pub fn reversed(&self) -> ReverseAdjacency<'_> {
        let mut reversed = ReverseAdjacency::new();
        for (child, parent) in self.edges() {
            reversed.entry(parent).or_default().insert(child);
        }
        reversed
    }

    /// The subgraph induced by `nodes`: edges with both endpoints inside.
    pub fn restricted_to(&self, nodes: &BTreeSet<ObjectId>) -> DependencyGraph {
        let mut sub = DependencyGraph::new();
        for (child, parent) in self.edges() {
            if nodes.contains(child) && nodes.contains(parent) {
                sub.add_edge(child.clone(), parent.clone());
            }
        }
        sub
    }
}

/// Builds the dependency graph from a snapshot map.
///
/// ## Edge sources
///
/// 1. References in `code` (and `business_logic` when enabled), via the
///    [`ReferenceExtractor`]
/// 2. Declared relationships of record-like objects
/// 3. Field type annotations of record-like objects naming a known object
///
/// References that resolve to nothing are omitted and reported as
/// MalformedReference diagnostics.
pub struct DependencyGraphBuilder<E: ReferenceExtractor = PatternReferenceExtractor> {
    extractor: E,
    policy: ReconcilePolicyV1,
}

impl DependencyGraphBuilder<PatternReferenceExtractor> {
    /// Create a builder with the pattern extractor configured by `policy`.
    pub fn new(policy: ReconcilePolicyV1) -> Self {
        let extractor = PatternReferenceExtractor::new(policy.reference_kinds);
        Self { extractor, policy }
    }
}

impl Default for DependencyGraphBuilder<PatternReferenceExtractor> {
    fn default() -> Self {
        Self::new(ReconcilePolicyV1::default())
    }
}

impl<E: ReferenceExtractor> DependencyGraphBuilder<E> {
    /// Create a builder with a custom extractor.
    pub fn with_extractor(extractor: E, policy: ReconcilePolicyV1) -> Self {
        Self { extractor, policy }
    }

    /// Build the graph over `snapshots` (normally the vendor package).
    pub fn build(&self, snapshots: &SnapshotMap) -> (DependencyGraph, Vec<Diagnostic>) {
        let index = NameIndex::build(snapshots);
        let mut graph = DependencyGraph::new();
        let mut diagnostics = Vec::new();

        for (id, snapshot) in snapshots {
            let refs = self.references_of(snapshot, &index);

            for parent in refs.resolved {
                graph.add_edge(id.clone(), parent);
            }
            for reference in refs.unresolved {
                diagnostics.push(Diagnostic::new(
                    Stage::DependencyGraph,
                    DiagnosticKind::MalformedReference {
                        object_id: id.clone(),
                        reference,
                    },
                ));
            }
        }

        tracing::info!(
            objects = snapshots.len(),
            edges = graph.edge_count(),
            unresolved = diagnostics.len(),
            "dependency graph built"
        );

        (graph, diagnostics)
    }

    fn references_of(&self, snapshot: &ObjectSnapshot, index: &NameIndex) -> ExtractedReferences {
        let mut refs = ExtractedReferences::default();

        if let Some(code) = &snapshot.code {
            refs.extend(self.extractor.extract_references(code, index));
        }
        if self.policy.scan_business_logic {
            if let Some(logic) = &snapshot.business_logic {
                refs.extend(self.extractor.extract_references(logic, index));
            }
        }

        if self.policy.record_relationships && snapshot.object_type.is_record_like() {
            for relationship in &snapshot.relationships {
                match index.resolve(relationship.target.trim()) {
                    Some(target) => {
                        refs.resolved.insert(target);
                    }
                    None => {
                        refs.unresolved.insert(format!("relationship {}", relationship.target));
                    }
                }
            }
            // Field types are mostly primitives; only known object names count.
            for field in &snapshot.fields {
                if let Some(target) = index.resolve_name(field.referenced_type_name()) {
                    refs.resolved.insert(target.clone());
                }
            }
        }

        refs.resolved.remove(&snapshot.id);
        refs
    }
}
