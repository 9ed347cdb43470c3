//! Deterministic topological ordering with cycle breaking.
//!
//! ## Algorithm
//!
//! 1. Restrict the dependency graph to the requested identifiers
//! 2. Kahn's algorithm; the ready set is a BTreeSet so the smallest
//!    identifier is always popped first
//! 3. If identifiers remain, they sit on or behind cycles: the
//!    [`CycleBreaker`] removes edges from a working copy of the graph
//! 4. Kahn's algorithm again on the reduced graph
//! 5. Anything still unplaced is appended in identifier order
//!
//! The orderer never fails; it degrades to a legal total order.
//!
//! The default [`LastEdgeCycleBreaker`] is a heuristic, not a minimal
//! feedback-arc-set solver.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::graph::DependencyGraph;
use crate::types::ObjectId;

/// An edge ignored to break a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenEdge {
    /// Dependent side of the ignored edge.
    pub child: ObjectId,
    /// Depended-on side of the ignored edge.
    pub parent: ObjectId,
    /// Cycle the edge closed, starting at `parent` and ending at `child`.
    pub cycle: Vec<ObjectId>,
}

/// Removes edges until the subgraph over `remaining` is acyclic.
pub trait CycleBreaker: Send + Sync {
    /// Break cycles among `remaining` in `graph`, returning removed edges.
    fn break_cycles(&self, remaining: &BTreeSet<ObjectId>, graph: &mut DependencyGraph) -> Vec<BrokenEdge>;
}

/// Depth-first search in identifier order; every edge that closes a cycle
/// (last node back to first) is removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastEdgeCycleBreaker;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Done,
}

impl CycleBreaker for LastEdgeCycleBreaker {
    fn break_cycles(&self, remaining: &BTreeSet<ObjectId>, graph: &mut DependencyGraph) -> Vec<BrokenEdge> {
        let neighbors: BTreeMap<&ObjectId, Vec<ObjectId>> = remaining
            .iter()
            .map(|id| {
                let parents = graph
                    .parents_of(id)
                    .filter(|p| remaining.contains(*p))
                    .cloned()
                    .collect();
                (id, parents)
            })
            .collect();

        let mut marks: BTreeMap<&ObjectId, Mark> = BTreeMap::new();
        let mut broken = Vec::new();

        for root in remaining {
            if marks.contains_key(root) {
                continue;
            }

            // Iterative DFS: (node, next neighbor index); `path` mirrors the stack.
            let mut stack: Vec<(&ObjectId, usize)> = vec![(root, 0)];
            let mut path: Vec<&ObjectId> = vec![root];
            marks.insert(root, Mark::OnStack);

            while let Some((node, next)) = stack.last_mut() {
                let node: &ObjectId = *node;
                let adj = neighbors.get(node).map(Vec::as_slice).unwrap_or(&[]);

                if *next >= adj.len() {
                    marks.insert(node, Mark::Done);
                    stack.pop();
                    path.pop();
                    continue;
                }

                let target = &adj[*next];
                *next += 1;

                match marks.get(target).copied() {
                    None => {
                        // Borrow the key from `remaining` so marks outlive this frame.
                        if let Some(key) = remaining.get(target) {
                            marks.insert(key, Mark::OnStack);
                            stack.push((key, 0));
                            path.push(key);
                        }
                    }
                    Some(Mark::OnStack) => {
                        let start = path.iter().position(|n| *n == target).unwrap_or(0);
                        let cycle: Vec<ObjectId> = path[start..].iter().map(|n| (*n).clone()).collect();
                        graph.remove_edge(node, target);
                        broken.push(BrokenEdge {
                            child: node.clone(),
                            parent: target.clone(),
                            cycle,
                        });
                    }
                    Some(Mark::Done) => {}
                }
            }
        }

        broken
    }
}

/// Result of ordering one identifier subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopoOutcome {
    /// Identifiers with every parent before its children.
    pub order: Vec<ObjectId>,
    /// Edges ignored to break cycles.
    pub broken_edges: Vec<BrokenEdge>,
    /// Identifiers placed by the final lexicographic fallback.
    pub appended: Vec<ObjectId>,
}

/// Topological orderer over a subset of the dependency graph.
#[derive(Debug, Clone, Default)]
pub struct TopologicalOrderer<B: CycleBreaker = LastEdgeCycleBreaker> {
    breaker: B,
}

impl TopologicalOrderer<LastEdgeCycleBreaker> {
    /// Create an orderer with the default cycle breaker.
    pub fn new() -> Self {
        Self {
            breaker: LastEdgeCycleBreaker,
        }
    }
}

impl<B: CycleBreaker> TopologicalOrderer<B> {
    /// Create an orderer with a custom cycle breaker.
    pub fn with_breaker(breaker: B) -> Self {
        Self { breaker }
    }

    /// Order `ids` so that for every edge (child → parent) with both ends in
    /// `ids`, the parent comes first. Edges leaving the subset are ignored.
    pub fn order(&self, ids: &[ObjectId], graph: &DependencyGraph) -> TopoOutcome {
        let nodes: BTreeSet<ObjectId> = ids.iter().cloned().collect();
        let mut working = graph.restricted_to(&nodes);

        let (order, remaining) = kahn(&nodes, &working);
        if remaining.is_empty() {
            return TopoOutcome {
                order,
                ..TopoOutcome::default()
            };
        }

        tracing::warn!(
            unresolved = remaining.len(),
            total = nodes.len(),
            "dependency cycle detected among conflicts; breaking"
        );
        let broken_edges = self.breaker.break_cycles(&remaining, &mut working);
        for edge in &broken_edges {
            tracing::debug!(child = %edge.child, parent = %edge.parent, cycle_len = edge.cycle.len(), "ignored cycle edge");
        }

        let (mut order, remaining) = kahn(&nodes, &working);
        let appended: Vec<ObjectId> = remaining.into_iter().collect();
        order.extend(appended.iter().cloned());

        TopoOutcome {
            order,
            broken_edges,
            appended,
        }
    }
}

/// Kahn's algorithm over `nodes`; returns the order and the unplaced nodes.
fn kahn(nodes: &BTreeSet<ObjectId>, graph: &DependencyGraph) -> (Vec<ObjectId>, BTreeSet<ObjectId>) {
    let reversed = graph.reversed();

    let mut in_degree: BTreeMap<&ObjectId, usize> = nodes
        .iter()
        .map(|id| (id, graph.parents_of(id).filter(|p| nodes.contains(*p)).count()))
        .collect();

    let mut ready: BTreeSet<&ObjectId> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| *id)
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(id) = ready.pop_first() {
        order.push(id.clone());
        if let Some(children) = reversed.get(id) {
            for child in children {
                if let Some(degree) = in_degree.get_mut(*child) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(*child);
                    }
                }
            }
        }
    }

    let placed: BTreeSet<&ObjectId> = order.iter().collect();
    let remaining = nodes.iter().filter(|id| !placed.contains(id)).cloned().collect();
    (order, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ObjectId {
        ObjectId::new(s)
    }

    fn ids(list: &[&str]) -> Vec<ObjectId> {
        list.iter().map(|s| id(s)).collect()
    }

    fn graph(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for (child, parent) in edges {
            g.add_edge(id(child), id(parent));
        }
        g
    }

    fn position(order: &[ObjectId], s: &str) -> usize {
        order.iter().position(|x| x.as_str() == s).unwrap()
    }

    #[test]
    fn test_parents_before_children() {
        // c depends on b, b depends on a
        let g = graph(&[("c", "b"), ("b", "a")]);
        let outcome = TopologicalOrderer::new().order(&ids(&["c", "b", "a"]), &g);

        assert_eq!(outcome.order, ids(&["a", "b", "c"]));
        assert!(outcome.broken_edges.is_empty());
    }

    #[test]
    fn test_ties_break_lexicographically() {
        let g = graph(&[("z", "m")]);
        let outcome = TopologicalOrderer::new().order(&ids(&["z", "b", "m", "a"]), &g);
        assert_eq!(outcome.order, ids(&["a", "b", "m", "z"]));
    }

    #[test]
    fn test_edges_outside_subset_ignored() {
        let g = graph(&[("a", "outside"), ("b", "a")]);
        let outcome = TopologicalOrderer::new().order(&ids(&["b", "a"]), &g);
        assert_eq!(outcome.order, ids(&["a", "b"]));
    }

    #[test]
    fn test_three_cycle_breaks_exactly_one_edge() {
        // A -> B -> C -> A
        let g = graph(&[("A", "B"), ("B", "C"), ("C", "A")]);
        let outcome = TopologicalOrderer::new().order(&ids(&["A", "B", "C"]), &g);

        assert_eq!(outcome.order.len(), 3);
        assert_eq!(outcome.broken_edges.len(), 1);
        assert!(outcome.appended.is_empty());

        let broken = &outcome.broken_edges[0];
        assert_eq!((broken.child.as_str(), broken.parent.as_str()), ("C", "A"));
        assert_eq!(broken.cycle, ids(&["A", "B", "C"]));

        // Remaining edges A->B and B->C hold: C, B, A.
        assert_eq!(outcome.order, ids(&["C", "B", "A"]));
    }

    #[test]
    fn test_cycle_with_tail() {
        // x depends on the cycle a <-> b; y is independent
        let g = graph(&[("a", "b"), ("b", "a"), ("x", "a")]);
        let outcome = TopologicalOrderer::new().order(&ids(&["x", "a", "b", "y"]), &g);

        assert_eq!(outcome.order.len(), 4);
        assert_eq!(outcome.broken_edges.len(), 1);
        assert!(position(&outcome.order, "a") < position(&outcome.order, "x"));
    }

    #[test]
    fn test_two_disjoint_cycles() {
        let g = graph(&[("a", "b"), ("b", "a"), ("c", "d"), ("d", "c")]);
        let outcome = TopologicalOrderer::new().order(&ids(&["a", "b", "c", "d"]), &g);

        assert_eq!(outcome.order.len(), 4);
        assert_eq!(outcome.broken_edges.len(), 2);
        for edge in &outcome.broken_edges {
            // Remaining edge of each pair is respected
            assert!(position(&outcome.order, edge.child.as_str()) < position(&outcome.order, edge.parent.as_str()));
        }
    }

    #[test]
    fn test_duplicate_ids_collapse() {
        let outcome = TopologicalOrderer::new().order(&ids(&["a", "a", "b"]), &DependencyGraph::new());
        assert_eq!(outcome.order, ids(&["a", "b"]));
    }

    struct NoopBreaker;

    impl CycleBreaker for NoopBreaker {
        fn break_cycles(&self, _remaining: &BTreeSet<ObjectId>, _graph: &mut DependencyGraph) -> Vec<BrokenEdge> {
            Vec::new()
        }
    }

    #[test]
    fn test_fallback_appends_lexicographically() {
        let g = graph(&[("b", "a"), ("a", "b"), ("c", "a")]);
        let outcome = TopologicalOrderer::with_breaker(NoopBreaker).order(&ids(&["c", "b", "a", "d"]), &g);

        assert_eq!(outcome.order, ids(&["d", "a", "b", "c"]));
        assert_eq!(outcome.appended, ids(&["a", "b", "c"]));
    }
}
