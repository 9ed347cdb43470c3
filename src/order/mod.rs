//! Review ordering: topological ordering of conflicts and bucket composition.

pub mod topo;
pub mod review;

pub use topo::{BrokenEdge, CycleBreaker, LastEdgeCycleBreaker, TopoOutcome, TopologicalOrderer};
pub use review::{resolve_dependencies, ReviewOrder, ReviewOrderer};
