//! Aggregate statistics over a reconciliation plan.
//!
//! Computed from the plan's own outputs; never re-scans snapshots.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::classify::ClassificationResult;
use crate::types::{Classification, ObjectType, OrderedChange, Strategy};

/// Number of changes per classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationCounts {
    /// NO_CONFLICT count.
    pub no_conflict: usize,
    /// CONFLICT count.
    pub conflict: usize,
    /// CUSTOMER_ONLY count.
    pub customer_only: usize,
    /// REMOVED_BUT_CUSTOMIZED count.
    pub removed_but_customized: usize,
}

impl ClassificationCounts {
    /// Increment count for a classification.
    pub fn increment(&mut self, classification: Classification) {
        match classification {
            Classification::NoConflict => self.no_conflict += 1,
            Classification::Conflict => self.conflict += 1,
            Classification::CustomerOnly => self.customer_only += 1,
            Classification::RemovedButCustomized => self.removed_but_customized += 1,
        }
    }

    /// Count for one classification.
    pub fn get(&self, classification: Classification) -> usize {
        match classification {
            Classification::NoConflict => self.no_conflict,
            Classification::Conflict => self.conflict,
            Classification::CustomerOnly => self.customer_only,
            Classification::RemovedButCustomized => self.removed_but_customized,
        }
    }

    /// Total across all classifications.
    pub fn total(&self) -> usize {
        self.no_conflict + self.conflict + self.customer_only + self.removed_but_customized
    }

    /// Changes that need review (everything but CUSTOMER_ONLY).
    pub fn reviewed(&self) -> usize {
        self.total() - self.customer_only
    }
}

/// Statistics for one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    /// Counts over the whole change universe.
    pub by_classification: ClassificationCounts,
    /// Counts per object type over the whole change universe.
    pub by_type: BTreeMap<ObjectType, usize>,
    /// Counts per recommended strategy over the working set.
    pub by_strategy: BTreeMap<Strategy, usize>,
    /// Number of reviewed changes.
    pub working_set_size: usize,
    /// Edges in the dependency graph.
    pub dependency_edges: usize,
    /// Edges ignored to break cycles.
    pub broken_edges: usize,
    /// Changes downgraded to NO_CONFLICT by content equality.
    pub converged_conflicts: usize,
    /// CONFLICT guidance degraded by missing snapshots.
    pub degraded_guidance: usize,
}

impl ReconcileStats {
    /// Compute statistics from a run's outputs.
    pub fn compute(
        classification: &ClassificationResult,
        working_set: &[OrderedChange],
        dependency_edges: usize,
        broken_edges: usize,
    ) -> Self {
        let mut stats = Self {
            working_set_size: working_set.len(),
            dependency_edges,
            broken_edges,
            ..Self::default()
        };

        for change in classification.iter() {
            stats.by_classification.increment(change.classification);
            *stats.by_type.entry(change.object_type).or_insert(0) += 1;
            if change.converged {
                stats.converged_conflicts += 1;
            }
        }

        for ordered in working_set {
            *stats.by_strategy.entry(ordered.guidance.strategy).or_insert(0) += 1;
            if ordered.guidance.is_degraded() {
                stats.degraded_guidance += 1;
            }
        }

        stats
    }
}
