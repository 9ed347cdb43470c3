//! Four-way change classification.
//!
//! Every identifier in the vendor diff (A→C) or customer diff (A→B) is
//! assigned to exactly one bucket. Rules apply in precedence order:
//!
//! 1. vendor REMOVED and customer MODIFIED → REMOVED_BUT_CUSTOMIZED
//! 2. changed by both → CONFLICT, unless both results are identical
//!    (see [`converges`]), in which case → NO_CONFLICT
//! 3. changed by customer only → CUSTOMER_ONLY
//! 4. changed by vendor only → NO_CONFLICT
//!
//! An identifier matching no rule is an invariant violation and aborts
//! the run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::ReconcileError;
use crate::policy::ReconcilePolicyV1;
use crate::types::{
    ChangeEntry, ChangeKind, ChangeSet, ChangeSide, Classification, ClassifiedChange,
    CustomerChangeSet, Diagnostic, DiagnosticKind, ObjectId, Stage, VendorChangeSet,
};

/// Classified changes partitioned into the four buckets.
///
/// Each bucket is sorted by identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Vendor-only or converged changes.
    pub no_conflict: Vec<ClassifiedChange>,
    /// Divergent changes on both sides.
    pub conflict: Vec<ClassifiedChange>,
    /// Customer-only changes.
    pub customer_only: Vec<ClassifiedChange>,
    /// Vendor removals of customized objects.
    pub removed_but_customized: Vec<ClassifiedChange>,
}

impl ClassificationResult {
    /// The bucket for a classification.
    pub fn bucket(&self, classification: Classification) -> &[ClassifiedChange] {
        match classification {
            Classification::NoConflict => &self.no_conflict,
            Classification::Conflict => &self.conflict,
            Classification::CustomerOnly => &self.customer_only,
            Classification::RemovedButCustomized => &self.removed_but_customized,
        }
    }

    fn bucket_mut(&mut self, classification: Classification) -> &mut Vec<ClassifiedChange> {
        match classification {
            Classification::NoConflict => &mut self.no_conflict,
            Classification::Conflict => &mut self.conflict,
            Classification::CustomerOnly => &mut self.customer_only,
            Classification::RemovedButCustomized => &mut self.removed_but_customized,
        }
    }

    /// All classified changes, bucket by bucket.
    pub fn iter(&self) -> impl Iterator<Item = &ClassifiedChange> {
        self.no_conflict
            .iter()
            .chain(self.conflict.iter())
            .chain(self.customer_only.iter())
            .chain(self.removed_but_customized.iter())
    }

    /// Total classified changes.
    pub fn len(&self) -> usize {
        self.no_conflict.len()
            + self.conflict.len()
            + self.customer_only.len()
            + self.removed_but_customized.len()
    }

    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up one identifier.
    pub fn get(&self, id: &ObjectId) -> Option<&ClassifiedChange> {
        self.iter().find(|c| &c.id == id)
    }

    /// Identifiers of one bucket.
    pub fn ids(&self, classification: Classification) -> Vec<ObjectId> {
        self.bucket(classification).iter().map(|c| c.id.clone()).collect()
    }

    /// Changes downgraded from CONFLICT because both sides converged.
    pub fn converged(&self) -> impl Iterator<Item = &ClassifiedChange> {
        self.no_conflict.iter().filter(|c| c.converged)
    }
}

/// Whether both sides' results are identical.
///
/// Both must agree on whether the object still exists, and when it does,
/// their resulting code, fields and properties must be pairwise equal.
pub fn converges(
    customer: (ChangeKind, &ChangeEntry),
    vendor: (ChangeKind, &ChangeEntry),
) -> bool {
    let (customer_kind, customer_entry) = customer;
    let (vendor_kind, vendor_entry) = vendor;

    match (customer_kind, vendor_kind) {
        (ChangeKind::Removed, ChangeKind::Removed) => true,
        (ChangeKind::Removed, _) | (_, ChangeKind::Removed) => false,
        _ => customer_entry.after.content_equals(&vendor_entry.after),
    }
}

/// Classification engine.
///
/// Stateless apart from its policy; safe to share across sessions.
#[derive(Debug, Clone, Default)]
pub struct ClassificationEngine {
    policy: ReconcilePolicyV1,
}

impl ClassificationEngine {
    /// Create an engine with the given policy.
    pub fn new(policy: ReconcilePolicyV1) -> Self {
        Self { policy }
    }

    /// Classify every changed identifier.
    ///
    /// Returns the four buckets and any diagnostics raised on the way
    /// (converged conflicts).
    pub fn classify(
        &self,
        vendor: &VendorChangeSet,
        customer: &CustomerChangeSet,
    ) -> Result<(ClassificationResult, Vec<Diagnostic>), ReconcileError> {
        validate_side(vendor, ChangeSide::Vendor)?;
        validate_side(customer, ChangeSide::Customer)?;

        let vendor_index = vendor.index();
        let customer_index = customer.index();

        let universe: BTreeSet<&ObjectId> = vendor_index.ids().chain(customer_index.ids()).collect();

        let mut result = ClassificationResult::default();
        let mut diagnostics = Vec::new();

        for id in universe {
            let vendor_side = vendor_index.get(id);
            let customer_side = customer_index.get(id);

            let (classification, converged) = self.decide(vendor_side, customer_side).ok_or_else(|| {
                let kind = DiagnosticKind::InvariantViolation {
                    object_id: id.clone(),
                    detail: "identifier matched no classification rule".to_string(),
                };
                Diagnostic::new(Stage::Classification, kind).log();
                ReconcileError::InvariantViolation {
                    object_id: id.clone(),
                    detail: "identifier matched no classification rule".to_string(),
                }
            })?;

            if converged {
                tracing::debug!(object_id = %id, "both sides converged; downgraded to NO_CONFLICT");
                diagnostics.push(Diagnostic::new(
                    Stage::Classification,
                    DiagnosticKind::ContentConverged { object_id: id.clone() },
                ));
            }

            let change = build_change(id, classification, converged, vendor_side, customer_side)?;
            result.bucket_mut(classification).push(change);
        }

        tracing::info!(
            no_conflict = result.no_conflict.len(),
            conflict = result.conflict.len(),
            customer_only = result.customer_only.len(),
            removed_but_customized = result.removed_but_customized.len(),
            converged = diagnostics.len(),
            "classification complete"
        );

        Ok((result, diagnostics))
    }

    /// Apply the precedence rules; `None` when no rule matches.
    fn decide(
        &self,
        vendor: Option<(ChangeKind, &ChangeEntry)>,
        customer: Option<(ChangeKind, &ChangeEntry)>,
    ) -> Option<(Classification, bool)> {
        match (vendor, customer) {
            (Some((ChangeKind::Removed, _)), Some((ChangeKind::Modified, _))) => {
                Some((Classification::RemovedButCustomized, false))
            }
            (Some(v), Some(c)) => {
                if self.policy.content_equality_downgrade && converges(c, v) {
                    Some((Classification::NoConflict, true))
                } else {
                    Some((Classification::Conflict, false))
                }
            }
            (None, Some(_)) => Some((Classification::CustomerOnly, false)),
            (Some(_), None) => Some((Classification::NoConflict, false)),
            (None, None) => None,
        }
    }
}

fn validate_side(set: &ChangeSet, side: ChangeSide) -> Result<(), ReconcileError> {
    set.validate()
        .map_err(|object_id| ReconcileError::DuplicateChangeEntry { side, object_id })
}

fn build_change(
    id: &ObjectId,
    classification: Classification,
    converged: bool,
    vendor: Option<(ChangeKind, &ChangeEntry)>,
    customer: Option<(ChangeKind, &ChangeEntry)>,
) -> Result<ClassifiedChange, ReconcileError> {
    let vendor_entry = vendor.map(|(_, e)| e);
    let customer_entry = customer.map(|(_, e)| e);

    let label_source = if classification.prefers_customer_label() {
        customer_entry.or(vendor_entry)
    } else {
        vendor_entry.or(customer_entry)
    };
    let label = label_source.ok_or_else(|| ReconcileError::InvariantViolation {
        object_id: id.clone(),
        detail: "classified object has no change entry on either side".to_string(),
    })?;

    Ok(ClassifiedChange {
        id: id.clone(),
        classification,
        name: label.name.clone(),
        object_type: label.object_type,
        vendor_change: vendor.map(|(k, _)| k),
        customer_change: customer.map(|(k, _)| k),
        vendor_detail: vendor_entry.map(|e| e.after.clone()),
        customer_detail: customer_entry.map(|e| e.after.clone()),
        converged,
    })
}
