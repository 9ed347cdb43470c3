//! Guidance generation.
//!
//! Dispatches on the classification of a change:
//!
//! | Classification | Guidance |
//! |---|---|
//! | NO_CONFLICT | adopt vendor (new object), review removal, or list base → vendor deltas |
//! | CONFLICT | additions, modifications and conflict sections from all three snapshots |
//! | CUSTOMER_ONLY | keep customer version |
//! | REMOVED_BUT_CUSTOMIZED | keep customer version |
//!
//! A CONFLICT missing any snapshot degrades to a bare MANUAL_MERGE_REQUIRED
//! and lists the absent versions in [`Guidance::missing`].

use super::diff;
use crate::policy::ReconcilePolicyV1;
use crate::types::{Classification, ClassifiedChange, Guidance, SnapshotTriple, Strategy};

/// Produces one [`Guidance`] per change. Pure; safe to share.
#[derive(Debug, Clone)]
pub struct GuidanceEngine {
    max_listed_items: usize,
}

impl GuidanceEngine {
    /// Create an engine configured by `policy`.
    pub fn new(policy: &ReconcilePolicyV1) -> Self {
        Self {
            max_listed_items: policy.max_listed_items,
        }
    }

    /// Generate guidance for `change` from its snapshots.
    pub fn generate(&self, change: &ClassifiedChange, snapshots: SnapshotTriple<'_>) -> Guidance {
        match change.classification {
            Classification::NoConflict => self.no_conflict(change, snapshots),
            Classification::Conflict => self.conflict(change, snapshots),
            Classification::CustomerOnly => Guidance::bare(
                Strategy::KeepCustomerVersion,
                "Only the customer changed this object; keep the customer version.",
            ),
            Classification::RemovedButCustomized => Guidance::bare(
                Strategy::KeepCustomerVersion,
                "The vendor removed this object but the customer customized it; keep the customer \
                 version and check it does not rely on other removed vendor objects.",
            ),
        }
    }

    fn no_conflict(&self, change: &ClassifiedChange, snapshots: SnapshotTriple<'_>) -> Guidance {
        let mut guidance = match (snapshots.base, snapshots.vendor) {
            (None, _) => Guidance::bare(
                Strategy::AdoptVendorChanges,
                format!("New object: the vendor added {} {}.", change.object_type, change.name),
            ),
            (Some(_), None) => Guidance::bare(
                Strategy::ReviewVendorRemoval,
                "The vendor removed this object; confirm nothing in the customer package still uses it.",
            ),
            (Some(base), Some(vendor)) => {
                let modifications = diff::modifications(base, vendor, self.max_listed_items);
                let mut guidance = Guidance::bare(
                    Strategy::AdoptVendorChanges,
                    "The customer did not change this object; adopt the vendor version.",
                );
                if modifications.is_empty() {
                    guidance
                        .recommendations
                        .push("No content differences between base and vendor were detected.".to_string());
                }
                guidance.vendor_modifications = modifications;
                guidance
            }
        };

        if change.converged {
            guidance
                .recommendations
                .push("Vendor and customer converged on identical content; nothing to merge.".to_string());
        }
        guidance
    }

    fn conflict(&self, change: &ClassifiedChange, snapshots: SnapshotTriple<'_>) -> Guidance {
        let (Some(base), Some(customer), Some(vendor)) = (snapshots.base, snapshots.customer, snapshots.vendor)
        else {
            let missing = snapshots.missing();
            let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
            tracing::debug!(object_id = %change.id, missing = ?names, "conflict guidance degraded");

            let mut guidance = Guidance::bare(
                Strategy::ManualMergeRequired,
                format!(
                    "Both sides changed this object but the {} snapshot is unavailable; merge manually.",
                    names.join(" and ")
                ),
            );
            guidance.missing = missing;
            return guidance;
        };

        let limit = self.max_listed_items;
        let vendor_additions = diff::vendor_additions(base, customer, vendor, limit);
        let vendor_modifications = diff::modifications(base, vendor, limit);
        let conflict_sections = diff::conflict_sections(base, customer, vendor, limit);

        let mut recommendations = Vec::new();
        let strategy = if !conflict_sections.is_empty() {
            let facets: Vec<&str> = conflict_sections.iter().map(|s| s.facet.label()).collect();
            recommendations.push(format!(
                "Vendor and customer made incompatible changes ({}); merge manually.",
                facets.join(", ")
            ));
            Strategy::ManualMergeRequired
        } else if !vendor_additions.is_empty() {
            recommendations.push("Keep the customer version and incorporate the vendor additions.".to_string());
            recommendations.extend(vendor_additions.iter().map(|a| format!("Add: {}", a.description)));
            Strategy::IncorporateVendorAdditions
        } else if vendor_modifications.is_empty() {
            recommendations.push("The vendor made no content changes; keep the customer version.".to_string());
            Strategy::KeepCustomerVersion
        } else {
            recommendations.push(
                "The vendor edited existing content without adding new content; re-apply those edits by hand."
                    .to_string(),
            );
            Strategy::ManualMergeRequired
        };

        Guidance {
            strategy,
            vendor_additions,
            vendor_modifications,
            conflict_sections,
            recommendations,
            missing: Vec::new(),
        }
    }
}

impl Default for GuidanceEngine {
    fn default() -> Self {
        Self::new(&ReconcilePolicyV1::default())
    }
}
