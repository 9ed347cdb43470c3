//! Merge guidance types.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::snapshot::PackageVersion;

/// Recommended resolution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    /// Take the vendor's version as-is.
    AdoptVendorChanges,
    /// Keep the customer's version and graft in the vendor's additions.
    IncorporateVendorAdditions,
    /// Keep the customer's version.
    KeepCustomerVersion,
    /// A human must merge both versions.
    ManualMergeRequired,
    /// Confirm the vendor's removal.
    ReviewVendorRemoval,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdoptVendorChanges => write!(f, "ADOPT_VENDOR_CHANGES"),
            Self::IncorporateVendorAdditions => write!(f, "INCORPORATE_VENDOR_ADDITIONS"),
            Self::KeepCustomerVersion => write!(f, "KEEP_CUSTOMER_VERSION"),
            Self::ManualMergeRequired => write!(f, "MANUAL_MERGE_REQUIRED"),
            Self::ReviewVendorRemoval => write!(f, "REVIEW_VENDOR_REMOVAL"),
        }
    }
}

/// Diffable facet of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    /// Expression/logic code.
    Code,
    /// Business logic text.
    BusinessLogic,
    /// Declared fields.
    Fields,
    /// Property map.
    Properties,
}

impl Facet {
    /// Human-readable facet name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Code => "Code",
            Self::BusinessLogic => "Business logic",
            Self::Fields => "Fields",
            Self::Properties => "Properties",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A vendor-originated change on one facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetChange {
    /// Facet the change applies to.
    pub facet: Facet,
    /// Human-readable description.
    pub description: String,
    /// Lines, field names or property keys involved (sorted).
    pub items: Vec<String>,
}

/// A facet where vendor and customer diverged incompatibly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictSection {
    /// Facet in conflict.
    pub facet: Facet,
    /// Human-readable description.
    pub description: String,
    /// Lines, field names or property keys in conflict (sorted).
    pub items: Vec<String>,
}

/// Guidance for resolving one change.
///
/// Produced once per ordered change; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guidance {
    /// Recommended strategy.
    pub strategy: Strategy,
    /// Content present only in the vendor version (safe to graft in).
    pub vendor_additions: Vec<FacetChange>,
    /// Base → vendor deltas.
    pub vendor_modifications: Vec<FacetChange>,
    /// Incompatible divergences.
    pub conflict_sections: Vec<ConflictSection>,
    /// Human-readable recommendations.
    pub recommendations: Vec<String>,
    /// Package versions that were needed but absent.
    #[serde(default)]
    pub missing: Vec<PackageVersion>,
}

impl Guidance {
    /// Guidance with only a strategy and one recommendation.
    pub fn bare(strategy: Strategy, recommendation: impl Into<String>) -> Self {
        Self {
            strategy,
            vendor_additions: Vec::new(),
            vendor_modifications: Vec::new(),
            conflict_sections: Vec::new(),
            recommendations: vec![recommendation.into()],
            missing: Vec::new(),
        }
    }

    /// Whether guidance was degraded because snapshots were absent.
    pub fn is_degraded(&self) -> bool {
        !self.missing.is_empty()
    }

    /// Whether any conflict section was found.
    pub fn has_conflicts(&self) -> bool {
        !self.conflict_sections.is_empty()
    }
}
