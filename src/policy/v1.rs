//! ReconcilePolicy v1: classification, reference scanning and guidance knobs.
//!
//! Every plan records the `params_hash` of the policy that produced it, so
//! two plans are comparable only when their hashes match.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::DEFAULT_POLICY_VERSION;

/// Which reference patterns the dependency scanner looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceKinds {
    /// Direct identifier citations.
    pub direct_ids: bool,
    /// `rule!Name` references.
    pub rules: bool,
    /// `cons!NAME` references.
    pub constants: bool,
    /// `type!Name` / `recordType!Name` references.
    pub types: bool,
}

impl ReferenceKinds {
    /// All patterns enabled.
    pub fn all() -> Self {
        Self {
            direct_ids: true,
            rules: true,
            constants: true,
            types: true,
        }
    }

    /// All patterns disabled.
    pub fn none() -> Self {
        Self {
            direct_ids: false,
            rules: false,
            constants: false,
            types: false,
        }
    }
}

impl Default for ReferenceKinds {
    fn default() -> Self {
        Self::all()
    }
}

/// Reconciliation policy version 1.
///
/// ## Parameters
///
/// - `content_equality_downgrade`: downgrade CONFLICT to NO_CONFLICT when
///   both sides produced identical content
/// - `reference_kinds`: reference patterns scanned in code
/// - `scan_business_logic`: scan business logic as well as code
/// - `record_relationships`: add relationship and field-type edges for
///   record-like objects
/// - `max_listed_items`: how many names a description quotes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePolicyV1 {
    /// Policy version identifier.
    pub version: String,
    /// Downgrade converged conflicts.
    pub content_equality_downgrade: bool,
    /// Reference patterns to scan.
    pub reference_kinds: ReferenceKinds,
    /// Scan business logic for references.
    pub scan_business_logic: bool,
    /// Relationship and field-type edges for record-like objects.
    pub record_relationships: bool,
    /// Maximum names quoted in a description.
    pub max_listed_items: usize,
}

impl ReconcilePolicyV1 {
    /// Get the policy ID.
    pub fn policy_id(&self) -> &str {
        &self.version
    }

    /// Compute a hash of the policy parameters.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(self)
    }

    /// Policy that reports raw four-way classification without downgrades.
    pub fn without_downgrade() -> Self {
        Self {
            content_equality_downgrade: false,
            ..Self::default()
        }
    }
}

impl Default for ReconcilePolicyV1 {
    fn default() -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            content_equality_downgrade: true,
            reference_kinds: ReferenceKinds::all(),
            scan_business_logic: true,
            record_relationships: true,
            max_listed_items: 10,
        }
    }
}
