//! Classification outcome types.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::change::{ChangeKind, ContentDetail};
use super::snapshot::{ObjectId, ObjectType};

/// Outcome category of a changed object.
///
/// Declaration order is the review order of the buckets
/// (customer-only changes are never reviewed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// Vendor-only change, or both sides converged on identical content.
    NoConflict,
    /// Both sides changed the object and the results diverge.
    Conflict,
    /// Only the customer changed the object.
    CustomerOnly,
    /// Vendor removed an object the customer modified.
    RemovedButCustomized,
}

impl Classification {
    /// All classifications, in bucket order.
    pub const ALL: [Classification; 4] = [
        Self::NoConflict,
        Self::Conflict,
        Self::CustomerOnly,
        Self::RemovedButCustomized,
    ];

    /// Parse a classification from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "NO_CONFLICT" => Some(Self::NoConflict),
            "CONFLICT" => Some(Self::Conflict),
            "CUSTOMER_ONLY" => Some(Self::CustomerOnly),
            "REMOVED_BUT_CUSTOMIZED" => Some(Self::RemovedButCustomized),
            _ => None,
        }
    }

    /// Whether entries of this classification appear in the review working set.
    pub fn is_reviewed(&self) -> bool {
        !matches!(self, Self::CustomerOnly)
    }

    /// Whether the customer's label takes precedence for this classification.
    pub fn prefers_customer_label(&self) -> bool {
        matches!(
            self,
            Self::Conflict | Self::CustomerOnly | Self::RemovedButCustomized
        )
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoConflict => write!(f, "NO_CONFLICT"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::CustomerOnly => write!(f, "CUSTOMER_ONLY"),
            Self::RemovedButCustomized => write!(f, "REMOVED_BUT_CUSTOMIZED"),
        }
    }
}

/// A changed object with its classification.
///
/// Created once per run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedChange {
    /// Object identifier.
    pub id: ObjectId,
    /// Outcome category.
    pub classification: Classification,
    /// Display name.
    pub name: String,
    /// Object kind.
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    /// Change kind in the vendor diff, if any.
    pub vendor_change: Option<ChangeKind>,
    /// Change kind in the customer diff, if any.
    pub customer_change: Option<ChangeKind>,
    /// Vendor "after" content.
    pub vendor_detail: Option<ContentDetail>,
    /// Customer "after" content.
    pub customer_detail: Option<ContentDetail>,
    /// Both sides changed the object but produced identical content.
    #[serde(default)]
    pub converged: bool,
}

impl ClassifiedChange {
    /// Whether both sides changed this object.
    pub fn changed_by_both(&self) -> bool {
        self.vendor_change.is_some() && self.customer_change.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_parsing() {
        assert_eq!(Classification::from_str("conflict"), Some(Classification::Conflict));
        assert_eq!(
            Classification::from_str("REMOVED_BUT_CUSTOMIZED"),
            Some(Classification::RemovedButCustomized)
        );
        assert_eq!(Classification::from_str("bogus"), None);
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for c in Classification::ALL {
            assert_eq!(Classification::from_str(&c.to_string()), Some(c));
        }
    }

    #[test]
    fn test_label_preference() {
        assert!(!Classification::NoConflict.prefers_customer_label());
        assert!(Classification::Conflict.prefers_customer_label());
        assert!(!Classification::CustomerOnly.is_reviewed());
    }
}
