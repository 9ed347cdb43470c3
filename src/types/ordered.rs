//! Ordered working-set entries.

use serde::{Deserialize, Serialize};

use super::classified::{Classification, ClassifiedChange};
use super::guidance::Guidance;
use super::snapshot::{ObjectId, ObjectType};

/// A resolved dependency of a working-set entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRef {
    /// Referenced object.
    pub id: ObjectId,
    /// Referenced object's name (identifier when unknown).
    pub name: String,
    /// Referenced object's kind.
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    /// Whether the referenced object is itself in the working set.
    pub in_working_set: bool,
    /// Its display order when in the working set.
    pub display_order: Option<usize>,
}

/// Parents (objects this one depends on) and children (objects depending on it).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDependencies {
    /// Objects this entry references, sorted by id.
    pub parents: Vec<DependencyRef>,
    /// Objects referencing this entry, sorted by id.
    pub children: Vec<DependencyRef>,
}

/// A classified change placed in review order with guidance.
///
/// The final output unit: one per reviewed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderedChange {
    /// The classified change.
    #[serde(flatten)]
    pub change: ClassifiedChange,
    /// 0-based, dense, unique review position.
    pub display_order: usize,
    /// Resolved dependencies.
    pub dependencies: ResolvedDependencies,
    /// Resolution guidance.
    pub guidance: Guidance,
}

impl OrderedChange {
    /// Object identifier.
    pub fn id(&self) -> &ObjectId {
        &self.change.id
    }

    /// Classification.
    pub fn classification(&self) -> Classification {
        self.change.classification
    }
}
