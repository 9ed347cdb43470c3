//! Change-set types produced by the package comparison step.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::snapshot::{FieldDef, ObjectId, ObjectSnapshot, ObjectType};
use crate::content::{digest_bytes, normalize_text};

/// Kind of change recorded in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    /// Object exists only after the change.
    Added,
    /// Object exists on both sides with different content.
    Modified,
    /// Object exists only before the change.
    Removed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "ADDED"),
            Self::Modified => write!(f, "MODIFIED"),
            Self::Removed => write!(f, "REMOVED"),
        }
    }
}

/// Which diff a change-set was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSide {
    /// Base → new vendor (A→C).
    Vendor,
    /// Base → customer (A→B).
    Customer,
}

impl fmt::Display for ChangeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vendor => write!(f, "vendor"),
            Self::Customer => write!(f, "customer"),
        }
    }
}

/// Resulting ("after") content of a change.
///
/// Removed objects carry an empty detail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentDetail {
    /// Code after the change.
    #[serde(default)]
    pub code: Option<String>,
    /// Fields after the change.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Properties after the change.
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    /// Business logic after the change.
    #[serde(default)]
    pub business_logic: Option<String>,
}

impl ContentDetail {
    /// Content detail of a snapshot.
    pub fn from_snapshot(snapshot: &ObjectSnapshot) -> Self {
        Self {
            code: snapshot.code.clone(),
            fields: snapshot.fields.clone(),
            properties: snapshot.properties.clone(),
            business_logic: snapshot.business_logic.clone(),
        }
    }

    /// Whether no facet carries content.
    pub fn is_empty(&self) -> bool {
        self.code.is_none()
            && self.fields.is_empty()
            && self.properties.is_empty()
            && self.business_logic.is_none()
    }

    /// Exact content equality over code, fields and properties.
    ///
    /// This is the comparison behind the convergence downgrade: code is
    /// compared byte-for-byte, fields in declaration order, properties by
    /// key and value. Business logic is not part of the resulting content
    /// the comparison collaborator reports.
    pub fn content_equals(&self, other: &ContentDetail) -> bool {
        self.code == other.code && self.fields == other.fields && self.properties == other.properties
    }

    /// SHA-256 digest of the canonical content, as lowercase hex.
    pub fn digest(&self) -> String {
        #[derive(Serialize)]
        struct Canonical<'a> {
            code: Option<String>,
            fields: &'a [FieldDef],
            properties: &'a BTreeMap<String, serde_json::Value>,
        }

        let canonical = Canonical {
            code: self.code.as_deref().map(normalize_text),
            fields: &self.fields,
            properties: &self.properties,
        };
        digest_bytes(&crate::canonical::to_canonical_bytes(&canonical))
    }
}

/// One entry of a diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Object identifier.
    pub id: ObjectId,
    /// Object name on the "after" side (or "before" side for removals).
    pub name: String,
    /// Object kind.
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    /// Resulting content.
    #[serde(default)]
    pub after: ContentDetail,
}

impl ChangeEntry {
    /// Create an entry with empty "after" content.
    pub fn new(id: impl Into<ObjectId>, name: impl Into<String>, object_type: ObjectType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            object_type,
            after: ContentDetail::default(),
        }
    }

    /// Create an entry whose "after" content is taken from a snapshot.
    pub fn from_snapshot(snapshot: &ObjectSnapshot) -> Self {
        Self {
            id: snapshot.id.clone(),
            name: snapshot.name.clone(),
            object_type: snapshot.object_type,
            after: ContentDetail::from_snapshot(snapshot),
        }
    }

    /// Set the resulting code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.after.code = Some(code.into());
        self
    }

    /// Set the resulting content.
    pub fn with_after(mut self, after: ContentDetail) -> Self {
        self.after = after;
        self
    }
}

/// A diff between two package versions: added, modified and removed objects.
///
/// Invariant: an identifier appears in at most one of the three collections
/// (checked by [`ChangeSet::validate`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Objects added.
    #[serde(default)]
    pub added: Vec<ChangeEntry>,
    /// Objects modified.
    #[serde(default)]
    pub modified: Vec<ChangeEntry>,
    /// Objects removed.
    #[serde(default)]
    pub removed: Vec<ChangeEntry>,
}

/// Base → new vendor diff.
pub type VendorChangeSet = ChangeSet;
/// Base → customer diff.
pub type CustomerChangeSet = ChangeSet;

impl ChangeSet {
    /// Create an empty change-set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry to the `added` collection.
    pub fn with_added(mut self, entry: ChangeEntry) -> Self {
        self.added.push(entry);
        self
    }

    /// Add an entry to the `modified` collection.
    pub fn with_modified(mut self, entry: ChangeEntry) -> Self {
        self.modified.push(entry);
        self
    }

    /// Add an entry to the `removed` collection.
    pub fn with_removed(mut self, entry: ChangeEntry) -> Self {
        self.removed.push(entry);
        self
    }

    /// Total entries across all collections.
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    /// Whether the change-set has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate all entries with their change kind.
    pub fn entries(&self) -> impl Iterator<Item = (ChangeKind, &ChangeEntry)> {
        self.added
            .iter()
            .map(|e| (ChangeKind::Added, e))
            .chain(self.modified.iter().map(|e| (ChangeKind::Modified, e)))
            .chain(self.removed.iter().map(|e| (ChangeKind::Removed, e)))
    }

    /// Check that no identifier appears twice.
    ///
    /// Returns the first duplicated identifier (in collection order).
    pub fn validate(&self) -> Result<(), ObjectId> {
        let mut seen: BTreeSet<&ObjectId> = BTreeSet::new();
        for (_, entry) in self.entries() {
            if !seen.insert(&entry.id) {
                return Err(entry.id.clone());
            }
        }
        Ok(())
    }

    /// Build an identifier lookup over all entries.
    pub fn index(&self) -> ChangeIndex<'_> {
        ChangeIndex {
            entries: self.entries().map(|(kind, e)| (&e.id, (kind, e))).collect(),
        }
    }
}

/// Identifier lookup over one change-set.
#[derive(Debug, Clone, Default)]
pub struct ChangeIndex<'a> {
    entries: BTreeMap<&'a ObjectId, (ChangeKind, &'a ChangeEntry)>,
}

impl<'a> ChangeIndex<'a> {
    /// Change kind and entry for an identifier.
    pub fn get(&self, id: &ObjectId) -> Option<(ChangeKind, &'a ChangeEntry)> {
        self.entries.get(id).copied()
    }

    /// Whether the identifier was changed at all.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.entries.contains_key(id)
    }

    /// All identifiers, in order.
    pub fn ids(&self) -> impl Iterator<Item = &'a ObjectId> + '_ {
        self.entries.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_duplicates() {
        let set = ChangeSet::new()
            .with_added(ChangeEntry::new("X", "Foo", ObjectType::Interface))
            .with_removed(ChangeEntry::new("X", "Foo", ObjectType::Interface));
        assert_eq!(set.validate(), Err(ObjectId::new("X")));
    }

    #[test]
    fn test_index_lookup() {
        let set = ChangeSet::new()
            .with_modified(ChangeEntry::new("X", "Foo", ObjectType::Interface))
            .with_removed(ChangeEntry::new("Y", "Bar", ObjectType::Constant));
        assert!(set.validate().is_ok());

        let index = set.index();
        assert_eq!(index.get(&ObjectId::new("X")).map(|(k, _)| k), Some(ChangeKind::Modified));
        assert_eq!(index.get(&ObjectId::new("Y")).map(|(k, e)| (k, e.name.as_str())), Some((ChangeKind::Removed, "Bar")));
        assert!(!index.contains(&ObjectId::new("Z")));
        assert_eq!(index.ids().count(), 2);
    }

    #[test]
    fn test_content_equality() {
        let a = ContentDetail {
            code: Some("same".to_string()),
            ..Default::default()
        };
        let b = a.clone();
        let mut c = a.clone();
        c.properties.insert("k".to_string(), serde_json::json!(1));

        assert!(a.content_equals(&b));
        assert!(!a.content_equals(&c));
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
    }

    #[test]
    fn test_field_order_matters_for_equality() {
        let a = ContentDetail {
            fields: vec![FieldDef::new("a", "Text"), FieldDef::new("b", "Number")],
            ..Default::default()
        };
        let b = ContentDetail {
            fields: vec![FieldDef::new("b", "Number"), FieldDef::new("a", "Text")],
            ..Default::default()
        };
        assert!(!a.content_equals(&b));
    }

    #[test]
    fn test_change_kind_serde() {
        assert_eq!(serde_json::to_string(&ChangeKind::Modified).unwrap(), "\"MODIFIED\"");
    }
}
