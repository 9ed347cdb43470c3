//! Sort keys for the review buckets that are not topologically ordered.

use std::cmp::Ordering;

use crate::types::{ClassifiedChange, ObjectId, ObjectType};

/// Sort key for NO_CONFLICT changes: type, then name, then id.
///
/// Types compare by display name, so groups come out lexicographically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeGroupKey<'a> {
    /// Object kind.
    pub object_type: ObjectType,
    /// Object name.
    pub name: &'a str,
    /// Tie-breaker.
    pub id: &'a ObjectId,
}

impl<'a> TypeGroupKey<'a> {
    /// Key for a classified change.
    pub fn of(change: &'a ClassifiedChange) -> Self {
        Self {
            object_type: change.object_type,
            name: &change.name,
            id: &change.id,
        }
    }
}

impl PartialOrd for TypeGroupKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeGroupKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.object_type
            .cmp(&other.object_type)
            .then_with(|| self.name.cmp(other.name))
            .then_with(|| self.id.cmp(other.id))
    }
}

/// Sort key for REMOVED_BUT_CUSTOMIZED changes: name, then id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NameKey<'a> {
    /// Object name.
    pub name: &'a str,
    /// Tie-breaker.
    pub id: &'a ObjectId,
}

impl<'a> NameKey<'a> {
    /// Key for a classified change.
    pub fn of(change: &'a ClassifiedChange) -> Self {
        Self {
            name: &change.name,
            id: &change.id,
        }
    }
}

/// Sort NO_CONFLICT changes into type groups.
pub fn sort_by_type_group(changes: &mut [&ClassifiedChange]) {
    changes.sort_by(|a, b| TypeGroupKey::of(a).cmp(&TypeGroupKey::of(b)));
}

/// Sort changes by name.
pub fn sort_by_name(changes: &mut [&ClassifiedChange]) {
    changes.sort_by(|a, b| NameKey::of(a).cmp(&NameKey::of(b)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Classification;

    fn change(id: &str, name: &str, object_type: ObjectType) -> ClassifiedChange {
        ClassifiedChange {
            id: ObjectId::new(id),
            classification: Classification::NoConflict,
            name: name.to_string(),
            object_type,
            vendor_change: None,
            customer_change: None,
            vendor_detail: None,
            customer_detail: None,
            converged: false,
        }
    }

    #[test]
    fn test_type_groups_sort_lexicographically() {
        let a = change("1", "Zeta", ObjectType::Constant);
        let b = change("2", "Alpha", ObjectType::Interface);
        let c = change("3", "Alpha", ObjectType::Constant);
        let d = change("4", "Beta", ObjectType::ConnectedSystem);

        let mut changes = vec![&a, &b, &c, &d];
        sort_by_type_group(&mut changes);

        let ids: Vec<&str> = changes.iter().map(|c| c.id.as_str()).collect();
        // Connected System < Constant < Interface
        assert_eq!(ids, vec!["4", "3", "1", "2"]);
    }

    #[test]
    fn test_name_sort_breaks_ties_by_id() {
        let a = change("b", "Same", ObjectType::Site);
        let b = change("a", "Same", ObjectType::Group);
        let c = change("c", "Other", ObjectType::Group);

        let mut changes = vec![&a, &b, &c];
        sort_by_name(&mut changes);

        let ids: Vec<&str> = changes.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
