//! Facet-level set differences.
//!
//! Every comparison is a set subtraction or intersection over lines, field
//! names or property keys. Results never depend on the order of lines,
//! fields or properties in the snapshots.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::content::optional_line_set;
use crate::types::{ConflictSection, Facet, FacetChange, FieldDef, ObjectSnapshot};

/// Facets compared as line sets.
pub const TEXT_FACETS: [Facet; 2] = [Facet::Code, Facet::BusinessLogic];

fn text_of(snapshot: &ObjectSnapshot, facet: Facet) -> Option<&str> {
    match facet {
        Facet::Code => snapshot.code.as_deref(),
        Facet::BusinessLogic => snapshot.business_logic.as_deref(),
        Facet::Fields | Facet::Properties => None,
    }
}

/// Canonical line set of a text facet; empty for structured facets.
pub fn lines_of(snapshot: &ObjectSnapshot, facet: Facet) -> BTreeSet<String> {
    optional_line_set(text_of(snapshot, facet))
}

/// Fields keyed by name.
pub fn field_map(snapshot: &ObjectSnapshot) -> BTreeMap<&str, &FieldDef> {
    snapshot.fields.iter().map(|f| (f.name.as_str(), f)).collect()
}

/// Properties keyed by key.
pub fn property_map(snapshot: &ObjectSnapshot) -> BTreeMap<&str, &Value> {
    snapshot.properties.iter().map(|(k, v)| (k.as_str(), v)).collect()
}

/// Added and removed lines between two line sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineDelta {
    /// Lines only in `after`.
    pub added: BTreeSet<String>,
    /// Lines only in `before`.
    pub removed: BTreeSet<String>,
}

impl LineDelta {
    /// Compute the delta from `before` to `after`.
    pub fn between(before: &BTreeSet<String>, after: &BTreeSet<String>) -> Self {
        Self {
            added: after.difference(before).cloned().collect(),
            removed: before.difference(after).cloned().collect(),
        }
    }

    /// Whether the line sets are equal.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Added, removed and changed keys between two keyed maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyDelta {
    /// Keys only in `after`.
    pub added: BTreeSet<String>,
    /// Keys only in `before`.
    pub removed: BTreeSet<String>,
    /// Keys in both with different values.
    pub changed: BTreeSet<String>,
}

impl KeyDelta {
    /// Compute the delta from `before` to `after`.
    pub fn between<V: PartialEq>(before: &BTreeMap<&str, V>, after: &BTreeMap<&str, V>) -> Self {
        let mut delta = Self::default();
        for (key, value) in after {
            match before.get(key) {
                None => {
                    delta.added.insert(key.to_string());
                }
                Some(old) if old != value => {
                    delta.changed.insert(key.to_string());
                }
                Some(_) => {}
            }
        }
        for key in before.keys() {
            if !after.contains_key(key) {
                delta.removed.insert(key.to_string());
            }
        }
        delta
    }

    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Every key touched by the delta, sorted.
    pub fn touched(&self) -> Vec<String> {
        let all: BTreeSet<&String> = self
            .added
            .iter()
            .chain(&self.removed)
            .chain(&self.changed)
            .collect();
        all.into_iter().cloned().collect()
    }
}

/// Join items for a description, listing at most `limit` of them.
pub fn describe_items(items: &[String], limit: usize) -> String {
    let limit = limit.max(1);
    if items.len() <= limit {
        items.join(", ")
    } else {
        format!("{} (+{} more)", items[..limit].join(", "), items.len() - limit)
    }
}

/// Keys both sides moved away from base, to different results.
///
/// Covers both sides changing a key differently, one side removing what
/// the other changed, and both adding the same key with different values.
fn conflicting_keys<V: PartialEq>(
    base: &BTreeMap<&str, V>,
    customer: &BTreeMap<&str, V>,
    vendor: &BTreeMap<&str, V>,
) -> Vec<String> {
    let keys: BTreeSet<&str> = base
        .keys()
        .chain(customer.keys())
        .chain(vendor.keys())
        .copied()
        .collect();

    keys.into_iter()
        .filter(|key| {
            let b = base.get(key);
            let c = customer.get(key);
            let v = vendor.get(key);
            v != b && c != b && v != c
        })
        .map(str::to_string)
        .collect()
}

fn keys_only_in<V>(vendor: &BTreeMap<&str, V>, base: &BTreeMap<&str, V>, customer: &BTreeMap<&str, V>) -> Vec<String> {
    vendor
        .keys()
        .filter(|k| !base.contains_key(*k) && !customer.contains_key(*k))
        .map(|k| k.to_string())
        .collect()
}

/// `before` → `after` deltas, one entry per changed facet.
pub fn modifications(before: &ObjectSnapshot, after: &ObjectSnapshot, limit: usize) -> Vec<FacetChange> {
    let mut changes = Vec::new();

    for facet in TEXT_FACETS {
        let delta = LineDelta::between(&lines_of(before, facet), &lines_of(after, facet));
        if delta.is_empty() {
            continue;
        }
        let description = format!(
            "{}: {} line(s) added, {} line(s) removed",
            facet,
            delta.added.len(),
            delta.removed.len()
        );
        let items = delta
            .added
            .iter()
            .map(|l| format!("+ {l}"))
            .chain(delta.removed.iter().map(|l| format!("- {l}")))
            .collect();
        changes.push(FacetChange { facet, description, items });
    }

    let fields = KeyDelta::between(&field_map(before), &field_map(after));
    if !fields.is_empty() {
        let items = fields.touched();
        changes.push(FacetChange {
            facet: Facet::Fields,
            description: format!("Fields changed: {}", describe_items(&items, limit)),
            items,
        });
    }

    let properties = KeyDelta::between(&property_map(before), &property_map(after));
    if !properties.is_empty() {
        let items = properties.touched();
        changes.push(FacetChange {
            facet: Facet::Properties,
            description: format!("Properties changed: {}", describe_items(&items, limit)),
            items,
        });
    }

    changes
}

/// Content present in the vendor version but in neither base nor customer.
pub fn vendor_additions(
    base: &ObjectSnapshot,
    customer: &ObjectSnapshot,
    vendor: &ObjectSnapshot,
    limit: usize,
) -> Vec<FacetChange> {
    let mut additions = Vec::new();

    for facet in TEXT_FACETS {
        let known: BTreeSet<String> = lines_of(base, facet)
            .union(&lines_of(customer, facet))
            .cloned()
            .collect();
        let items: Vec<String> = lines_of(vendor, facet).difference(&known).cloned().collect();
        if !items.is_empty() {
            additions.push(FacetChange {
                facet,
                description: format!("{}: {} line(s) present only in the vendor version", facet, items.len()),
                items,
            });
        }
    }

    let items = keys_only_in(&field_map(vendor), &field_map(base), &field_map(customer));
    if !items.is_empty() {
        additions.push(FacetChange {
            facet: Facet::Fields,
            description: format!("Fields added by the vendor: {}", describe_items(&items, limit)),
            items,
        });
    }

    let items = keys_only_in(&property_map(vendor), &property_map(base), &property_map(customer));
    if !items.is_empty() {
        additions.push(FacetChange {
            facet: Facet::Properties,
            description: format!("Properties added by the vendor: {}", describe_items(&items, limit)),
            items,
        });
    }

    additions
}

/// Facets where vendor and customer diverged from base incompatibly.
///
/// Text facets conflict on lines both sides added, and on lines both
/// sides dropped when their replacements differ. Fields and properties
/// conflict per name/key (see `conflicting_keys`).
pub fn conflict_sections(
    base: &ObjectSnapshot,
    customer: &ObjectSnapshot,
    vendor: &ObjectSnapshot,
    limit: usize,
) -> Vec<ConflictSection> {
    let mut sections = Vec::new();

    for facet in TEXT_FACETS {
        let base_lines = lines_of(base, facet);
        let vendor_delta = LineDelta::between(&base_lines, &lines_of(vendor, facet));
        let customer_delta = LineDelta::between(&base_lines, &lines_of(customer, facet));

        let mut items: BTreeSet<String> = vendor_delta
            .added
            .intersection(&customer_delta.added)
            .cloned()
            .collect();
        if vendor_delta.added != customer_delta.added {
            items.extend(vendor_delta.removed.intersection(&customer_delta.removed).cloned());
        }

        if !items.is_empty() {
            sections.push(ConflictSection {
                facet,
                description: format!("{}: {} line(s) changed by both vendor and customer", facet, items.len()),
                items: items.into_iter().collect(),
            });
        }
    }

    let items = conflicting_keys(&field_map(base), &field_map(customer), &field_map(vendor));
    if !items.is_empty() {
        sections.push(ConflictSection {
            facet: Facet::Fields,
            description: format!(
                "Fields changed differently by vendor and customer: {}",
                describe_items(&items, limit)
            ),
            items,
        });
    }

    let items = conflicting_keys(&property_map(base), &property_map(customer), &property_map(vendor));
    if !items.is_empty() {
        sections.push(ConflictSection {
            facet: Facet::Properties,
            description: format!(
                "Properties changed differently by vendor and customer: {}",
                describe_items(&items, limit)
            ),
            items,
        });
    }

    sections
}
