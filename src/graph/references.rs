//! Reference extraction from expression text.
//!
//! The [`ReferenceExtractor`] trait is the seam between the dependency
//! graph and whatever understands the expression language. The default
//! [`PatternReferenceExtractor`] is string-pattern based and
//! under-approximates: anything it cannot resolve is reported, not guessed.

use regex_lite::Regex;
use std::collections::{BTreeMap, BTreeSet};

use crate::policy::ReferenceKinds;
use crate::types::{ObjectId, SnapshotMap};

/// Name → identifier index over one snapshot map.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    by_name: BTreeMap<String, ObjectId>,
    ids: BTreeSet<ObjectId>,
}

impl NameIndex {
    /// Build the index once over a snapshot map.
    ///
    /// When two objects share a name, the smallest identifier wins.
    pub fn build(snapshots: &SnapshotMap) -> Self {
        let mut index = Self::default();
        // BTreeMap iteration is by id, so the first insert is the smallest id.
        for (id, snapshot) in snapshots {
            index.ids.insert(id.clone());
            if let Some(existing) = index.by_name.get(&snapshot.name) {
                tracing::debug!(
                    name = %snapshot.name,
                    kept = %existing,
                    ignored = %id,
                    "duplicate object name in package"
                );
                continue;
            }
            index.by_name.insert(snapshot.name.clone(), id.clone());
        }
        index
    }

    /// Resolve an object name.
    pub fn resolve_name(&self, name: &str) -> Option<&ObjectId> {
        self.by_name.get(name)
    }

    /// Resolve a token that is either a known identifier or a known name.
    pub fn resolve(&self, token: &str) -> Option<ObjectId> {
        let id = ObjectId::new(token);
        if self.ids.contains(&id) {
            return Some(id);
        }
        self.resolve_name(token).cloned()
    }

    /// Whether an identifier is known.
    pub fn contains_id(&self, id: &ObjectId) -> bool {
        self.ids.contains(id)
    }

    /// Number of indexed objects.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// References found in one text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedReferences {
    /// Identifiers the references resolved to.
    pub resolved: BTreeSet<ObjectId>,
    /// Matched references that resolved to nothing.
    pub unresolved: BTreeSet<String>,
}

impl ExtractedReferences {
    /// Merge another extraction into this one.
    pub fn extend(&mut self, other: ExtractedReferences) {
        self.resolved.extend(other.resolved);
        self.unresolved.extend(other.unresolved);
    }
}

/// Extracts object references from expression text.
pub trait ReferenceExtractor: Send + Sync {
    /// Find and resolve all references in `text`.
    fn extract_references(&self, text: &str, index: &NameIndex) -> ExtractedReferences;
}

/// Identifier citation: optional `_x-` prefix, UUID body, optional `_N` suffix.
const DIRECT_ID_PATTERN: &str =
    r"(?:_[a-z]-)?[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}(?:_[0-9]+)?";
const RULE_PATTERN: &str = r"\brule!([A-Za-z_][A-Za-z0-9_]*)";
const CONSTANT_PATTERN: &str = r"\bcons!([A-Za-z_][A-Za-z0-9_]*)";
const TYPE_PATTERN: &str = r"\b(?:type|recordType)!(?:\{[^}]*\})?([A-Za-z_][A-Za-z0-9_]*)";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("reference pattern is a valid regex")
}

/// Regex-based extractor for direct ids, rules, constants and types.
#[derive(Debug, Clone)]
pub struct PatternReferenceExtractor {
    kinds: ReferenceKinds,
    direct_id: Regex,
    rule: Regex,
    constant: Regex,
    type_ref: Regex,
}

impl PatternReferenceExtractor {
    /// Create an extractor for the enabled reference kinds.
    pub fn new(kinds: ReferenceKinds) -> Self {
        Self {
            kinds,
            direct_id: compile(DIRECT_ID_PATTERN),
            rule: compile(RULE_PATTERN),
            constant: compile(CONSTANT_PATTERN),
            type_ref: compile(TYPE_PATTERN),
        }
    }

    fn collect_named(&self, re: &Regex, prefix: &str, text: &str, index: &NameIndex, out: &mut ExtractedReferences) {
        for caps in re.captures_iter(text) {
            let Some(name) = caps.get(1) else { continue };
            match index.resolve_name(name.as_str()) {
                Some(id) => {
                    out.resolved.insert(id.clone());
                }
                None => {
                    out.unresolved.insert(format!("{}!{}", prefix, name.as_str()));
                }
            }
        }
    }
}

impl Default for PatternReferenceExtractor {
    fn default() -> Self {
        Self::new(ReferenceKinds::all())
    }
}

impl ReferenceExtractor for PatternReferenceExtractor {
    fn extract_references(&self, text: &str, index: &NameIndex) -> ExtractedReferences {
        let mut out = ExtractedReferences::default();

        if self.kinds.direct_ids {
            for m in self.direct_id.find_iter(text) {
                let id = ObjectId::new(m.as_str());
                if index.contains_id(&id) {
                    out.resolved.insert(id);
                } else {
                    out.unresolved.insert(m.as_str().to_string());
                }
            }
        }
        if self.kinds.rules {
            self.collect_named(&self.rule, "rule", text, index, &mut out);
        }
        if self.kinds.constants {
            self.collect_named(&self.constant, "cons", text, index, &mut out);
        }
        if self.kinds.types {
            self.collect_named(&self.type_ref, "type", text, index, &mut out);
        }

        out
    }
}
