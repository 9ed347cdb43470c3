//! Object snapshot types for the reconciliation engine.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Stable identifier of a package object.
///
/// Package identifiers look like UUIDs but are not always RFC 4122
/// (e.g. `_a-0000e6a2-...`), so the raw string is kept.
/// Implements `Ord` for deterministic ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Create a new ObjectId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for ObjectId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Kind of package object.
///
/// `Ord` follows the display name so that grouping by type sorts
/// lexicographically. Serializes as the display name; deserializes through
/// [`ObjectType::parse`], so unrecognized kinds become `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// User interface definition.
    Interface,
    /// Process model.
    ProcessModel,
    /// Record type.
    RecordType,
    /// Expression rule.
    ExpressionRule,
    /// Constant.
    Constant,
    /// Integration.
    Integration,
    /// Web API.
    WebApi,
    /// Site.
    Site,
    /// Group.
    Group,
    /// Connected system.
    ConnectedSystem,
    /// Custom data type.
    CustomDataType,
    /// Unrecognized kind.
    Unknown,
}

impl ObjectType {
    /// All object types, in declaration order.
    pub const ALL: [ObjectType; 12] = [
        Self::Interface,
        Self::ProcessModel,
        Self::RecordType,
        Self::ExpressionRule,
        Self::Constant,
        Self::Integration,
        Self::WebApi,
        Self::Site,
        Self::Group,
        Self::ConnectedSystem,
        Self::CustomDataType,
        Self::Unknown,
    ];

    /// Display name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interface => "Interface",
            Self::ProcessModel => "Process Model",
            Self::RecordType => "Record Type",
            Self::ExpressionRule => "Expression Rule",
            Self::Constant => "Constant",
            Self::Integration => "Integration",
            Self::WebApi => "Web API",
            Self::Site => "Site",
            Self::Group => "Group",
            Self::ConnectedSystem => "Connected System",
            Self::CustomDataType => "Custom Data Type",
            Self::Unknown => "Unknown",
        }
    }

    /// Parse an object type from string.
    ///
    /// Accepts display names, snake_case and compact spellings in any case.
    /// Anything unrecognized is `Unknown`.
    pub fn parse(s: &str) -> Self {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match compact.as_str() {
            "interface" => Self::Interface,
            "processmodel" => Self::ProcessModel,
            "recordtype" => Self::RecordType,
            "expressionrule" | "rule" => Self::ExpressionRule,
            "constant" => Self::Constant,
            "integration" => Self::Integration,
            "webapi" => Self::WebApi,
            "site" => Self::Site,
            "group" => Self::Group,
            "connectedsystem" => Self::ConnectedSystem,
            "customdatatype" | "datatype" | "cdt" => Self::CustomDataType,
            _ => Self::Unknown,
        }
    }

    /// Whether the object declares structured fields and relationships.
    pub fn is_record_like(&self) -> bool {
        matches!(self, Self::RecordType | Self::CustomDataType)
    }
}

impl Default for ObjectType {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ObjectType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ObjectType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

impl PartialOrd for ObjectType {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ObjectType {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

/// A declared field of a structured object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Declared type annotation (may name another object).
    #[serde(rename = "type")]
    pub field_type: String,
    /// Flags such as `required`, `list`, `primaryKey`.
    #[serde(default)]
    pub flags: Vec<String>,
}

impl FieldDef {
    /// Create a new field definition without flags.
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            flags: Vec::new(),
        }
    }

    /// Add a flag.
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// Referenced type name with namespace and list decorations stripped.
    ///
    /// `{urn:com:acme}Customer?list` and `Customer[]` both yield `Customer`.
    pub fn referenced_type_name(&self) -> &str {
        let t = self.field_type.trim();
        let t = t.rsplit_once('}').map_or(t, |(_, rest)| rest);
        let t = t.split('?').next().unwrap_or(t);
        t.trim_end_matches("[]").trim()
    }
}

/// A declared relationship of a record-like object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Relationship name.
    pub name: String,
    /// Target object name or identifier.
    pub target: String,
}

impl Relationship {
    /// Create a new relationship.
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
        }
    }
}

/// Snapshot of one object within one package version.
///
/// Immutable once produced by extraction. Ordered by ObjectId.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    /// Stable identifier.
    pub id: ObjectId,
    /// Object name.
    pub name: String,
    /// Object kind.
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    /// Expression/logic payload.
    #[serde(default)]
    pub code: Option<String>,
    /// Declared fields, in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Property map.
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    /// Business logic payload.
    #[serde(default)]
    pub business_logic: Option<String>,
    /// Declared relationships (record-like objects).
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl ObjectSnapshot {
    /// Create an empty snapshot of the given kind.
    pub fn new(id: impl Into<ObjectId>, name: impl Into<String>, object_type: ObjectType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            object_type,
            code: None,
            fields: Vec::new(),
            properties: BTreeMap::new(),
            business_logic: None,
            relationships: Vec::new(),
        }
    }

    /// Set the code payload.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Set the business logic payload.
    pub fn with_business_logic(mut self, logic: impl Into<String>) -> Self {
        self.business_logic = Some(logic.into());
        self
    }

    /// Append a field.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Set a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Append a relationship.
    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }
}

/// Snapshots of one package version keyed by identifier.
pub type SnapshotMap = BTreeMap<ObjectId, ObjectSnapshot>;

/// Which of the three package versions a snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageVersion {
    /// Base version (A).
    Base,
    /// Customer-modified version (B).
    Customer,
    /// New vendor version (C).
    Vendor,
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::Customer => write!(f, "customer"),
            Self::Vendor => write!(f, "vendor"),
        }
    }
}

/// The three package versions' snapshot maps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageSnapshots {
    /// Base package (A).
    pub base: SnapshotMap,
    /// Customer package (B).
    pub customer: SnapshotMap,
    /// Vendor package (C), treated as most complete.
    pub vendor: SnapshotMap,
}

impl PackageSnapshots {
    /// Create empty package snapshots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a snapshot into the given package version.
    pub fn insert(&mut self, version: PackageVersion, snapshot: ObjectSnapshot) {
        let map = match version {
            PackageVersion::Base => &mut self.base,
            PackageVersion::Customer => &mut self.customer,
            PackageVersion::Vendor => &mut self.vendor,
        };
        map.insert(snapshot.id.clone(), snapshot);
    }

    /// The three snapshots of one object.
    pub fn triple(&self, id: &ObjectId) -> SnapshotTriple<'_> {
        SnapshotTriple {
            base: self.base.get(id),
            customer: self.customer.get(id),
            vendor: self.vendor.get(id),
        }
    }

    /// Best known label for an object: vendor first, then customer, then base.
    pub fn label(&self, id: &ObjectId) -> Option<(&str, ObjectType)> {
        self.vendor
            .get(id)
            .or_else(|| self.customer.get(id))
            .or_else(|| self.base.get(id))
            .map(|s| (s.name.as_str(), s.object_type))
    }
}

/// Borrowed base/customer/vendor snapshots of one object; any may be absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotTriple<'a> {
    /// Base snapshot.
    pub base: Option<&'a ObjectSnapshot>,
    /// Customer snapshot.
    pub customer: Option<&'a ObjectSnapshot>,
    /// Vendor snapshot.
    pub vendor: Option<&'a ObjectSnapshot>,
}

impl<'a> SnapshotTriple<'a> {
    /// Package versions with no snapshot.
    pub fn missing(&self) -> Vec<PackageVersion> {
        let mut missing = Vec::new();
        if self.base.is_none() {
            missing.push(PackageVersion::Base);
        }
        if self.customer.is_none() {
            missing.push(PackageVersion::Customer);
        }
        if self.vendor.is_none() {
            missing.push(PackageVersion::Vendor);
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_ordering() {
        let a = ObjectId::new("_a-0001");
        let b = ObjectId::new("_a-0002");
        assert!(a < b);
        assert_eq!(ObjectId::from(Uuid::from_u128(1)).as_str(), "00000000-0000-0000-0000-000000000001");
    }

    #[test]
    fn test_object_type_parsing() {
        assert_eq!(ObjectType::parse("Process Model"), ObjectType::ProcessModel);
        assert_eq!(ObjectType::parse("process_model"), ObjectType::ProcessModel);
        assert_eq!(ObjectType::parse("WEB API"), ObjectType::WebApi);
        assert_eq!(ObjectType::parse("cdt"), ObjectType::CustomDataType);
        assert_eq!(ObjectType::parse("Dashboard"), ObjectType::Unknown);
    }

    #[test]
    fn test_object_type_orders_by_display_name() {
        let mut types = ObjectType::ALL.to_vec();
        types.sort();
        let names: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(types[0], ObjectType::ConnectedSystem);
    }

    #[test]
    fn test_object_type_serde_uses_display_name() {
        let json = serde_json::to_string(&ObjectType::ProcessModel).unwrap();
        assert_eq!(json, "\"Process Model\"");
        let back: ObjectType = serde_json::from_str("\"Web API\"").unwrap();
        assert_eq!(back, ObjectType::WebApi);
    }

    #[test]
    fn test_object_type_deserializes_leniently() {
        let unknown: ObjectType = serde_json::from_str("\"Decision\"").unwrap();
        assert_eq!(unknown, ObjectType::Unknown);
        let spelled: ObjectType = serde_json::from_str("\"process_model\"").unwrap();
        assert_eq!(spelled, ObjectType::ProcessModel);

        let snapshot: ObjectSnapshot =
            serde_json::from_str(r#"{"id": "d1", "name": "Approval", "type": "Decision"}"#).unwrap();
        assert_eq!(snapshot.object_type, ObjectType::Unknown);
    }

    #[test]
    fn test_referenced_type_name() {
        assert_eq!(FieldDef::new("c", "{urn:com:acme}Customer?list").referenced_type_name(), "Customer");
        assert_eq!(FieldDef::new("c", "Customer[]").referenced_type_name(), "Customer");
        assert_eq!(FieldDef::new("c", "Text").referenced_type_name(), "Text");
    }

    #[test]
    fn test_snapshot_triple_missing() {
        let mut pkgs = PackageSnapshots::new();
        let id = ObjectId::new("X");
        pkgs.insert(PackageVersion::Vendor, ObjectSnapshot::new("X", "Foo", ObjectType::Interface));

        let triple = pkgs.triple(&id);
        assert!(triple.vendor.is_some());
        assert_eq!(triple.missing(), vec![PackageVersion::Base, PackageVersion::Customer]);
        assert_eq!(pkgs.label(&id), Some(("Foo", ObjectType::Interface)));
    }
}
