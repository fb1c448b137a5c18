//! Serializable record types returned by the query engine.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Attribute-name-to-value record; null-valued attributes are never present.
pub type AttrMap = BTreeMap<String, Value>;

/// One entry of the entity listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: i64,
    pub name: String,
}

/// Whether an attribute belongs to the global relation or to period
/// relations. An attribute carried by both scopes is listed once per scope;
/// scope is part of its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrScope {
    Global,
    Period,
}

/// One entry of the attribute-definition listing, as declared by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: String,
    pub scope: AttrScope,
}

/// A single non-null attribute value paired with the entity that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub entity_id: i64,
    pub value: Value,
}

/// The full picture of one entity: every period's record plus the global
/// record.
///
/// Serializes as a single object with the period keys ascending followed by a
/// reserved `"global"` key, so period-nested and global attribute names can
/// never collide.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedEntity {
    /// Period identifier -> that period's record. Only periods where a row
    /// exists for the entity appear.
    pub periods: BTreeMap<String, AttrMap>,
    /// The entity's global record.
    pub global: AttrMap,
}

impl Serialize for MergedEntity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.periods.len() + 1))?;
        for (period, record) in &self.periods {
            map.serialize_entry(period, record)?;
        }
        map.serialize_entry("global", &self.global)?;
        map.end()
    }
}
