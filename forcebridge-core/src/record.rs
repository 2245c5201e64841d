//! Raw remote records.

use serde::{Deserialize, Serialize};

/// Attribute map of a remote record, keyed by wire field name.
pub type AttributeMap = serde_json::Map<String, serde_json::Value>;

/// A single record as returned by the remote query API.
///
/// Attributes are kept in their raw wire form; mapping to application
/// attribute names and types is the transformer collaborator's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Record {
    attributes: AttributeMap,
}

impl Record {
    pub fn new(attributes: AttributeMap) -> Self {
        Self { attributes }
    }

    /// Build a record from a raw API result object, stripping the remote's
    /// `attributes` bookkeeping envelope if present.
    pub fn from_raw(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(mut map) => {
                map.remove("attributes");
                Self { attributes: map }
            }
            _ => Self::default(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.attributes.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.attributes.get(field).and_then(|v| v.as_str())
    }

    /// The record identifier under the given identifier field.
    pub fn id(&self, identifier_field: &str) -> Option<&str> {
        self.get_str(identifier_field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(field.into(), value);
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub fn into_attributes(self) -> AttributeMap {
        self.attributes
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_raw_strips_envelope() {
        let record = Record::from_raw(json!({
            "attributes": {"type": "Account", "url": "/services/data/v52.0/sobjects/Account/001"},
            "Id": "001",
            "Name": "Acme",
        }));
        assert_eq!(record.id("Id"), Some("001"));
        assert_eq!(record.get_str("Name"), Some("Acme"));
        assert!(record.get("attributes").is_none());
    }

    #[test]
    fn test_from_raw_non_object_is_empty() {
        let record = Record::from_raw(json!("not a record"));
        assert!(record.is_empty());
    }

    #[test]
    fn test_serde_roundtrip_is_transparent() {
        let mut record = Record::default();
        record.set("Id", json!("001"));
        let encoded = serde_json::to_value(&record).unwrap();
        assert_eq!(encoded, json!({"Id": "001"}));
        let decoded: Record = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, record);
    }
}
