//! Describe-metadata types and the schema resolver seam.
//!
//! The remote store describes each object (fields, picklists, child
//! relationships) through its metadata API. The compiler consults this
//! metadata to translate logical relationship names into wire relationship
//! names; resolvers own the memoization policy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::RemoteError;

/// Describe metadata for a single remote object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectDescribe {
    pub name: String,
    pub fields: Vec<FieldDescribe>,
    pub child_relationships: Vec<ChildRelationship>,
}

/// Describe metadata for one field of an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldDescribe {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    pub picklist_values: Vec<PicklistValue>,
}

/// One admissible value of a picklist field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PicklistValue {
    pub value: String,
    pub label: Option<String>,
    pub active: bool,
}

impl Default for PicklistValue {
    fn default() -> Self {
        Self {
            value: String::new(),
            label: None,
            active: true,
        }
    }
}

/// A child relationship of an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ChildRelationship {
    /// Wire-level relationship name used in sub-selects. May be absent for
    /// relationships the remote store does not expose to queries.
    pub relationship_name: Option<String>,
    /// Remote object name on the child side.
    #[serde(rename = "childSObject")]
    pub child_object: String,
    /// Reference field on the child pointing back at this object.
    pub field: Option<String>,
}

impl ObjectDescribe {
    /// Resolve a logical relation name to its wire relationship name.
    ///
    /// Matches case-insensitively against either the child object name or the
    /// relationship's own name. Returns `None` when nothing matches or the
    /// matched relationship carries no queryable name; callers degrade to the
    /// literal name supplied.
    pub fn resolve_child_relationship(&self, relation: &str) -> Option<&str> {
        self.child_relationships
            .iter()
            .find(|rel| {
                rel.child_object.eq_ignore_ascii_case(relation)
                    || rel
                        .relationship_name
                        .as_deref()
                        .is_some_and(|name| name.eq_ignore_ascii_case(relation))
            })
            .and_then(|rel| rel.relationship_name.as_deref())
    }

    /// Active picklist values declared for a field.
    pub fn picklist_values(&self, field: &str) -> Vec<String> {
        self.fields
            .iter()
            .find(|f| f.name == field)
            .map(|f| {
                f.picklist_values
                    .iter()
                    .filter(|v| v.active)
                    .map(|v| v.value.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Schema metadata resolver consumed by the query compiler.
///
/// Implementations own caching and lifetime; the compiler only ever asks for
/// one object's describe at a time.
#[async_trait]
pub trait SchemaResolver: Send + Sync {
    async fn describe(&self, object: &str) -> Result<ObjectDescribe, RemoteError>;
}

/// Fixed describe map for tests and offline compilation.
///
/// Unknown objects resolve to an empty describe, which makes the compiler
/// fall back to literal relationship names.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaResolver {
    describes: HashMap<String, ObjectDescribe>,
}

impl StaticSchemaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_describe(mut self, describe: ObjectDescribe) -> Self {
        self.describes.insert(describe.name.clone(), describe);
        self
    }
}

#[async_trait]
impl SchemaResolver for StaticSchemaResolver {
    async fn describe(&self, object: &str) -> Result<ObjectDescribe, RemoteError> {
        Ok(self.describes.get(object).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_describe() -> ObjectDescribe {
        ObjectDescribe {
            name: "Account".to_string(),
            fields: vec![FieldDescribe {
                name: "Status".to_string(),
                field_type: Some("picklist".to_string()),
                picklist_values: vec![
                    PicklistValue {
                        value: "Open".to_string(),
                        label: None,
                        active: true,
                    },
                    PicklistValue {
                        value: "Legacy".to_string(),
                        label: None,
                        active: false,
                    },
                ],
            }],
            child_relationships: vec![
                ChildRelationship {
                    relationship_name: Some("Contacts".to_string()),
                    child_object: "Contact".to_string(),
                    field: Some("AccountId".to_string()),
                },
                ChildRelationship {
                    relationship_name: None,
                    child_object: "Ghost".to_string(),
                    field: None,
                },
            ],
        }
    }

    #[test]
    fn test_resolve_by_child_object_case_insensitive() {
        let describe = account_describe();
        assert_eq!(describe.resolve_child_relationship("contact"), Some("Contacts"));
    }

    #[test]
    fn test_resolve_by_relationship_name() {
        let describe = account_describe();
        assert_eq!(describe.resolve_child_relationship("CONTACTS"), Some("Contacts"));
    }

    #[test]
    fn test_resolve_unknown_or_unqueryable_is_none() {
        let describe = account_describe();
        assert_eq!(describe.resolve_child_relationship("Opportunity"), None);
        // Matched but carries no relationship name
        assert_eq!(describe.resolve_child_relationship("Ghost"), None);
    }

    #[test]
    fn test_picklist_values_filters_inactive() {
        let describe = account_describe();
        assert_eq!(describe.picklist_values("Status"), vec!["Open".to_string()]);
        assert!(describe.picklist_values("Missing").is_empty());
    }

    #[test]
    fn test_describe_wire_deserialization() {
        let describe: ObjectDescribe = serde_json::from_value(serde_json::json!({
            "name": "Account",
            "fields": [
                {"name": "Id", "type": "id", "picklistValues": []}
            ],
            "childRelationships": [
                {"childSObject": "Contact", "relationshipName": "Contacts", "field": "AccountId"}
            ],
            "queryable": true
        }))
        .unwrap();
        assert_eq!(describe.child_relationships[0].child_object, "Contact");
        assert_eq!(describe.fields[0].field_type.as_deref(), Some("id"));
    }

    #[tokio::test]
    async fn test_static_resolver_unknown_object_is_empty() {
        let resolver = StaticSchemaResolver::new().with_describe(account_describe());
        let known = resolver.describe("Account").await.unwrap();
        assert_eq!(known.child_relationships.len(), 2);
        let unknown = resolver.describe("Nope").await.unwrap();
        assert!(unknown.child_relationships.is_empty());
    }
}
