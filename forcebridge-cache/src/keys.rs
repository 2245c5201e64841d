//! Cache key construction.
//!
//! Three key flavors, each a fixed prefix plus a SHA-256 hex digest of
//! canonical key material:
//!
//! - `sf.query.<namespace>.<hash(soql)>`: one per compiled query text,
//!   orphaned wholesale by rotating the namespace token;
//! - `sf.entry.<hash(object, signature)>`: one per point-lookup signature;
//! - `sf.entry_index.<hash(object, field, value)>`: reverse index from a
//!   field/value dependency to the set of entry keys built on it.

use serde_json::json;

use forcebridge_core::{normalize_value, sha256_hex, signature_hash, Condition, Value};

pub const QUERY_KEY_PREFIX: &str = "sf.query.";
pub const ENTRY_KEY_PREFIX: &str = "sf.entry.";
pub const ENTRY_INDEX_KEY_PREFIX: &str = "sf.entry_index.";
pub const LOOKUP_KEY_PREFIX: &str = "sf.lookup.";

/// Well-known key holding the current query-cache namespace token.
pub const QUERY_NAMESPACE_KEY: &str = "sf.query.namespace";

/// Key for a compiled query under the given namespace token.
pub fn query_key(namespace: &str, soql: &str) -> String {
    format!("{}{}.{}", QUERY_KEY_PREFIX, namespace, sha256_hex(soql))
}

/// Key for an entry-cache slot identified by object and condition signature.
pub fn entry_key(object: &str, conditions: &[Condition]) -> String {
    format!("{}{}", ENTRY_KEY_PREFIX, signature_hash(object, conditions))
}

/// Key for the index set of one `(object, field, value)` dependency.
pub fn entry_index_key(object: &str, field: &str, value: &Value) -> String {
    let canonical = json!({
        "field": field,
        "object": object,
        "value": normalize_value(value),
    });
    format!(
        "{}{}",
        ENTRY_INDEX_KEY_PREFIX,
        sha256_hex(&canonical.to_string())
    )
}

/// Key for a memoized picklist lookup.
pub fn lookup_key(object: &str, field: &str) -> String {
    format!("{}{}.{}", LOOKUP_KEY_PREFIX, object, field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use forcebridge_core::{BooleanOp, CompareOp};

    #[test]
    fn test_query_key_embeds_namespace() {
        let a = query_key("ns1", "SELECT Id FROM Account");
        let b = query_key("ns2", "SELECT Id FROM Account");
        assert!(a.starts_with("sf.query.ns1."));
        assert!(b.starts_with("sf.query.ns2."));
        assert_ne!(a, b);
    }

    #[test]
    fn test_query_key_deterministic() {
        assert_eq!(
            query_key("ns", "SELECT Id FROM Account"),
            query_key("ns", "SELECT Id FROM Account")
        );
    }

    #[test]
    fn test_entry_key_distinguishes_objects() {
        let conditions = vec![Condition::basic(BooleanOp::And, "Id", CompareOp::Eq, "X")];
        assert_ne!(
            entry_key("Account", &conditions),
            entry_key("Contact", &conditions)
        );
    }

    #[test]
    fn test_entry_index_key_distinguishes_components() {
        let value = Value::from("Open");
        let base = entry_index_key("Account", "Status", &value);
        assert_ne!(base, entry_index_key("Contact", "Status", &value));
        assert_ne!(base, entry_index_key("Account", "Stage", &value));
        assert_ne!(
            base,
            entry_index_key("Account", "Status", &Value::from("Closed"))
        );
    }

    #[test]
    fn test_lookup_key_shape() {
        assert_eq!(lookup_key("Account", "Status"), "sf.lookup.Account.Status");
    }
}
