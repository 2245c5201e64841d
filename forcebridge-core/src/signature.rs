//! Canonical condition signatures.
//!
//! A signature is the canonical JSON form of a condition list, used as
//! cache-key material. Two logically identical condition sets must normalize
//! to byte-identical text; the text itself is always hashed before storage.
//!
//! Canonicalization rules: map keys sort (free with `BTreeMap` values and
//! serde_json's default ordered map), sequences keep order, timestamps render
//! as ISO-8601 strings, scalars as their JSON forms.

use serde_json::json;
use sha2::{Digest, Sha256};

use crate::condition::{Condition, Scalar, Value};

/// Deep-normalize a condition value into canonical JSON.
pub fn normalize_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Scalar(scalar) => normalize_scalar(scalar),
        Value::List(items) => {
            serde_json::Value::Array(items.iter().map(normalize_value).collect())
        }
        Value::Map(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), normalize_value(v)))
                .collect(),
        ),
    }
}

fn normalize_scalar(scalar: &Scalar) -> serde_json::Value {
    match scalar {
        Scalar::Null => serde_json::Value::Null,
        Scalar::Bool(b) => serde_json::Value::Bool(*b),
        Scalar::Int(i) => serde_json::Value::Number((*i).into()),
        Scalar::Float(x) => serde_json::Number::from_f64(*x)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Scalar::String(s) => serde_json::Value::String(s.clone()),
        Scalar::DateTime(dt) => serde_json::Value::String(
            dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        ),
    }
}

/// Canonical JSON form of a condition list.
pub fn canonical_conditions(conditions: &[Condition]) -> serde_json::Value {
    serde_json::Value::Array(conditions.iter().map(canonical_condition).collect())
}

fn canonical_condition(condition: &Condition) -> serde_json::Value {
    match condition {
        Condition::Basic {
            boolean,
            field,
            operator,
            value,
        } => json!({
            "boolean": boolean.symbol(),
            "type": "basic",
            "field": field,
            "operator": operator.symbol(),
            "value": normalize_value(value),
        }),
        Condition::SetMembership {
            boolean,
            field,
            operator,
            values,
        } => json!({
            "boolean": boolean.symbol(),
            "type": "set",
            "field": field,
            "operator": operator.symbol(),
            "values": values.iter().map(normalize_value).collect::<Vec<_>>(),
        }),
        Condition::Group {
            boolean,
            conditions,
        } => json!({
            "boolean": boolean.symbol(),
            "type": "group",
            "conditions": conditions.iter().map(canonical_condition).collect::<Vec<_>>(),
        }),
    }
}

/// Hex-encoded SHA-256 of arbitrary key material.
pub fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hashed signature for an `(object, conditions)` pair.
pub fn signature_hash(object: &str, conditions: &[Condition]) -> String {
    let canonical = json!({
        "conditions": canonical_conditions(conditions),
        "object": object,
    });
    sha256_hex(&canonical.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{BooleanOp, CompareOp, SetOp};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn sample_conditions() -> Vec<Condition> {
        vec![
            Condition::basic(BooleanOp::And, "Id", CompareOp::Eq, "001"),
            Condition::set(
                BooleanOp::Or,
                "Status",
                SetOp::In,
                vec![Value::from("Open"), Value::from("Pending")],
            ),
        ]
    }

    #[test]
    fn test_normalizing_twice_is_identical() {
        let conditions = sample_conditions();
        let first = canonical_conditions(&conditions).to_string();
        let second = canonical_conditions(&conditions).to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn test_map_key_order_does_not_change_signature() {
        let mut forward = BTreeMap::new();
        forward.insert("alpha".to_string(), Value::from(1));
        forward.insert("beta".to_string(), Value::from(2));

        let mut reverse = BTreeMap::new();
        reverse.insert("beta".to_string(), Value::from(2));
        reverse.insert("alpha".to_string(), Value::from(1));

        let a = vec![Condition::basic(
            BooleanOp::And,
            "Payload",
            CompareOp::Eq,
            Value::Map(forward),
        )];
        let b = vec![Condition::basic(
            BooleanOp::And,
            "Payload",
            CompareOp::Eq,
            Value::Map(reverse),
        )];

        assert_eq!(signature_hash("Account", &a), signature_hash("Account", &b));
    }

    #[test]
    fn test_sequence_order_is_preserved() {
        let a = vec![Condition::set(
            BooleanOp::And,
            "Id",
            SetOp::In,
            vec![Value::from("A"), Value::from("B")],
        )];
        let b = vec![Condition::set(
            BooleanOp::And,
            "Id",
            SetOp::In,
            vec![Value::from("B"), Value::from("A")],
        )];
        assert_ne!(signature_hash("Account", &a), signature_hash("Account", &b));
    }

    #[test]
    fn test_timestamps_render_iso8601() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let normalized = normalize_value(&Value::from(dt));
        assert_eq!(normalized, json!("2024-03-01T12:30:00Z"));
    }

    #[test]
    fn test_different_objects_differ() {
        let conditions = sample_conditions();
        assert_ne!(
            signature_hash("Account", &conditions),
            signature_hash("Contact", &conditions)
        );
    }

    #[test]
    fn test_different_operators_differ() {
        let eq = vec![Condition::basic(BooleanOp::And, "Id", CompareOp::Eq, "X")];
        let ne = vec![Condition::basic(BooleanOp::And, "Id", CompareOp::Ne, "X")];
        assert_ne!(signature_hash("Account", &eq), signature_hash("Account", &ne));
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::condition::{BooleanOp, CompareOp, SetOp};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn scalar_strategy() -> impl Strategy<Value = Scalar> {
        prop_oneof![
            Just(Scalar::Null),
            any::<bool>().prop_map(Scalar::Bool),
            any::<i64>().prop_map(Scalar::Int),
            "[a-zA-Z0-9 _-]{0,24}".prop_map(Scalar::String),
        ]
    }

    fn value_strategy() -> impl Strategy<Value = Value> {
        let leaf = scalar_strategy().prop_map(Value::Scalar);
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
                prop::collection::btree_map("[a-z]{1,8}", inner, 0..4)
                    .prop_map(|m: BTreeMap<String, Value>| Value::Map(m)),
            ]
        })
    }

    fn compare_op_strategy() -> impl Strategy<Value = CompareOp> {
        prop_oneof![
            Just(CompareOp::Eq),
            Just(CompareOp::Ne),
            Just(CompareOp::Gt),
            Just(CompareOp::Gte),
            Just(CompareOp::Lt),
            Just(CompareOp::Lte),
            Just(CompareOp::Like),
        ]
    }

    fn condition_strategy() -> impl Strategy<Value = Condition> {
        let boolean = prop_oneof![Just(BooleanOp::And), Just(BooleanOp::Or)];
        let basic = (
            boolean.clone(),
            "[A-Za-z][A-Za-z0-9_]{0,12}",
            compare_op_strategy(),
            value_strategy(),
        )
            .prop_map(|(b, f, op, v)| Condition::basic(b, f, op, v));
        let set = (
            boolean,
            "[A-Za-z][A-Za-z0-9_]{0,12}",
            prop_oneof![Just(SetOp::In), Just(SetOp::NotIn)],
            prop::collection::vec(value_strategy(), 0..4),
        )
            .prop_map(|(b, f, op, vs)| Condition::set(b, f, op, vs));
        prop_oneof![basic, set]
    }

    proptest! {
        /// Property: normalization is idempotent. The canonical form of a
        /// condition list never changes between invocations.
        #[test]
        fn prop_signature_idempotent(
            conditions in prop::collection::vec(condition_strategy(), 0..5),
            object in "[A-Za-z][A-Za-z0-9_]{0,12}",
        ) {
            let first = signature_hash(&object, &conditions);
            let second = signature_hash(&object, &conditions);
            prop_assert_eq!(first, second);
        }

        /// Property: the signature survives a clone of the condition list,
        /// i.e. it depends only on logical content.
        #[test]
        fn prop_signature_depends_on_content_only(
            conditions in prop::collection::vec(condition_strategy(), 0..5),
            object in "[A-Za-z][A-Za-z0-9_]{0,12}",
        ) {
            let cloned = conditions.clone();
            prop_assert_eq!(
                signature_hash(&object, &conditions),
                signature_hash(&object, &cloned)
            );
        }

        /// Property: signatures are fixed-width lowercase hex.
        #[test]
        fn prop_signature_is_hex(
            conditions in prop::collection::vec(condition_strategy(), 0..3),
        ) {
            let hash = signature_hash("Account", &conditions);
            prop_assert_eq!(hash.len(), 64);
            prop_assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }
}
