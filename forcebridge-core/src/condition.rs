//! Condition model for remote queries.
//!
//! Conditions form an ordered boolean tree: basic comparisons, set-membership
//! tests and parenthesized groups. The tree is built by the query builder in
//! `forcebridge-soql` and consumed by both the compiler and the entry cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::QueryError;

/// A single typed scalar value.
///
/// Closed variant set: condition values never carry arbitrary objects, so
/// normalization and literal rendering need no runtime type probing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    DateTime(DateTime<Utc>),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::String(s) => write!(f, "{}", s),
            Scalar::DateTime(dt) => {
                write!(f, "{}", dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
            }
        }
    }
}

/// A condition value: a scalar, an ordered sequence, or a keyed map.
///
/// Maps use [`BTreeMap`] so key order is canonical by construction; two
/// logically identical maps serialize identically regardless of how they
/// were assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Scalar(Scalar),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::Scalar(Scalar::String(s.into()))
    }

    pub fn null() -> Self {
        Value::Scalar(Scalar::Null)
    }

    /// String view of a scalar string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Value::Scalar(scalar)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(Scalar::String(s))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(Scalar::Bool(b))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Scalar(Scalar::Int(i64::from(i)))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Scalar(Scalar::Int(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Scalar(Scalar::Float(x))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::Scalar(Scalar::DateTime(dt))
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::List(values)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Scalar(Scalar::Null),
            serde_json::Value::Bool(b) => Value::Scalar(Scalar::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Scalar(Scalar::Int(i))
                } else {
                    Value::Scalar(Scalar::Float(n.as_f64().unwrap_or(0.0)))
                }
            }
            serde_json::Value::String(s) => Value::Scalar(Scalar::String(s)),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

/// Boolean connective between sibling conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanOp {
    And,
    Or,
}

impl BooleanOp {
    pub fn as_soql(&self) -> &'static str {
        match self {
            BooleanOp::And => "AND",
            BooleanOp::Or => "OR",
        }
    }

    /// Lowercase token used in condition signatures.
    pub fn symbol(&self) -> &'static str {
        match self {
            BooleanOp::And => "and",
            BooleanOp::Or => "or",
        }
    }
}

/// Comparison operator for basic conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl CompareOp {
    /// Wire-level operator text.
    pub fn as_soql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Like => "LIKE",
        }
    }

    /// Lowercase token used in condition signatures.
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Like => "like",
            other => other.as_soql(),
        }
    }

    /// Parse an operator supplied as text, case-insensitively.
    ///
    /// The supported set is fixed; anything else fails with
    /// [`QueryError::UnsupportedOperator`].
    pub fn parse(operator: &str) -> Result<Self, QueryError> {
        match operator.trim().to_ascii_lowercase().as_str() {
            "=" => Ok(CompareOp::Eq),
            "!=" => Ok(CompareOp::Ne),
            ">" => Ok(CompareOp::Gt),
            ">=" => Ok(CompareOp::Gte),
            "<" => Ok(CompareOp::Lt),
            "<=" => Ok(CompareOp::Lte),
            "like" => Ok(CompareOp::Like),
            _ => Err(QueryError::UnsupportedOperator {
                operator: operator.to_string(),
            }),
        }
    }
}

/// Set-membership operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetOp {
    In,
    NotIn,
}

impl SetOp {
    pub fn as_soql(&self) -> &'static str {
        match self {
            SetOp::In => "IN",
            SetOp::NotIn => "NOT IN",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            SetOp::In => "in",
            SetOp::NotIn => "not in",
        }
    }
}

/// One node of the condition tree.
///
/// Children of a [`Condition::Group`] preserve insertion order; compiled text
/// must reproduce that order exactly since the remote language has no
/// precedence override other than parentheses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Basic {
        boolean: BooleanOp,
        field: String,
        operator: CompareOp,
        value: Value,
    },
    SetMembership {
        boolean: BooleanOp,
        field: String,
        operator: SetOp,
        values: Vec<Value>,
    },
    Group {
        boolean: BooleanOp,
        conditions: Vec<Condition>,
    },
}

impl Condition {
    pub fn basic(
        boolean: BooleanOp,
        field: impl Into<String>,
        operator: CompareOp,
        value: impl Into<Value>,
    ) -> Self {
        Condition::Basic {
            boolean,
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn set(
        boolean: BooleanOp,
        field: impl Into<String>,
        operator: SetOp,
        values: Vec<Value>,
    ) -> Self {
        Condition::SetMembership {
            boolean,
            field: field.into(),
            operator,
            values,
        }
    }

    pub fn group(boolean: BooleanOp, conditions: Vec<Condition>) -> Self {
        Condition::Group {
            boolean,
            conditions,
        }
    }

    /// The boolean connective joining this condition to its previous sibling.
    pub fn boolean(&self) -> BooleanOp {
        match self {
            Condition::Basic { boolean, .. }
            | Condition::SetMembership { boolean, .. }
            | Condition::Group { boolean, .. } => *boolean,
        }
    }

    /// Whether every node in this subtree can seed the invalidation index.
    pub fn is_indexable(&self) -> bool {
        match self {
            Condition::Basic { operator, .. } => *operator == CompareOp::Eq,
            Condition::SetMembership { operator, .. } => *operator == SetOp::In,
            Condition::Group { conditions, .. } => {
                !conditions.is_empty() && conditions.iter().all(Condition::is_indexable)
            }
        }
    }

    fn collect_indexable<'a>(&'a self, pairs: &mut Vec<(&'a str, &'a Value)>) {
        match self {
            Condition::Basic {
                field,
                operator: CompareOp::Eq,
                value,
                ..
            } => pairs.push((field, value)),
            Condition::SetMembership {
                field,
                operator: SetOp::In,
                values,
                ..
            } => {
                for value in values {
                    pairs.push((field, value));
                }
            }
            Condition::Group { conditions, .. } => {
                for condition in conditions {
                    condition.collect_indexable(pairs);
                }
            }
            // !=, >, >=, <, <=, LIKE and NOT IN cannot be inverted into a
            // safe invalidation trigger.
            _ => {}
        }
    }
}

/// Extract every `(field, value)` pair eligible for point invalidation.
///
/// Only `=` comparisons and `IN` memberships contribute; groups are recursed
/// and merged. An empty result means the condition list must never be
/// entry-cached.
pub fn indexable_pairs(conditions: &[Condition]) -> Vec<(&str, &Value)> {
    let mut pairs = Vec::new();
    for condition in conditions {
        condition.collect_indexable(&mut pairs);
    }
    pairs
}

/// Whether a condition list qualifies as a point (equality) lookup.
///
/// True when the list is non-empty and every node, groups recursed, is an
/// indexable `=`/`IN` condition.
pub fn is_point_lookup(conditions: &[Condition]) -> bool {
    !conditions.is_empty() && conditions.iter().all(Condition::is_indexable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported_operators() {
        assert_eq!(CompareOp::parse("=").unwrap(), CompareOp::Eq);
        assert_eq!(CompareOp::parse("!=").unwrap(), CompareOp::Ne);
        assert_eq!(CompareOp::parse(">=").unwrap(), CompareOp::Gte);
        assert_eq!(CompareOp::parse("LIKE").unwrap(), CompareOp::Like);
        assert_eq!(CompareOp::parse("Like").unwrap(), CompareOp::Like);
    }

    #[test]
    fn test_parse_unsupported_operator() {
        let err = CompareOp::parse("<>").unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedOperator { .. }));
        assert!(err.to_string().contains("<>"));
    }

    #[test]
    fn test_indexable_pairs_from_equality() {
        let conditions = vec![
            Condition::basic(BooleanOp::And, "Id", CompareOp::Eq, "X"),
            Condition::basic(BooleanOp::And, "Age", CompareOp::Gt, 21),
        ];
        let pairs = indexable_pairs(&conditions);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, "Id");
    }

    #[test]
    fn test_indexable_pairs_from_in_membership() {
        let conditions = vec![Condition::set(
            BooleanOp::And,
            "Status",
            SetOp::In,
            vec![Value::from("Open"), Value::from("Pending")],
        )];
        let pairs = indexable_pairs(&conditions);
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|(field, _)| *field == "Status"));
    }

    #[test]
    fn test_indexable_pairs_recurse_into_groups() {
        let conditions = vec![Condition::group(
            BooleanOp::And,
            vec![
                Condition::basic(BooleanOp::And, "A", CompareOp::Eq, 1),
                Condition::basic(BooleanOp::Or, "B", CompareOp::Eq, 2),
            ],
        )];
        let pairs = indexable_pairs(&conditions);
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn test_not_in_and_inequalities_never_contribute() {
        let conditions = vec![
            Condition::set(
                BooleanOp::And,
                "Status",
                SetOp::NotIn,
                vec![Value::from("Closed")],
            ),
            Condition::basic(BooleanOp::And, "Name", CompareOp::Like, "smith"),
            Condition::basic(BooleanOp::And, "Id", CompareOp::Ne, "X"),
        ];
        assert!(indexable_pairs(&conditions).is_empty());
    }

    #[test]
    fn test_point_lookup_detection() {
        let point = vec![Condition::basic(BooleanOp::And, "Id", CompareOp::Eq, "X")];
        assert!(is_point_lookup(&point));

        let mixed = vec![
            Condition::basic(BooleanOp::And, "Id", CompareOp::Eq, "X"),
            Condition::basic(BooleanOp::And, "Age", CompareOp::Gt, 21),
        ];
        assert!(!is_point_lookup(&mixed));

        assert!(!is_point_lookup(&[]));
    }

    #[test]
    fn test_value_from_json() {
        let json = serde_json::json!({"b": [1, "two"], "a": null});
        let value = Value::from(json);
        match value {
            Value::Map(map) => {
                assert_eq!(map.len(), 2);
                assert_eq!(map.get("a"), Some(&Value::null()));
            }
            other => panic!("expected map, got {:?}", other),
        }
    }
}
