//! Fluent query builder.
//!
//! Builds the condition tree plus select/include/sort/limit directives that
//! the compiler lowers to SOQL text. Typed entry points are infallible; the
//! dynamic surfaces (`where_args`, [`Constraint`]) validate arity and
//! operator text and fail with the query error taxonomy.

use std::fmt;
use std::sync::Arc;

use forcebridge_core::{
    BooleanOp, CompareOp, Condition, QueryError, SetOp, Value,
};

/// Sort direction for an ORDER BY field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_soql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A reusable query constraint.
///
/// Two-way tag: either a literal `(field, operator, value)` tuple or a
/// function applied against the in-progress builder. Repositories hold a list
/// of these as default constraints applied to every new query.
#[derive(Clone)]
pub enum Constraint {
    Literal {
        field: String,
        operator: Option<String>,
        value: Value,
    },
    Nested(Arc<dyn Fn(QueryBuilder) -> QueryBuilder + Send + Sync>),
}

impl Constraint {
    /// Equality constraint on a field.
    pub fn literal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Constraint::Literal {
            field: field.into(),
            operator: None,
            value: value.into(),
        }
    }

    /// Constraint with an explicit operator given as text.
    pub fn literal_op(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Constraint::Literal {
            field: field.into(),
            operator: Some(operator.into()),
            value: value.into(),
        }
    }

    /// Constraint expressed as a builder transformation.
    pub fn nested(f: impl Fn(QueryBuilder) -> QueryBuilder + Send + Sync + 'static) -> Self {
        Constraint::Nested(Arc::new(f))
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Literal {
                field,
                operator,
                value,
            } => f
                .debug_struct("Literal")
                .field("field", field)
                .field("operator", operator)
                .field("value", value)
                .finish(),
            Constraint::Nested(_) => f.debug_tuple("Nested").field(&"<fn>").finish(),
        }
    }
}

/// In-progress query over one remote object.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    object: Option<String>,
    identifier: String,
    selects: Vec<String>,
    includes: Vec<String>,
    conditions: Vec<Condition>,
    orders: Vec<(String, SortDirection)>,
    limit: Option<u32>,
    offset: Option<u32>,
    count_only: bool,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self {
            object: None,
            identifier: "Id".to_string(),
            selects: Vec::new(),
            includes: Vec::new(),
            conditions: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            count_only: false,
        }
    }
}

impl QueryBuilder {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: Some(object.into()),
            ..Self::default()
        }
    }

    pub fn object(&self) -> Option<&str> {
        self.object.as_deref()
    }

    pub fn set_object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Identifier field used when no explicit select list is given.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn with_identifier(mut self, field: impl Into<String>) -> Self {
        self.identifier = field.into();
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selects = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Add a relationship include directive.
    ///
    /// Accepts `relation`, `relation:field1,field2` for child sub-selects and
    /// `relation.field` for a parent scalar projection.
    pub fn include(mut self, relation: impl Into<String>) -> Self {
        self.includes.push(relation.into());
        self
    }

    // ------------------------------------------------------------------
    // Typed condition surface
    // ------------------------------------------------------------------

    pub fn filter(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter_op(field, CompareOp::Eq, value)
    }

    pub fn or_filter(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.or_filter_op(field, CompareOp::Eq, value)
    }

    pub fn filter_op(
        mut self,
        field: impl Into<String>,
        operator: CompareOp,
        value: impl Into<Value>,
    ) -> Self {
        self.conditions
            .push(Condition::basic(BooleanOp::And, field, operator, value));
        self
    }

    pub fn or_filter_op(
        mut self,
        field: impl Into<String>,
        operator: CompareOp,
        value: impl Into<Value>,
    ) -> Self {
        self.conditions
            .push(Condition::basic(BooleanOp::Or, field, operator, value));
        self
    }

    pub fn filter_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.conditions
            .push(Condition::set(BooleanOp::And, field, SetOp::In, values));
        self
    }

    pub fn or_filter_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.conditions
            .push(Condition::set(BooleanOp::Or, field, SetOp::In, values));
        self
    }

    pub fn filter_not_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.conditions
            .push(Condition::set(BooleanOp::And, field, SetOp::NotIn, values));
        self
    }

    pub fn or_filter_not_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.conditions
            .push(Condition::set(BooleanOp::Or, field, SetOp::NotIn, values));
        self
    }

    /// Open a parenthesized sub-group joined with AND.
    pub fn filter_group(self, build: impl FnOnce(QueryBuilder) -> QueryBuilder) -> Self {
        self.push_group(BooleanOp::And, build)
    }

    /// Open a parenthesized sub-group joined with OR.
    pub fn or_filter_group(self, build: impl FnOnce(QueryBuilder) -> QueryBuilder) -> Self {
        self.push_group(BooleanOp::Or, build)
    }

    fn push_group(
        mut self,
        boolean: BooleanOp,
        build: impl FnOnce(QueryBuilder) -> QueryBuilder,
    ) -> Self {
        let group = build(QueryBuilder::default());
        if !group.conditions.is_empty() {
            self.conditions
                .push(Condition::group(boolean, group.conditions));
        }
        self
    }

    // ------------------------------------------------------------------
    // Dynamic condition surface
    // ------------------------------------------------------------------

    /// Positional-argument form: `[field, value]` or `[field, operator, value]`.
    ///
    /// Anything else fails with [`QueryError::InvalidArguments`]; an operator
    /// outside the supported set fails with
    /// [`QueryError::UnsupportedOperator`].
    pub fn where_args(self, args: &[Value]) -> Result<Self, QueryError> {
        self.where_args_boolean(BooleanOp::And, args)
    }

    pub fn or_where_args(self, args: &[Value]) -> Result<Self, QueryError> {
        self.where_args_boolean(BooleanOp::Or, args)
    }

    fn where_args_boolean(
        mut self,
        boolean: BooleanOp,
        args: &[Value],
    ) -> Result<Self, QueryError> {
        let (field, operator, value) = match args {
            [field, value] => (field, CompareOp::Eq, value),
            [field, operator, value] => {
                let text = operator.as_str().ok_or(QueryError::InvalidArguments {
                    count: args.len(),
                })?;
                (field, CompareOp::parse(text)?, value)
            }
            _ => {
                return Err(QueryError::InvalidArguments { count: args.len() });
            }
        };
        let field = field
            .as_str()
            .ok_or(QueryError::InvalidArguments { count: args.len() })?;
        self.conditions.push(Condition::basic(
            boolean,
            field,
            operator,
            value.clone(),
        ));
        Ok(self)
    }

    /// Apply a reusable constraint to this builder.
    pub fn apply(self, constraint: &Constraint) -> Result<Self, QueryError> {
        match constraint {
            Constraint::Literal {
                field,
                operator,
                value,
            } => match operator {
                None => Ok(self.filter(field.clone(), value.clone())),
                Some(text) => {
                    let operator = CompareOp::parse(text)?;
                    Ok(self.filter_op(field.clone(), operator, value.clone()))
                }
            },
            Constraint::Nested(build) => Ok(build(self)),
        }
    }

    // ------------------------------------------------------------------
    // Ordering and paging
    // ------------------------------------------------------------------

    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.orders.push((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Turn this query into a record count.
    pub fn count(mut self) -> Self {
        self.count_only = true;
        self
    }

    // ------------------------------------------------------------------
    // Introspection (consumed by the compiler and caches)
    // ------------------------------------------------------------------

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn selects(&self) -> &[String] {
        &self.selects
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn orders(&self) -> &[(String, SortDirection)] {
        &self.orders
    }

    pub fn limit_value(&self) -> Option<u32> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<u32> {
        self.offset
    }

    pub fn is_count(&self) -> bool {
        self.count_only
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_pushes_and_equality() {
        let builder = QueryBuilder::new("Account").filter("Status", "Open");
        match &builder.conditions()[0] {
            Condition::Basic {
                boolean, operator, ..
            } => {
                assert_eq!(*boolean, BooleanOp::And);
                assert_eq!(*operator, CompareOp::Eq);
            }
            other => panic!("unexpected condition {:?}", other),
        }
    }

    #[test]
    fn test_empty_group_is_dropped() {
        let builder = QueryBuilder::new("Account").filter_group(|group| group);
        assert!(builder.conditions().is_empty());
    }

    #[test]
    fn test_where_args_two_and_three() {
        let builder = QueryBuilder::new("Account")
            .where_args(&[Value::from("Status"), Value::from("Open")])
            .unwrap()
            .where_args(&[Value::from("Age"), Value::from(">"), Value::from(21)])
            .unwrap();
        assert_eq!(builder.conditions().len(), 2);
    }

    #[test]
    fn test_where_args_bad_arity() {
        let err = QueryBuilder::new("Account")
            .where_args(&[Value::from("Status")])
            .unwrap_err();
        assert_eq!(err, QueryError::InvalidArguments { count: 1 });

        let err = QueryBuilder::new("Account")
            .where_args(&[
                Value::from("A"),
                Value::from("="),
                Value::from(1),
                Value::from(2),
            ])
            .unwrap_err();
        assert_eq!(err, QueryError::InvalidArguments { count: 4 });
    }

    #[test]
    fn test_where_args_unknown_operator() {
        let err = QueryBuilder::new("Account")
            .where_args(&[Value::from("A"), Value::from("<>"), Value::from(1)])
            .unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedOperator { .. }));
    }

    #[test]
    fn test_apply_literal_and_nested_constraints() {
        let literal = Constraint::literal_op("Age", ">=", 18);
        let nested = Constraint::nested(|builder| builder.filter("Active", true));

        let builder = QueryBuilder::new("Contact")
            .apply(&literal)
            .unwrap()
            .apply(&nested)
            .unwrap();
        assert_eq!(builder.conditions().len(), 2);
    }

    #[test]
    fn test_apply_literal_bad_operator() {
        let constraint = Constraint::literal_op("Age", "between", 18);
        let err = QueryBuilder::new("Contact").apply(&constraint).unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedOperator { .. }));
    }
}
