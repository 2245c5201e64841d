//! SOQL compiler.
//!
//! Lowers a [`QueryBuilder`] into a single line of query text:
//! `SELECT <fields> FROM <object> [WHERE <expr>] [ORDER BY ...] [LIMIT n]
//! [OFFSET n]`. Emission is deterministic: identical builders always produce
//! byte-identical text, which the caches rely on for key material.
//!
//! Relationship includes are resolved against live describe metadata through
//! the [`SchemaResolver`] seam. Resolution is best-effort: an unknown
//! relation compiles to the literal name supplied and the remote API is left
//! to reject it.

use forcebridge_core::{
    normalize_value, CompareOp, Condition, ForceBridgeResult, ObjectDescribe, RepositoryError,
    Scalar, SchemaResolver, Value,
};

use crate::builder::QueryBuilder;

impl QueryBuilder {
    /// Compile this query to SOQL text.
    pub async fn to_soql<R: SchemaResolver>(&self, resolver: &R) -> ForceBridgeResult<String> {
        compile(self, resolver).await
    }
}

/// Compile a builder to SOQL text, resolving relationship includes.
pub async fn compile<R: SchemaResolver>(
    builder: &QueryBuilder,
    resolver: &R,
) -> ForceBridgeResult<String> {
    let object = builder
        .object()
        .ok_or(RepositoryError::ObjectNotSpecified)?;

    let mut soql = String::new();

    if builder.is_count() {
        // Count queries never carry relationship sub-selects.
        soql.push_str("SELECT COUNT() FROM ");
        soql.push_str(object);
    } else {
        let mut fields: Vec<String> = if builder.selects().is_empty() {
            vec![builder.identifier().to_string()]
        } else {
            builder.selects().to_vec()
        };
        for include in builder.includes() {
            fields.push(resolve_include(object, builder.identifier(), include, resolver).await);
        }
        soql.push_str("SELECT ");
        soql.push_str(&fields.join(", "));
        soql.push_str(" FROM ");
        soql.push_str(object);
    }

    if !builder.conditions().is_empty() {
        soql.push_str(" WHERE ");
        render_conditions(builder.conditions(), &mut soql);
    }

    if !builder.is_count() && !builder.orders().is_empty() {
        let orders: Vec<String> = builder
            .orders()
            .iter()
            .map(|(field, direction)| format!("{} {}", field, direction.as_soql()))
            .collect();
        soql.push_str(" ORDER BY ");
        soql.push_str(&orders.join(", "));
    }

    if let Some(limit) = builder.limit_value() {
        soql.push_str(" LIMIT ");
        soql.push_str(&limit.to_string());
    }

    if let Some(offset) = builder.offset_value() {
        soql.push_str(" OFFSET ");
        soql.push_str(&offset.to_string());
    }

    Ok(soql)
}

/// Resolve one include directive to a projected field or sub-select.
async fn resolve_include<R: SchemaResolver>(
    object: &str,
    identifier: &str,
    include: &str,
    resolver: &R,
) -> String {
    // `relation.field` projects a scalar through a parent lookup.
    if include.contains('.') && !include.contains(':') {
        return parent_projection(include);
    }

    let (relation, child_fields) = match include.split_once(':') {
        Some((relation, list)) => (
            relation.trim(),
            list.split(',')
                .map(|field| field.trim().to_string())
                .filter(|field| !field.is_empty())
                .collect::<Vec<_>>(),
        ),
        None => (include.trim(), Vec::new()),
    };

    let describe = match resolver.describe(object).await {
        Ok(describe) => describe,
        Err(error) => {
            tracing::warn!(
                object = %object,
                relation = %relation,
                error = %error,
                "describe failed, falling back to literal relationship name"
            );
            ObjectDescribe::default()
        }
    };

    let wire_name = match describe.resolve_child_relationship(relation) {
        Some(name) => name.to_string(),
        None => {
            tracing::warn!(
                object = %object,
                relation = %relation,
                "relationship not present in describe metadata, using literal name"
            );
            relation.to_string()
        }
    };

    // An empty child sub-select is invalid wire text; fall back to the
    // minimal identifier + display-name set.
    let child_fields = if child_fields.is_empty() {
        vec![identifier.to_string(), "Name".to_string()]
    } else {
        child_fields
    };

    format!("(SELECT {} FROM {})", child_fields.join(", "), wire_name)
}

/// Translate a parent path: every reference segment named `X__c` traverses
/// the relationship `X__r`; standard lookups pass through verbatim.
fn parent_projection(include: &str) -> String {
    let segments: Vec<&str> = include.split('.').collect();
    let last = segments.len() - 1;
    segments
        .iter()
        .enumerate()
        .map(|(index, segment)| {
            if index < last {
                match segment.strip_suffix("__c") {
                    Some(base) => format!("{}__r", base),
                    None => (*segment).to_string(),
                }
            } else {
                (*segment).to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Emit a condition list depth-first.
///
/// Each child's boolean keyword goes between itself and the previous
/// sibling, never before the first sibling at a level; groups are wrapped in
/// parentheses and recursed.
fn render_conditions(conditions: &[Condition], out: &mut String) {
    for (index, condition) in conditions.iter().enumerate() {
        if index > 0 {
            out.push(' ');
            out.push_str(condition.boolean().as_soql());
            out.push(' ');
        }
        match condition {
            Condition::Basic {
                field,
                operator,
                value,
                ..
            } => {
                out.push_str(field);
                out.push(' ');
                out.push_str(operator.as_soql());
                out.push(' ');
                if *operator == CompareOp::Like {
                    out.push_str(&render_like(value));
                } else {
                    out.push_str(&render_value(value));
                }
            }
            Condition::SetMembership {
                field,
                operator,
                values,
                ..
            } => {
                out.push_str(field);
                out.push(' ');
                out.push_str(operator.as_soql());
                out.push_str(" (");
                let rendered: Vec<String> = values.iter().map(render_value).collect();
                out.push_str(&rendered.join(", "));
                out.push(')');
            }
            Condition::Group { conditions, .. } => {
                out.push('(');
                render_conditions(conditions, out);
                out.push(')');
            }
        }
    }
}

/// Render a literal: booleans bare, numerics unquoted, null bare, everything
/// else single-quoted with internal quotes and backslashes escaped.
fn render_value(value: &Value) -> String {
    match value {
        Value::Scalar(scalar) => match scalar {
            Scalar::Null => "null".to_string(),
            Scalar::Bool(true) => "TRUE".to_string(),
            Scalar::Bool(false) => "FALSE".to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(x) => x.to_string(),
            Scalar::String(s) => quote(s),
            Scalar::DateTime(_) => quote(&scalar.to_string()),
        },
        composite => quote(&normalize_value(composite).to_string()),
    }
}

/// Render a LIKE operand: caller-supplied wrapping `%` is stripped, interior
/// wildcard characters match literally, and the result is wrapped `'%v%'`.
fn render_like(value: &Value) -> String {
    let raw = match value {
        Value::Scalar(Scalar::String(s)) => s.clone(),
        Value::Scalar(scalar) => scalar.to_string(),
        composite => normalize_value(composite).to_string(),
    };
    let trimmed = raw.trim_matches('%');
    let mut escaped = String::with_capacity(trimmed.len() + 4);
    for c in trimmed.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '%' => escaped.push_str("\\%"),
            '_' => escaped.push_str("\\_"),
            other => escaped.push(other),
        }
    }
    format!("'%{}%'", escaped)
}

fn quote(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            other => escaped.push(other),
        }
    }
    format!("'{}'", escaped)
}
