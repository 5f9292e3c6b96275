//! WHERE clause construction.
//!
//! Conditions are grouped into segments. Every `where*` call on a builder adds
//! one segment carrying its own connective, and the predicate compiler turns
//! the ordered list of segments into a parameterized SQL fragment.

use std::fmt::{self, Display};

use sea_query::{Expr, SimpleExpr, Value};

use crate::error::ConfigurationError;
use crate::query::quote_ident;

/// Logical connective joining conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `field operator value` comparison.
///
/// The operator is written into the SQL as given; the value is always bound.
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: String,
    pub value: Value,
}

impl Condition {
    /// Comparison with an explicit operator.
    #[must_use]
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// Equality comparison.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, "=", value)
    }
}

impl<F, V> From<(F, V)> for Condition
where
    F: Into<String>,
    V: Into<Value>,
{
    fn from((field, value): (F, V)) -> Self {
        Self::eq(field, value)
    }
}

impl<F, O, V> From<(F, O, V)> for Condition
where
    F: Into<String>,
    O: Into<String>,
    V: Into<Value>,
{
    fn from((field, operator, value): (F, O, V)) -> Self {
        Self::new(field, operator, value)
    }
}

/// Build a condition from loosely typed parts: `[field, value]` or
/// `[field, operator, value]`.
impl TryFrom<Vec<Value>> for Condition {
    type Error = ConfigurationError;

    fn try_from(parts: Vec<Value>) -> Result<Self, Self::Error> {
        let len = parts.len();
        let mut parts = parts.into_iter();
        match (parts.next(), parts.next(), parts.next(), len) {
            (Some(field), Some(value), None, 2) => Ok(Self::eq(text(field, 0)?, value)),
            (Some(field), Some(operator), Some(value), 3) => {
                Ok(Self::new(text(field, 0)?, text(operator, 1)?, value))
            }
            _ => Err(ConfigurationError::InvalidPredicateArity { len }),
        }
    }
}

fn text(value: Value, position: usize) -> Result<String, ConfigurationError> {
    match value {
        Value::String(Some(text)) => Ok(*text),
        other => Err(ConfigurationError::InvalidPredicatePart {
            position,
            found: format!("{other:?}"),
        }),
    }
}

/// Conditions added by one `where*` call, joined by the segment's connective.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub connective: Connective,
    pub conditions: Vec<Condition>,
}

/// Ordered list of segments making up a WHERE clause.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Predicate {
    segments: Vec<Segment>,
}

impl Predicate {
    #[must_use]
    pub const fn new() -> Self {
        Self { segments: Vec::new() }
    }

    /// Append a segment. Segments without conditions are dropped.
    pub fn push(&mut self, connective: Connective, conditions: Vec<Condition>) {
        if conditions.is_empty() {
            return;
        }
        self.segments.push(Segment {
            connective,
            conditions,
        });
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Compile to a SQL fragment (without the `WHERE` keyword) and its bind
    /// values. Returns `None` when there are no conditions.
    ///
    /// Within a segment, conditions are joined by the segment's connective.
    /// Between segments, the connective of the earlier segment is used. A
    /// segment is parenthesized when it has more than one condition and is
    /// not the only segment.
    #[must_use]
    pub fn compile(&self) -> Option<CompiledPredicate> {
        if self.segments.is_empty() {
            return None;
        }

        let grouped = self.segments.len() > 1;
        let mut sql = String::new();
        let mut values = Vec::new();

        let mut previous: Option<Connective> = None;
        for segment in &self.segments {
            if let Some(connective) = previous {
                sql.push_str(&format!(" {connective} "));
            }

            let parenthesize = grouped && segment.conditions.len() > 1;
            if parenthesize {
                sql.push('(');
            }
            for (i, condition) in segment.conditions.iter().enumerate() {
                if i > 0 {
                    sql.push_str(&format!(" {} ", segment.connective));
                }
                sql.push_str(&format!("{} {} ?", quote_ident(&condition.field), condition.operator));
                values.push(condition.value.clone());
            }
            if parenthesize {
                sql.push(')');
            }

            previous = Some(segment.connective);
        }

        Some(CompiledPredicate { sql, values })
    }
}

/// Output of [`Predicate::compile`].
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledPredicate {
    pub sql: String,
    pub values: Vec<Value>,
}

impl CompiledPredicate {
    /// Hand the fragment to sea-query as a custom expression with bound values.
    #[must_use]
    pub fn into_expr(self) -> SimpleExpr {
        Expr::cust_with_values(self.sql, self.values)
    }
}
