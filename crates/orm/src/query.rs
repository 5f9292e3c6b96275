use sea_query::backend::{
    EscapeBuilder, OperLeftAssocDecider, PrecedenceDecider, QuotedBuilder, TableRefBuilder,
};
use sea_query::prepare::SqlWriter;
use sea_query::{Alias, BinOper, ColumnRef, IntoIden, Oper, Quote, SimpleExpr, SubQueryStatement, Value};
use trellis_sql::DataType;

use crate::record::Record;

/// A compiled statement: SQL text with positional `?` placeholders and the
/// values to bind, in placeholder order.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub sql: String,
    pub params: Vec<DataType>,
}

/// Outcome of an executed `INSERT` or `UPDATE`.
#[derive(Clone, Debug, PartialEq)]
pub struct Mutation {
    /// Rows changed by the statement.
    pub rows_affected: u64,
    /// The affected rows, re-read after the statement ran.
    pub records: Vec<Record>,
}

/// Ordered field/value pairs for `INSERT` and `UPDATE`.
///
/// Setting a field twice keeps its first position and the latest value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fields(Vec<(String, Value)>);

impl Fields {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Set `field` to `value`.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        match self.0.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = value,
            None => self.0.push((field, value)),
        }
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<F: Into<String>, V: Into<Value>> FromIterator<(F, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (F, V)>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), |fields, (field, value)| fields.set(field, value))
    }
}

/// Turns `field`, `table.field`, `*` or `table.*` into a column reference.
pub(crate) fn column_ref(field: &str) -> ColumnRef {
    match field.split_once('.') {
        Some((table, "*")) => ColumnRef::TableAsterisk(Alias::new(table).into_iden()),
        Some((table, column)) => table_column(table, column),
        None if field == "*" => ColumnRef::Asterisk,
        None => ColumnRef::Column(Alias::new(field).into_iden()),
    }
}

pub(crate) fn table_column(table: &str, column: &str) -> ColumnRef {
    ColumnRef::TableColumn(Alias::new(table).into_iden(), Alias::new(column).into_iden())
}

/// Quote an identifier for direct inclusion in SQL text.
///
/// Each dot-separated part is wrapped in `"`, doubling any embedded quote.
/// `*` parts are left as they are.
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    ident
        .split('.')
        .map(|part| {
            if part == "*" { part.to_string() } else { format!("\"{}\"", part.replace('"', "\"\"")) }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// SQL dialect used to render statements: `"` quoting and `?` placeholders.
pub struct QueryBuilder {
    pub quote: Quote,
    pub placeholder: &'static str,
    pub numbered: bool,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self {
            quote: Quote::new(b'"'),
            placeholder: "?",
            numbered: false,
        }
    }
}

impl QuotedBuilder for QueryBuilder {
    fn quote(&self) -> Quote {
        self.quote
    }
}

impl EscapeBuilder for QueryBuilder {}

impl TableRefBuilder for QueryBuilder {}

impl OperLeftAssocDecider for QueryBuilder {
    fn well_known_left_associative(&self, op: &BinOper) -> bool {
        matches!(
            op,
            BinOper::And | BinOper::Or | BinOper::Add | BinOper::Sub | BinOper::Mul | BinOper::Mod
        )
    }
}

impl PrecedenceDecider for QueryBuilder {
    fn inner_expr_well_known_greater_precedence(
        &self, inner: &SimpleExpr, _outer_oper: &Oper,
    ) -> bool {
        // Columns and values are atomic; anything compound keeps its parentheses
        matches!(
            inner,
            SimpleExpr::Column(_)
                | SimpleExpr::Value(_)
                | SimpleExpr::Constant(_)
                | SimpleExpr::Keyword(_)
        )
    }
}

impl sea_query::backend::QueryBuilder for QueryBuilder {
    fn prepare_query_statement(&self, query: &SubQueryStatement, sql: &mut dyn SqlWriter) {
        match query {
            SubQueryStatement::SelectStatement(s) => self.prepare_select_statement(s, sql),
            SubQueryStatement::InsertStatement(s) => self.prepare_insert_statement(s, sql),
            SubQueryStatement::UpdateStatement(s) => self.prepare_update_statement(s, sql),
            SubQueryStatement::DeleteStatement(s) => self.prepare_delete_statement(s, sql),
            SubQueryStatement::WithStatement(s) => self.prepare_with_query(s, sql),
        }
    }

    fn prepare_value(&self, value: &Value, sql: &mut dyn SqlWriter) {
        sql.push_param(value.clone(), self);
    }

    fn placeholder(&self) -> (&str, bool) {
        (self.placeholder, self.numbered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting() {
        assert_eq!(quote_ident("exercises.title"), r#""exercises"."title""#);
        assert_eq!(quote_ident("title"), r#""title""#);
        assert_eq!(quote_ident("exercises.*"), r#""exercises".*"#);
        assert_eq!(quote_ident(r#"we"ird"#), r#""we""ird""#);
    }

    #[test]
    fn column_refs() {
        assert!(matches!(column_ref("*"), ColumnRef::Asterisk));
        assert!(matches!(column_ref("exercises.*"), ColumnRef::TableAsterisk(_)));
        assert!(matches!(column_ref("exercises.id"), ColumnRef::TableColumn(_, _)));
        assert!(matches!(column_ref("id"), ColumnRef::Column(_)));
    }

    #[test]
    fn fields_keep_first_position() {
        let fields = Fields::new().set("title", "a").set("state", "open").set("title", "b");
        let names: Vec<_> = fields.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["title", "state"]);
        assert_eq!(fields.iter().next().map(|(_, value)| value.clone()), Some(Value::from("b")));
    }
}
