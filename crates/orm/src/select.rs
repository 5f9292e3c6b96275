use std::str::FromStr;

use sea_query::{Alias, Expr, Order};
use trellis_sql::{Connection, FetchMode, RawRow};

use crate::assemble::assemble;
use crate::entity::values_to_datatypes;
use crate::error::{ConfigurationError, Result};
use crate::filter::{Condition, Connective, Predicate};
use crate::join::{self, Join};
use crate::model::Model;
use crate::query::{Query, QueryBuilder, column_ref, quote_ident, table_column};
use crate::record::Record;

/// `LIMIT` bound when only an offset is set: the largest value SQLite accepts.
const UNBOUNDED: u64 = u64::MAX >> 1;

/// One entry of the select list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    /// A column: `field`, `table.field` or `*`.
    Field(String),
    /// `function(argument) [AS alias]`.
    Function {
        name: String,
        argument: String,
        alias: Option<String>,
    },
}

impl From<&str> for Selection {
    fn from(field: &str) -> Self {
        Self::Field(field.to_string())
    }
}

impl From<String> for Selection {
    fn from(field: String) -> Self {
        Self::Field(field)
    }
}

impl<N: Into<String>, A: Into<String>> From<(N, A)> for Selection {
    fn from((name, argument): (N, A)) -> Self {
        Self::Function {
            name: name.into(),
            argument: argument.into(),
            alias: None,
        }
    }
}

impl<N: Into<String>, A: Into<String>, L: Into<String>> From<(N, A, L)> for Selection {
    fn from((name, argument, alias): (N, A, L)) -> Self {
        Self::Function {
            name: name.into(),
            argument: argument.into(),
            alias: Some(alias.into()),
        }
    }
}

/// Sort direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(keyword: &str) -> std::result::Result<Self, Self::Err> {
        if keyword.eq_ignore_ascii_case("ASC") {
            Ok(Self::Asc)
        } else if keyword.eq_ignore_ascii_case("DESC") {
            Ok(Self::Desc)
        } else {
            Err(())
        }
    }
}

impl From<Direction> for Order {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Asc => Self::Asc,
            Direction::Desc => Self::Desc,
        }
    }
}

/// Builder for constructing SELECT queries.
#[derive(Clone, Debug)]
pub struct SelectBuilder {
    model: &'static Model,
    fields: Vec<Selection>,
    predicate: Predicate,
    order: Vec<(String, Direction)>,
    group_by: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    joins: Vec<Join>,
}

impl SelectBuilder {
    /// Creates a `SELECT *` builder for `model`.
    #[must_use]
    pub const fn new(model: &'static Model) -> Self {
        Self {
            model,
            fields: Vec::new(),
            predicate: Predicate::new(),
            order: Vec::new(),
            group_by: None,
            limit: None,
            offset: None,
            joins: Vec::new(),
        }
    }

    /// Replace the select list. An empty list selects `*`.
    #[must_use]
    pub fn fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Selection>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a condition, joined to what follows with `AND`.
    #[must_use]
    pub fn r#where(mut self, condition: impl Into<Condition>) -> Self {
        self.predicate.push(Connective::And, vec![condition.into()]);
        self
    }

    /// Adds a condition, joined to what follows with `OR`.
    #[must_use]
    pub fn where_or(mut self, condition: impl Into<Condition>) -> Self {
        self.predicate.push(Connective::Or, vec![condition.into()]);
        self
    }

    /// Adds a group of conditions joined with `AND`.
    #[must_use]
    pub fn where_all<I>(mut self, conditions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Condition>,
    {
        self.predicate.push(Connective::And, conditions.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a group of conditions joined with `OR`.
    #[must_use]
    pub fn where_any<I>(mut self, conditions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Condition>,
    {
        self.predicate.push(Connective::Or, conditions.into_iter().map(Into::into).collect());
        self
    }

    /// Adds an ORDER BY clause from a textual keyword (`ASC` or `DESC`, any case).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnsupportedOrdering`] for any other keyword.
    pub fn order_by(self, field: impl Into<String>, keyword: &str) -> Result<Self> {
        let field = field.into();
        let Ok(direction) = keyword.parse::<Direction>() else {
            return Err(ConfigurationError::UnsupportedOrdering {
                field,
                keyword: keyword.to_string(),
            }
            .into());
        };
        Ok(self.order(field, direction))
    }

    /// Adds ascending ORDER BY clause.
    #[must_use]
    pub fn order_by_asc(self, field: impl Into<String>) -> Self {
        self.order(field.into(), Direction::Asc)
    }

    /// Adds descending ORDER BY clause.
    #[must_use]
    pub fn order_by_desc(self, field: impl Into<String>) -> Self {
        self.order(field.into(), Direction::Desc)
    }

    fn order(mut self, field: String, direction: Direction) -> Self {
        self.order.push((field, direction));
        self
    }

    /// Sets the GROUP BY field.
    #[must_use]
    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by = Some(field.into());
        self
    }

    /// Sets the maximum number of rows to return.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of rows to skip.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Load a related entity (and, through [`Join::with`], its relations).
    #[must_use]
    pub fn join(mut self, join: impl Into<Join>) -> Self {
        self.joins.push(join.into());
        self
    }

    pub(crate) fn filtered(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    #[must_use]
    pub const fn model(&self) -> &'static Model {
        self.model
    }

    /// Build the SELECT query.
    ///
    /// # Errors
    ///
    /// Returns an error if a join cannot be resolved or a bind value has no
    /// database representation.
    pub fn build(&self) -> Result<Query> {
        let mut statement = sea_query::Query::select();
        let planned = join::plan(self.model, &self.joins)?;

        if self.fields.is_empty() && planned.is_empty() {
            statement.column(column_ref("*"));
        } else if self.fields.is_empty() {
            // one column per declared field, in assembler layout order
            let tables = std::iter::once(self.model).chain(planned.iter().map(|join| join.model));
            for model in tables {
                for field in model.fields {
                    statement.column(table_column(model.table, field));
                }
            }
        }

        for selection in &self.fields {
            match selection {
                Selection::Field(field) => {
                    statement.column(column_ref(field));
                }
                Selection::Function {
                    name,
                    argument,
                    alias,
                } => {
                    let call = Expr::cust(format!("{name}({})", quote_ident(argument)));
                    match alias {
                        Some(alias) => statement.expr_as(call, Alias::new(alias)),
                        None => statement.expr(call),
                    };
                }
            }
        }

        statement.from(Alias::new(self.model.table));

        for join in &planned {
            statement.join(join.join_type(), Alias::new(join.model.table), join.on());
        }

        if let Some(predicate) = self.predicate.compile() {
            statement.and_where(predicate.into_expr());
        }

        if let Some(field) = &self.group_by {
            statement.group_by_col(column_ref(field));
        }

        for (field, direction) in &self.order {
            statement.order_by(column_ref(field), Order::from(*direction));
        }

        // SQLite only accepts OFFSET after a LIMIT
        if let Some(limit) = self.limit.or_else(|| self.offset.map(|_| UNBOUNDED)) {
            statement.limit(limit);
        }

        if let Some(offset) = self.offset {
            statement.offset(offset);
        }

        let (sql, values) = statement.build(QueryBuilder::default());
        let params = values_to_datatypes(values)?;

        tracing::debug!(
            table = self.model.table,
            sql = %sql,
            param_count = params.len(),
            "SelectBuilder generated SQL"
        );

        Ok(Query { sql, params })
    }

    /// Run the query and assemble the rows into a forest of records.
    ///
    /// # Errors
    ///
    /// Returns configuration and resolution errors from building and
    /// assembling, and passes executor failures through.
    pub async fn execute(self, conn: &dyn Connection) -> Result<Vec<Record>> {
        self.fetch(conn, FetchMode::Named).await
    }

    /// Run the query and return the first root record, if any.
    ///
    /// # Errors
    ///
    /// See [`SelectBuilder::execute`].
    pub async fn first(self, conn: &dyn Connection) -> Result<Option<Record>> {
        Ok(self.execute(conn).await?.into_iter().next())
    }

    /// Run the query and return the rows as the executor produced them, one
    /// scalar per column name.
    ///
    /// Aggregate aliases such as `COUNT(..) AS total` are not declared
    /// fields, so this is how they are read.
    ///
    /// # Errors
    ///
    /// Returns configuration and resolution errors from building and passes
    /// executor failures through.
    pub async fn rows(self, conn: &dyn Connection) -> Result<Vec<RawRow>> {
        let query = self.build()?;
        let rows = conn.query(query.sql, query.params).await?;
        Ok(rows.into_iter().map(|row| row.fetch(FetchMode::Assoc)).collect())
    }

    pub(crate) async fn fetch(self, conn: &dyn Connection, mode: FetchMode) -> Result<Vec<Record>> {
        let query = self.build()?;
        let rows = conn.query(query.sql, query.params).await?;
        let rows: Vec<RawRow> = rows.into_iter().map(|row| row.fetch(mode)).collect();
        assemble(self.model, &self.joins, &rows)
    }
}
