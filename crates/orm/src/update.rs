use sea_query::Alias;
use trellis_sql::{Connection, FetchMode};

use crate::entity::values_to_datatypes;
use crate::error::Result;
use crate::filter::{Condition, Connective, Predicate};
use crate::model::Model;
use crate::query::{Fields, Mutation, Query, QueryBuilder};
use crate::select::SelectBuilder;

/// Builder for constructing UPDATE queries.
///
/// Created through [`Model::update`], which rejects an empty field list.
#[derive(Clone, Debug)]
pub struct UpdateBuilder {
    model: &'static Model,
    fields: Fields,
    predicate: Predicate,
}

impl UpdateBuilder {
    pub(crate) const fn new(model: &'static Model, fields: Fields) -> Self {
        Self {
            model,
            fields,
            predicate: Predicate::new(),
        }
    }

    /// Sets (or replaces) a field value.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<sea_query::Value>) -> Self {
        self.fields = self.fields.set(field, value);
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

    /// Build the UPDATE query. `SET` values are bound before WHERE values.
    ///
    /// # Errors
    ///
    /// Returns an error if a value has no database representation.
    pub fn build(&self) -> Result<Query> {
        let mut statement = sea_query::Query::update();
        statement.table(Alias::new(self.model.table));

        for (field, value) in self.fields.iter() {
            statement.value(Alias::new(field), value.clone());
        }

        if let Some(predicate) = self.predicate.compile() {
            statement.and_where(predicate.into_expr());
        }

        let (sql, values) = statement.build(QueryBuilder::default());
        let params = values_to_datatypes(values)?;

        tracing::debug!(
            table = self.model.table,
            sql = %sql,
            param_count = params.len(),
            "UpdateBuilder generated SQL"
        );

        Ok(Query { sql, params })
    }

    /// Run the update, then read the rows matching the same predicate back.
    ///
    /// # Errors
    ///
    /// Returns configuration errors from building and passes executor
    /// failures through.
    pub async fn execute(self, conn: &dyn Connection) -> Result<Mutation> {
        let query = self.build()?;
        let outcome = conn.exec(query.sql, query.params).await?;

        let records = SelectBuilder::new(self.model)
            .filtered(self.predicate)
            .fetch(conn, FetchMode::Assoc)
            .await?;

        Ok(Mutation {
            rows_affected: outcome.rows_affected,
            records,
        })
    }
}
