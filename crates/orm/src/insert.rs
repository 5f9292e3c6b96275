use sea_query::{Alias, SimpleExpr};
use trellis_sql::{Connection, FetchMode};

use crate::entity::{datatype_to_value, values_to_datatypes};
use crate::error::Result;
use crate::model::Model;
use crate::query::{Fields, Mutation, Query, QueryBuilder};
use crate::select::SelectBuilder;

/// Builder for constructing INSERT queries.
///
/// Created through [`Model::insert`], which rejects an empty field list.
#[derive(Clone, Debug)]
pub struct InsertBuilder {
    model: &'static Model,
    fields: Fields,
}

impl InsertBuilder {
    pub(crate) const fn new(model: &'static Model, fields: Fields) -> Self {
        Self { model, fields }
    }

    /// Sets (or replaces) a field value.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<sea_query::Value>) -> Self {
        self.fields = self.fields.set(field, value);
        self
    }

    /// Build the INSERT query.
    ///
    /// # Errors
    ///
    /// Returns an error if a value has no database representation.
    pub fn build(&self) -> Result<Query> {
        let mut statement = sea_query::Query::insert();
        statement.into_table(Alias::new(self.model.table));

        let columns: Vec<Alias> = self.fields.iter().map(|(field, _)| Alias::new(field)).collect();
        statement.columns(columns);
        let values: Vec<SimpleExpr> =
            self.fields.iter().map(|(_, value)| SimpleExpr::Value(value.clone())).collect();
        statement.values_panic(values);

        let (sql, values) = statement.build(QueryBuilder::default());
        let params = values_to_datatypes(values)?;

        tracing::debug!(
            table = self.model.table,
            sql = %sql,
            param_count = params.len(),
            "InsertBuilder generated SQL"
        );

        Ok(Query { sql, params })
    }

    /// Run the insert, then read the new row back by the executor's last
    /// insert id.
    ///
    /// # Errors
    ///
    /// Returns configuration errors from building and passes executor
    /// failures through.
    pub async fn execute(self, conn: &dyn Connection) -> Result<Mutation> {
        let query = self.build()?;
        let outcome = conn.exec(query.sql, query.params).await?;

        let records = SelectBuilder::new(self.model)
            .r#where((self.model.primary_key, datatype_to_value(outcome.last_insert_id)))
            .fetch(conn, FetchMode::Assoc)
            .await?;

        Ok(Mutation {
            rows_affected: outcome.rows_affected,
            records,
        })
    }
}
