use sea_query::Alias;
use trellis_sql::Connection;

use crate::entity::values_to_datatypes;
use crate::error::Result;
use crate::filter::{Condition, Connective, Predicate};
use crate::model::Model;
use crate::query::{Query, QueryBuilder};

/// Builder for constructing DELETE queries.
#[derive(Clone, Debug)]
pub struct DeleteBuilder {
    model: &'static Model,
    predicate: Predicate,
}

impl DeleteBuilder {
    pub(crate) const fn new(model: &'static Model) -> Self {
        Self {
            model,
            predicate: Predicate::new(),
        }
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

    /// Build the DELETE query.
    ///
    /// # Errors
    ///
    /// Returns an error if any query values cannot be converted.
    pub fn build(&self) -> Result<Query> {
        let mut statement = sea_query::Query::delete();
        statement.from_table(Alias::new(self.model.table));

        if let Some(predicate) = self.predicate.compile() {
            statement.and_where(predicate.into_expr());
        }

        let (sql, values) = statement.build(QueryBuilder::default());
        let params = values_to_datatypes(values)?;

        tracing::debug!(
            table = self.model.table,
            sql = %sql,
            param_count = params.len(),
            "DeleteBuilder generated SQL"
        );

        Ok(Query { sql, params })
    }

    /// Run the delete and return the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns configuration errors from building and passes executor
    /// failures through.
    pub async fn execute(self, conn: &dyn Connection) -> Result<u64> {
        let query = self.build()?;
        let outcome = conn.exec(query.sql, query.params).await?;
        Ok(outcome.rows_affected)
    }
}
