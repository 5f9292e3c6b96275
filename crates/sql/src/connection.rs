use std::fmt::Debug;
use std::future::Future;

use anyhow::Result;
use futures::future::BoxFuture;

use crate::types::{DataType, Row};

/// Result type for asynchronous operations.
pub type FutureResult<T> = BoxFuture<'static, Result<T>>;

/// SQL providers implement the [`Connection`] trait to allow the query layer
/// to execute statements against a backend (`SQLite`, Postgres, etc).
///
/// Statements are plain SQL text with positional `?` placeholders; `params`
/// are bound in order.
pub trait Connection: Debug + Send + Sync + 'static {
    /// Execute a query and return the resulting rows.
    ///
    /// Every result column is returned as its own [`crate::Field`], in column
    /// order, even when several columns share a name.
    fn query(&self, query: String, params: Vec<DataType>) -> FutureResult<Vec<Row>>;

    /// Execute a statement that does not return rows (e.g., an `INSERT`,
    /// `UPDATE`, or `DELETE`).
    fn exec(&self, query: String, params: Vec<DataType>) -> FutureResult<ExecOutcome>;
}

/// What the executor reports back after running a non-query statement.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecOutcome {
    /// Number of rows changed by the statement.
    pub rows_affected: u64,

    /// Identifier generated by the most recent successful insert on the
    /// connection. Captured together with `rows_affected` so no other
    /// statement can interleave.
    pub last_insert_id: DataType,
}

/// Implemented by backend resources to allow the host to connect to them.
pub trait Backend: Sized + Sync + Send {
    /// The options used to connect to the backend.
    type ConnectOptions: FromEnv;

    /// Connect to the resource.
    #[must_use]
    fn connect() -> impl Future<Output = Result<Self>> {
        async { Self::connect_with(Self::ConnectOptions::from_env()?).await }
    }

    /// Connect to the resource with the specified options.
    fn connect_with(options: Self::ConnectOptions) -> impl Future<Output = Result<Self>>;
}

/// Trait for creating connection options from environment variables.
pub trait FromEnv: Sized {
    /// Create connection options from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    fn from_env() -> Result<Self>;
}
