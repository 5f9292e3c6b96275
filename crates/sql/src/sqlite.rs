//! Default `SQLite` implementation of [`Connection`].
//!
//! This is a lightweight implementation for development and test use.

#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

use std::sync::Arc;

use anyhow::{Context, Result};
use fromenv::FromEnv;
use futures::FutureExt;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection as SqliteConnection, params_from_iter};
use tracing::instrument;

use crate::connection::{Backend, Connection, ExecOutcome, FutureResult};
use crate::types::{DataType, Field, Row};

/// Options used to connect to the SQL database.
///
/// This struct is used to load connection options from environment variables.
#[derive(Debug, Clone, FromEnv)]
pub struct ConnectOptions {
    /// Database path or `SQLite` URI.
    #[env(from = "SQL_DATABASE", default = "file::memory:?cache=shared")]
    pub database: String,
}

impl crate::connection::FromEnv for ConnectOptions {
    fn from_env() -> Result<Self> {
        Self::from_env().finalize().context("issue loading connection options")
    }
}

/// Default `SQLite` backend.
#[derive(Debug, Clone)]
pub struct SqlDefault {
    // Mutex is necessary since rusqlite::Connection isn't `Sync`; it also
    // serializes statements on the single physical connection.
    conn: Arc<parking_lot::Mutex<SqliteConnection>>,
}

impl Backend for SqlDefault {
    type ConnectOptions = ConnectOptions;

    #[instrument]
    async fn connect_with(options: Self::ConnectOptions) -> Result<Self> {
        tracing::debug!("initializing SQLite connection to: {}", options.database);

        let conn = Arc::new(parking_lot::Mutex::new(
            SqliteConnection::open(&options.database).context("failed to open SQLite database")?,
        ));

        Ok(Self { conn })
    }
}

impl SqlDefault {
    /// Hand out a connection handle backed by the shared `SQLite` connection.
    #[must_use]
    pub fn open(&self) -> Arc<dyn Connection> {
        tracing::debug!("opening SQL connection");
        Arc::new(SqliteHandle {
            conn: Arc::clone(&self.conn),
        })
    }
}

#[derive(Debug, Clone)]
struct SqliteHandle {
    conn: Arc<parking_lot::Mutex<SqliteConnection>>,
}

impl Connection for SqliteHandle {
    fn query(&self, query: String, params: Vec<DataType>) -> FutureResult<Vec<Row>> {
        tracing::debug!(sql = %query, "executing query");
        let conn = Arc::clone(&self.conn);

        async move {
            let conn = conn.lock();
            let mut stmt = conn.prepare(&query).context("failed to prepare statement")?;

            // one name per result index: joined tables may repeat a column name
            let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

            let mut cursor =
                stmt.query(params_from_iter(bind(&params))).context("failed to execute query")?;

            let mut rows = Vec::new();
            while let Some(current) = cursor.next().context("failed to fetch row")? {
                let fields = names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        let value = current.get_ref(i).context("failed to get column value")?;
                        Ok(Field {
                            name: name.clone(),
                            value: from_sqlite(value)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                rows.push(Row { fields });
            }

            Ok(rows)
        }
        .boxed()
    }

    fn exec(&self, query: String, params: Vec<DataType>) -> FutureResult<ExecOutcome> {
        tracing::debug!(sql = %query, "executing statement");
        let conn = Arc::clone(&self.conn);

        async move {
            let conn = conn.lock();
            let changed = conn
                .prepare(&query)
                .context("failed to prepare statement")?
                .execute(params_from_iter(bind(&params)))
                .context("failed to execute statement")?;

            // read under the same lock so no other statement can move the rowid
            Ok(ExecOutcome {
                rows_affected: changed as u64,
                last_insert_id: DataType::Int64(Some(conn.last_insert_rowid())),
            })
        }
        .boxed()
    }
}

fn bind(params: &[DataType]) -> Vec<SqlValue> {
    params.iter().map(to_sqlite).collect()
}

fn to_sqlite(value: &DataType) -> SqlValue {
    match value {
        DataType::Boolean(Some(flag)) => SqlValue::Integer(i64::from(*flag)),
        DataType::Int32(Some(n)) => SqlValue::Integer(i64::from(*n)),
        DataType::Uint32(Some(n)) => SqlValue::Integer(i64::from(*n)),
        DataType::Int64(Some(n)) => SqlValue::Integer(*n),
        DataType::Uint64(Some(n)) => SqlValue::Integer(*n as i64),
        DataType::Float(Some(x)) => SqlValue::Real(f64::from(*x)),
        DataType::Double(Some(x)) => SqlValue::Real(*x),
        DataType::Str(Some(text))
        | DataType::Date(Some(text))
        | DataType::Time(Some(text))
        | DataType::Timestamp(Some(text)) => SqlValue::Text(text.clone()),
        DataType::Binary(Some(bytes)) => SqlValue::Blob(bytes.clone()),
        _ => SqlValue::Null,
    }
}

fn from_sqlite(value: ValueRef) -> Result<DataType> {
    let converted = match value {
        ValueRef::Null => DataType::Str(None),
        ValueRef::Integer(n) => DataType::Int64(Some(n)),
        ValueRef::Real(x) => DataType::Double(Some(x)),
        ValueRef::Text(raw) => DataType::Str(Some(
            std::str::from_utf8(raw).context("invalid UTF-8 in text value")?.to_owned(),
        )),
        ValueRef::Blob(bytes) => DataType::Binary(Some(bytes.to_vec())),
    };
    Ok(converted)
}
