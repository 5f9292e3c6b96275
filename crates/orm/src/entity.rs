use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sea_query::{Value, Values};
use trellis_sql::DataType;

use crate::delete::DeleteBuilder;
use crate::error::{self, ConfigurationError};
use crate::insert::InsertBuilder;
use crate::model::Model;
use crate::query::Fields;
use crate::record::Record;
use crate::select::SelectBuilder;
use crate::update::UpdateBuilder;

/// Types that can be read out of a [`Record`] field.
///
/// Implemented for the usual scalar types (`i64`, `String`, `DateTime<Utc>`,
/// etc) and for `Option<T>`, which maps SQL `NULL` and missing fields to `None`.
pub trait FetchValue: Sized {
    /// Fetch the value of field `col`.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is missing or cannot be converted to the
    /// target type.
    fn fetch(record: &Record, col: &str) -> Result<Self>;
}

/// Declares an entity struct together with its static [`Model`] descriptor.
///
/// Struct field names are the table's columns. `primary_key` defaults to `id`
/// and each relationship map is optional, but when present they must appear
/// in the order shown.
///
/// # Examples
///
/// ```ignore
/// entity! {
///     table = "exercises",
///     has_many = [Question => "exercises_id"],
///     #[derive(Debug, Clone)]
///     pub struct Exercise {
///         pub id: i64,
///         pub title: String,
///     }
/// }
///
/// entity! {
///     table = "questions",
///     primary_key = "id",
///     belongs_to = [Exercise => "exercises_id"],
///     #[derive(Debug, Clone)]
///     pub struct Question {
///         pub id: i64,
///         pub label: String,
///         pub exercises_id: i64,
///     }
/// }
/// ```
#[macro_export]
macro_rules! entity {
    (@primary_key) => { "id" };
    (@primary_key $pk:literal) => { $pk };

    (
        table = $table:literal,
        $(primary_key = $pk:literal,)?
        $(has_many = [$($many:ty => $many_fk:literal),* $(,)?],)?
        $(has_one = [$($one:ty => $one_fk:literal),* $(,)?],)?
        $(belongs_to = [$($owner:ty => $owner_fk:literal),* $(,)?],)?
        $(#[$meta:meta])*
        pub struct $struct_name:ident {
            $(
                $(#[$field_meta:meta])*
                pub $field_name:ident : $field_type:ty
            ),* $(,)?
        }
    ) => {
        #[allow(missing_docs)]
        $(#[$meta])*
        pub struct $struct_name {
            $(
                $(#[$field_meta])*
                pub $field_name : $field_type
            ),*
        }

        impl $crate::Entity for $struct_name {
            const TABLE: &'static str = $table;

            fn model() -> &'static $crate::Model {
                static MODEL: $crate::Model = $crate::Model {
                    table: $table,
                    primary_key: $crate::entity!(@primary_key $($pk)?),
                    fields: &[ $( stringify!($field_name) ),* ],
                    has_many: &[ $($( $crate::Relation::new(<$many as $crate::Entity>::model, $many_fk) ),*)? ],
                    has_one: &[ $($( $crate::Relation::new(<$one as $crate::Entity>::model, $one_fk) ),*)? ],
                    belongs_to: &[ $($( $crate::Relation::new(<$owner as $crate::Entity>::model, $owner_fk) ),*)? ],
                };
                &MODEL
            }

            fn from_record(record: &$crate::Record) -> $crate::__private::Result<Self> {
                Ok(Self {
                    $(
                        $field_name: <$field_type as $crate::FetchValue>::fetch(record, stringify!($field_name))?,
                    )*
                })
            }
        }
    };
}

/// Database entities with a static descriptor.
///
/// Typically implemented via the `entity!` macro rather than manually. The
/// query entry points forward to the descriptor.
pub trait Entity: Sized {
    /// The database table name for this entity.
    const TABLE: &'static str;

    /// The entity's descriptor.
    fn model() -> &'static Model;

    /// Construct an entity instance from an assembled record.
    ///
    /// # Errors
    ///
    /// Returns an error if any required field is missing or cannot be converted
    /// to the expected type.
    fn from_record(record: &Record) -> Result<Self>;

    /// Table-qualified field name, e.g. `Exercise::field("id") == "exercises.id"`.
    #[must_use]
    fn field(name: &str) -> String {
        Self::model().field(name)
    }

    #[must_use]
    fn select() -> SelectBuilder {
        Self::model().select()
    }

    #[must_use]
    fn find(primary_key: impl Into<Value>) -> SelectBuilder {
        Self::model().find(primary_key)
    }

    /// # Errors
    ///
    /// Returns [`ConfigurationError::EmptyFieldList`] when `fields` is empty.
    fn insert(fields: Fields) -> error::Result<InsertBuilder> {
        Self::model().insert(fields)
    }

    /// # Errors
    ///
    /// Returns [`ConfigurationError::EmptyFieldList`] when `fields` is empty.
    fn update(fields: Fields) -> error::Result<UpdateBuilder> {
        Self::model().update(fields)
    }

    #[must_use]
    fn delete() -> DeleteBuilder {
        Self::model().delete()
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// Outbound conversion
pub(crate) fn values_to_datatypes(values: Values) -> Result<Vec<DataType>, ConfigurationError> {
    values.into_iter().map(value_to_datatype).collect()
}

fn value_to_datatype(value: Value) -> Result<DataType, ConfigurationError> {
    let data_type = match value {
        Value::Bool(v) => DataType::Boolean(v),
        Value::TinyInt(v) => DataType::Int32(v.map(i32::from)),
        Value::SmallInt(v) => DataType::Int32(v.map(i32::from)),
        Value::Int(v) => DataType::Int32(v),
        Value::BigInt(v) => DataType::Int64(v),
        Value::TinyUnsigned(v) => DataType::Uint32(v.map(u32::from)),
        Value::SmallUnsigned(v) => DataType::Uint32(v.map(u32::from)),
        Value::Unsigned(v) => DataType::Uint32(v),
        Value::BigUnsigned(v) => DataType::Uint64(v),
        Value::Float(v) => DataType::Float(v),
        Value::Double(v) => DataType::Double(v),
        Value::String(v) => DataType::Str(v.map(|value| *value)),
        Value::Char(v) => DataType::Str(v.map(|ch| ch.to_string())),
        Value::Bytes(v) => DataType::Binary(v.map(|bytes| *bytes)),
        Value::ChronoDate(v) => DataType::Date(v.map(|date| date.format(DATE_FORMAT).to_string())),
        Value::ChronoTime(v) => DataType::Time(v.map(|time| time.to_string())),
        Value::ChronoDateTime(v) => {
            DataType::Timestamp(v.map(|dt| dt.format(DATETIME_FORMAT).to_string()))
        }
        Value::ChronoDateTimeUtc(v) => DataType::Timestamp(v.map(|dt| dt.to_rfc3339())),
        other => {
            return Err(ConfigurationError::UnsupportedValue {
                value: format!("{other:?}"),
            });
        }
    };
    Ok(data_type)
}

/// Turn a value read back from the database into a bindable value.
pub(crate) fn datatype_to_value(value: DataType) -> Value {
    match value {
        DataType::Boolean(v) => Value::Bool(v),
        DataType::Int32(v) => Value::Int(v),
        DataType::Int64(v) => Value::BigInt(v),
        DataType::Uint32(v) => Value::Unsigned(v),
        DataType::Uint64(v) => Value::BigUnsigned(v),
        DataType::Float(v) => Value::Float(v),
        DataType::Double(v) => Value::Double(v),
        DataType::Binary(v) => Value::Bytes(v.map(Box::new)),
        DataType::Str(v) | DataType::Date(v) | DataType::Time(v) | DataType::Timestamp(v) => {
            Value::String(v.map(Box::new))
        }
    }
}

// Inbound conversion

macro_rules! fetch_integer {
    ($($ty:ty),+) => {$(
        impl FetchValue for $ty {
            fn fetch(record: &Record, col: &str) -> Result<Self> {
                let value = integer(col, field(record, col)?)?;
                Self::try_from(value).with_context(|| {
                    format!("`{col}` value {value} is out of range for {}", stringify!($ty))
                })
            }
        }
    )+};
}

fetch_integer!(i32, i64, u32, u64);

impl FetchValue for bool {
    fn fetch(record: &Record, col: &str) -> Result<Self> {
        match field(record, col)? {
            DataType::Boolean(Some(flag)) => Ok(*flag),
            other => match integer(col, other) {
                Ok(0) => Ok(false),
                Ok(1) => Ok(true),
                _ => Err(mismatch(col, "a boolean", other)),
            },
        }
    }
}

impl FetchValue for f64 {
    #[allow(clippy::cast_precision_loss)]
    fn fetch(record: &Record, col: &str) -> Result<Self> {
        match field(record, col)? {
            DataType::Double(Some(x)) => Ok(*x),
            DataType::Float(Some(x)) => Ok(Self::from(*x)),
            other => integer(col, other).map(|n| n as Self),
        }
    }
}

impl FetchValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn fetch(record: &Record, col: &str) -> Result<Self> {
        match field(record, col)? {
            DataType::Float(Some(x)) => Ok(*x),
            _ => f64::fetch(record, col).map(|x| x as Self),
        }
    }
}

impl FetchValue for String {
    fn fetch(record: &Record, col: &str) -> Result<Self> {
        text(col, field(record, col)?).map(str::to_owned)
    }
}

impl FetchValue for Vec<u8> {
    fn fetch(record: &Record, col: &str) -> Result<Self> {
        match field(record, col)? {
            DataType::Binary(Some(bytes)) => Ok(bytes.clone()),
            other => Err(mismatch(col, "binary", other)),
        }
    }
}

// SQLite hands dates and timestamps back as plain text
impl FetchValue for DateTime<Utc> {
    fn fetch(record: &Record, col: &str) -> Result<Self> {
        let raw = text(col, field(record, col)?)?;
        DateTime::parse_from_rfc3339(raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT).map(|naive| naive.and_utc())
            })
            .map_err(|_e| anyhow!("`{col}`: unsupported timestamp {raw:?}, expected RFC3339"))
    }
}

impl FetchValue for NaiveDate {
    fn fetch(record: &Record, col: &str) -> Result<Self> {
        let raw = text(col, field(record, col)?)?;
        Self::parse_from_str(raw, DATE_FORMAT)
            .map_err(|_e| anyhow!("`{col}`: unsupported date {raw:?}, expected {DATE_FORMAT}"))
    }
}

impl FetchValue for serde_json::Value {
    fn fetch(record: &Record, col: &str) -> Result<Self> {
        let parsed = match field(record, col)? {
            DataType::Str(Some(raw)) => serde_json::from_str(raw),
            DataType::Binary(Some(bytes)) => serde_json::from_slice(bytes),
            other => return Err(mismatch(col, "JSON text", other)),
        };
        parsed.with_context(|| format!("`{col}` is not valid JSON"))
    }
}

impl<T: FetchValue> FetchValue for Option<T> {
    fn fetch(record: &Record, col: &str) -> Result<Self> {
        match record.get(col) {
            Some(value) if !value.is_null() => T::fetch(record, col).map(Some),
            _ => Ok(None),
        }
    }
}

fn field<'a>(record: &'a Record, name: &str) -> Result<&'a DataType> {
    record.get(name).ok_or_else(|| anyhow!("missing field '{name}' on `{}`", record.model().table))
}

fn mismatch(col: &str, expected: &str, found: &DataType) -> anyhow::Error {
    anyhow!("`{col}` holds {found:?}, expected {expected}")
}

fn integer(col: &str, value: &DataType) -> Result<i128> {
    match value {
        DataType::Int32(Some(n)) => Ok(i128::from(*n)),
        DataType::Int64(Some(n)) => Ok(i128::from(*n)),
        DataType::Uint32(Some(n)) => Ok(i128::from(*n)),
        DataType::Uint64(Some(n)) => Ok(i128::from(*n)),
        other => Err(mismatch(col, "an integer", other)),
    }
}

fn text<'a>(col: &str, value: &'a DataType) -> Result<&'a str> {
    match value {
        DataType::Str(Some(raw))
        | DataType::Date(Some(raw))
        | DataType::Time(Some(raw))
        | DataType::Timestamp(Some(raw)) => Ok(raw),
        other => Err(mismatch(col, "text", other)),
    }
}
