use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// A nullable scalar exchanged with the database. `None` is SQL `NULL`.
#[derive(Clone, Debug, PartialEq)]
pub enum DataType {
    /// Boolean value.
    Boolean(Option<bool>),
    /// 32-bit signed integer.
    Int32(Option<i32>),
    /// 64-bit signed integer.
    Int64(Option<i64>),
    /// 32-bit unsigned integer.
    Uint32(Option<u32>),
    /// 64-bit unsigned integer.
    Uint64(Option<u64>),
    /// 32-bit float.
    Float(Option<f32>),
    /// 64-bit float.
    Double(Option<f64>),
    /// UTF-8 text.
    Str(Option<String>),
    /// Raw bytes.
    Binary(Option<Vec<u8>>),
    /// Date formatted as `%Y-%m-%d`.
    Date(Option<String>),
    /// Time formatted as `%H:%M:%S%.f`.
    Time(Option<String>),
    /// Timestamp formatted as RFC3339 or `%Y-%m-%d %H:%M:%S%.f`.
    Timestamp(Option<String>),
}

impl DataType {
    /// Returns `true` when the value is SQL `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(
            self,
            Self::Boolean(None)
                | Self::Int32(None)
                | Self::Int64(None)
                | Self::Uint32(None)
                | Self::Uint64(None)
                | Self::Float(None)
                | Self::Double(None)
                | Self::Str(None)
                | Self::Binary(None)
                | Self::Date(None)
                | Self::Time(None)
                | Self::Timestamp(None)
        )
    }
}

/// A single result column.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// Column name as reported by the database (no table qualifier).
    pub name: String,
    /// Column value.
    pub value: DataType,
}

/// A result row exactly as the executor produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    /// Result columns in select-list order.
    pub fields: Vec<Field>,
}

/// How a [`Row`] is presented to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchMode {
    /// One scalar per column name. When a name repeats, the last occurrence wins.
    Assoc,
    /// One scalar per unique column name, and a per-occurrence list (in column
    /// order) for every name that repeats across joined tables.
    Named,
}

/// Value of one column name within a [`RawRow`].
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    /// The column name is unique in the row.
    Scalar(DataType),
    /// The column name repeats; one value per occurrence, in column order.
    PerOccurrence(Vec<DataType>),
}

impl Column {
    /// The first occurrence of the column. For joined rows this is the base
    /// table's value.
    #[must_use]
    pub fn first(&self) -> Option<&DataType> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::PerOccurrence(values) => values.first(),
        }
    }

    /// Number of occurrences of the column name.
    #[must_use]
    pub const fn occurrences(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::PerOccurrence(values) => values.len(),
        }
    }
}

/// A row keyed by column name, as produced by [`Row::fetch`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawRow {
    columns: HashMap<String, Column>,
}

impl RawRow {
    /// Look up a column by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Number of distinct column names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate over column names and values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(name, column)| (name.as_str(), column))
    }
}

impl FromIterator<(String, Column)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (String, Column)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

impl Row {
    /// Present the row in the requested [`FetchMode`].
    #[must_use]
    pub fn fetch(self, mode: FetchMode) -> RawRow {
        let mut columns: HashMap<String, Column> = HashMap::with_capacity(self.fields.len());

        for Field { name, value } in self.fields {
            match mode {
                FetchMode::Assoc => {
                    columns.insert(name, Column::Scalar(value));
                }
                FetchMode::Named => match columns.entry(name) {
                    Entry::Vacant(entry) => {
                        entry.insert(Column::Scalar(value));
                    }
                    Entry::Occupied(mut entry) => {
                        let previous =
                            std::mem::replace(entry.get_mut(), Column::PerOccurrence(Vec::new()));
                        let merged = match previous {
                            Column::Scalar(first) => Column::PerOccurrence(vec![first, value]),
                            Column::PerOccurrence(mut values) => {
                                values.push(value);
                                Column::PerOccurrence(values)
                            }
                        };
                        entry.insert(merged);
                    }
                },
            }
        }

        RawRow { columns }
    }
}
