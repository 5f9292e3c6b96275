//! Errors

use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error returned by builders and `execute()`.
#[derive(Error, Debug)]
pub enum Error {
    /// The query was configured incorrectly. Raised before any SQL is issued.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A relation or joined column could not be resolved.
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// The executor reported a failure. Passed through unchanged.
    #[error(transparent)]
    Execution(#[from] anyhow::Error),
}

/// Malformed query configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A condition had fewer than 2 or more than 3 parts.
    #[error("condition must have 2 or 3 parts (field, [operator,] value), got {len}")]
    InvalidPredicateArity {
        /// Number of parts supplied.
        len: usize,
    },

    /// A condition's field or operator part was not a string.
    #[error("condition part {position} must be a string, got {found}")]
    InvalidPredicatePart {
        /// Zero-based part index.
        position: usize,
        /// Debug rendering of the offending value.
        found: String,
    },

    /// `INSERT` or `UPDATE` was configured without any fields.
    #[error("no fields given for {kind} on `{table}`")]
    EmptyFieldList {
        /// `INSERT` or `UPDATE`.
        kind: &'static str,
        /// Target table.
        table: &'static str,
    },

    /// The ordering keyword was neither `ASC` nor `DESC`.
    #[error("order by keyword `{keyword}` not supported for `{field}`")]
    UnsupportedOrdering {
        /// Field being ordered.
        field: String,
        /// Keyword supplied.
        keyword: String,
    },

    /// A bind value has no database representation.
    #[error("unsupported value `{value}`: convert it explicitly before building the query")]
    UnsupportedValue {
        /// Debug rendering of the value.
        value: String,
    },
}

/// Relation metadata or joined rows that could not be matched up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The requested entity is not in any relationship map of `model`.
    #[error("`{relation}` is not related to `{model}` by has_many, has_one or belongs_to")]
    UnknownRelation {
        /// Table whose maps were searched.
        model: &'static str,
        /// Table that was requested.
        relation: &'static str,
    },

    /// A repeated column has fewer occurrences than the join position needs.
    #[error(
        "column `{column}` of `{table}` expects occurrence {index}, row only has {occurrences}"
    )]
    UnresolvedJoinIndex {
        /// Column name.
        column: String,
        /// Table the value was requested for.
        table: &'static str,
        /// Occurrence index required.
        index: usize,
        /// Occurrences present in the row.
        occurrences: usize,
    },

    /// The same table would be joined more than once.
    #[error("`{table}` is already part of the query; join it once")]
    AmbiguousJoin {
        /// Table joined twice.
        table: &'static str,
    },
}
