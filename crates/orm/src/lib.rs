//! Query construction and result-graph assembly for SQL databases.
//!
//! Declare entities with their relations, build parameterized statements with
//! a fluent API, and get joined rows back as a forest of records with nested
//! related collections.
//!
//! # Quick Start
//!
//! ## Define Entities
//!
//! ```ignore
//! entity! {
//!     table = "exercises",
//!     has_many = [Question => "exercises_id"],
//!     #[derive(Debug, Clone)]
//!     pub struct Exercise {
//!         pub id: i64,
//!         pub title: String,
//!         pub state: String,
//!     }
//! }
//!
//! entity! {
//!     table = "questions",
//!     belongs_to = [Exercise => "exercises_id"],
//!     #[derive(Debug, Clone)]
//!     pub struct Question {
//!         pub id: i64,
//!         pub label: String,
//!         pub exercises_id: i64,
//!     }
//! }
//! ```
//!
//! ## CRUD Operations
//!
//! ```ignore
//! use trellis_orm::{Entity, Fields};
//!
//! // Select with conditions; `(field, value)` is an equality test
//! let open = Exercise::select()
//!     .r#where(("state", "open"))
//!     .where_all([("id", ">", 3), ("id", "<", 10)])
//!     .order_by("title", "desc")?
//!     .limit(10)
//!     .execute(conn.as_ref())
//!     .await?;
//!
//! // Insert, returning the stored row
//! let created = Exercise::insert(Fields::new().set("title", "Quiz").set("state", "building"))?
//!     .execute(conn.as_ref())
//!     .await?;
//!
//! // Update, returning the affected rows
//! Exercise::update(Fields::new().set("state", "closed"))?
//!     .r#where(("id", 9))
//!     .execute(conn.as_ref())
//!     .await?;
//!
//! // Delete, returning the number of rows removed
//! Exercise::delete().r#where(("id", 9)).execute(conn.as_ref()).await?;
//! ```
//!
//! ## Joins
//!
//! Relations are loaded by naming the related entity. Nested relations are
//! resolved against their parent entity.
//!
//! ```ignore
//! use trellis_orm::Join;
//!
//! let exercises = Exercise::find(8)
//!     .join(Join::entity::<Fulfillment>().with(Join::entity::<Response>()))
//!     .execute(conn.as_ref())
//!     .await?;
//!
//! let fulfillments = exercises[0].related_entities::<Fulfillment>()?;
//! let responses = exercises[0].related("fulfillments").unwrap()[0].related("responses");
//! ```

mod assemble;
mod delete;
mod entity;
mod error;
mod filter;
mod insert;
mod join;
mod model;
mod query;
mod record;
mod select;
mod update;

pub use assemble::assemble;
pub use delete::DeleteBuilder;
pub use entity::{Entity, FetchValue};
pub use error::{ConfigurationError, Error, ResolutionError, Result};
pub use filter::{CompiledPredicate, Condition, Connective, Predicate, Segment};
pub use insert::InsertBuilder;
pub use join::{Join, JoinKind, PlannedJoin, plan};
pub use model::{Model, Relation, RelationKind, Schema};
pub use query::{Fields, Mutation, Query, quote_ident};
pub use record::{Record, RecordBuilder, into_json};
// Bind values for conditions and field maps.
pub use sea_query::Value;
pub use select::{Direction, SelectBuilder, Selection};
// Re-export the executor types used in results and custom value conversions.
pub use trellis_sql::{Column, Connection, DataType, RawRow};
pub use update::UpdateBuilder;

// Re-exports for ``entity`` macro use only.
#[doc(hidden)]
pub mod __private {
    pub use anyhow::Result;
}
