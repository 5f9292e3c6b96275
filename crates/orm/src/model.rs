use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::ptr;

use sea_query::Value;

use crate::delete::DeleteBuilder;
use crate::error::{ConfigurationError, ResolutionError, Result};
use crate::insert::InsertBuilder;
use crate::query::Fields;
use crate::select::{SelectBuilder, Selection};
use crate::update::UpdateBuilder;

/// Static description of an entity: its table, key, columns and relations.
///
/// Descriptors live for the whole process and are compared by address, so the
/// usual way to declare one is a `static` (or the [`crate::entity`] macro).
///
/// `fields` may be a subset of the table's columns. Joined selects name the
/// declared fields of every table explicitly, so undeclared columns never
/// reach the assembler.
#[derive(Debug)]
pub struct Model {
    /// Database table name. Also the slot name related collections attach under.
    pub table: &'static str,
    /// Primary-key column.
    pub primary_key: &'static str,
    /// Declared columns, in table order.
    pub fields: &'static [&'static str],
    /// Related entities holding a foreign key back to this one.
    pub has_many: &'static [Relation],
    /// Related entities sharing this entity's primary key.
    pub has_one: &'static [Relation],
    /// Related entities this one points at through its own foreign key.
    pub belongs_to: &'static [Relation],
}

/// One entry in a relationship map.
#[derive(Clone, Copy)]
pub struct Relation {
    /// The related descriptor. A function so descriptors can refer to each other.
    pub model: fn() -> &'static Model,
    /// Foreign-key column linking the two entities.
    pub foreign_key: &'static str,
}

/// Which relationship map a relation was found in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationKind {
    /// One-to-many; the foreign key lives on the related table.
    HasMany,
    /// One-to-one on primary keys.
    HasOne,
    /// Many-to-one; the foreign key lives on this table.
    BelongsTo,
}

impl Relation {
    /// Creates a relationship map entry.
    #[must_use]
    pub const fn new(model: fn() -> &'static Model, foreign_key: &'static str) -> Self {
        Self { model, foreign_key }
    }

    /// The related descriptor.
    #[must_use]
    pub fn model(&self) -> &'static Model {
        (self.model)()
    }
}

impl Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("table", &self.model().table)
            .field("foreign_key", &self.foreign_key)
            .finish()
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

impl Eq for Model {}

impl Model {
    /// Qualify a field with the table name, e.g. `exercises.title`.
    ///
    /// Use it to avoid ambiguous column names once tables are joined.
    #[must_use]
    pub fn field(&self, field: &str) -> String {
        format!("{}.{field}", self.table)
    }

    /// Whether `field` is one of the declared columns.
    #[must_use]
    pub fn declares(&self, field: &str) -> bool {
        self.fields.contains(&field)
    }

    /// Look `related` up in the relationship maps, checking `has_many`, then
    /// `has_one`, then `belongs_to`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::UnknownRelation`] when no map mentions `related`.
    pub fn relation(
        &self, related: &'static Self,
    ) -> std::result::Result<(RelationKind, &'static Relation), ResolutionError> {
        let maps = [
            (RelationKind::HasMany, self.has_many),
            (RelationKind::HasOne, self.has_one),
            (RelationKind::BelongsTo, self.belongs_to),
        ];

        maps.into_iter()
            .find_map(|(kind, map)| {
                map.iter().find(|relation| relation.model() == related).map(|found| (kind, found))
            })
            .ok_or(ResolutionError::UnknownRelation {
                model: self.table,
                relation: related.table,
            })
    }

    /// Start a `SELECT *` query.
    #[must_use]
    pub fn select(&'static self) -> SelectBuilder {
        SelectBuilder::new(self)
    }

    /// Start a `SELECT` of specific columns or function calls.
    #[must_use]
    pub fn select_fields<I>(&'static self, fields: I) -> SelectBuilder
    where
        I: IntoIterator,
        I::Item: Into<Selection>,
    {
        SelectBuilder::new(self).fields(fields)
    }

    /// Start a `SELECT` filtered on the (table-qualified) primary key.
    #[must_use]
    pub fn find(&'static self, primary_key: impl Into<Value>) -> SelectBuilder {
        SelectBuilder::new(self).r#where((self.field(self.primary_key), primary_key.into()))
    }

    /// Start an `INSERT` of `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::EmptyFieldList`] when `fields` is empty.
    pub fn insert(&'static self, fields: Fields) -> Result<InsertBuilder> {
        if fields.is_empty() {
            return Err(ConfigurationError::EmptyFieldList {
                kind: "INSERT",
                table: self.table,
            }
            .into());
        }
        Ok(InsertBuilder::new(self, fields))
    }

    /// Start an `UPDATE` setting `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::EmptyFieldList`] when `fields` is empty.
    pub fn update(&'static self, fields: Fields) -> Result<UpdateBuilder> {
        if fields.is_empty() {
            return Err(ConfigurationError::EmptyFieldList {
                kind: "UPDATE",
                table: self.table,
            }
            .into());
        }
        Ok(UpdateBuilder::new(self, fields))
    }

    /// Start a `DELETE`.
    #[must_use]
    pub fn delete(&'static self) -> DeleteBuilder {
        DeleteBuilder::new(self)
    }
}

/// Name to descriptor lookup, populated once at startup.
#[derive(Debug, Default)]
pub struct Schema {
    models: HashMap<&'static str, &'static Model>,
}

impl Schema {
    /// Build a schema from a set of descriptors.
    #[must_use]
    pub fn new(models: impl IntoIterator<Item = &'static Model>) -> Self {
        let mut schema = Self::default();
        for model in models {
            schema.register(model);
        }
        schema
    }

    /// Add a descriptor, replacing any previous one for the same table.
    pub fn register(&mut self, model: &'static Model) {
        self.models.insert(model.table, model);
    }

    /// Look a descriptor up by table name.
    #[must_use]
    pub fn model(&self, table: &str) -> Option<&'static Model> {
        self.models.get(table).copied()
    }

    /// Number of registered descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
