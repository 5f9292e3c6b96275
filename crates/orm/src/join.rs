//! Relation joins.
//!
//! A [`Join`] names a related entity and, optionally, further relations of that
//! entity. [`plan`] resolves the tree against the relationship maps, depth
//! first, producing one SQL join per node.

use sea_query::{Expr, ExprTrait, JoinType, SimpleExpr};

use crate::entity::Entity;
use crate::error::ResolutionError;
use crate::model::{Model, RelationKind};
use crate::query::table_column;

/// A requested relation, with the relations to load beneath it.
#[derive(Clone, Debug, PartialEq)]
pub struct Join {
    pub(crate) model: &'static Model,
    pub(crate) nested: Vec<Self>,
}

impl Join {
    #[must_use]
    pub const fn new(model: &'static Model) -> Self {
        Self {
            model,
            nested: Vec::new(),
        }
    }

    /// Join the relation described by entity `E`.
    #[must_use]
    pub fn entity<E: Entity>() -> Self {
        Self::new(E::model())
    }

    /// Also load `nested`, a relation of this join's entity.
    #[must_use]
    pub fn with(mut self, nested: impl Into<Self>) -> Self {
        self.nested.push(nested.into());
        self
    }

    #[must_use]
    pub const fn model(&self) -> &'static Model {
        self.model
    }

    #[must_use]
    pub fn nested(&self) -> &[Self] {
        &self.nested
    }
}

impl From<&'static Model> for Join {
    fn from(model: &'static Model) -> Self {
        Self::new(model)
    }
}

/// Join types produced by the planner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    const fn into_join_type(self) -> JoinType {
        match self {
            Self::Inner => JoinType::InnerJoin,
            Self::Left => JoinType::LeftJoin,
        }
    }
}

/// One resolved join: `kind JOIN table ON left = right`.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedJoin {
    /// The joined entity.
    pub model: &'static Model,
    /// Map the relation was found in, on the parent entity.
    pub relation: RelationKind,
    pub kind: JoinKind,
    /// `(table, column)` on the parent side of the ON clause.
    pub left: (&'static str, &'static str),
    /// `(table, column)` on the joined side of the ON clause.
    pub right: (&'static str, &'static str),
}

impl PlannedJoin {
    /// Resolve a single relation of `parent`.
    ///
    /// | map          | join  | ON                            |
    /// |--------------|-------|-------------------------------|
    /// | `has_many`   | LEFT  | `parent.pk = related.fk`      |
    /// | `has_one`    | INNER | `parent.pk = related.pk`      |
    /// | `belongs_to` | LEFT  | `parent.fk = related.pk`      |
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::UnknownRelation`] when `related` is not in
    /// any of `parent`'s maps.
    pub fn resolve(parent: &Model, related: &'static Model) -> Result<Self, ResolutionError> {
        let (relation, entry) = parent.relation(related)?;

        let (kind, left, right) = match relation {
            RelationKind::HasMany => (
                JoinKind::Left,
                (parent.table, parent.primary_key),
                (related.table, entry.foreign_key),
            ),
            RelationKind::HasOne => (
                JoinKind::Inner,
                (parent.table, parent.primary_key),
                (related.table, related.primary_key),
            ),
            RelationKind::BelongsTo => (
                JoinKind::Left,
                (parent.table, entry.foreign_key),
                (related.table, related.primary_key),
            ),
        };

        Ok(Self {
            model: related,
            relation,
            kind,
            left,
            right,
        })
    }

    pub(crate) fn join_type(&self) -> JoinType {
        self.kind.into_join_type()
    }

    pub(crate) fn on(&self) -> SimpleExpr {
        let left = table_column(self.left.0, self.left.1);
        let right = table_column(self.right.0, self.right.1);
        Expr::col(left).eq(Expr::col(right))
    }
}

/// Resolve the requested joins of `base`, depth first.
///
/// Each node is resolved against its parent's relationship maps, so the output
/// order (pre-order) matches the table order of the resulting columns.
///
/// # Errors
///
/// Returns [`ResolutionError::UnknownRelation`] for a relation missing from
/// its parent's maps, and [`ResolutionError::AmbiguousJoin`] when a table
/// would appear in the query twice.
pub fn plan(base: &'static Model, joins: &[Join]) -> Result<Vec<PlannedJoin>, ResolutionError> {
    let mut planned = Vec::new();
    let mut seen = vec![base.table];
    walk(base, joins, &mut seen, &mut planned)?;
    Ok(planned)
}

fn walk(
    parent: &'static Model, joins: &[Join], seen: &mut Vec<&'static str>,
    planned: &mut Vec<PlannedJoin>,
) -> Result<(), ResolutionError> {
    for join in joins {
        let resolved = PlannedJoin::resolve(parent, join.model)?;
        if seen.contains(&join.model.table) {
            return Err(ResolutionError::AmbiguousJoin {
                table: join.model.table,
            });
        }
        seen.push(join.model.table);
        planned.push(resolved);
        walk(join.model, &join.nested, seen, planned)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Relation;

    fn authors() -> &'static Model {
        &AUTHORS
    }

    fn books() -> &'static Model {
        &BOOKS
    }

    fn profiles() -> &'static Model {
        &PROFILES
    }

    static AUTHORS: Model = Model {
        table: "authors",
        primary_key: "id",
        fields: &["id", "name"],
        has_many: &[Relation::new(books, "authors_id")],
        has_one: &[Relation::new(profiles, "id")],
        belongs_to: &[],
    };

    static BOOKS: Model = Model {
        table: "books",
        primary_key: "id",
        fields: &["id", "title", "authors_id"],
        has_many: &[],
        has_one: &[],
        belongs_to: &[Relation::new(authors, "authors_id")],
    };

    static PROFILES: Model = Model {
        table: "profiles",
        primary_key: "id",
        fields: &["id", "bio"],
        has_many: &[],
        has_one: &[],
        belongs_to: &[],
    };

    #[test]
    fn has_many_is_left_join_on_foreign_key() {
        let join = PlannedJoin::resolve(&AUTHORS, &BOOKS).unwrap();
        assert_eq!(join.kind, JoinKind::Left);
        assert_eq!(join.left, ("authors", "id"));
        assert_eq!(join.right, ("books", "authors_id"));
    }

    #[test]
    fn has_one_is_inner_join_on_primary_keys() {
        let join = PlannedJoin::resolve(&AUTHORS, &PROFILES).unwrap();
        assert_eq!(join.kind, JoinKind::Inner);
        assert_eq!(join.left, ("authors", "id"));
        assert_eq!(join.right, ("profiles", "id"));
    }

    #[test]
    fn belongs_to_is_left_join_from_foreign_key() {
        let join = PlannedJoin::resolve(&BOOKS, &AUTHORS).unwrap();
        assert_eq!(join.relation, RelationKind::BelongsTo);
        assert_eq!(join.left, ("books", "authors_id"));
        assert_eq!(join.right, ("authors", "id"));
    }

    #[test]
    fn nested_joins_resolve_against_their_parent() {
        let err = plan(&BOOKS, &[Join::new(&PROFILES)]).unwrap_err();
        assert_eq!(
            err,
            ResolutionError::UnknownRelation {
                model: "books",
                relation: "profiles",
            }
        );

        let planned = plan(&PROFILES, &[]).unwrap();
        assert!(planned.is_empty());
    }

    #[test]
    fn same_table_twice_is_ambiguous() {
        let err = plan(&AUTHORS, &[Join::new(&BOOKS).with(&AUTHORS)]).unwrap_err();
        assert_eq!(err, ResolutionError::AmbiguousJoin { table: "authors" });

        let err = plan(&AUTHORS, &[Join::new(&BOOKS), Join::new(&BOOKS)]).unwrap_err();
        assert_eq!(err, ResolutionError::AmbiguousJoin { table: "books" });
    }

    #[test]
    fn plan_is_pre_order() {
        let planned =
            plan(&AUTHORS, &[Join::new(&PROFILES), Join::new(&BOOKS)]).unwrap();
        let tables: Vec<_> = planned.iter().map(|join| join.model.table).collect();
        assert_eq!(tables, ["profiles", "books"]);
    }
}
