//! Result assembly.
//!
//! Joined rows repeat the base row once per related row, and a column name
//! shared by several joined tables comes back with one value per occurrence.
//! [`assemble`] folds such rows back into a forest of [`Record`]s: one root per
//! distinct base primary key, each carrying a slot per requested relation,
//! recursively.
//!
//! The tables of a query are laid out as `[base, joins in depth-first order]`,
//! the same order the join planner emits them in. For a table at layout
//! position `p`, the value of a repeated column `c` is occurrence `k`, where
//! `k` counts the tables before `p` that declare `c`.

use trellis_sql::{Column, DataType, RawRow};

use crate::error::{ResolutionError, Result};
use crate::join::{self, Join};
use crate::model::Model;
use crate::record::{Record, RecordBuilder};

/// A requested relation with its layout position.
struct Node {
    model: &'static Model,
    position: usize,
    nested: Vec<Self>,
}

struct Layout {
    tables: Vec<&'static Model>,
    nodes: Vec<Node>,
}

impl Layout {
    fn new(base: &'static Model, joins: &[Join]) -> Result<Self> {
        let planned = join::plan(base, joins)?;

        let mut tables = Vec::with_capacity(planned.len() + 1);
        tables.push(base);
        tables.extend(planned.iter().map(|join| join.model));

        let mut next = 1;
        let nodes = number(joins, &mut next);
        Ok(Self { tables, nodes })
    }

    /// Value of `column` for the table at `position`. `None` when the row does
    /// not contain the column at all.
    fn value<'r>(
        &self, row: &'r RawRow, position: usize, column: &str,
    ) -> Result<Option<&'r DataType>> {
        let Some(found) = row.get(column) else {
            return Ok(None);
        };

        match found {
            Column::Scalar(value) => Ok(Some(value)),
            Column::PerOccurrence(values) => {
                let index =
                    self.tables[..position].iter().filter(|model| model.declares(column)).count();
                values.get(index).map(Some).ok_or_else(|| {
                    ResolutionError::UnresolvedJoinIndex {
                        column: column.to_string(),
                        table: self.tables[position].table,
                        index,
                        occurrences: values.len(),
                    }
                    .into()
                })
            }
        }
    }

    /// Flatten the row for the table at `position`, keeping declared fields
    /// only, and open an empty slot for each relation in `nested`.
    fn record(&self, row: &RawRow, position: usize, nested: &[Node]) -> Result<Record> {
        let model = self.tables[position];

        let mut builder = RecordBuilder::new(model);
        for field in model.fields {
            if let Some(value) = self.value(row, position, field)? {
                builder = builder.set(field, value.clone());
            }
        }

        let mut record = builder.build();
        for node in nested {
            record.ensure_slot(node.model.table);
        }
        Ok(record)
    }

    /// Attach the instance of `node` found in `row` under `parent`, then its
    /// own nested relations from the same row.
    fn attach(&self, parent: &mut Record, row: &RawRow, node: &Node) -> Result<()> {
        let model = node.model;
        parent.ensure_slot(model.table);

        // A NULL key means the outer join found nothing for this row
        let key = match self.value(row, node.position, model.primary_key)? {
            Some(key) if !key.is_null() => key,
            _ => return Ok(()),
        };

        let children = parent.slot_mut(model.table);
        let index = match children.iter().position(|child| child.primary_key() == Some(key)) {
            Some(index) => index,
            None => {
                children.push(self.record(row, node.position, &node.nested)?);
                children.len() - 1
            }
        };

        for nested in &node.nested {
            self.attach(&mut children[index], row, nested)?;
        }
        Ok(())
    }
}

fn number(joins: &[Join], next: &mut usize) -> Vec<Node> {
    joins
        .iter()
        .map(|join| {
            let position = *next;
            *next += 1;
            Node {
                model: join.model,
                position,
                nested: number(&join.nested, next),
            }
        })
        .collect()
}

/// Assemble rows fetched for `base` (with `joins`) into root records.
///
/// Roots keep the order their first row arrived in, and so do related records
/// within each slot. Roots are de-duplicated by primary key when the key was
/// selected; otherwise every row is its own root.
///
/// # Errors
///
/// Returns a [`ResolutionError`] when a join cannot be resolved or a repeated
/// column has fewer occurrences than the layout requires. Nothing is returned
/// on failure.
pub fn assemble(base: &'static Model, joins: &[Join], rows: &[RawRow]) -> Result<Vec<Record>> {
    let layout = Layout::new(base, joins)?;

    // root pass
    let mut roots: Vec<Record> = Vec::new();
    let mut owners: Vec<usize> = Vec::with_capacity(rows.len());
    for row in rows {
        let key = layout.value(row, 0, base.primary_key)?;
        let existing =
            key.and_then(|key| roots.iter().position(|root| root.primary_key() == Some(key)));

        let index = match existing {
            Some(index) => index,
            None => {
                roots.push(layout.record(row, 0, &layout.nodes)?);
                roots.len() - 1
            }
        };
        owners.push(index);
    }

    // relation passes, in request order
    for node in &layout.nodes {
        for (row, owner) in rows.iter().zip(&owners) {
            layout.attach(&mut roots[*owner], row, node)?;
        }
    }

    tracing::debug!(
        table = base.table,
        rows = rows.len(),
        roots = roots.len(),
        relations = layout.nodes.len(),
        "assembled result forest"
    );

    Ok(roots)
}
