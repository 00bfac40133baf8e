//! In-memory doubles and builders for exercising the evaluator without a
//! storage engine. Trees are single-level: a row's foreign key points
//! directly at its scope root.

use crate::change::{Change, Lsn, Transaction};
use crate::relation::Relation;
use crate::scope::{ScopeFrame, ScopePath, ScopeResolver};
use crate::types::{Record, RowId, Value};
use compact_str::CompactString;
use std::collections::BTreeSet;

/// Persistent scope resolver over single-level ownership trees.
///
/// Rows are identified by their `id` column. Inserts and scope moves resolve
/// through the foreign-key value carried in the record (the row's new home);
/// updates and deletes resolve through the resolver's own state, which
/// reflects rows as they stood before the change, falling back to the record
/// when the row was never seen. `apply_change` returns a successor sharing
/// structure with its predecessor.
#[derive(Debug, Clone, Default)]
pub struct TreeResolver {
    edges: im::HashMap<Relation, (CompactString, Relation)>,
    parents: im::HashMap<(Relation, RowId), RowId>,
}

impl TreeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that rows of `child` point at rows of `parent` through the
    /// given foreign-key column.
    pub fn with_edge(mut self, child: Relation, fk_column: &str, parent: Relation) -> Self {
        self.edges.insert(child, (fk_column.into(), parent));
        self
    }

    /// Seed the resolver with an existing row-to-root membership.
    pub fn with_parent(mut self, relation: Relation, row: RowId, root: RowId) -> Self {
        self.parents.insert((relation, row), root);
        self
    }

    fn row_id_of(record: &Record) -> Option<RowId> {
        let id = record.get("id")?;
        if id.is_null() {
            return None;
        }
        Some(vec![id.clone()])
    }

    fn fk_value(record: &Record, column: &CompactString) -> Option<RowId> {
        let value = record.get(column)?;
        if value.is_null() {
            return None;
        }
        Some(vec![value.clone()])
    }
}

impl ScopeResolver for TreeResolver {
    fn scope_id(&self, scope: &Relation, change: &Change) -> Option<(RowId, ScopePath)> {
        let relation = change.relation();
        let row_id = Self::row_id_of(change.row())?;

        if relation == scope {
            let path = ScopePath {
                frames: vec![ScopeFrame {
                    relation: scope.clone(),
                    id: row_id.clone(),
                }],
            };
            return Some((row_id, path));
        }

        let (fk_column, parent) = self.edges.get(relation)?;
        if parent != scope {
            return None;
        }
        let root = match change {
            Change::Insert { record, .. } | Change::ScopeMove { record, .. } => {
                Self::fk_value(record, fk_column)?
            }
            Change::Update { record, .. } => match self.parents.get(&(relation.clone(), row_id.clone())) {
                Some(root) => root.clone(),
                None => Self::fk_value(record, fk_column)?,
            },
            Change::Delete { old_record, .. } => {
                match self.parents.get(&(relation.clone(), row_id.clone())) {
                    Some(root) => root.clone(),
                    None => Self::fk_value(old_record, fk_column)?,
                }
            }
        };
        let path = ScopePath {
            frames: vec![
                ScopeFrame {
                    relation: scope.clone(),
                    id: root.clone(),
                },
                ScopeFrame {
                    relation: relation.clone(),
                    id: row_id,
                },
            ],
        };
        Some((root, path))
    }

    fn modifies_fk(&self, scope: &Relation, change: &Change) -> bool {
        let Change::Update {
            relation,
            changed_columns,
            ..
        } = change
        else {
            return false;
        };
        self.edges
            .get(relation)
            .is_some_and(|(fk_column, parent)| parent == scope && changed_columns.contains(fk_column))
    }

    fn apply_change(&self, change: &Change) -> Self {
        let relation = change.relation();
        let Some(row_id) = Self::row_id_of(change.row()) else {
            return self.clone();
        };
        let mut next = self.clone();
        match change {
            Change::Delete { .. } => {
                next.parents.remove(&(relation.clone(), row_id));
            }
            Change::Insert { record, .. }
            | Change::Update { record, .. }
            | Change::ScopeMove { record, .. } => {
                if let Some((fk_column, _)) = self.edges.get(relation) {
                    if let Some(root) = Self::fk_value(record, fk_column) {
                        next.parents.insert((relation.clone(), row_id), root);
                    }
                }
            }
        }
        next
    }
}

pub fn record(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(name, value)| (CompactString::from(*name), value.clone()))
        .collect()
}

pub fn columns(names: &[&str]) -> BTreeSet<CompactString> {
    names.iter().map(|n| CompactString::from(*n)).collect()
}

pub fn insert(relation: Relation, pairs: &[(&str, Value)]) -> Change {
    Change::Insert {
        relation,
        record: record(pairs),
    }
}

pub fn update(
    relation: Relation,
    old: &[(&str, Value)],
    new: &[(&str, Value)],
    changed: &[&str],
) -> Change {
    Change::Update {
        relation,
        record: record(new),
        old_record: record(old),
        changed_columns: columns(changed),
    }
}

pub fn delete(relation: Relation, pairs: &[(&str, Value)]) -> Change {
    Change::Delete {
        relation,
        old_record: record(pairs),
    }
}

pub fn transaction(lsn: u64, changes: Vec<Change>) -> Transaction {
    Transaction::new(Lsn(lsn), changes)
}
