use crate::relation::Relation;
use crate::types::Record;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Opaque monotonically increasing log position. Supplied by the replication
/// pipeline; the core only compares it against transient-permission windows.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Lsn(pub u64);

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single row change crossing the replication boundary.
///
/// `ScopeMove` is synthesized by the write validator when an update edits a
/// foreign key on the path to a scope root: it carries the new row data so the
/// destination scope is checked alongside the origin. It never needs to cross
/// the crate's public boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Change {
    Insert {
        relation: Relation,
        record: Record,
    },
    Update {
        relation: Relation,
        record: Record,
        old_record: Record,
        changed_columns: BTreeSet<CompactString>,
    },
    Delete {
        relation: Relation,
        old_record: Record,
    },
    ScopeMove {
        relation: Relation,
        record: Record,
    },
}

impl Change {
    pub fn relation(&self) -> &Relation {
        match self {
            Change::Insert { relation, .. }
            | Change::Update { relation, .. }
            | Change::Delete { relation, .. }
            | Change::ScopeMove { relation, .. } => relation,
        }
    }

    /// The row data the change acts on: the new record for inserts, updates
    /// and scope moves, the old record for deletes.
    pub fn row(&self) -> &Record {
        match self {
            Change::Insert { record, .. }
            | Change::Update { record, .. }
            | Change::ScopeMove { record, .. } => record,
            Change::Delete { old_record, .. } => old_record,
        }
    }
}

/// An ordered list of changes admitted or rejected as one unit. Order is
/// significant: earlier changes may alter scope state for later ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub lsn: Lsn,
    pub changes: Vec<Change>,
}

impl Transaction {
    pub fn new(lsn: Lsn, changes: Vec<Change>) -> Self {
        Self { lsn, changes }
    }
}

#[cfg(test)]
mod tests {
    use super::{Change, Relation};
    use crate::types::Value;
    use std::collections::BTreeMap;

    #[test]
    fn row_points_at_old_record_for_deletes() {
        let mut old = BTreeMap::new();
        old.insert("id".into(), Value::Integer(1));
        let change = Change::Delete {
            relation: Relation::new("public", "issues"),
            old_record: old.clone(),
        };
        assert_eq!(change.row(), &old);
    }
}
