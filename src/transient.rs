use crate::change::Lsn;
use crate::relation::Relation;
use crate::roles::RoleGrant;
use crate::types::RowId;
use compact_str::CompactString;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A short-lived grant keyed by assignment id, targeting one scope root, and
/// valid over the half-open position window `[valid_from, valid_to)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransientRecord {
    pub assignment_id: CompactString,
    pub target_relation: Relation,
    pub target_id: RowId,
    pub valid_from: Lsn,
    pub valid_to: Lsn,
}

impl TransientRecord {
    pub fn contains(&self, lsn: Lsn) -> bool {
        self.valid_from <= lsn && lsn < self.valid_to
    }
}

/// Lookup interface for transient permissions. The backing table is owned by
/// the surrounding process; the core reads it through this handle and assumes
/// reads are consistent for the duration of one change evaluation.
pub trait TransientLookup: Clone {
    /// Pairs each scoped role-grant with the transient records earned by its
    /// assignment that are valid at `lsn`. Roles without an assignment id
    /// (the builtins) never match.
    fn for_roles(&self, role_grants: &[RoleGrant], lsn: Lsn) -> Vec<(RoleGrant, TransientRecord)>;
}

/// Process-wide in-memory transient table. Cloning shares the underlying
/// storage, so every compiled permissions handle observes the same records.
#[derive(Debug, Clone, Default)]
pub struct TransientTable {
    records: Arc<RwLock<HashMap<CompactString, Vec<TransientRecord>>>>,
}

impl TransientTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: TransientRecord) {
        self.records
            .write()
            .entry(record.assignment_id.clone())
            .or_default()
            .push(record);
    }

    /// Drop every record earned by the given assignment, e.g. when the role
    /// assignment itself is revoked.
    pub fn remove_assignment(&self, assignment_id: &str) {
        self.records.write().remove(assignment_id);
    }

    /// Drop records whose window closed at or before the given position. The
    /// surrounding system calls this as the replication position advances.
    pub fn prune_until(&self, lsn: Lsn) {
        let mut records = self.records.write();
        records.retain(|_, list| {
            list.retain(|record| record.valid_to > lsn);
            !list.is_empty()
        });
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl TransientLookup for TransientTable {
    fn for_roles(&self, role_grants: &[RoleGrant], lsn: Lsn) -> Vec<(RoleGrant, TransientRecord)> {
        let records = self.records.read();
        let mut out = Vec::new();
        for pair in role_grants {
            let Some(assignment_id) = pair.role.assignment_id() else {
                continue;
            };
            let Some(list) = records.get(assignment_id.as_str()) else {
                continue;
            };
            for record in list {
                if record.contains(lsn) {
                    out.push((pair.clone(), record.clone()));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::{TransientLookup, TransientRecord, TransientTable};
    use crate::change::Lsn;
    use crate::grants::{Grant, GrantRecord};
    use crate::relation::Relation;
    use crate::roles::{Role, RoleGrant};
    use crate::types::Value;

    fn record(assignment_id: &str, from: u64, to: u64) -> TransientRecord {
        TransientRecord {
            assignment_id: assignment_id.into(),
            target_relation: Relation::new("public", "issues"),
            target_id: vec![Value::Integer(42)],
            valid_from: Lsn(from),
            valid_to: Lsn(to),
        }
    }

    fn scoped_pair(assignment_id: &str) -> RoleGrant {
        let grant = Grant::from_record(&GrantRecord {
            role_name: "member".into(),
            schema: "public".into(),
            table: "issues".into(),
            privileges: vec!["UPDATE".into()],
            columns: None,
            check: None,
        })
        .expect("decode grant");
        RoleGrant {
            role: Role::Assigned {
                name: "member".into(),
                user_id: Some("u1".into()),
                assignment_id: assignment_id.into(),
                scope: Some((Relation::new("public", "projects"), vec![Value::Integer(7)])),
            },
            grant,
        }
    }

    #[test]
    fn window_is_half_open() {
        let table = TransientTable::new();
        table.insert(record("a1", 10, 20));
        let pairs = vec![scoped_pair("a1")];

        assert_eq!(table.for_roles(&pairs, Lsn(10)).len(), 1);
        assert_eq!(table.for_roles(&pairs, Lsn(19)).len(), 1);
        assert!(table.for_roles(&pairs, Lsn(20)).is_empty());
        assert!(table.for_roles(&pairs, Lsn(9)).is_empty());
    }

    #[test]
    fn builtin_roles_never_match() {
        let table = TransientTable::new();
        table.insert(record("a1", 0, 100));
        let grant = scoped_pair("a1").grant;
        let pairs = vec![RoleGrant {
            role: Role::Anyone,
            grant,
        }];
        assert!(table.for_roles(&pairs, Lsn(50)).is_empty());
    }

    #[test]
    fn prune_drops_closed_windows_only() {
        let table = TransientTable::new();
        table.insert(record("a1", 0, 10));
        table.insert(record("a2", 0, 50));
        table.prune_until(Lsn(10));

        let pairs = vec![scoped_pair("a1"), scoped_pair("a2")];
        let live = table.for_roles(&pairs, Lsn(20));
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].1.assignment_id, "a2");
    }

    #[test]
    fn remove_assignment_forgets_all_records() {
        let table = TransientTable::new();
        table.insert(record("a1", 0, 100));
        table.remove_assignment("a1");
        assert!(table.is_empty());
    }

    #[test]
    fn clones_share_storage() {
        let table = TransientTable::new();
        let other = table.clone();
        table.insert(record("a1", 0, 100));
        assert!(!other.is_empty());
    }
}
