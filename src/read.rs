use crate::change::{Change, Transaction};
use crate::compile::CompiledPermissions;
use crate::eval::validate_read;
use crate::grants::Privilege;
use crate::relation::Relation;
use crate::scope::{ScopePath, ScopeResolver};
use crate::transient::TransientLookup;
use crate::types::{Record, RowId};
use serde::{Deserialize, Serialize};

/// Notification that a row visible before this transaction is no longer
/// visible after it, so downstream caches can evict it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveOut {
    pub change: Change,
    pub scope_path: ScopePath,
    pub relation: Relation,
    pub id: RowId,
}

fn read_probe(relation: &Relation, record: &Record) -> Change {
    Change::Insert {
        relation: relation.clone(),
        record: record.clone(),
    }
}

/// The scope chain the old row resolved through, taken from the first
/// compiled scope that still resolves it. Empty when none does.
fn pre_update_scope_path<R: ScopeResolver, T: TransientLookup>(
    perms: &CompiledPermissions<R, T>,
    resolver: &R,
    probe: &Change,
) -> ScopePath {
    perms
        .scopes()
        .iter()
        .find_map(|scope| resolver.scope_id(scope, probe).map(|(_, path)| path))
        .unwrap_or_default()
}

/// Filter a transaction flowing from the server down to an edge client,
/// removing rows the user may not see.
///
/// Updates are judged on the old and new row independently: a row leaving
/// visibility is dropped from the change list and reported as a [`MoveOut`];
/// a row entering visibility is rewritten as an insert, since the client has
/// never seen it. Reads are evaluated against one resolver snapshot for the
/// whole transaction. Every column of a visible row is emitted.
pub fn filter_read<R: ScopeResolver, T: TransientLookup>(
    perms: &CompiledPermissions<R, T>,
    tx: &Transaction,
) -> (Transaction, Vec<MoveOut>) {
    let resolver = perms.resolver();
    let mut kept = Vec::new();
    let mut move_outs = Vec::new();

    for change in &tx.changes {
        if perms.bucket(change.relation(), Privilege::Select).is_none() {
            continue;
        }
        match change {
            Change::Update {
                relation,
                record,
                old_record,
                ..
            } => {
                let before = read_probe(relation, old_record);
                let after = read_probe(relation, record);
                let visible_before = validate_read(&before, perms, resolver, tx.lsn).is_some();
                let visible_after = validate_read(&after, perms, resolver, tx.lsn).is_some();
                match (visible_before, visible_after) {
                    (true, true) => kept.push(change.clone()),
                    (true, false) => {
                        let scope_path = pre_update_scope_path(perms, resolver, &before);
                        let id = scope_path.row_id().cloned().unwrap_or_default();
                        tracing::debug!(
                            relation = %relation,
                            lsn = %tx.lsn,
                            "row left visibility, emitting move-out"
                        );
                        move_outs.push(MoveOut {
                            change: change.clone(),
                            scope_path,
                            relation: relation.clone(),
                            id,
                        });
                    }
                    (false, true) => kept.push(Change::Insert {
                        relation: relation.clone(),
                        record: record.clone(),
                    }),
                    (false, false) => {}
                }
            }
            other => {
                if validate_read(other, perms, resolver, tx.lsn).is_some() {
                    kept.push(other.clone());
                }
            }
        }
    }

    (Transaction::new(tx.lsn, kept), move_outs)
}
