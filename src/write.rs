use crate::change::{Change, Transaction};
use crate::compile::CompiledPermissions;
use crate::error::RowguardError;
use crate::eval::{role_grant_for_change, AccessMode};
use crate::grants::Privilege;
use crate::scope::ScopeResolver;
use crate::transient::TransientLookup;

/// The privilege a change must hold on its relation. Scope moves are mapped
/// to `UPDATE`: relocating a row needs write rights in the destination scope
/// just as the paired update needs them in the origin.
pub fn required_permission(change: &Change) -> Privilege {
    match change {
        Change::Insert { .. } => Privilege::Insert,
        Change::Update { .. } => Privilege::Update,
        Change::Delete { .. } => Privilege::Delete,
        Change::ScopeMove { .. } => Privilege::Update,
    }
}

/// Doubles every update that re-parents a row across a compiled scope: the
/// original update is checked against the origin scope, the synthetic
/// `ScopeMove` carries the new row data and is checked against the
/// destination. All other changes pass through unchanged.
fn expand_changes<R: ScopeResolver, T: TransientLookup>(
    perms: &CompiledPermissions<R, T>,
    changes: &[Change],
) -> Vec<Change> {
    let mut expanded = Vec::with_capacity(changes.len());
    for change in changes {
        expanded.push(change.clone());
        if let Change::Update {
            relation, record, ..
        } = change
        {
            let moves_scope = perms
                .scopes()
                .iter()
                .any(|scope| perms.resolver().modifies_fk(scope, change));
            if moves_scope {
                expanded.push(Change::ScopeMove {
                    relation: relation.clone(),
                    record: record.clone(),
                });
            }
        }
    }
    expanded
}

/// Admit or reject a transaction arriving from the edge.
///
/// The fold is a short-circuit: the first change no grant admits rejects the
/// whole transaction, and no later change is evaluated. After each admitted
/// change the scope resolver is advanced, so a later change sees the scope
/// state produced by every earlier one. All intermediate resolvers are
/// return values; a rejected transaction leaves no observable effect.
pub fn validate_write<R: ScopeResolver, T: TransientLookup>(
    perms: &CompiledPermissions<R, T>,
    tx: &Transaction,
) -> Result<(), RowguardError> {
    let config = perms.config();
    if tx.changes.len() > config.max_transaction_changes {
        return Err(RowguardError::Validation(format!(
            "transaction has {} changes, limit is {}",
            tx.changes.len(),
            config.max_transaction_changes
        )));
    }

    let expanded = expand_changes(perms, &tx.changes);
    if expanded.len() > config.max_expanded_changes {
        return Err(RowguardError::Validation(format!(
            "transaction expands to {} changes, limit is {}",
            expanded.len(),
            config.max_expanded_changes
        )));
    }

    let mut resolver = perms.resolver().clone();
    for change in &expanded {
        let privilege = required_permission(change);
        let relation = change.relation();
        let admitted = perms.bucket(relation, privilege).and_then(|bucket| {
            role_grant_for_change(
                bucket,
                perms.transients(),
                &resolver,
                change,
                tx.lsn,
                AccessMode::Write,
            )
        });
        match admitted {
            Some(pair) => {
                tracing::debug!(
                    relation = %relation,
                    privilege = ?privilege,
                    role = pair.role.grant_name(),
                    "change admitted"
                );
                resolver = resolver.apply_change(change);
            }
            None => {
                tracing::warn!(
                    relation = %relation,
                    privilege = ?privilege,
                    lsn = %tx.lsn,
                    "change rejected, aborting transaction"
                );
                return Err(RowguardError::PermissionDenied {
                    privilege,
                    relation: relation.clone(),
                });
            }
        }
    }
    Ok(())
}
