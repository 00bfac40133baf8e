use crate::change::{Change, Lsn};
use crate::compile::{AssignedRoles, CompiledPermissions};
use crate::grants::{Grant, Privilege};
use crate::roles::RoleGrant;
use crate::scope::{change_in_scope, ScopeResolver};
use crate::transient::TransientLookup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

fn grant_admits(grant: &Grant, change: &Change, mode: AccessMode) -> bool {
    let columns_ok = match mode {
        AccessMode::Read => true,
        AccessMode::Write => match change {
            Change::Insert { record, .. } => grant.columns_valid(record.keys()),
            Change::Update {
                changed_columns, ..
            } => grant.columns_valid(changed_columns.iter()),
            // Deletes never consult columns; a scope move's columns were
            // already validated on the update it was expanded from.
            Change::Delete { .. } | Change::ScopeMove { .. } => true,
        },
    };
    columns_ok && grant.check_passes(change)
}

/// The first role-grant in the bucket that admits the change, or `None`.
///
/// Order is significant: unscoped role-grants first, then scoped ones whose
/// bound scope contains the change's row, then transient grants earned by the
/// scoped roles. The transient table is not consulted unless both earlier
/// stages miss. Any single matching grant is sufficient; matching is never
/// intersected across grants.
pub fn role_grant_for_change<R: ScopeResolver, T: TransientLookup>(
    bucket: &AssignedRoles,
    transients: &T,
    resolver: &R,
    change: &Change,
    lsn: Lsn,
    mode: AccessMode,
) -> Option<RoleGrant> {
    for pair in &bucket.unscoped {
        if grant_admits(&pair.grant, change, mode) {
            return Some(pair.clone());
        }
    }

    for pair in &bucket.scoped {
        let Some((scope_relation, scope_id)) = pair.role.scope() else {
            continue;
        };
        if change_in_scope(resolver, scope_relation, scope_id, change)
            && grant_admits(&pair.grant, change, mode)
        {
            return Some(pair.clone());
        }
    }

    for (pair, record) in transients.for_roles(&bucket.scoped, lsn) {
        if change_in_scope(resolver, &record.target_relation, &record.target_id, change)
            && grant_admits(&pair.grant, change, mode)
        {
            tracing::debug!(
                relation = %change.relation(),
                assignment = %record.assignment_id,
                lsn = %lsn,
                "transient grant admitted change"
            );
            return Some(pair);
        }
    }

    None
}

/// Single-change visibility check: the first role-grant admitting a `SELECT`
/// of the change's row, or `None` when the row is invisible to the user.
pub fn validate_read<R: ScopeResolver, T: TransientLookup>(
    change: &Change,
    perms: &CompiledPermissions<R, T>,
    resolver: &R,
    lsn: Lsn,
) -> Option<RoleGrant> {
    let bucket = perms.bucket(change.relation(), Privilege::Select)?;
    role_grant_for_change(
        bucket,
        perms.transients(),
        resolver,
        change,
        lsn,
        AccessMode::Read,
    )
}
