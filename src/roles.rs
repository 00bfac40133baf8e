use crate::error::RowguardError;
use crate::grants::Grant;
use crate::relation::Relation;
use crate::types::RowId;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Grants naming this role apply to every user.
pub const ANYONE_ROLE: &str = "__anyone__";
/// Grants naming this role apply to every user with a non-empty user id.
pub const AUTHENTICATED_ROLE: &str = "__authenticated__";

/// Raw role record as produced by the configuration source. `kind` leaves
/// room for future role families; `"assigned"` is the only one recognised
/// today. A scope reference is the triple (schema, table, row id) and must be
/// complete or entirely absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleRecord {
    pub kind: CompactString,
    pub name: CompactString,
    #[serde(default)]
    pub user_id: Option<CompactString>,
    pub assignment_id: CompactString,
    #[serde(default)]
    pub scope_schema: Option<CompactString>,
    #[serde(default)]
    pub scope_table: Option<CompactString>,
    #[serde(default)]
    pub scope_id: Option<RowId>,
}

/// The authoritative role classification.
///
/// `Anyone` is always present; `Authenticated` is injected by the compiler
/// when the identity carries a non-empty user id. `Assigned` roles come from
/// the configuration source and are *scoped* when bound to a scope root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Anyone,
    Authenticated {
        user_id: CompactString,
    },
    Assigned {
        name: CompactString,
        user_id: Option<CompactString>,
        assignment_id: CompactString,
        scope: Option<(Relation, RowId)>,
    },
}

impl Role {
    pub fn from_record(record: &RoleRecord) -> Result<Self, RowguardError> {
        if record.kind != "assigned" {
            return Err(RowguardError::UnknownRoleKind {
                kind: record.kind.to_string(),
            });
        }
        let scope = match (
            record.scope_schema.as_ref(),
            record.scope_table.as_ref(),
            record.scope_id.as_ref(),
        ) {
            (Some(schema), Some(table), Some(id)) => {
                Some((Relation::new(schema.clone(), table.clone()), id.clone()))
            }
            (None, None, None) => None,
            _ => {
                return Err(RowguardError::IncompleteScope {
                    role: record.name.to_string(),
                });
            }
        };
        Ok(Role::Assigned {
            name: record.name.clone(),
            user_id: record.user_id.clone(),
            assignment_id: record.assignment_id.clone(),
            scope,
        })
    }

    /// The role name grants are matched against. Builtin roles answer to
    /// their reserved sentinels.
    pub fn grant_name(&self) -> &str {
        match self {
            Role::Anyone => ANYONE_ROLE,
            Role::Authenticated { .. } => AUTHENTICATED_ROLE,
            Role::Assigned { name, .. } => name,
        }
    }

    /// The configured name, if any. Builtin roles have none.
    pub fn name(&self) -> Option<&str> {
        match self {
            Role::Assigned { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Key into the transient-permission table. Builtin roles never
    /// participate in transient lookups.
    pub fn assignment_id(&self) -> Option<&CompactString> {
        match self {
            Role::Assigned { assignment_id, .. } => Some(assignment_id),
            _ => None,
        }
    }

    pub fn scope(&self) -> Option<(&Relation, &RowId)> {
        match self {
            Role::Assigned {
                scope: Some((relation, id)),
                ..
            } => Some((relation, id)),
            _ => None,
        }
    }

    pub fn has_scope(&self) -> bool {
        self.scope().is_some()
    }
}

/// Every grant whose role name equals the role's grant-matching name, in
/// input order.
pub fn matching_grants<'a>(role: &Role, grants: &'a [Grant]) -> Vec<&'a Grant> {
    grants
        .iter()
        .filter(|g| g.role_name == role.grant_name())
        .collect()
}

/// An immutable pairing asserting "this role supplies the rights of this
/// grant". Both components stay read-only for the life of the compiled
/// permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGrant {
    pub role: Role,
    pub grant: Grant,
}
