use crate::grants::Privilege;
use crate::relation::Relation;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowguardErrorCode {
    UnknownRoleKind,
    UnknownPrivilege,
    EmptyPrivileges,
    IncompleteScope,
    PermissionDenied,
    Validation,
}

impl RowguardErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            RowguardErrorCode::UnknownRoleKind => "unknown_role_kind",
            RowguardErrorCode::UnknownPrivilege => "unknown_privilege",
            RowguardErrorCode::EmptyPrivileges => "empty_privileges",
            RowguardErrorCode::IncompleteScope => "incomplete_scope",
            RowguardErrorCode::PermissionDenied => "permission_denied",
            RowguardErrorCode::Validation => "validation",
        }
    }
}

/// Errors surfaced by the evaluation core. Configuration variants come out of
/// the compiler and belong to whoever supplied the grant/role records;
/// `PermissionDenied` is the per-transaction outcome and its message format is
/// stable, user-visible API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RowguardError {
    #[error("unknown role kind '{kind}'")]
    UnknownRoleKind { kind: String },
    #[error("unknown privilege '{privilege}' in grant for {relation}")]
    UnknownPrivilege {
        privilege: String,
        relation: Relation,
    },
    #[error("grant for {relation} has an empty privilege set")]
    EmptyPrivileges { relation: Relation },
    #[error("role '{role}' has an incomplete scope reference")]
    IncompleteScope { role: String },
    #[error("user does not have permission to {} {}", .privilege.verb_phrase(), .relation)]
    PermissionDenied {
        privilege: Privilege,
        relation: Relation,
    },
    #[error("validation error: {0}")]
    Validation(String),
}

impl RowguardError {
    pub fn code(&self) -> RowguardErrorCode {
        match self {
            RowguardError::UnknownRoleKind { .. } => RowguardErrorCode::UnknownRoleKind,
            RowguardError::UnknownPrivilege { .. } => RowguardErrorCode::UnknownPrivilege,
            RowguardError::EmptyPrivileges { .. } => RowguardErrorCode::EmptyPrivileges,
            RowguardError::IncompleteScope { .. } => RowguardErrorCode::IncompleteScope,
            RowguardError::PermissionDenied { .. } => RowguardErrorCode::PermissionDenied,
            RowguardError::Validation(_) => RowguardErrorCode::Validation,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }
}
