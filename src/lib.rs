pub mod auth;
pub mod change;
pub mod compile;
pub mod config;
pub mod error;
pub mod eval;
pub mod grants;
pub mod read;
pub mod relation;
pub mod roles;
pub mod scope;
pub mod testing;
pub mod transient;
pub mod types;
pub mod write;

pub use crate::auth::Identity;
pub use crate::change::{Change, Lsn, Transaction};
pub use crate::compile::{AssignedRoles, CompiledPermissions};
pub use crate::config::RowguardConfig;
pub use crate::error::{RowguardError, RowguardErrorCode};
pub use crate::eval::validate_read;
pub use crate::grants::{Grant, GrantRecord, Privilege};
pub use crate::read::{filter_read, MoveOut};
pub use crate::relation::Relation;
pub use crate::roles::{Role, RoleGrant, RoleRecord};
pub use crate::scope::{ScopePath, ScopeResolver};
pub use crate::transient::{TransientLookup, TransientRecord, TransientTable};
pub use crate::types::{Record, RowId, Value};
pub use crate::write::validate_write;
