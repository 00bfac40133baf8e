use crate::change::Change;
use crate::relation::Relation;
use crate::types::RowId;
use serde::{Deserialize, Serialize};

/// One step of a resolved scope chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScopeFrame {
    pub relation: Relation,
    pub id: RowId,
}

/// The foreign-key chain from the scope root down to the row, inclusive. The
/// terminal frame is the row itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScopePath {
    pub frames: Vec<ScopeFrame>,
}

impl ScopePath {
    pub fn row_id(&self) -> Option<&RowId> {
        self.frames.last().map(|frame| &frame.id)
    }
}

/// Capability for resolving rows to their scope roots, backed by whatever
/// storage the surrounding system uses.
///
/// Implementations must be persistent: `apply_change` produces a successor
/// value and the predecessor must stay observably unchanged. The write
/// validator relies on this to give a rejected transaction zero effect, and
/// to thread per-transaction scope state through the fold without touching
/// the compiled snapshot.
pub trait ScopeResolver: Clone {
    /// The primary key of the scope-root row owning the change's row, walking
    /// foreign keys as needed, or `None` when the row is outside that scope.
    fn scope_id(&self, scope: &Relation, change: &Change) -> Option<(RowId, ScopePath)>;

    /// True iff the change edits a foreign key participating in the path from
    /// the change's relation up to `scope`.
    fn modifies_fk(&self, scope: &Relation, change: &Change) -> bool;

    /// Successor resolver reflecting the change's effect on scope state.
    fn apply_change(&self, change: &Change) -> Self;
}

/// True iff the change's row resolves to exactly the given scope root.
pub fn change_in_scope<R: ScopeResolver>(
    resolver: &R,
    scope: &Relation,
    id: &RowId,
    change: &Change,
) -> bool {
    resolver
        .scope_id(scope, change)
        .is_some_and(|(found, _)| &found == id)
}
