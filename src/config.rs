/// Defensive limits for the evaluator. Oversized transactions are rejected
/// with a validation error before any privilege is evaluated.
#[derive(Debug, Clone)]
pub struct RowguardConfig {
    /// Maximum changes accepted in one transaction as handed in.
    pub max_transaction_changes: usize,
    /// Maximum changes after scope-move expansion.
    pub max_expanded_changes: usize,
}

impl Default for RowguardConfig {
    fn default() -> Self {
        Self {
            max_transaction_changes: 10_000,
            max_expanded_changes: 20_000,
        }
    }
}
