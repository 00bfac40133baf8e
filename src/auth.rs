use crate::types::Record;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Pre-validated identity of the connected user. Produced by the
/// authentication layer; the core never inspects `claims`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<CompactString>,
    #[serde(default)]
    pub claims: Record,
}

impl Identity {
    pub fn new(user_id: impl Into<CompactString>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            claims: Record::default(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An empty `user_id` counts as anonymous.
    pub fn is_authenticated(&self) -> bool {
        self.user_id.as_deref().is_some_and(|u| !u.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::Identity;

    #[test]
    fn empty_user_id_is_anonymous() {
        assert!(!Identity::anonymous().is_authenticated());
        assert!(!Identity::new("").is_authenticated());
        assert!(Identity::new("u1").is_authenticated());
    }
}
