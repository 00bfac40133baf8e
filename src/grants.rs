use crate::change::Change;
use crate::error::RowguardError;
use crate::relation::Relation;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The four SQL privileges a grant can confer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Privilege {
    Insert,
    Update,
    Delete,
    Select,
}

impl Privilege {
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("INSERT") {
            Some(Privilege::Insert)
        } else if token.eq_ignore_ascii_case("UPDATE") {
            Some(Privilege::Update)
        } else if token.eq_ignore_ascii_case("DELETE") {
            Some(Privilege::Delete)
        } else if token.eq_ignore_ascii_case("SELECT") {
            Some(Privilege::Select)
        } else {
            None
        }
    }

    /// The verb phrase used in denial messages, e.g. "INSERT INTO".
    pub fn verb_phrase(self) -> &'static str {
        match self {
            Privilege::Insert => "INSERT INTO",
            Privilege::Update => "UPDATE",
            Privilege::Delete => "DELETE FROM",
            Privilege::Select => "SELECT FROM",
        }
    }
}

/// Raw grant record as produced by the configuration source. Structurally
/// defined by the surrounding schema; the core only decodes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrantRecord {
    pub role_name: CompactString,
    pub schema: CompactString,
    pub table: CompactString,
    pub privileges: Vec<CompactString>,
    #[serde(default)]
    pub columns: Option<Vec<CompactString>>,
    #[serde(default)]
    pub check: Option<String>,
}

/// A normalised grant. A missing `columns` set means all columns are
/// permitted. The `check` expression is carried verbatim but not evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub role_name: CompactString,
    pub relation: Relation,
    pub privileges: Vec<Privilege>,
    pub columns: Option<BTreeSet<CompactString>>,
    pub check: Option<String>,
}

impl Grant {
    pub fn from_record(record: &GrantRecord) -> Result<Self, RowguardError> {
        let relation = Relation::new(record.schema.clone(), record.table.clone());
        if record.privileges.is_empty() {
            return Err(RowguardError::EmptyPrivileges { relation });
        }
        let mut privileges = Vec::with_capacity(record.privileges.len());
        for token in &record.privileges {
            let privilege = Privilege::from_token(token).ok_or_else(|| {
                RowguardError::UnknownPrivilege {
                    privilege: token.to_string(),
                    relation: relation.clone(),
                }
            })?;
            if !privileges.contains(&privilege) {
                privileges.push(privilege);
            }
        }
        Ok(Self {
            role_name: record.role_name.clone(),
            relation,
            privileges,
            columns: record
                .columns
                .as_ref()
                .map(|cols| cols.iter().cloned().collect()),
            check: record.check.clone(),
        })
    }

    /// True when the grant's column subset covers every named column. Deletes
    /// never consult this.
    pub fn columns_valid<'a, I>(&self, columns: I) -> bool
    where
        I: IntoIterator<Item = &'a CompactString>,
    {
        match &self.columns {
            None => true,
            Some(allowed) => columns.into_iter().all(|c| allowed.contains(c)),
        }
    }

    /// Placeholder for the CHECK-expression evaluator. A grant carrying an
    /// expression currently behaves as if it passed; replacing this function
    /// is the only change a real evaluator requires.
    pub fn check_passes(&self, _change: &Change) -> bool {
        true
    }
}
