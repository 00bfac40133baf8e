use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A qualified table name. Equality and hashing only; no ordering is assumed
/// anywhere in the crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Relation {
    pub schema: CompactString,
    pub table: CompactString,
}

impl Relation {
    pub fn new(schema: impl Into<CompactString>, table: impl Into<CompactString>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

/// An identifier can be emitted bare only when it would survive SQL lexing
/// unchanged: non-empty, leading lowercase letter or underscore, and only
/// lowercase letters, digits, underscores and dollar signs after that.
fn needs_quoting(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return true,
    }
    !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$')
}

fn write_ident(f: &mut fmt::Formatter<'_>, ident: &str) -> fmt::Result {
    if needs_quoting(ident) {
        write!(f, "\"")?;
        for c in ident.chars() {
            if c == '"' {
                write!(f, "\"\"")?;
            } else {
                write!(f, "{c}")?;
            }
        }
        write!(f, "\"")
    } else {
        f.write_str(ident)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_ident(f, &self.schema)?;
        f.write_str(".")?;
        write_ident(f, &self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::Relation;

    #[test]
    fn plain_identifiers_render_bare() {
        let rel = Relation::new("public", "issues");
        assert_eq!(rel.to_string(), "public.issues");
    }

    #[test]
    fn uppercase_and_special_characters_force_quoting() {
        assert_eq!(
            Relation::new("public", "Issues").to_string(),
            "public.\"Issues\""
        );
        assert_eq!(
            Relation::new("my schema", "t").to_string(),
            "\"my schema\".t"
        );
        assert_eq!(Relation::new("public", "1st").to_string(), "public.\"1st\"");
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        assert_eq!(
            Relation::new("public", "we\"ird").to_string(),
            "public.\"we\"\"ird\""
        );
    }

    #[test]
    fn empty_identifier_is_quoted() {
        assert_eq!(Relation::new("", "t").to_string(), "\"\".t");
    }
}
