use crate::auth::Identity;
use crate::config::RowguardConfig;
use crate::error::RowguardError;
use crate::grants::{Grant, GrantRecord, Privilege};
use crate::relation::Relation;
use crate::roles::{matching_grants, Role, RoleGrant, RoleRecord};
use crate::scope::ScopeResolver;
use crate::transient::TransientLookup;
use std::collections::HashMap as StdHashMap;

/// All role-grants applicable to one `(relation, privilege)` key, split by
/// whether the role is bound to a scope. Built once by the compiler and never
/// mutated afterwards; order inside each list follows role input order, then
/// grant input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignedRoles {
    pub scoped: Vec<RoleGrant>,
    pub unscoped: Vec<RoleGrant>,
}

/// The grant/role configuration compiled into per-change lookup structures,
/// plus the handles evaluation needs: the identity, the scope resolver
/// snapshot, and the transient-permission table.
///
/// Immutable once built. A configuration change produces a replacement via
/// [`CompiledPermissions::update`]; readers swap the handle they hold.
#[derive(Clone)]
pub struct CompiledPermissions<R, T> {
    identity: Identity,
    role_lookup: im::HashMap<(Relation, Privilege), AssignedRoles>,
    scoped_roles: im::HashMap<Relation, Vec<Role>>,
    scopes: Vec<Relation>,
    resolver: R,
    transients: T,
    config: RowguardConfig,
}

impl<R: ScopeResolver, T: TransientLookup> CompiledPermissions<R, T> {
    /// An empty compilation: no roles, no grants, everything denied on the
    /// write path and everything filtered on the read path.
    pub fn new(identity: Identity, resolver: R, transients: T) -> Self {
        Self {
            identity,
            role_lookup: im::HashMap::new(),
            scoped_roles: im::HashMap::new(),
            scopes: Vec::new(),
            resolver,
            transients,
            config: RowguardConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RowguardConfig) -> Self {
        self.config = config;
        self
    }

    /// Compile a fresh lookup from the given records, carrying over identity,
    /// resolver, transient handle and config. Pure: equal inputs produce
    /// structurally equal outputs, and bucket order is the role input order
    /// (builtins first) then the grant input order.
    pub fn update(
        &self,
        grant_records: &[GrantRecord],
        role_records: &[RoleRecord],
    ) -> Result<Self, RowguardError> {
        let mut roles = vec![Role::Anyone];
        if self.identity.is_authenticated() {
            if let Some(user_id) = &self.identity.user_id {
                roles.push(Role::Authenticated {
                    user_id: user_id.clone(),
                });
            }
        }
        for record in role_records {
            roles.push(Role::from_record(record)?);
        }

        let grants = grant_records
            .iter()
            .map(Grant::from_record)
            .collect::<Result<Vec<_>, _>>()?;

        let mut role_lookup: StdHashMap<(Relation, Privilege), AssignedRoles> = StdHashMap::new();
        let mut scoped_roles: StdHashMap<Relation, Vec<Role>> = StdHashMap::new();
        let mut scopes: Vec<Relation> = Vec::new();

        for role in &roles {
            let matched = matching_grants(role, &grants);
            if matched.is_empty() {
                continue;
            }
            for grant in matched {
                for privilege in &grant.privileges {
                    let bucket = role_lookup
                        .entry((grant.relation.clone(), *privilege))
                        .or_default();
                    let pair = RoleGrant {
                        role: role.clone(),
                        grant: grant.clone(),
                    };
                    if role.has_scope() {
                        bucket.scoped.push(pair);
                    } else {
                        bucket.unscoped.push(pair);
                    }
                }
            }
            if let Some((scope_relation, _)) = role.scope() {
                scoped_roles
                    .entry(scope_relation.clone())
                    .or_default()
                    .push(role.clone());
                if !scopes.contains(scope_relation) {
                    scopes.push(scope_relation.clone());
                }
            }
        }

        tracing::debug!(
            roles = roles.len(),
            grants = grants.len(),
            buckets = role_lookup.len(),
            scopes = scopes.len(),
            "compiled permissions"
        );

        Ok(Self {
            identity: self.identity.clone(),
            role_lookup: role_lookup.into_iter().collect(),
            scoped_roles: scoped_roles.into_iter().collect(),
            scopes,
            resolver: self.resolver.clone(),
            transients: self.transients.clone(),
            config: self.config.clone(),
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn bucket(&self, relation: &Relation, privilege: Privilege) -> Option<&AssignedRoles> {
        self.role_lookup.get(&(relation.clone(), privilege))
    }

    pub fn role_lookup(&self) -> &im::HashMap<(Relation, Privilege), AssignedRoles> {
        &self.role_lookup
    }

    pub fn scoped_roles(&self) -> &im::HashMap<Relation, Vec<Role>> {
        &self.scoped_roles
    }

    /// Scope relations referenced by at least one surviving scoped role, in
    /// first-encounter order.
    pub fn scopes(&self) -> &[Relation] {
        &self.scopes
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn transients(&self) -> &T {
        &self.transients
    }

    pub fn config(&self) -> &RowguardConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::CompiledPermissions;
    use crate::auth::Identity;
    use crate::grants::{GrantRecord, Privilege};
    use crate::relation::Relation;
    use crate::roles::RoleRecord;
    use crate::testing::TreeResolver;
    use crate::transient::TransientTable;
    use crate::types::Value;
    use compact_str::CompactString;
    use proptest::prelude::*;

    fn grant(role_name: &str, table: &str, privileges: &[&str]) -> GrantRecord {
        GrantRecord {
            role_name: role_name.into(),
            schema: "public".into(),
            table: table.into(),
            privileges: privileges.iter().map(|p| CompactString::from(*p)).collect(),
            columns: None,
            check: None,
        }
    }

    fn assigned(name: &str, assignment_id: &str) -> RoleRecord {
        RoleRecord {
            kind: "assigned".into(),
            name: name.into(),
            user_id: Some("u1".into()),
            assignment_id: assignment_id.into(),
            scope_schema: None,
            scope_table: None,
            scope_id: None,
        }
    }

    fn scoped(name: &str, assignment_id: &str, scope_table: &str, id: i64) -> RoleRecord {
        let mut record = assigned(name, assignment_id);
        record.scope_schema = Some("public".into());
        record.scope_table = Some(scope_table.into());
        record.scope_id = Some(vec![Value::Integer(id)]);
        record
    }

    fn empty_perms(identity: Identity) -> CompiledPermissions<TreeResolver, TransientTable> {
        CompiledPermissions::new(identity, TreeResolver::new(), TransientTable::new())
    }

    #[test]
    fn roles_without_matching_grants_are_dropped() {
        let perms = empty_perms(Identity::new("u1"))
            .update(
                &[grant("editor", "issues", &["UPDATE"])],
                &[assigned("editor", "a1"), assigned("viewer", "a2")],
            )
            .expect("compile");

        let bucket = perms
            .bucket(&Relation::new("public", "issues"), Privilege::Update)
            .expect("bucket");
        assert_eq!(bucket.unscoped.len(), 1);
        assert_eq!(bucket.unscoped[0].role.name(), Some("editor"));
    }

    #[test]
    fn one_bucket_entry_per_privilege_in_the_grant() {
        let perms = empty_perms(Identity::new("u1"))
            .update(
                &[grant("editor", "issues", &["INSERT", "UPDATE", "DELETE"])],
                &[assigned("editor", "a1")],
            )
            .expect("compile");

        let issues = Relation::new("public", "issues");
        for privilege in [Privilege::Insert, Privilege::Update, Privilege::Delete] {
            assert!(perms.bucket(&issues, privilege).is_some());
        }
        assert!(perms.bucket(&issues, Privilege::Select).is_none());
    }

    #[test]
    fn scoped_and_unscoped_roles_split_within_a_bucket() {
        let perms = empty_perms(Identity::new("u1"))
            .update(
                &[grant("member", "issues", &["UPDATE"])],
                &[
                    scoped("member", "a1", "projects", 7),
                    assigned("member", "a2"),
                ],
            )
            .expect("compile");

        let bucket = perms
            .bucket(&Relation::new("public", "issues"), Privilege::Update)
            .expect("bucket");
        assert_eq!(bucket.scoped.len(), 1);
        assert_eq!(bucket.unscoped.len(), 1);
        assert_eq!(perms.scopes(), &[Relation::new("public", "projects")]);
        assert_eq!(
            perms
                .scoped_roles()
                .get(&Relation::new("public", "projects"))
                .map(Vec::len),
            Some(1)
        );
    }

    #[test]
    fn builtin_roles_come_before_assigned_ones_in_bucket_order() {
        let perms = empty_perms(Identity::new("u1"))
            .update(
                &[
                    grant("editor", "issues", &["SELECT"]),
                    grant("__anyone__", "issues", &["SELECT"]),
                    grant("__authenticated__", "issues", &["SELECT"]),
                ],
                &[assigned("editor", "a1")],
            )
            .expect("compile");

        let bucket = perms
            .bucket(&Relation::new("public", "issues"), Privilege::Select)
            .expect("bucket");
        let names: Vec<&str> = bucket
            .unscoped
            .iter()
            .map(|pair| pair.role.grant_name())
            .collect();
        assert_eq!(names, vec!["__anyone__", "__authenticated__", "editor"]);
    }

    #[test]
    fn authenticated_role_requires_a_user_id() {
        let grants = [grant("__authenticated__", "issues", &["SELECT"])];
        let with_user = empty_perms(Identity::new("u1"))
            .update(&grants, &[])
            .expect("compile");
        let anonymous = empty_perms(Identity::anonymous())
            .update(&grants, &[])
            .expect("compile");

        let issues = Relation::new("public", "issues");
        assert!(with_user.bucket(&issues, Privilege::Select).is_some());
        assert!(anonymous.bucket(&issues, Privilege::Select).is_none());
    }

    #[test]
    fn config_error_leaves_no_partial_result() {
        let perms = empty_perms(Identity::new("u1"));
        let mut bad_role = assigned("editor", "a1");
        bad_role.kind = "derived".into();
        let result = perms.update(&[grant("editor", "issues", &["UPDATE"])], &[bad_role]);
        assert!(result.is_err());
        // The previous compilation is untouched.
        assert!(perms.role_lookup().is_empty());
    }

    fn arb_grant() -> impl Strategy<Value = GrantRecord> {
        (
            prop::sample::select(vec!["editor", "viewer", "member", "__anyone__"]),
            prop::sample::select(vec!["issues", "comments", "projects"]),
            prop::sample::subsequence(vec!["INSERT", "UPDATE", "DELETE", "SELECT"], 1..=4),
        )
            .prop_map(|(role, table, privileges)| grant(role, table, &privileges))
    }

    fn arb_role() -> impl Strategy<Value = RoleRecord> {
        (
            prop::sample::select(vec!["editor", "viewer", "member"]),
            0u32..100,
            prop::option::of(1i64..5),
        )
            .prop_map(|(name, n, scope)| match scope {
                Some(id) => scoped(name, &format!("a{n}"), "projects", id),
                None => assigned(name, &format!("a{n}")),
            })
    }

    proptest! {
        #[test]
        fn compilation_is_deterministic(
            grants in prop::collection::vec(arb_grant(), 0..8),
            roles in prop::collection::vec(arb_role(), 0..6),
        ) {
            let base = empty_perms(Identity::new("u1"));
            let first = base.update(&grants, &roles).expect("compile");
            let second = base.update(&grants, &roles).expect("compile");
            prop_assert_eq!(first.role_lookup(), second.role_lookup());
            prop_assert_eq!(first.scoped_roles(), second.scoped_roles());
            prop_assert_eq!(first.scopes(), second.scopes());
        }
    }

    #[test]
    fn empty_compilation_has_no_buckets() {
        let perms = empty_perms(Identity::anonymous());
        assert!(perms.role_lookup().is_empty());
        assert!(perms.scopes().is_empty());
        assert!(perms
            .scoped_roles()
            .get(&Relation::new("public", "projects"))
            .is_none());
    }
}
