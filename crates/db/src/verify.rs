//! Static verification of the isolation guarantees against the live catalog.
//!
//! Reads `pg_class`, `pg_policies`, `pg_attribute`, and `pg_roles` and
//! compares them with the table registry. Nothing here depends on data.

use std::collections::{HashMap, HashSet};
use std::fmt;

use nestling_core::tenancy::{POLICY_NAME, TENANT_SETTING, TablePolicy};
use sea_orm::{ConnectionTrait, DbBackend, DbErr, FromQueryResult, Statement};
use tracing::debug;

use crate::error::IsolationError;

// The isolation policy only counts when it covers every command and both
// halves read the tenant setting. Any other permissive policy is ORed with
// it and can widen visibility, so those are reported by name.
const TABLE_FLAGS_SQL: &str = r"
SELECT c.relname::text AS table_name,
       c.relrowsecurity AS rls_enabled,
       c.relforcerowsecurity AS rls_forced,
       EXISTS (
           SELECT 1 FROM pg_policies p
           WHERE p.schemaname = 'public'
             AND p.tablename = c.relname
             AND p.policyname = $1::name
             AND p.permissive = 'PERMISSIVE'
             AND p.cmd = 'ALL'
             AND position($2 IN coalesce(p.qual, '')) > 0
             AND position($2 IN coalesce(p.with_check, '')) > 0
       ) AS has_policy,
       (
           SELECT string_agg(p.policyname::text, ',' ORDER BY p.policyname)
           FROM pg_policies p
           WHERE p.schemaname = 'public'
             AND p.tablename = c.relname
             AND p.policyname <> $1::name
             AND p.permissive = 'PERMISSIVE'
       ) AS extra_policies
FROM pg_class c
JOIN pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = 'public' AND c.relkind IN ('r', 'p')
";

const TENANT_COLUMN_TABLES_SQL: &str = r"
SELECT DISTINCT c.relname::text AS table_name
FROM pg_attribute a
JOIN pg_class c ON c.oid = a.attrelid
JOIN pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = 'public'
  AND c.relkind IN ('r', 'p')
  AND a.attname = 'tenant_id'
  AND NOT a.attisdropped
ORDER BY 1
";

const CURRENT_ROLE_SQL: &str = r"
SELECT rolname::text AS role, rolsuper AS is_superuser, rolbypassrls AS bypasses_rls
FROM pg_roles
WHERE rolname = current_user
";

const NAMED_ROLE_SQL: &str = r"
SELECT rolname::text AS role, rolsuper AS is_superuser, rolbypassrls AS bypasses_rls
FROM pg_roles
WHERE rolname = $1::name
";

#[derive(Debug, FromQueryResult)]
struct TableFlagsRow {
    table_name: String,
    rls_enabled: bool,
    rls_forced: bool,
    has_policy: bool,
    extra_policies: Option<String>,
}

impl TableFlagsRow {
    fn extra_policies(&self) -> Vec<String> {
        self.extra_policies
            .as_deref()
            .map(|names| names.split(',').map(str::to_string).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, FromQueryResult)]
struct TableNameRow {
    table_name: String,
}

/// Attributes of a role that decide whether policies apply to it.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct RolePrivileges {
    /// Role name.
    pub role: String,
    /// `rolsuper`.
    pub is_superuser: bool,
    /// `rolbypassrls`.
    pub bypasses_rls: bool,
}

impl RolePrivileges {
    /// Reads the attributes of the role this connection runs as.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog query fails.
    pub async fn inspect<C>(db: &C) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        Self::find_by_statement(Statement::from_string(
            DbBackend::Postgres,
            CURRENT_ROLE_SQL,
        ))
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("current_user in pg_roles".to_string()))
    }

    /// Reads the attributes of a named role, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog query fails.
    pub async fn of_role<C>(db: &C, role: &str) -> Result<Option<Self>, DbErr>
    where
        C: ConnectionTrait,
    {
        Self::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            NAMED_ROLE_SQL,
            [role.into()],
        ))
        .one(db)
        .await
    }

    /// Rejects roles for which row-level security is not enforced.
    ///
    /// # Errors
    ///
    /// Returns `MisconfiguredPrivilege` if the role is a superuser or holds
    /// `BYPASSRLS`.
    pub fn check(&self) -> Result<(), IsolationError> {
        let reason = match (self.is_superuser, self.bypasses_rls) {
            (true, true) => "SUPERUSER and BYPASSRLS",
            (true, false) => "SUPERUSER",
            (false, true) => "BYPASSRLS",
            (false, false) => return Ok(()),
        };
        Err(IsolationError::MisconfiguredPrivilege {
            role: self.role.clone(),
            reason: reason.to_string(),
        })
    }
}

/// Catalog state of one registered table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStatus {
    /// Table name.
    pub table: String,
    /// Whether the table exists in `public`.
    pub exists: bool,
    /// `relrowsecurity`.
    pub rls_enabled: bool,
    /// `relforcerowsecurity`.
    pub rls_forced: bool,
    /// Whether the isolation policy is attached, covers all commands, and
    /// filters both reads and writes on the bound tenant.
    pub has_policy: bool,
    /// Other permissive policies on the table.
    pub extra_policies: Vec<String>,
}

/// One reason verification failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// A registered table is absent from the schema.
    MissingTable(String),
    /// Row-level security is not enabled on a registered table.
    RlsDisabled(String),
    /// Row-level security is enabled but not forced for the owner.
    RlsNotForced(String),
    /// The isolation policy is absent or does not filter on the bound tenant.
    MissingPolicy(String),
    /// A further permissive policy that could widen what a tenant sees.
    ExtraPolicy {
        /// Table name.
        table: String,
        /// Policy name.
        policy: String,
    },
    /// A table has a `tenant_id` column but is not in the registry.
    UnregisteredTable(String),
    /// The connecting role is exempt from policies.
    Privilege {
        /// Role name.
        role: String,
        /// Which attribute exempts it.
        reason: String,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTable(t) => write!(f, "{t}: table does not exist"),
            Self::RlsDisabled(t) => write!(f, "{t}: row-level security is not enabled"),
            Self::RlsNotForced(t) => write!(f, "{t}: row-level security is not forced"),
            Self::MissingPolicy(t) => write!(
                f,
                "{t}: policy {POLICY_NAME} is missing or does not filter on {TENANT_SETTING}"
            ),
            Self::ExtraPolicy { table, policy } => {
                write!(f, "{table}: unexpected permissive policy {policy}")
            }
            Self::UnregisteredTable(t) => {
                write!(f, "{t}: has a tenant_id column but is not tenant-scoped")
            }
            Self::Privilege { role, reason } => {
                write!(f, "role {role} bypasses row-level security ({reason})")
            }
        }
    }
}

/// Everything the static check observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    /// One entry per registered table, in registry order.
    pub tables: Vec<TableStatus>,
    /// Tables carrying `tenant_id` that the registry does not cover.
    pub unregistered: Vec<String>,
    /// The role the check connected as.
    pub role: RolePrivileges,
}

impl VerificationReport {
    /// Every problem found, tables first.
    #[must_use]
    pub fn findings(&self) -> Vec<Finding> {
        let mut findings = Vec::new();

        for status in &self.tables {
            let table = || status.table.clone();
            if !status.exists {
                findings.push(Finding::MissingTable(table()));
                continue;
            }
            if !status.rls_enabled {
                findings.push(Finding::RlsDisabled(table()));
            }
            if !status.rls_forced {
                findings.push(Finding::RlsNotForced(table()));
            }
            if !status.has_policy {
                findings.push(Finding::MissingPolicy(table()));
            }
            findings.extend(status.extra_policies.iter().map(|policy| {
                Finding::ExtraPolicy {
                    table: table(),
                    policy: policy.clone(),
                }
            }));
        }

        findings.extend(
            self.unregistered
                .iter()
                .cloned()
                .map(Finding::UnregisteredTable),
        );

        if let Err(IsolationError::MisconfiguredPrivilege { role, reason }) = self.role.check() {
            findings.push(Finding::Privilege { role, reason });
        }

        findings
    }

    /// True when there are no findings.
    #[must_use]
    pub fn is_pass(&self) -> bool {
        self.findings().is_empty()
    }
}

/// Checks the live catalog against `registry`.
///
/// # Errors
///
/// Returns an error only if the catalog cannot be read. Isolation problems
/// are reported through [`VerificationReport::findings`].
pub async fn verify_isolation<C>(
    db: &C,
    registry: &[TablePolicy],
) -> Result<VerificationReport, DbErr>
where
    C: ConnectionTrait,
{
    let flags: HashMap<String, TableFlagsRow> =
        TableFlagsRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            TABLE_FLAGS_SQL,
            [POLICY_NAME.into(), TENANT_SETTING.into()],
        ))
        .all(db)
        .await?
        .into_iter()
        .map(|row| (row.table_name.clone(), row))
        .collect();

    let tables = registry
        .iter()
        .map(|policy| match flags.get(policy.table) {
            Some(row) => TableStatus {
                table: policy.table.to_string(),
                exists: true,
                rls_enabled: row.rls_enabled,
                rls_forced: row.rls_forced,
                has_policy: row.has_policy,
                extra_policies: row.extra_policies(),
            },
            None => TableStatus {
                table: policy.table.to_string(),
                exists: false,
                rls_enabled: false,
                rls_forced: false,
                has_policy: false,
                extra_policies: Vec::new(),
            },
        })
        .collect();

    let registered: HashSet<&str> = registry.iter().map(|p| p.table).collect();
    let unregistered = TableNameRow::find_by_statement(Statement::from_string(
        DbBackend::Postgres,
        TENANT_COLUMN_TABLES_SQL,
    ))
    .all(db)
    .await?
    .into_iter()
    .map(|row| row.table_name)
    .filter(|table| !registered.contains(table.as_str()))
    .collect();

    let role = RolePrivileges::inspect(db).await?;

    let report = VerificationReport {
        tables,
        unregistered,
        role,
    };
    debug!(
        tables = report.tables.len(),
        findings = report.findings().len(),
        "Isolation catalog inspected"
    );
    Ok(report)
}
