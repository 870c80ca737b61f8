//! Registry of tenant-scoped tables and the row-level security SQL for each.
//!
//! The registry is the single source of truth: migrations render their
//! policy statements from it, and the verification harness checks the live
//! catalog against it.

/// Postgres setting carrying the tenant bound to the current transaction.
pub const TENANT_SETTING: &str = "app.current_tenant_id";

/// Name of the isolation policy created on every registered table.
pub const POLICY_NAME: &str = "tenant_isolation";

/// One table subject to tenant isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TablePolicy {
    /// Table name in the `public` schema.
    pub table: &'static str,
    /// Column compared against the bound tenant.
    pub tenant_column: &'static str,
}

/// Every tenant-scoped table, in dependency order.
pub const TENANT_TABLES: &[TablePolicy] = &[
    TablePolicy::root("tenants"),
    TablePolicy::scoped("users"),
    TablePolicy::scoped("staff"),
    TablePolicy::scoped("rooms"),
    TablePolicy::scoped("children"),
    TablePolicy::scoped("daily_logs"),
    TablePolicy::scoped("attendance_records"),
    TablePolicy::scoped("invoices"),
    TablePolicy::scoped("payments"),
    TablePolicy::scoped("conversations"),
    TablePolicy::scoped("messages"),
    TablePolicy::scoped("announcements"),
    TablePolicy::scoped("audit_logs"),
    TablePolicy::scoped("magic_link_tokens"),
];

/// Expression reading the bound tenant.
///
/// `current_setting(.., true)` yields NULL when the setting was never
/// defined on the session and `''` after a transaction-local value has been
/// discarded. Both must compare as unknown so that no row matches.
fn bound_tenant_expr() -> String {
    format!("NULLIF(current_setting('{TENANT_SETTING}', true), '')::uuid")
}

impl TablePolicy {
    /// A table keyed to its tenant through a `tenant_id` column.
    #[must_use]
    pub const fn scoped(table: &'static str) -> Self {
        Self {
            table,
            tenant_column: "tenant_id",
        }
    }

    /// The tenants table itself, whose own primary key is the tenant.
    #[must_use]
    pub const fn root(table: &'static str) -> Self {
        Self {
            table,
            tenant_column: "id",
        }
    }

    /// Row predicate shared by the read and write halves of the policy.
    #[must_use]
    pub fn predicate(&self) -> String {
        format!("{} = {}", self.tenant_column, bound_tenant_expr())
    }

    /// `ALTER TABLE .. ENABLE ROW LEVEL SECURITY`.
    #[must_use]
    pub fn enable_sql(&self) -> String {
        format!("ALTER TABLE {} ENABLE ROW LEVEL SECURITY;", self.table)
    }

    /// `ALTER TABLE .. FORCE ROW LEVEL SECURITY`, binding the table owner too.
    #[must_use]
    pub fn force_sql(&self) -> String {
        format!("ALTER TABLE {} FORCE ROW LEVEL SECURITY;", self.table)
    }

    /// The isolation policy: `USING` narrows reads, `WITH CHECK` rejects
    /// writes of rows belonging to another tenant.
    #[must_use]
    pub fn policy_sql(&self) -> String {
        let predicate = self.predicate();
        format!(
            "CREATE POLICY {POLICY_NAME} ON {} AS PERMISSIVE FOR ALL USING ({predicate}) WITH CHECK ({predicate});",
            self.table
        )
    }

    /// Reverse of [`Self::enable_sql`] and [`Self::policy_sql`].
    #[must_use]
    pub fn disable_sql(&self) -> String {
        format!(
            "DROP POLICY IF EXISTS {POLICY_NAME} ON {table};\nALTER TABLE {table} DISABLE ROW LEVEL SECURITY;",
            table = self.table
        )
    }

    /// Reverse of [`Self::force_sql`].
    #[must_use]
    pub fn no_force_sql(&self) -> String {
        format!("ALTER TABLE {} NO FORCE ROW LEVEL SECURITY;", self.table)
    }
}

/// Looks up a registered table by name.
#[must_use]
pub fn find(table: &str) -> Option<&'static TablePolicy> {
    TENANT_TABLES.iter().find(|policy| policy.table == table)
}

/// Joins one rendered statement per table into a script.
#[must_use]
pub fn render(tables: &[TablePolicy], statement: impl Fn(&TablePolicy) -> String) -> String {
    tables
        .iter()
        .map(statement)
        .collect::<Vec<_>>()
        .join("\n")
}
