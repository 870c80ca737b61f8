//! Tenant-scoped database work.
//!
//! Every scoped query runs inside a transaction whose first statement binds
//! the tenant with `set_config('app.current_tenant_id', $1, true)`. The
//! binding is transaction-local, so it is discarded on commit, on rollback,
//! and when an unfinished transaction is dropped. A pooled connection can
//! therefore never carry one request's tenant into the next.
//!
//! # Usage
//!
//! ```ignore
//! use nestling_db::rls::TenantScope;
//!
//! let scope = TenantScope::bind(&db, tenant_id).await?;
//! let children = children::Entity::find().all(scope.transaction()).await?;
//! scope.commit().await?;
//! ```

use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use nestling_core::tenancy::TENANT_SETTING;
use nestling_shared::TenantId;
use sea_orm::{
    ConnectionTrait, DatabaseTransaction, DbBackend, DbErr, Statement, TransactionTrait,
};
use tracing::{debug, warn};

/// Units of work slower than this are logged.
const SLOW_SCOPE: Duration = Duration::from_millis(100);

/// A transaction bound to exactly one tenant.
///
/// Scoped repositories only accept `&TenantScope`, so a query that forgot
/// to set the tenant does not type-check.
pub struct TenantScope {
    txn: DatabaseTransaction,
    tenant_id: TenantId,
    started: Instant,
}

impl std::fmt::Debug for TenantScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantScope")
            .field("tenant_id", &self.tenant_id)
            .finish_non_exhaustive()
    }
}

/// SQL binding the tenant for the rest of the current transaction.
pub(crate) fn bind_statement(tenant_id: TenantId) -> Statement {
    Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT set_config($1, $2, true)",
        [TENANT_SETTING.into(), tenant_id.to_string().into()],
    )
}

impl TenantScope {
    /// Begins a transaction and binds `tenant_id` to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started or the binding
    /// cannot be set. Nothing is left bound on failure.
    pub async fn bind<C>(db: &C, tenant_id: TenantId) -> Result<Self, DbErr>
    where
        C: TransactionTrait,
    {
        let txn = db.begin().await?;
        txn.execute(bind_statement(tenant_id)).await?;
        debug!(tenant_id = %tenant_id, "Tenant scope bound");

        Ok(Self {
            txn,
            tenant_id,
            started: Instant::now(),
        })
    }

    /// Runs `f` inside a fresh scope, committing on `Ok` and rolling back on `Err`.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a database error from bind/commit.
    pub async fn run<C, F, T, E>(db: &C, tenant_id: TenantId, f: F) -> Result<T, E>
    where
        C: TransactionTrait,
        F: for<'c> FnOnce(&'c TenantScope) -> BoxFuture<'c, Result<T, E>> + Send,
        T: Send,
        E: From<DbErr>,
    {
        let scope = Self::bind(db, tenant_id).await?;
        match f(&scope).await {
            Ok(value) => {
                scope.commit().await?;
                Ok(value)
            }
            Err(e) => {
                scope.rollback().await?;
                Err(e)
            }
        }
    }

    /// The tenant this scope is bound to.
    #[must_use]
    pub const fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the underlying transaction for executing queries.
    ///
    /// Every query run through it is subject to the tenant isolation
    /// policies for [`Self::tenant_id`].
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Reads the binding back from the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn current_binding(&self) -> Result<Option<TenantId>, DbErr> {
        current_binding(&self.txn).await
    }

    /// Commits the transaction, releasing the binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub async fn commit(self) -> Result<(), DbErr> {
        self.log_if_slow("commit");
        self.txn.commit().await
    }

    /// Rolls back the transaction, releasing the binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub async fn rollback(self) -> Result<(), DbErr> {
        self.log_if_slow("rollback");
        self.txn.rollback().await
    }

    fn log_if_slow(&self, outcome: &'static str) {
        let elapsed = self.started.elapsed();
        if elapsed > SLOW_SCOPE {
            warn!(
                tenant_id = %self.tenant_id,
                duration_ms = elapsed.as_millis(),
                outcome,
                "Slow tenant-scoped unit of work"
            );
        }
    }
}

/// Reads `app.current_tenant_id` on any connection.
///
/// Returns `None` when the setting is unset or empty, which is what a
/// released pooled connection must report.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn current_binding<C>(conn: &C) -> Result<Option<TenantId>, DbErr>
where
    C: ConnectionTrait,
{
    let row = conn
        .query_one(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT NULLIF(current_setting($1, true), '') AS tenant_id",
            [TENANT_SETTING.into()],
        ))
        .await?;

    let raw = match row {
        Some(row) => row.try_get::<Option<String>>("", "tenant_id")?,
        None => None,
    };

    raw.map(|value| {
        value
            .parse::<TenantId>()
            .map_err(|e| DbErr::Custom(format!("corrupt tenant binding {value:?}: {e}")))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_bind_statement_is_parameterized() {
        let tenant = TenantId::from_uuid(
            Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap(),
        );
        let stmt = bind_statement(tenant);

        assert_eq!(stmt.sql, "SELECT set_config($1, $2, true)");
        assert!(!stmt.sql.contains(&tenant.to_string()));

        let values = stmt.values.expect("bind values").0;
        assert_eq!(values.len(), 2);
        assert_eq!(values[0], sea_orm::Value::from("app.current_tenant_id"));
        assert_eq!(values[1], sea_orm::Value::from(tenant.to_string()));
    }
}
