//! Tenant (nursery) repository.

use nestling_shared::TenantId;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DbBackend, DbErr, EntityTrait, FromQueryResult, Set,
    Statement,
};
use uuid::Uuid;

use crate::entities::tenants;
use crate::error::IsolationError;
use crate::rls::TenantScope;

#[derive(Debug, FromQueryResult)]
struct LookupRow {
    tenant_id: Option<Uuid>,
}

/// Repository for the tenant row a scope is bound to.
///
/// The tenants table is itself isolated: inside a scope the only visible
/// tenant is the bound one.
#[derive(Debug, Clone, Copy)]
pub struct TenantRepository<'a> {
    scope: &'a TenantScope,
}

impl<'a> TenantRepository<'a> {
    /// Creates a repository over `scope`.
    #[must_use]
    pub const fn new(scope: &'a TenantScope) -> Self {
        Self { scope }
    }

    /// Resolves a subdomain to an active tenant before any scope exists.
    ///
    /// This goes through the `tenant_id_for_subdomain` function, the one
    /// lookup that is not subject to the isolation policies.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn lookup_subdomain<C>(db: &C, subdomain: &str) -> Result<Option<TenantId>, DbErr>
    where
        C: ConnectionTrait,
    {
        let row = LookupRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT tenant_id_for_subdomain($1) AS tenant_id",
            [subdomain.into()],
        ))
        .one(db)
        .await?;

        Ok(row
            .and_then(|row| row.tenant_id)
            .map(TenantId::from_uuid))
    }

    /// Inserts the tenant row for the scope's own id.
    ///
    /// Open the scope on a fresh `TenantId` first; the row passes the
    /// policy check because its id is the bound tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, for example on a taken subdomain.
    pub async fn create(
        &self,
        name: &str,
        subdomain: &str,
    ) -> Result<tenants::Model, IsolationError> {
        let now = chrono::Utc::now().into();
        let tenant = tenants::ActiveModel {
            id: Set(self.scope.tenant_id().into_inner()),
            name: Set(name.to_string()),
            subdomain: Set(subdomain.to_lowercase()),
            branding: Set(serde_json::json!({})),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(tenant.insert(self.scope.transaction()).await?)
    }

    /// Loads the bound tenant.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the bound tenant does not exist.
    pub async fn current(&self) -> Result<tenants::Model, IsolationError> {
        tenants::Entity::find_by_id(self.scope.tenant_id().into_inner())
            .one(self.scope.transaction())
            .await?
            .ok_or(IsolationError::NotFound("tenant"))
    }

    /// Replaces the bound tenant's branding document.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the bound tenant does not exist.
    pub async fn update_branding(
        &self,
        branding: serde_json::Value,
    ) -> Result<tenants::Model, IsolationError> {
        let mut tenant: tenants::ActiveModel = self.current().await?.into();
        tenant.branding = Set(branding);
        Ok(tenant.update(self.scope.transaction()).await?)
    }

    /// Marks the bound tenant inactive, which also stops subdomain logins.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the bound tenant does not exist.
    pub async fn deactivate(&self) -> Result<(), IsolationError> {
        let mut tenant: tenants::ActiveModel = self.current().await?.into();
        tenant.is_active = Set(false);
        tenant.update(self.scope.transaction()).await?;
        Ok(())
    }
}
