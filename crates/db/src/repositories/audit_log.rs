//! Audit log repository.

use nestling_shared::types::UserId;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, QuerySelect, Set};
use uuid::Uuid;

use crate::entities::audit_logs;
use crate::error::IsolationError;
use crate::rls::TenantScope;

/// One auditable action.
#[derive(Debug, Clone)]
pub struct AuditEntry<'e> {
    /// Account that acted, if any.
    pub actor_id: Option<UserId>,
    /// Verb, e.g. `auth.login`.
    pub action: &'e str,
    /// Kind of record acted on.
    pub entity_type: &'e str,
    /// Record acted on.
    pub entity_id: Option<Uuid>,
    /// Free-form context.
    pub metadata: serde_json::Value,
}

/// Audit log repository scoped to one tenant.
#[derive(Debug, Clone, Copy)]
pub struct AuditLogRepository<'a> {
    scope: &'a TenantScope,
}

impl<'a> AuditLogRepository<'a> {
    /// Creates a repository over `scope`.
    #[must_use]
    pub const fn new(scope: &'a TenantScope) -> Self {
        Self { scope }
    }

    /// Appends an entry to the bound tenant's log.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn record(&self, entry: AuditEntry<'_>) -> Result<audit_logs::Model, IsolationError> {
        let log = audit_logs::ActiveModel {
            id: Set(Uuid::now_v7()),
            tenant_id: Set(self.scope.tenant_id().into_inner()),
            actor_id: Set(entry.actor_id.map(UserId::into_inner)),
            action: Set(entry.action.to_string()),
            entity_type: Set(entry.entity_type.to_string()),
            entity_id: Set(entry.entity_id),
            metadata: Set(entry.metadata),
            created_at: Set(chrono::Utc::now().into()),
        };

        Ok(log.insert(self.scope.transaction()).await?)
    }

    /// Most recent entries first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn recent(&self, limit: u64) -> Result<Vec<audit_logs::Model>, IsolationError> {
        Ok(audit_logs::Entity::find()
            .order_by_desc(audit_logs::Column::CreatedAt)
            .limit(limit)
            .all(self.scope.transaction())
            .await?)
    }
}
