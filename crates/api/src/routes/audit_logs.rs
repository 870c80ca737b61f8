//! Audit log routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use nestling_db::{AuditLogRepository, TenantScope, entities::audit_logs};
use serde::Deserialize;

use crate::{AppState, error::ApiError, middleware::AuthTenant};

const DEFAULT_LIMIT: u64 = 50;
const MAX_LIMIT: u64 = 500;

/// Creates the audit log routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/audit-logs", get(list_audit_logs))
}

/// Query parameters for listing audit entries.
#[derive(Debug, Deserialize)]
pub struct AuditLogQuery {
    /// Number of entries, newest first.
    pub limit: Option<u64>,
}

/// GET /audit-logs - Recent activity in the bearer's nursery.
async fn list_audit_logs(
    State(state): State<AppState>,
    AuthTenant(ctx): AuthTenant,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Vec<audit_logs::Model>>, ApiError> {
    if !ctx.role.can_modify_settings() {
        return Err(ApiError::forbidden("Only owners and admins can read the audit log"));
    }
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let entries = TenantScope::run(state.db.as_ref(), ctx.tenant_id, |scope| {
        Box::pin(async move { AuditLogRepository::new(scope).recent(limit).await })
    })
    .await?;

    Ok(Json(entries))
}
