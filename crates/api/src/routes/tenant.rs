//! Routes for the caller's own nursery.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, put},
};
use nestling_db::{
    AuditLogRepository, TenantRepository, TenantScope, entities::tenants,
    repositories::AuditEntry,
};
use serde_json::json;

use crate::{AppState, error::ApiError, middleware::AuthTenant};

/// Creates the tenant routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tenant", get(get_tenant))
        .route("/tenant/branding", put(update_branding))
}

/// GET /tenant - The bearer's nursery, including branding.
async fn get_tenant(
    State(state): State<AppState>,
    AuthTenant(ctx): AuthTenant,
) -> Result<Json<tenants::Model>, ApiError> {
    let tenant = TenantScope::run(state.db.as_ref(), ctx.tenant_id, |scope| {
        Box::pin(async move { TenantRepository::new(scope).current().await })
    })
    .await?;

    Ok(Json(tenant))
}

/// PUT /tenant/branding - Replace the nursery's branding document.
async fn update_branding(
    State(state): State<AppState>,
    AuthTenant(ctx): AuthTenant,
    Json(branding): Json<serde_json::Value>,
) -> Result<Json<tenants::Model>, ApiError> {
    if !ctx.role.can_modify_settings() {
        return Err(ApiError::forbidden("Only owners and admins can change branding"));
    }
    if !branding.is_object() {
        return Err(nestling_shared::AppError::Validation(
            "branding must be a JSON object".to_string(),
        )
        .into());
    }

    let scope = TenantScope::bind(state.db.as_ref(), ctx.tenant_id).await?;
    let tenant = TenantRepository::new(&scope).update_branding(branding).await?;
    AuditLogRepository::new(&scope)
        .record(AuditEntry {
            actor_id: Some(ctx.user_id),
            action: "tenant.branding_updated",
            entity_type: "tenant",
            entity_id: Some(tenant.id),
            metadata: json!({}),
        })
        .await?;
    scope.commit().await?;

    Ok(Json(tenant))
}
