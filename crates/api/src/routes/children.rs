//! Child enrolment routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use chrono::NaiveDate;
use nestling_db::{
    AuditLogRepository, ChildRepository, IsolationError, TenantScope,
    entities::children,
    repositories::{AuditEntry, NewChild},
};
use nestling_shared::types::ChildId;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::AuthTenant};

/// Creates the child routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/children", get(list_children).post(create_child))
        .route("/children/{child_id}", get(get_child).delete(delete_child))
}

/// Query parameters for listing children.
#[derive(Debug, Deserialize)]
pub struct ListChildrenQuery {
    /// Only children placed in this room.
    pub room_id: Option<Uuid>,
}

/// Request body for enrolling a child.
#[derive(Debug, Deserialize)]
pub struct CreateChildRequest {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Date of birth.
    pub date_of_birth: NaiveDate,
    /// Room placement.
    pub room_id: Option<Uuid>,
}

fn require_staff(AuthTenant(ctx): AuthTenant) -> Result<(), ApiError> {
    if ctx.role.is_staff_member() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only nursery staff can view the register"))
    }
}

fn require_manager(AuthTenant(ctx): AuthTenant) -> Result<(), ApiError> {
    if ctx.role.can_manage_staff() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only managers can change enrolment"))
    }
}

/// GET /children - List the tenant's children.
async fn list_children(
    State(state): State<AppState>,
    auth: AuthTenant,
    Query(query): Query<ListChildrenQuery>,
) -> Result<Json<Vec<children::Model>>, ApiError> {
    require_staff(auth)?;

    let children = TenantScope::run(state.db.as_ref(), auth.0.tenant_id, |scope| {
        Box::pin(async move {
            let repo = ChildRepository::new(scope);
            match query.room_id {
                Some(room_id) => repo.list_by_room(room_id).await,
                None => repo.list().await,
            }
        })
    })
    .await?;

    Ok(Json(children))
}

/// GET /children/{child_id} - Fetch one child.
async fn get_child(
    State(state): State<AppState>,
    auth: AuthTenant,
    Path(child_id): Path<Uuid>,
) -> Result<Json<children::Model>, ApiError> {
    require_staff(auth)?;

    let child = TenantScope::run(state.db.as_ref(), auth.0.tenant_id, |scope| {
        Box::pin(async move {
            ChildRepository::new(scope)
                .find(ChildId::from_uuid(child_id))
                .await?
                .ok_or(IsolationError::NotFound("child"))
        })
    })
    .await?;

    Ok(Json(child))
}

/// POST /children - Enrol a child.
async fn create_child(
    State(state): State<AppState>,
    auth: AuthTenant,
    Json(payload): Json<CreateChildRequest>,
) -> Result<(StatusCode, Json<children::Model>), ApiError> {
    require_manager(auth)?;
    let ctx = auth.0;

    let scope = TenantScope::bind(state.db.as_ref(), ctx.tenant_id).await?;
    let child = ChildRepository::new(&scope)
        .create(NewChild {
            first_name: payload.first_name,
            last_name: payload.last_name,
            date_of_birth: payload.date_of_birth,
            room_id: payload.room_id,
        })
        .await?;
    AuditLogRepository::new(&scope)
        .record(AuditEntry {
            actor_id: Some(ctx.user_id),
            action: "child.enrolled",
            entity_type: "child",
            entity_id: Some(child.id),
            metadata: json!({ "room_id": child.room_id }),
        })
        .await?;
    scope.commit().await?;

    info!(child_id = %child.id, tenant_id = %ctx.tenant_id, "Child enrolled");
    Ok((StatusCode::CREATED, Json(child)))
}

/// DELETE /children/{child_id} - Remove a child record.
async fn delete_child(
    State(state): State<AppState>,
    auth: AuthTenant,
    Path(child_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_manager(auth)?;
    let ctx = auth.0;

    let scope = TenantScope::bind(state.db.as_ref(), ctx.tenant_id).await?;
    ChildRepository::new(&scope)
        .delete(ChildId::from_uuid(child_id))
        .await?;
    AuditLogRepository::new(&scope)
        .record(AuditEntry {
            actor_id: Some(ctx.user_id),
            action: "child.deleted",
            entity_type: "child",
            entity_id: Some(child_id),
            metadata: json!({}),
        })
        .await?;
    scope.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
