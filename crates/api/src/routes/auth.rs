//! Authentication routes: staff login, parent magic links, token refresh.
//!
//! None of these run behind the auth middleware. Login and magic link
//! requests find their tenant through the subdomain lookup; redemption and
//! refresh carry the tenant in the link or the token.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use nestling_core::auth::{UserRole, verify_password};
use nestling_db::{
    AuditLogRepository, MagicLinkRepository, TenantRepository, TenantScope, UserRepository,
    entities::users, repositories::AuditEntry,
};
use nestling_shared::{
    AppError, TenantId, TokenKind,
    auth::{LoginRequest, LoginResponse, MagicLinkRequest, RedeemMagicLinkRequest, RefreshRequest},
    types::UserId,
};
use serde_json::json;
use tracing::{info, warn};

use crate::{AppState, error::ApiError};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Creates the auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/magic-link", post(request_magic_link))
        .route("/auth/magic-link/redeem", post(redeem_magic_link))
        .route("/auth/refresh", post(refresh))
}

fn account_role(user: &users::Model) -> Result<UserRole, ApiError> {
    user.role
        .parse()
        .map_err(|e| ApiError(AppError::Internal(format!("stored role: {e}"))))
}

fn issue_tokens(
    state: &AppState,
    user: &users::Model,
    tenant_id: TenantId,
    role: UserRole,
) -> Result<LoginResponse, ApiError> {
    let pair = state
        .jwt_service
        .generate_token_pair(user.id, tenant_id, role.as_str())?;

    Ok(LoginResponse {
        user_id: user.id,
        tenant_id,
        role: role.as_str().to_string(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        expires_in: pair.expires_in,
    })
}

async fn audit(scope: &TenantScope, user: &users::Model, action: &str) -> Result<(), ApiError> {
    AuditLogRepository::new(scope)
        .record(AuditEntry {
            actor_id: Some(UserId::from_uuid(user.id)),
            action,
            entity_type: "user",
            entity_id: Some(user.id),
            metadata: json!({}),
        })
        .await?;
    Ok(())
}

/// POST /auth/login - Staff sign-in with a password.
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Some(tenant_id) =
        TenantRepository::lookup_subdomain(state.db.as_ref(), &payload.subdomain).await?
    else {
        info!(subdomain = %payload.subdomain, "Login attempt for unknown nursery");
        return Err(ApiError::unauthenticated(INVALID_CREDENTIALS));
    };

    let scope = TenantScope::bind(state.db.as_ref(), tenant_id).await?;
    let users = UserRepository::new(&scope);

    let Some(user) = users.find_by_email(&payload.email).await? else {
        info!(tenant_id = %tenant_id, "Login attempt for non-existent user");
        return Err(ApiError::unauthenticated(INVALID_CREDENTIALS));
    };

    let role = account_role(&user)?;
    if !user.is_active || !role.is_staff_member() {
        return Err(ApiError::unauthenticated(INVALID_CREDENTIALS));
    }

    if !verify_password(&payload.password, user.password_hash.as_deref())? {
        info!(user_id = %user.id, "Failed login attempt - invalid password");
        return Err(ApiError::unauthenticated(INVALID_CREDENTIALS));
    }

    users.touch_last_login(UserId::from_uuid(user.id)).await?;
    audit(&scope, &user, "auth.login").await?;
    scope.commit().await?;

    info!(user_id = %user.id, tenant_id = %tenant_id, "User logged in successfully");
    Ok(Json(issue_tokens(&state, &user, tenant_id, role)?))
}

/// POST /auth/magic-link - Mail a single-use sign-in link to a parent.
///
/// Always answers 202 so the endpoint cannot be used to probe which
/// addresses are registered.
async fn request_magic_link(
    State(state): State<AppState>,
    Json(payload): Json<MagicLinkRequest>,
) -> Result<StatusCode, ApiError> {
    let Some(tenant_id) =
        TenantRepository::lookup_subdomain(state.db.as_ref(), &payload.subdomain).await?
    else {
        return Ok(StatusCode::ACCEPTED);
    };

    let scope = TenantScope::bind(state.db.as_ref(), tenant_id).await?;

    let parent = UserRepository::new(&scope)
        .find_by_email(&payload.email)
        .await?
        .filter(|user| user.is_active && user.role == UserRole::Parent.as_str());
    let Some(parent) = parent else {
        return Ok(StatusCode::ACCEPTED);
    };

    let token = MagicLinkRepository::new(&scope)
        .create(UserId::from_uuid(parent.id), state.magic_link_ttl)
        .await?;
    let nursery = TenantRepository::new(&scope).current().await?;
    audit(&scope, &parent, "auth.magic_link_requested").await?;
    scope.commit().await?;

    if let Err(e) = state
        .email_service
        .send_magic_link(
            &parent.email,
            &parent.full_name,
            &nursery.name,
            tenant_id,
            &token,
            state.magic_link_ttl.num_minutes(),
        )
        .await
    {
        warn!(error = %e, user_id = %parent.id, "Failed to send magic link");
    }

    Ok(StatusCode::ACCEPTED)
}

/// POST /auth/magic-link/redeem - Exchange a magic link for tokens.
async fn redeem_magic_link(
    State(state): State<AppState>,
    Json(payload): Json<RedeemMagicLinkRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let scope = TenantScope::bind(state.db.as_ref(), payload.tenant_id).await?;

    let user = match MagicLinkRepository::new(&scope).redeem(&payload.token).await {
        Ok(user) => user,
        Err(nestling_db::IsolationError::NotFound(_)) => {
            return Err(ApiError::unauthenticated("Invalid or expired link"));
        }
        Err(e) => return Err(e.into()),
    };
    let role = account_role(&user)?;

    UserRepository::new(&scope)
        .touch_last_login(UserId::from_uuid(user.id))
        .await?;
    audit(&scope, &user, "auth.magic_link_redeemed").await?;
    scope.commit().await?;

    info!(user_id = %user.id, tenant_id = %payload.tenant_id, "Magic link redeemed");
    Ok(Json(issue_tokens(&state, &user, payload.tenant_id, role)?))
}

/// POST /auth/refresh - Exchange a refresh token for a new pair.
///
/// The role is re-read from the database so demotions take effect on the
/// next refresh.
async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let claims = state
        .jwt_service
        .validate_token(&payload.refresh_token)
        .map_err(|_| ApiError::unauthenticated("Invalid or expired refresh token"))?;

    if claims.kind != TokenKind::Refresh {
        return Err(ApiError::unauthenticated("Not a refresh token"));
    }
    let tenant_id = claims.tenant_id().ok_or(AppError::MissingTenantClaim)?;

    let scope = TenantScope::bind(state.db.as_ref(), tenant_id).await?;
    let user = UserRepository::new(&scope)
        .find_by_id(UserId::from_uuid(claims.user_id()))
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::unauthenticated("Account is no longer active"))?;
    scope.commit().await?;

    let role = account_role(&user)?;
    Ok(Json(issue_tokens(&state, &user, tenant_id, role)?))
}
