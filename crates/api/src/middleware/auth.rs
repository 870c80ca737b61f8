//! Authentication middleware for protected routes.
//!
//! Resolves the tenant for every protected request before any handler runs.
//! A request either carries a valid access token scoped to a tenant or is
//! answered with 401; there is no unscoped fallback.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use nestling_core::tenancy::{TenantContext, resolve_bearer};
use tracing::debug;

use crate::{AppState, error::ApiError};

/// Authentication middleware that resolves the tenant context.
///
/// On success the [`TenantContext`] is stored in request extensions for
/// [`AuthTenant`] to pick up.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match resolve_bearer(header, state.jwt_service.as_ref()) {
        Ok(ctx) => {
            debug!(tenant_id = %ctx.tenant_id, user_id = %ctx.user_id, "Tenant resolved");
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(e) => {
            debug!(error = %e, "Tenant resolution failed");
            ApiError::from(e).into_response()
        }
    }
}

/// Extractor for the resolved tenant context.
///
/// ```ignore
/// async fn handler(AuthTenant(ctx): AuthTenant) -> impl IntoResponse {
///     let scope = TenantScope::bind(&db, ctx.tenant_id).await?;
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthTenant(pub TenantContext);

impl<S> FromRequestParts<S> for AuthTenant
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .copied()
            .map(AuthTenant)
            .ok_or_else(|| ApiError::unauthenticated("Authentication required"))
    }
}
