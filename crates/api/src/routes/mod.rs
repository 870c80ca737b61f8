//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth::auth_middleware};

pub mod audit_logs;
pub mod auth;
pub mod children;
pub mod health;
pub mod tenant;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Every route here runs inside the bearer's tenant
    let protected_routes = Router::new()
        .merge(children::routes())
        .merge(tenant::routes())
        .merge(audit_logs::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(protected_routes)
}
