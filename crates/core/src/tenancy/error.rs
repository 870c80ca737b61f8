//! Tenant resolution errors.

use nestling_shared::AppError;
use thiserror::Error;

/// Errors raised while resolving the tenant for a unit of work.
///
/// Both variants reject the request before any query runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenantError {
    /// No credential, or the credential failed validation.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The credential is valid but not scoped to a tenant.
    #[error("credential carries no tenant claim")]
    MissingTenantClaim,
}

impl From<TenantError> for AppError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::Unauthenticated(reason) => Self::Unauthenticated(reason),
            TenantError::MissingTenantClaim => Self::MissingTenantClaim,
        }
    }
}
