//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
///
/// The tenant isolation variants are never retried by callers; they mark
/// structural bugs or rejected requests.
#[derive(Debug, Error)]
pub enum AppError {
    /// No credential, or the credential failed signature/expiry checks.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// A valid credential that is not scoped to a tenant.
    #[error("Token carries no tenant claim")]
    MissingTenantClaim,

    /// Access denied.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A write was rejected by a row-level security policy.
    #[error("Row-level security policy violation: {0}")]
    PolicyViolation(String),

    /// The connecting database role can bypass row-level security.
    #[error("Misconfigured database privilege: {0}")]
    MisconfiguredPrivilege(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// External service error.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated(_) | Self::MissingTenantClaim => 401,
            Self::Forbidden(_) | Self::PolicyViolation(_) => 403,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::MisconfiguredPrivilege(_)
            | Self::Database(_)
            | Self::ExternalService(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::MissingTenantClaim => "missing_tenant_claim",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation_error",
            Self::PolicyViolation(_) => "policy_violation",
            Self::MisconfiguredPrivilege(_) => "misconfigured_privilege",
            Self::Database(_) => "database_error",
            Self::ExternalService(_) => "external_service_error",
            Self::Internal(_) => "internal_error",
        }
    }
}
