//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use nestling_core::{auth::PasswordError, tenancy::TenantError};
use nestling_db::IsolationError;
use nestling_shared::{AppError, JwtError};
use sea_orm::DbErr;
use serde_json::json;
use tracing::error;

/// Handler error rendered as `{"error": code, "message": text}`.
///
/// Server-side failures are logged and answered with a generic message.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// Shorthand for a 401 with a client-facing reason.
    #[must_use]
    pub fn unauthenticated(message: &str) -> Self {
        Self(AppError::Unauthenticated(message.to_string()))
    }

    /// Shorthand for a 403 with a client-facing reason.
    #[must_use]
    pub fn forbidden(message: &str) -> Self {
        Self(AppError::Forbidden(message.to_string()))
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<TenantError> for ApiError {
    fn from(err: TenantError) -> Self {
        Self(err.into())
    }
}

impl From<IsolationError> for ApiError {
    fn from(err: IsolationError) -> Self {
        Self(err.into())
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        IsolationError::from(err).into()
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        Self(AppError::Internal(err.to_string()))
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooShort => Self(AppError::Validation(err.to_string())),
            other => Self(AppError::Internal(other.to_string())),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if status.is_server_error() {
            error!(error = %self.0, code = self.0.error_code(), "Request failed");
            "An internal error occurred".to_string()
        } else {
            match &self.0 {
                AppError::Unauthenticated(msg)
                | AppError::Forbidden(msg)
                | AppError::NotFound(msg)
                | AppError::Validation(msg) => msg.clone(),
                AppError::PolicyViolation(_) => {
                    "The request touches data outside your nursery".to_string()
                }
                other => other.to_string(),
            }
        };

        (
            status,
            Json(json!({ "error": self.0.error_code(), "message": message })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[rstest]
    #[case(AppError::MissingTenantClaim, StatusCode::UNAUTHORIZED, "missing_tenant_claim")]
    #[case(AppError::PolicyViolation("x".into()), StatusCode::FORBIDDEN, "policy_violation")]
    #[case(AppError::NotFound("child".into()), StatusCode::NOT_FOUND, "not_found")]
    #[case(AppError::Database("boom".into()), StatusCode::INTERNAL_SERVER_ERROR, "database_error")]
    #[tokio::test]
    async fn test_error_envelope(
        #[case] error: AppError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let response = ApiError(error).into_response();
        assert_eq!(response.status(), status);
        assert_eq!(body_json(response).await["error"], code);
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let response = ApiError(AppError::Database("relation secrets".into())).into_response();
        let body = body_json(response).await;
        assert_eq!(body["message"], "An internal error occurred");
    }

    #[test]
    fn test_policy_violation_from_db_error() {
        let err = DbErr::Custom("new row violates row-level security policy".into());
        assert!(matches!(ApiError::from(err).0, AppError::PolicyViolation(_)));
    }
}
