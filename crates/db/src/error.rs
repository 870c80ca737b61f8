//! Errors raised by tenant-scoped database work.

use nestling_shared::AppError;
use sea_orm::{DbErr, RuntimeErr};
use thiserror::Error;

/// SQLSTATE `insufficient_privilege`. Postgres raises it for policy
/// rejections and for plain missing grants alike.
const INSUFFICIENT_PRIVILEGE: &str = "42501";

/// SQLSTATE `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";

const POLICY_MESSAGE: &str = "row-level security policy";

/// Errors surfaced by the isolation layer.
#[derive(Debug, Error)]
pub enum IsolationError {
    /// A write was rejected by a row-level security policy.
    #[error("write rejected by row-level security: {0}")]
    PolicyViolation(String),

    /// No row visible to the bound tenant matched.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A write referenced a row that does not exist in the bound tenant.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// The connecting role is superuser or holds BYPASSRLS.
    #[error("role {role} defeats row-level security: {reason}")]
    MisconfiguredPrivilege {
        /// Role name as reported by `pg_roles`.
        role: String,
        /// Which attribute is set.
        reason: String,
    },

    /// A role name that is not a plain lowercase identifier.
    #[error("invalid role name: {0}")]
    InvalidRoleName(String),

    /// Any other database failure.
    #[error(transparent)]
    Database(DbErr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Policy,
    ForeignKey,
    Other,
}

fn classify(sqlstate: Option<&str>, message: &str) -> Rejection {
    match sqlstate {
        Some(INSUFFICIENT_PRIVILEGE) if message.contains(POLICY_MESSAGE) => Rejection::Policy,
        Some(FOREIGN_KEY_VIOLATION) => Rejection::ForeignKey,
        Some(_) => Rejection::Other,
        // Errors that lost their SQLSTATE on the way up only keep the text.
        None if message.contains(POLICY_MESSAGE) => Rejection::Policy,
        None if message.contains("violates foreign key constraint") => Rejection::ForeignKey,
        None => Rejection::Other,
    }
}

fn database_error(err: &DbErr) -> Option<(Option<String>, String)> {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(e))
        | DbErr::Query(RuntimeErr::SqlxError(e))
        | DbErr::Conn(RuntimeErr::SqlxError(e)) => e.as_database_error().map(|db| {
            (
                db.code().map(std::borrow::Cow::into_owned),
                db.message().to_string(),
            )
        }),
        _ => None,
    }
}

fn rejection(err: &DbErr) -> Rejection {
    match database_error(err) {
        Some((code, message)) => classify(code.as_deref(), &message),
        None => classify(None, &err.to_string()),
    }
}

/// Returns true if `err` is Postgres rejecting a row under a policy.
#[must_use]
pub fn is_policy_violation(err: &DbErr) -> bool {
    rejection(err) == Rejection::Policy
}

impl From<DbErr> for IsolationError {
    fn from(err: DbErr) -> Self {
        match rejection(&err) {
            Rejection::Policy => Self::PolicyViolation(err.to_string()),
            Rejection::ForeignKey => Self::InvalidReference(err.to_string()),
            Rejection::Other => Self::Database(err),
        }
    }
}

impl From<IsolationError> for AppError {
    fn from(err: IsolationError) -> Self {
        match err {
            IsolationError::PolicyViolation(msg) => Self::PolicyViolation(msg),
            IsolationError::NotFound(what) => Self::NotFound(what.to_string()),
            // The constraint text names tables; keep it out of the response.
            IsolationError::InvalidReference(_) => {
                Self::Validation("referenced record does not exist".to_string())
            }
            e @ IsolationError::MisconfiguredPrivilege { .. } => {
                Self::MisconfiguredPrivilege(e.to_string())
            }
            IsolationError::InvalidRoleName(name) => Self::Validation(name),
            IsolationError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_message_is_classified() {
        let err = DbErr::Custom(
            "new row violates row-level security policy for table \"children\"".to_string(),
        );
        assert!(matches!(
            IsolationError::from(err),
            IsolationError::PolicyViolation(_)
        ));
    }

    #[test]
    fn test_other_errors_stay_database_errors() {
        let err = DbErr::RecordNotFound("children".to_string());
        assert!(matches!(
            IsolationError::from(err),
            IsolationError::Database(_)
        ));
    }

    #[test]
    fn test_missing_grant_is_not_a_policy_violation() {
        assert_eq!(
            classify(Some("42501"), "permission denied for table seaql_migrations"),
            Rejection::Other
        );
        assert_eq!(
            classify(
                Some("42501"),
                "new row violates row-level security policy for table \"children\""
            ),
            Rejection::Policy
        );
    }

    #[test]
    fn test_foreign_key_violation_is_an_invalid_reference() {
        assert_eq!(
            classify(
                Some("23503"),
                "insert or update on table \"children\" violates foreign key constraint"
            ),
            Rejection::ForeignKey
        );

        let err = DbErr::Custom(
            "insert or update on table \"children\" violates foreign key constraint \
             \"children_tenant_id_room_id_fkey\""
                .to_string(),
        );
        let isolation = IsolationError::from(err);
        assert!(matches!(isolation, IsolationError::InvalidReference(_)));

        let app: AppError = isolation.into();
        assert_eq!(app.status_code(), 400);
        assert_eq!(app.error_code(), "validation_error");
    }

    #[test]
    fn test_app_error_mapping() {
        let app: AppError = IsolationError::PolicyViolation("x".into()).into();
        assert_eq!(app.error_code(), "policy_violation");

        let app: AppError = IsolationError::MisconfiguredPrivilege {
            role: "postgres".into(),
            reason: "superuser".into(),
        }
        .into();
        assert_eq!(app.status_code(), 500);

        let app: AppError = IsolationError::NotFound("child").into();
        assert_eq!(app.status_code(), 404);
    }
}
