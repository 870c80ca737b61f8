//! Provisioning of the role the application connects as.
//!
//! The role can log in and run DML on the schema, and nothing more: it is
//! not a superuser, does not hold `BYPASSRLS`, and does not own the tables.
//! Run this as the migration owner after migrations have been applied.

use sea_orm::ConnectionTrait;
use tracing::info;

use crate::error::IsolationError;

/// Longest identifier Postgres accepts without truncating.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Accepts only plain lowercase identifiers, which need no quoting.
///
/// Role names cannot be bound as parameters in DDL, so anything else is
/// rejected rather than escaped.
fn validate_role_name(role: &str) -> Result<(), IsolationError> {
    let mut chars = role.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if valid_start && valid_rest && role.len() <= MAX_IDENTIFIER_LEN {
        Ok(())
    } else {
        Err(IsolationError::InvalidRoleName(role.to_string()))
    }
}

/// Renders `value` as a SQL string literal.
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Statements creating or tightening `role`, in execution order.
fn provision_statements(role: &str, password: Option<&str>) -> Vec<String> {
    let mut statements = vec![format!(
        "DO $$ BEGIN \
         IF NOT EXISTS (SELECT 1 FROM pg_roles WHERE rolname = {name}) THEN \
         CREATE ROLE {role} LOGIN; \
         END IF; \
         END $$;",
        name = quote_literal(role)
    )];

    let mut alter =
        format!("ALTER ROLE {role} LOGIN NOSUPERUSER NOBYPASSRLS NOCREATEDB NOCREATEROLE");
    if let Some(password) = password {
        alter.push_str(" PASSWORD ");
        alter.push_str(&quote_literal(password));
    }
    alter.push(';');
    statements.push(alter);

    statements.extend([
        format!("GRANT USAGE ON SCHEMA public TO {role};"),
        format!("GRANT SELECT, INSERT, UPDATE, DELETE ON ALL TABLES IN SCHEMA public TO {role};"),
        format!("GRANT USAGE, SELECT ON ALL SEQUENCES IN SCHEMA public TO {role};"),
        format!("GRANT EXECUTE ON FUNCTION tenant_id_for_subdomain(TEXT) TO {role};"),
        format!(
            "ALTER DEFAULT PRIVILEGES IN SCHEMA public \
             GRANT SELECT, INSERT, UPDATE, DELETE ON TABLES TO {role};"
        ),
        format!("REVOKE ALL ON TABLE seaql_migrations FROM {role};"),
    ]);

    statements
}

/// Creates `role` if missing and leaves it with only the privileges the
/// application needs.
///
/// Running it again is harmless. Passing `None` for `password` keeps any
/// password already set.
///
/// # Errors
///
/// Returns `InvalidRoleName` for names that are not plain lowercase
/// identifiers, or a database error if a statement fails.
pub async fn provision_app_role<C>(
    db: &C,
    role: &str,
    password: Option<&str>,
) -> Result<(), IsolationError>
where
    C: ConnectionTrait,
{
    validate_role_name(role)?;

    for statement in provision_statements(role, password) {
        db.execute_unprepared(&statement)
            .await
            .map_err(IsolationError::Database)?;
    }

    info!(role, "Application role provisioned");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_identifiers_are_accepted() {
        for role in ["nestling_app", "_svc", "app2"] {
            assert!(validate_role_name(role).is_ok(), "{role}");
        }
    }

    #[test]
    fn test_unsafe_identifiers_are_rejected() {
        for role in ["", "2app", "App", "app-user", "app; DROP TABLE children", "app\"x"] {
            assert!(
                matches!(
                    validate_role_name(role),
                    Err(IsolationError::InvalidRoleName(_))
                ),
                "{role}"
            );
        }
        assert!(validate_role_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_password_literal_is_escaped() {
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_role_never_gains_bypass_attributes() {
        let statements = provision_statements("nestling_app", Some("secret"));
        let alter = statements
            .iter()
            .find(|s| s.starts_with("ALTER ROLE"))
            .unwrap();

        assert!(alter.contains("NOSUPERUSER"));
        assert!(alter.contains("NOBYPASSRLS"));
        assert!(alter.ends_with("PASSWORD 'secret';"));
        assert!(statements.iter().all(|s| !s.contains(" OWNER ")));
    }

    #[test]
    fn test_password_is_optional() {
        let statements = provision_statements("nestling_app", None);
        assert!(statements.iter().all(|s| !s.contains("PASSWORD")));
    }

    #[test]
    fn test_migration_ledger_is_revoked() {
        let statements = provision_statements("nestling_app", None);
        assert_eq!(
            statements.last().unwrap(),
            "REVOKE ALL ON TABLE seaql_migrations FROM nestling_app;"
        );
    }
}
