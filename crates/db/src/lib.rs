//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Database migrations, including the row-level security policy set
//! - [`rls::TenantScope`], the only handle scoped repositories accept
//! - Provisioning of the low-privilege application role
//! - Catalog verification of the isolation guarantees

pub mod entities;
pub mod error;
pub mod migration;
pub mod provision;
pub mod repositories;
pub mod rls;
pub mod verify;

pub use error::IsolationError;
pub use repositories::{
    AuditLogRepository, ChildRepository, MagicLinkRepository, TenantRepository, UserRepository,
};
pub use rls::TenantScope;
pub use verify::{Finding, RolePrivileges, VerificationReport, verify_isolation};

use std::time::Duration;

use nestling_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection using the configured pool bounds.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(5))
        .sqlx_logging(false);
    Database::connect(options).await
}
