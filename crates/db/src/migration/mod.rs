//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration and must run as the schema
//! owner, never as the application role.

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_initial;
mod m20260301_000002_tenant_policies;
mod m20260301_000003_force_rls;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_initial::Migration),
            Box::new(m20260301_000002_tenant_policies::Migration),
            Box::new(m20260301_000003_force_rls::Migration),
        ]
    }
}
