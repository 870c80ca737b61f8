//! Enables row-level security and creates the `tenant_isolation` policy on
//! every table in the tenant registry.

use nestling_core::tenancy::{TENANT_TABLES, TablePolicy, policy};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(&policy::render(TENANT_TABLES, TablePolicy::enable_sql))
            .await?;
        db.execute_unprepared(&policy::render(TENANT_TABLES, TablePolicy::policy_sql))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(&policy::render(TENANT_TABLES, TablePolicy::disable_sql))
            .await?;

        Ok(())
    }
}
