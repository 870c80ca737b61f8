//! Forces row-level security on every registered table so that the policy
//! binds the table owner as well.

use nestling_core::tenancy::{TENANT_TABLES, TablePolicy, policy};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(&policy::render(TENANT_TABLES, TablePolicy::force_sql))
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(&policy::render(TENANT_TABLES, TablePolicy::no_force_sql))
            .await?;
        Ok(())
    }
}
