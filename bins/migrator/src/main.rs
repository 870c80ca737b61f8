//! Database migration runner for Nestling.
//!
//! Connect as the schema owner, never as the application role: the owner
//! creates the tables, the policies, and the subdomain lookup function.
//!
//! Usage:
//!   migrator up      - Run all pending migrations
//!   migrator down    - Rollback last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations

use nestling_db::migration::Migrator;
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Reads DATABASE_URL and sets up its own tracing
    cli::run_cli(Migrator).await;
}
