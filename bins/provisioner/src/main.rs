//! Provisions the application database role.
//!
//! Run after `migrator up`, connected as the schema owner:
//!
//! ```bash
//! DATABASE_URL=postgres://owner@localhost/nestling \
//! NESTLING__DATABASE__APP_ROLE=nestling_app \
//! NESTLING__DATABASE__APP_PASSWORD=... \
//!   cargo run --bin provisioner
//! ```
//!
//! The role is then checked the same way the server checks its own
//! connection, so a role that somehow kept `BYPASSRLS` fails here first.

use anyhow::{Context, bail};
use tracing::info;

use nestling_db::{RolePrivileges, provision::provision_app_role};

const DEFAULT_ROLE: &str = "nestling_app";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "provisioner=info,nestling_db=info".into()),
        )
        .init();

    let owner_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must point at the schema owner")?;
    let role = std::env::var("NESTLING__DATABASE__APP_ROLE")
        .unwrap_or_else(|_| DEFAULT_ROLE.to_string());
    let password = std::env::var("NESTLING__DATABASE__APP_PASSWORD").ok();

    let db = nestling_db::connect(&owner_url).await?;
    info!("Connected to database as schema owner");

    provision_app_role(&db, &role, password.as_deref()).await?;

    let Some(privileges) = RolePrivileges::of_role(&db, &role).await? else {
        bail!("role {role} was not created");
    };
    privileges.check()?;

    info!(role = %role, "Role is subject to row-level security");
    Ok(())
}
