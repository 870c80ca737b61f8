//! Nestling API Server
//!
//! Main entry point for the Nestling backend service. Refuses to start when
//! the database connection could read across tenants.

use std::sync::Arc;

use anyhow::{Context, bail};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nestling_api::{AppState, create_router};
use nestling_core::tenancy::TENANT_TABLES;
use nestling_db::{connect_with, verify_isolation};
use nestling_shared::{AppConfig, EmailService, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "nestling=debug,nestling_api=debug,nestling_db=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect_with(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    // Isolation is only as good as the role we connect as
    let report = verify_isolation(&db, TENANT_TABLES).await?;
    if !report.is_pass() {
        for finding in report.findings() {
            error!(%finding, "Tenant isolation check failed");
        }
        bail!("tenant isolation is not enforced for role {}", report.role.role);
    }
    info!(
        role = %report.role.role,
        tables = report.tables.len(),
        "Tenant isolation verified"
    );

    let jwt_service = JwtService::new(JwtConfig::from(&config.jwt));

    let email_service = EmailService::new(config.email.clone());
    info!(
        smtp_host = %config.email.smtp_host,
        smtp_port = %config.email.smtp_port,
        "Email service configured"
    );

    let state = AppState {
        db: Arc::new(db),
        jwt_service: Arc::new(jwt_service),
        email_service: Arc::new(email_service),
        magic_link_ttl: chrono::Duration::minutes(config.magic_link.ttl_minutes),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
