//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Outbound email configuration.
    #[serde(default)]
    pub email: EmailConfig,
    /// Parent magic link settings.
    #[serde(default)]
    pub magic_link: MagicLinkConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
///
/// `url` is what the server connects with and must point at the
/// low-privilege application role. `app_role`/`app_password` are only read
/// by the provisioner, which connects as the schema owner.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Name of the application login role.
    #[serde(default = "default_app_role")]
    pub app_role: String,
    /// Password assigned to the application role when provisioning.
    #[serde(default)]
    pub app_password: Option<String>,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_app_role() -> String {
    "nestling_app".to_string()
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
    /// Refresh token expiration in seconds.
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

fn default_refresh_token_expiry() -> u64 {
    604_800 // 7 days
}

/// SMTP configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host.
    pub smtp_host: String,
    /// SMTP port.
    pub smtp_port: u16,
    /// SMTP username.
    pub smtp_username: String,
    /// SMTP password.
    pub smtp_password: String,
    /// Sender address.
    pub from_email: String,
    /// Sender display name.
    pub from_name: String,
    /// Base URL of the parent portal, used to build links.
    pub frontend_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "no-reply@nestling.local".to_string(),
            from_name: "Nestling".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Magic link settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MagicLinkConfig {
    /// Minutes a link stays valid.
    #[serde(default = "default_magic_link_ttl")]
    pub ttl_minutes: i64,
}

impl Default for MagicLinkConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_magic_link_ttl(),
        }
    }
}

fn default_magic_link_ttl() -> i64 {
    15
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("NESTLING").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_environment_applies_defaults() {
        temp_env::with_vars(
            [
                ("NESTLING__DATABASE__URL", Some("postgres://app@localhost/nestling")),
                ("NESTLING__JWT__SECRET", Some("secret")),
                ("RUN_MODE", Some("test-without-files")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://app@localhost/nestling");
                assert_eq!(config.database.app_role, "nestling_app");
                assert!(config.database.app_password.is_none());
                assert_eq!(config.jwt.access_token_expiry_secs, 900);
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.magic_link.ttl_minutes, 15);
            },
        );
    }

    #[test]
    fn test_load_fails_without_database_url() {
        temp_env::with_vars(
            [
                ("NESTLING__DATABASE__URL", None::<&str>),
                ("NESTLING__JWT__SECRET", Some("secret")),
                ("RUN_MODE", Some("test-without-files")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }

    #[test]
    fn test_email_config_default() {
        let config = EmailConfig::default();
        assert_eq!(config.smtp_host, "localhost");
        assert_eq!(config.smtp_port, 1025);
    }
}
