//! JWT token generation and validation.
//!
//! Provides secure JWT handling with access and refresh tokens. Every token
//! issued here carries a tenant claim.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{Claims, TokenKind, TokenPair};
use crate::types::TenantId;

/// JWT configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Access token expiration in minutes.
    pub access_token_expires_minutes: i64,
    /// Refresh token expiration in days.
    pub refresh_token_expires_days: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            access_token_expires_minutes: 15,
            refresh_token_expires_days: 7,
        }
    }
}

impl From<&crate::config::JwtConfig> for JwtConfig {
    #[allow(clippy::cast_possible_wrap)]
    fn from(config: &crate::config::JwtConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            access_token_expires_minutes: (config.access_token_expiry_secs / 60) as i64,
            refresh_token_expires_days: (config.refresh_token_expiry_secs / 86400) as i64,
        }
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Token encoding failed.
    #[error("failed to encode token: {0}")]
    EncodingError(String),

    /// Token decoding failed.
    #[error("failed to decode token: {0}")]
    DecodingError(String),

    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// Token is invalid.
    #[error("invalid token")]
    Invalid,
}

/// JWT service for token operations.
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("access_token_expires_minutes", &self.config.access_token_expires_minutes)
            .field("refresh_token_expires_days", &self.config.refresh_token_expires_days)
            .field("secret", &"[hidden]")
            .finish()
    }
}

impl JwtService {
    /// Creates a new JWT service with the given configuration.
    #[must_use]
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Generates an access token for a user in a tenant.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if token generation fails.
    pub fn generate_access_token(
        &self,
        user_id: Uuid,
        tenant_id: TenantId,
        role: &str,
    ) -> Result<String, JwtError> {
        let expires_at = Utc::now() + Duration::minutes(self.config.access_token_expires_minutes);
        self.encode_claims(&Claims::new(user_id, tenant_id, role, expires_at))
    }

    /// Generates a refresh token for a user in a tenant.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if token generation fails.
    pub fn generate_refresh_token(
        &self,
        user_id: Uuid,
        tenant_id: TenantId,
        role: &str,
    ) -> Result<String, JwtError> {
        let expires_at = Utc::now() + Duration::days(self.config.refresh_token_expires_days);
        let claims = Claims::with_kind(
            user_id,
            Some(tenant_id),
            role,
            TokenKind::Refresh,
            expires_at,
        );
        self.encode_claims(&claims)
    }

    /// Generates an access/refresh pair.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if either token cannot be generated.
    pub fn generate_token_pair(
        &self,
        user_id: Uuid,
        tenant_id: TenantId,
        role: &str,
    ) -> Result<TokenPair, JwtError> {
        Ok(TokenPair::new(
            self.generate_access_token(user_id, tenant_id, role)?,
            self.generate_refresh_token(user_id, tenant_id, role)?,
            self.access_token_expires_in(),
        ))
    }

    /// Signs arbitrary claims with the service key.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if signing fails.
    pub fn encode_claims(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }

    /// Validates and decodes a token.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Expired` if the token has expired.
    /// Returns `JwtError::DecodingError` if the token is malformed or the
    /// signature does not match.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let validation = Validation::default();

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::DecodingError(e.to_string()),
            })
    }

    /// Returns the access token expiration in seconds.
    #[must_use]
    pub const fn access_token_expires_in(&self) -> i64 {
        self.config.access_token_expires_minutes * 60
    }
}
