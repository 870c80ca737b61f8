//! Authentication types for JWT and tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::TenantId;

/// Distinguishes short-lived access tokens from refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Accepted by the request authentication layer.
    #[default]
    Access,
    /// Only accepted by the refresh endpoint.
    Refresh,
}

/// JWT claims.
///
/// `tid` is optional on the wire so that a token without tenant scoping
/// can be recognised and rejected instead of failing to decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    /// Tenant the token is scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<Uuid>,
    /// User's role within the tenant.
    pub role: String,
    /// Token kind.
    #[serde(default)]
    pub kind: TokenKind,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new access-token claims for a user in a tenant.
    #[must_use]
    pub fn new(user_id: Uuid, tenant_id: TenantId, role: &str, expires_at: DateTime<Utc>) -> Self {
        Self::with_kind(user_id, Some(tenant_id), role, TokenKind::Access, expires_at)
    }

    /// Creates claims with an explicit kind and optional tenant.
    #[must_use]
    pub fn with_kind(
        user_id: Uuid,
        tenant_id: Option<TenantId>,
        role: &str,
        kind: TokenKind,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: user_id,
            tid: tenant_id.map(TenantId::into_inner),
            role: role.to_string(),
            kind,
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the tenant claim, if present and not nil.
    #[must_use]
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tid
            .filter(|tid| !tid.is_nil())
            .map(TenantId::from_uuid)
    }
}

/// Token pair returned after successful authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token (short-lived).
    pub access_token: String,
    /// Refresh token (long-lived).
    pub refresh_token: String,
    /// Access token expiration in seconds.
    pub expires_in: i64,
}

impl TokenPair {
    /// Creates a new token pair.
    #[must_use]
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_in,
        }
    }
}

/// Staff login request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Nursery subdomain the account belongs to.
    pub subdomain: String,
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Parent magic link request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct MagicLinkRequest {
    /// Nursery subdomain the parent belongs to.
    pub subdomain: String,
    /// Parent email.
    pub email: String,
}

/// Magic link redemption payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RedeemMagicLinkRequest {
    /// Tenant embedded in the link.
    pub tenant_id: TenantId,
    /// Raw single-use token embedded in the link.
    pub token: String,
}

/// Refresh token request.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token issued at login.
    pub refresh_token: String,
}

/// Login response payload.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    /// Authenticated account ID.
    pub user_id: Uuid,
    /// Tenant the tokens are scoped to.
    pub tenant_id: TenantId,
    /// Role within the tenant.
    pub role: String,
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Token expiration in seconds.
    pub expires_in: i64,
}
