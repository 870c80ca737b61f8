//! Tenant Context Resolver.
//!
//! Derives the active tenant for a unit of work from a signed credential.
//! Resolution is pure: it never touches the database and never falls back
//! to an unscoped context.

use nestling_shared::{Claims, JwtError, JwtService, TenantId, TokenKind, types::UserId};

use super::TenantError;
use crate::auth::UserRole;

/// Anything that can validate a bearer token and hand back its claims.
pub trait TokenVerifier {
    /// Validates `token` and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns a `JwtError` for malformed, forged, or expired tokens.
    fn verify(&self, token: &str) -> Result<Claims, JwtError>;
}

impl TokenVerifier for JwtService {
    fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate_token(token)
    }
}

/// The resolved scope of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    /// Tenant every query of this unit of work is bound to.
    pub tenant_id: TenantId,
    /// Authenticated account.
    pub user_id: UserId,
    /// Role of the account within the tenant.
    pub role: UserRole,
}

impl TryFrom<&Claims> for TenantContext {
    type Error = TenantError;

    fn try_from(claims: &Claims) -> Result<Self, Self::Error> {
        if claims.kind != TokenKind::Access {
            return Err(TenantError::Unauthenticated(
                "refresh tokens cannot authorize requests".to_string(),
            ));
        }
        let tenant_id = claims.tenant_id().ok_or(TenantError::MissingTenantClaim)?;
        let role = claims
            .role
            .parse::<UserRole>()
            .map_err(|e| TenantError::Unauthenticated(e.to_string()))?;

        Ok(Self {
            tenant_id,
            user_id: UserId::from_uuid(claims.user_id()),
            role,
        })
    }
}

/// Extracts the token from an `Authorization` header value.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves a tenant context from a bare token.
///
/// # Errors
///
/// `Unauthenticated` if the token fails validation or is not an access
/// token, `MissingTenantClaim` if it validates but names no tenant.
pub fn resolve_token<V>(token: &str, verifier: &V) -> Result<TenantContext, TenantError>
where
    V: TokenVerifier + ?Sized,
{
    let claims = verifier.verify(token).map_err(|e| match e {
        JwtError::Expired => TenantError::Unauthenticated("token has expired".to_string()),
        _ => TenantError::Unauthenticated("invalid or malformed token".to_string()),
    })?;
    TenantContext::try_from(&claims)
}

/// Resolves a tenant context from an optional `Authorization` header value.
///
/// # Errors
///
/// `Unauthenticated` if the header is missing or not a bearer credential,
/// otherwise as [`resolve_token`].
pub fn resolve_bearer<V>(header: Option<&str>, verifier: &V) -> Result<TenantContext, TenantError>
where
    V: TokenVerifier + ?Sized,
{
    let token = header.and_then(extract_bearer_token).ok_or_else(|| {
        TenantError::Unauthenticated("bearer token is required".to_string())
    })?;
    resolve_token(token, verifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use nestling_shared::JwtConfig;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn service() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "resolver-test-secret".to_string(),
            ..JwtConfig::default()
        })
    }

    fn signed(claims: &Claims) -> String {
        service().encode_claims(claims).unwrap()
    }

    #[test]
    fn test_resolves_tenant_from_valid_bearer() {
        let tenant = TenantId::new();
        let user = Uuid::new_v4();
        let token = service()
            .generate_access_token(user, tenant, "staff")
            .unwrap();
        let header = format!("Bearer {token}");

        let ctx = resolve_bearer(Some(&header), &service()).unwrap();

        assert_eq!(ctx.tenant_id, tenant);
        assert_eq!(ctx.user_id, UserId::from_uuid(user));
        assert_eq!(ctx.role, UserRole::Staff);
    }

    #[test]
    fn test_missing_header_is_unauthenticated() {
        assert!(matches!(
            resolve_bearer(None, &service()),
            Err(TenantError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_non_bearer_scheme_is_unauthenticated() {
        assert!(matches!(
            resolve_bearer(Some("Basic dXNlcjpwYXNz"), &service()),
            Err(TenantError::Unauthenticated(_))
        ));
        assert!(matches!(
            resolve_bearer(Some("Bearer "), &service()),
            Err(TenantError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_token_without_tenant_claim_is_rejected() {
        let claims = Claims::with_kind(
            Uuid::new_v4(),
            None,
            "admin",
            TokenKind::Access,
            Utc::now() + Duration::minutes(5),
        );
        assert_eq!(
            resolve_token(&signed(&claims), &service()),
            Err(TenantError::MissingTenantClaim)
        );
    }

    #[test]
    fn test_nil_tenant_claim_is_rejected() {
        let claims = Claims::new(
            Uuid::new_v4(),
            TenantId::from_uuid(Uuid::nil()),
            "admin",
            Utc::now() + Duration::minutes(5),
        );
        assert_eq!(
            resolve_token(&signed(&claims), &service()),
            Err(TenantError::MissingTenantClaim)
        );
    }

    #[test]
    fn test_expired_token_is_unauthenticated() {
        let claims = Claims::new(
            Uuid::new_v4(),
            TenantId::new(),
            "staff",
            Utc::now() - Duration::hours(1),
        );
        assert_eq!(
            resolve_token(&signed(&claims), &service()),
            Err(TenantError::Unauthenticated("token has expired".to_string()))
        );
    }

    #[test]
    fn test_refresh_token_cannot_authorize() {
        let token = service()
            .generate_refresh_token(Uuid::new_v4(), TenantId::new(), "parent")
            .unwrap();
        assert!(matches!(
            resolve_token(&token, &service()),
            Err(TenantError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_unknown_role_is_unauthenticated() {
        let claims = Claims::new(
            Uuid::new_v4(),
            TenantId::new(),
            "root",
            Utc::now() + Duration::minutes(5),
        );
        assert!(matches!(
            resolve_token(&signed(&claims), &service()),
            Err(TenantError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_tenant_error_maps_to_app_error() {
        let err: nestling_shared::AppError = TenantError::MissingTenantClaim.into();
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.error_code(), "missing_tenant_claim");
    }

    proptest! {
        #[test]
        fn prop_garbage_headers_never_resolve(header in ".{0,64}") {
            prop_assert!(resolve_bearer(Some(&header), &service()).is_err());
        }

        #[test]
        fn prop_resolved_tenant_matches_claim(bytes in any::<[u8; 16]>()) {
            let uuid = Uuid::from_bytes(bytes);
            prop_assume!(!uuid.is_nil());
            let tenant = TenantId::from_uuid(uuid);
            let token = service()
                .generate_access_token(Uuid::new_v4(), tenant, "manager")
                .unwrap();
            let ctx = resolve_token(&token, &service()).unwrap();
            prop_assert_eq!(ctx.tenant_id, tenant);
        }
    }
}
