//! Magic link repository for passwordless parent sign-in.

use chrono::{Duration, Utc};
use nestling_shared::types::UserId;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, sea_query::Expr,
};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::entities::{magic_link_tokens, users};
use crate::error::IsolationError;
use crate::rls::TenantScope;

/// Magic link repository scoped to one tenant.
#[derive(Debug, Clone, Copy)]
pub struct MagicLinkRepository<'a> {
    scope: &'a TenantScope,
}

impl<'a> MagicLinkRepository<'a> {
    /// Creates a repository over `scope`.
    #[must_use]
    pub const fn new(scope: &'a TenantScope) -> Self {
        Self { scope }
    }

    /// Hashes a link token for storage.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Generates a URL-safe random token.
    #[must_use]
    pub fn generate_token() -> String {
        let bytes: [u8; 32] = rand::random();
        base64_url::encode(&bytes)
    }

    /// Issues a link for `user_id`, replacing any outstanding ones.
    /// Returns the raw token to be mailed; only its hash is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(&self, user_id: UserId, ttl: Duration) -> Result<String, IsolationError> {
        self.invalidate_user_tokens(user_id).await?;

        let raw_token = Self::generate_token();
        let now = Utc::now();

        let token = magic_link_tokens::ActiveModel {
            id: Set(Uuid::now_v7()),
            tenant_id: Set(self.scope.tenant_id().into_inner()),
            user_id: Set(user_id.into_inner()),
            token_hash: Set(Self::hash_token(&raw_token)),
            expires_at: Set((now + ttl).into()),
            used_at: Set(None),
            created_at: Set(now.into()),
        };
        token.insert(self.scope.transaction()).await?;

        Ok(raw_token)
    }

    /// Consumes a token and returns the account it signs in.
    ///
    /// A token issued by another tenant is invisible here and is reported
    /// exactly like an unknown one. The token is claimed with a conditional
    /// update, so of two concurrent redemptions at most one succeeds.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the token is unknown, expired, already used, or
    /// its account is inactive.
    pub async fn redeem(&self, raw_token: &str) -> Result<users::Model, IsolationError> {
        let now = Utc::now();

        let token = magic_link_tokens::Entity::find()
            .filter(magic_link_tokens::Column::TokenHash.eq(Self::hash_token(raw_token)))
            .filter(magic_link_tokens::Column::UsedAt.is_null())
            .filter(magic_link_tokens::Column::ExpiresAt.gt(now))
            .one(self.scope.transaction())
            .await?
            .ok_or(IsolationError::NotFound("magic link"))?;

        // Re-evaluated against the committed row once a competing claim releases its lock.
        let claimed = magic_link_tokens::Entity::update_many()
            .col_expr(
                magic_link_tokens::Column::UsedAt,
                Expr::value(now.fixed_offset()),
            )
            .filter(magic_link_tokens::Column::Id.eq(token.id))
            .filter(magic_link_tokens::Column::UsedAt.is_null())
            .filter(magic_link_tokens::Column::ExpiresAt.gt(now))
            .exec(self.scope.transaction())
            .await?;
        if claimed.rows_affected != 1 {
            debug!(token_id = %token.id, "Magic link already claimed");
            return Err(IsolationError::NotFound("magic link"));
        }

        let user = users::Entity::find_by_id(token.user_id)
            .filter(users::Column::IsActive.eq(true))
            .one(self.scope.transaction())
            .await?
            .ok_or(IsolationError::NotFound("magic link"))?;

        debug!(user_id = %user.id, "Magic link redeemed");
        Ok(user)
    }

    /// Marks every outstanding token of `user_id` as used.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn invalidate_user_tokens(&self, user_id: UserId) -> Result<u64, IsolationError> {
        let result = magic_link_tokens::Entity::update_many()
            .col_expr(
                magic_link_tokens::Column::UsedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(magic_link_tokens::Column::UserId.eq(user_id.into_inner()))
            .filter(magic_link_tokens::Column::UsedAt.is_null())
            .exec(self.scope.transaction())
            .await?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = MagicLinkRepository::hash_token("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_generated_tokens_are_url_safe_and_unique() {
        let a = MagicLinkRepository::generate_token();
        let b = MagicLinkRepository::generate_token();

        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
