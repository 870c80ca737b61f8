//! User repository for staff and parent accounts.

use nestling_core::auth::UserRole;
use nestling_shared::types::UserId;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::entities::users;
use crate::error::IsolationError;
use crate::rls::TenantScope;

/// Input for creating an account in the bound tenant.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login email, stored lowercased.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Role within the nursery.
    pub role: UserRole,
    /// Argon2 hash; required for staff, `None` for parents.
    pub password_hash: Option<String>,
}

/// User repository scoped to one tenant.
#[derive(Debug, Clone, Copy)]
pub struct UserRepository<'a> {
    scope: &'a TenantScope,
}

impl<'a> UserRepository<'a> {
    /// Creates a repository over `scope`.
    #[must_use]
    pub const fn new(scope: &'a TenantScope) -> Self {
        Self { scope }
    }

    /// Finds an account by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, IsolationError> {
        Ok(users::Entity::find()
            .filter(users::Column::Email.eq(email.to_lowercase()))
            .one(self.scope.transaction())
            .await?)
    }

    /// Finds an account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<users::Model>, IsolationError> {
        Ok(users::Entity::find_by_id(id.into_inner())
            .one(self.scope.transaction())
            .await?)
    }

    /// Lists every account in the tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<users::Model>, IsolationError> {
        Ok(users::Entity::find()
            .order_by_asc(users::Column::FullName)
            .all(self.scope.transaction())
            .await?)
    }

    /// Creates an account in the bound tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, for example on a duplicate email.
    pub async fn create(&self, input: NewUser) -> Result<users::Model, IsolationError> {
        let now = chrono::Utc::now().into();
        let user = users::ActiveModel {
            id: Set(UserId::new().into_inner()),
            tenant_id: Set(self.scope.tenant_id().into_inner()),
            email: Set(input.email.to_lowercase()),
            full_name: Set(input.full_name),
            role: Set(input.role.as_str().to_string()),
            password_hash: Set(input.password_hash),
            is_active: Set(true),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(user.insert(self.scope.transaction()).await?)
    }

    /// Records a successful login.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no visible account has this ID.
    pub async fn touch_last_login(&self, id: UserId) -> Result<(), IsolationError> {
        let user = self
            .find_by_id(id)
            .await?
            .ok_or(IsolationError::NotFound("user"))?;

        let mut user: users::ActiveModel = user.into();
        user.last_login_at = Set(Some(chrono::Utc::now().into()));
        user.update(self.scope.transaction()).await?;
        Ok(())
    }
}
