//! Child repository.
//!
//! None of these queries filter on `tenant_id`. The bound scope alone
//! decides which rows exist.

use chrono::NaiveDate;
use nestling_shared::types::ChildId;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::entities::children;
use crate::error::IsolationError;
use crate::rls::TenantScope;

/// Input for enrolling a child.
#[derive(Debug, Clone)]
pub struct NewChild {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Date of birth.
    pub date_of_birth: NaiveDate,
    /// Room the child is placed in, if any.
    pub room_id: Option<Uuid>,
}

/// Child repository scoped to one tenant.
#[derive(Debug, Clone, Copy)]
pub struct ChildRepository<'a> {
    scope: &'a TenantScope,
}

impl<'a> ChildRepository<'a> {
    /// Creates a repository over `scope`.
    #[must_use]
    pub const fn new(scope: &'a TenantScope) -> Self {
        Self { scope }
    }

    /// Lists every enrolled child, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<children::Model>, IsolationError> {
        Ok(children::Entity::find()
            .order_by_asc(children::Column::LastName)
            .order_by_asc(children::Column::FirstName)
            .all(self.scope.transaction())
            .await?)
    }

    /// Lists the active children placed in a room.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_by_room(&self, room_id: Uuid) -> Result<Vec<children::Model>, IsolationError> {
        Ok(children::Entity::find()
            .filter(children::Column::RoomId.eq(room_id))
            .filter(children::Column::IsActive.eq(true))
            .order_by_asc(children::Column::LastName)
            .all(self.scope.transaction())
            .await?)
    }

    /// Finds a child by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(&self, id: ChildId) -> Result<Option<children::Model>, IsolationError> {
        Ok(children::Entity::find_by_id(id.into_inner())
            .one(self.scope.transaction())
            .await?)
    }

    /// Enrolls a child in the bound tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, including a room that belongs
    /// to another tenant.
    pub async fn create(&self, input: NewChild) -> Result<children::Model, IsolationError> {
        let now = chrono::Utc::now().into();
        let child = children::ActiveModel {
            id: Set(ChildId::new().into_inner()),
            tenant_id: Set(self.scope.tenant_id().into_inner()),
            room_id: Set(input.room_id),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            date_of_birth: Set(input.date_of_birth),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(child.insert(self.scope.transaction()).await?)
    }

    /// Moves a child to another room, or out of any room.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no visible child has this ID.
    pub async fn assign_room(
        &self,
        id: ChildId,
        room_id: Option<Uuid>,
    ) -> Result<children::Model, IsolationError> {
        let child = self.find(id).await?.ok_or(IsolationError::NotFound("child"))?;

        let mut child: children::ActiveModel = child.into();
        child.room_id = Set(room_id);
        Ok(child.update(self.scope.transaction()).await?)
    }

    /// Deletes a child record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no visible child has this ID.
    pub async fn delete(&self, id: ChildId) -> Result<(), IsolationError> {
        let child = self.find(id).await?.ok_or(IsolationError::NotFound("child"))?;
        let result = child.delete(self.scope.transaction()).await?;

        if result.rows_affected == 0 {
            return Err(IsolationError::NotFound("child"));
        }
        Ok(())
    }
}
