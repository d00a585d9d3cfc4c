use uuid::Uuid;

use crate::{
    api::error,
    modules::user::{
        model::{InsertUser, UpdateUser},
        schema::UserEntity,
    },
};

#[async_trait::async_trait]
pub trait UserRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError>;

    /// Rows come back in no particular order; missing ids are skipped.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserEntity>, error::SystemError>;

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserEntity>, error::SystemError>;
    async fn create(&self, user: &InsertUser) -> Result<Uuid, error::SystemError>;
    async fn update(&self, id: &Uuid, user: &UpdateUser) -> Result<UserEntity, error::SystemError>;
    async fn delete(&self, id: &Uuid) -> Result<bool, error::SystemError>;

    /// Appends `friend_id` to `user_id`'s friends unless already present.
    /// Returns false when nothing changed.
    async fn push_friend(&self, user_id: &Uuid, friend_id: &Uuid)
    -> Result<bool, error::SystemError>;

    async fn pull_friend(&self, user_id: &Uuid, friend_id: &Uuid)
    -> Result<bool, error::SystemError>;

    async fn push_blocked(
        &self,
        user_id: &Uuid,
        blocked_id: &Uuid,
    ) -> Result<bool, error::SystemError>;

    async fn pull_blocked(
        &self,
        user_id: &Uuid,
        blocked_id: &Uuid,
    ) -> Result<bool, error::SystemError>;

    /// Users whose first or last name contains `search` (case-insensitive),
    /// skipping every id in `exclude`.
    async fn find_new_people(
        &self,
        exclude: &[Uuid],
        search: &str,
        limit: i64,
    ) -> Result<Vec<UserEntity>, error::SystemError>;
}
