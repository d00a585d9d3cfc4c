use uuid::Uuid;

use crate::api::error;
use crate::modules::friend::schema::{FriendRequestEntity, FriendRequestStatus};

/// Directed friend request records. Every method is a single store call.
#[async_trait::async_trait]
pub trait FriendRequestRepository {
    /// The `from -> to` record whose status is one of `statuses`.
    async fn find_directed(
        &self,
        from_user_id: &Uuid,
        to_user_id: &Uuid,
        statuses: &[FriendRequestStatus],
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;

    /// Every record with `user_id` on either side, any status.
    async fn find_involving(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestEntity>, error::SystemError>;

    async fn find_sent(
        &self,
        user_id: &Uuid,
        status: FriendRequestStatus,
    ) -> Result<Vec<FriendRequestEntity>, error::SystemError>;

    async fn find_received(
        &self,
        user_id: &Uuid,
        status: FriendRequestStatus,
    ) -> Result<Vec<FriendRequestEntity>, error::SystemError>;

    /// Inserts a pending `from -> to` record. Fails with a duplicate error
    /// when the pair already holds a pending or blocked record.
    async fn create_pending(
        &self,
        from_user_id: &Uuid,
        to_user_id: &Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError>;

    /// Moves the `from -> to` record from `current` to `next` only if it is
    /// still in `current`. Returns `None` when no record matched.
    async fn transition(
        &self,
        from_user_id: &Uuid,
        to_user_id: &Uuid,
        current: FriendRequestStatus,
        next: FriendRequestStatus,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;

    async fn delete_directed(
        &self,
        from_user_id: &Uuid,
        to_user_id: &Uuid,
        status: FriendRequestStatus,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;

    /// Deletes every record between the pair in either direction and
    /// returns how many were removed.
    async fn delete_between(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<u64, error::SystemError>;
}
