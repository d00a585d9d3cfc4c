use uuid::Uuid;

use crate::{
    api::error,
    modules::friend::{
        repository::FriendRequestRepository,
        schema::{FriendRequestEntity, FriendRequestStatus},
    },
};

#[derive(Clone)]
pub struct FriendRepositoryPg {
    pool: sqlx::PgPool,
}

impl FriendRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FriendRequestRepository for FriendRepositoryPg {
    async fn find_directed(
        &self,
        from_user_id: &Uuid,
        to_user_id: &Uuid,
        statuses: &[FriendRequestStatus],
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let request = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            SELECT *
            FROM friend_requests
            WHERE from_user_id = $1
              AND to_user_id = $2
              AND status = ANY($3)
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(from_user_id)
        .bind(to_user_id)
        .bind(statuses)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn find_involving(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestEntity>, error::SystemError> {
        let requests = sqlx::query_as::<_, FriendRequestEntity>(
            "SELECT * FROM friend_requests WHERE from_user_id = $1 OR to_user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    async fn find_sent(
        &self,
        user_id: &Uuid,
        status: FriendRequestStatus,
    ) -> Result<Vec<FriendRequestEntity>, error::SystemError> {
        let requests = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            SELECT *
            FROM friend_requests
            WHERE from_user_id = $1 AND status = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    async fn find_received(
        &self,
        user_id: &Uuid,
        status: FriendRequestStatus,
    ) -> Result<Vec<FriendRequestEntity>, error::SystemError> {
        let requests = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            SELECT *
            FROM friend_requests
            WHERE to_user_id = $1 AND status = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    async fn create_pending(
        &self,
        from_user_id: &Uuid,
        to_user_id: &Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        let request = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            INSERT INTO friend_requests (id, from_user_id, to_user_id, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(from_user_id)
        .bind(to_user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(request)
    }

    async fn transition(
        &self,
        from_user_id: &Uuid,
        to_user_id: &Uuid,
        current: FriendRequestStatus,
        next: FriendRequestStatus,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let request = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            UPDATE friend_requests
            SET status = $4, updated_at = NOW()
            WHERE id = (
                SELECT id
                FROM friend_requests
                WHERE from_user_id = $1 AND to_user_id = $2 AND status = $3
                LIMIT 1
                FOR UPDATE
            )
            AND status = $3
            RETURNING *
            "#,
        )
        .bind(from_user_id)
        .bind(to_user_id)
        .bind(current)
        .bind(next)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn delete_directed(
        &self,
        from_user_id: &Uuid,
        to_user_id: &Uuid,
        status: FriendRequestStatus,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let request = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            DELETE FROM friend_requests
            WHERE id = (
                SELECT id
                FROM friend_requests
                WHERE from_user_id = $1 AND to_user_id = $2 AND status = $3
                LIMIT 1
                FOR UPDATE
            )
            RETURNING *
            "#,
        )
        .bind(from_user_id)
        .bind(to_user_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn delete_between(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<u64, error::SystemError> {
        let rows = sqlx::query(
            r#"
            DELETE FROM friend_requests
            WHERE (from_user_id = $1 AND to_user_id = $2)
               OR (from_user_id = $2 AND to_user_id = $1)
            "#,
        )
        .bind(user_id_a)
        .bind(user_id_b)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows)
    }
}
