use uuid::Uuid;

use crate::{
    api::error,
    modules::user::{
        model::{InsertUser, UpdateUser},
        repository::UserRepository,
        schema::UserEntity,
    },
};

#[derive(Clone)]
pub struct UserRepositoryPg {
    pool: sqlx::PgPool,
}

impl UserRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

fn like_pattern(search: &str) -> String {
    let escaped = search.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait::async_trait]
impl UserRepository for UserRepositoryPg {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
        let user = sqlx::query_as::<_, UserEntity>(
            "SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserEntity>, error::SystemError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, UserEntity>(
            "SELECT * FROM users WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserEntity>, error::SystemError> {
        let user = sqlx::query_as::<_, UserEntity>(
            "SELECT * FROM users WHERE lower(username) = lower($1) AND deleted_at IS NULL",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create(&self, user: &InsertUser) -> Result<Uuid, error::SystemError> {
        let id = Uuid::now_v7();
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, hash_password, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.hash_password)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update(&self, id: &Uuid, user: &UpdateUser) -> Result<UserEntity, error::SystemError> {
        let user = sqlx::query_as::<_, UserEntity>(
            r#"
        UPDATE users
        SET
            username   = COALESCE($2, username),
            email      = COALESCE($3, email),
            first_name = COALESCE($4, first_name),
            last_name  = COALESCE($5, last_name),
            avatar_url = CASE WHEN $6::boolean THEN $7 ELSE avatar_url END,
            bio        = CASE WHEN $8::boolean THEN $9 ELSE bio END,
            updated_at = NOW()
        WHERE id = $1 AND deleted_at IS NULL
        RETURNING *
        "#,
        )
        .bind(id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.avatar_url.is_some()) // $6: was avatar_url provided?
        .bind(user.avatar_url.as_ref().and_then(|v| v.as_ref()))
        .bind(user.bio.is_some()) // $8: was bio provided?
        .bind(user.bio.as_ref().and_then(|v| v.as_ref()))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        Ok(user)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let rows =
            sqlx::query("UPDATE users SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(&self.pool)
                .await?
                .rows_affected();

        Ok(rows > 0)
    }

    async fn push_friend(
        &self,
        user_id: &Uuid,
        friend_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let rows = sqlx::query(
            r#"
            UPDATE users
            SET friends = array_append(friends, $2), updated_at = NOW()
            WHERE id = $1 AND NOT ($2 = ANY(friends))
            "#,
        )
        .bind(user_id)
        .bind(friend_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows > 0)
    }

    async fn pull_friend(
        &self,
        user_id: &Uuid,
        friend_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let rows = sqlx::query(
            r#"
            UPDATE users
            SET friends = array_remove(friends, $2), updated_at = NOW()
            WHERE id = $1 AND $2 = ANY(friends)
            "#,
        )
        .bind(user_id)
        .bind(friend_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows > 0)
    }

    async fn push_blocked(
        &self,
        user_id: &Uuid,
        blocked_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let rows = sqlx::query(
            r#"
            UPDATE users
            SET blocked_users = array_append(blocked_users, $2), updated_at = NOW()
            WHERE id = $1 AND NOT ($2 = ANY(blocked_users))
            "#,
        )
        .bind(user_id)
        .bind(blocked_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows > 0)
    }

    async fn pull_blocked(
        &self,
        user_id: &Uuid,
        blocked_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let rows = sqlx::query(
            r#"
            UPDATE users
            SET blocked_users = array_remove(blocked_users, $2), updated_at = NOW()
            WHERE id = $1 AND $2 = ANY(blocked_users)
            "#,
        )
        .bind(user_id)
        .bind(blocked_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows > 0)
    }

    async fn find_new_people(
        &self,
        exclude: &[Uuid],
        search: &str,
        limit: i64,
    ) -> Result<Vec<UserEntity>, error::SystemError> {
        let users = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT * FROM users
            WHERE deleted_at IS NULL
            AND id <> ALL($1)
            AND (
                first_name ILIKE $2
                OR last_name ILIKE $2
            )
            LIMIT $3
            "#,
        )
        .bind(exclude)
        .bind(like_pattern(search))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }
}
