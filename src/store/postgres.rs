/// Postgres-backed store
///
/// Refresh token values are stored as SHA-256 hex digests in `token_hash`.
/// Revocation of a single value is a conditional `UPDATE`, which Postgres
/// serializes per row under read committed: of two concurrent rotations of
/// the same value only one sees a matching row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::auth::{hash_token, NewRefreshToken, RefreshToken};
use crate::error::StoreError;
use crate::store::{RefreshTokenStore, UserStore};
use crate::user::{NewUser, User};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_refresh_token<'e, E>(
    executor: E,
    token: &NewRefreshToken,
) -> Result<RefreshToken, StoreError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let record = sqlx::query_as::<_, RefreshToken>(
        r#"
        INSERT INTO refresh_tokens (id, user_id, token_hash, issued_at, expires_at, revoked)
        VALUES ($1, $2, $3, $4, $5, false)
        RETURNING id, user_id, token_hash, issued_at, expires_at, revoked, revoked_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(token.user_id)
    .bind(token.token_hash())
    .bind(Utc::now())
    .bind(token.expires_at)
    .fetch_one(executor)
    .await?;

    Ok(record)
}

async fn revoke_if_active<'e, E>(executor: E, value: &str) -> Result<bool, StoreError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = true, revoked_at = $1
        WHERE token_hash = $2 AND revoked = false AND expires_at > $1
        "#,
    )
    .bind(Utc::now())
    .bind(hash_token(value))
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

async fn revoke_all_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<u64, StoreError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = true, revoked_at = $1
        WHERE user_id = $2 AND revoked = false
        "#,
    )
    .bind(Utc::now())
    .bind(user_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

async fn update_password_hash<'e, E>(
    executor: E,
    user_id: Uuid,
    password_hash: &str,
) -> Result<bool, StoreError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(user_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() == 1)
}

#[async_trait]
impl RefreshTokenStore for PgStore {
    async fn insert(&self, token: &NewRefreshToken) -> Result<RefreshToken, StoreError> {
        insert_refresh_token(&self.pool, token).await
    }

    async fn find_by_value(&self, value: &str) -> Result<Option<RefreshToken>, StoreError> {
        let record = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, user_id, token_hash, issued_at, expires_at, revoked, revoked_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(hash_token(value))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn revoke(&self, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = true, revoked_at = $1
            WHERE token_hash = $2 AND revoked = false
            "#,
        )
        .bind(Utc::now())
        .bind(hash_token(value))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn revoke_if_active(&self, value: &str) -> Result<bool, StoreError> {
        revoke_if_active(&self.pool, value).await
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        revoke_all_for_user(&self.pool, user_id).await
    }

    async fn rotate(
        &self,
        presented: &str,
        replacement: &NewRefreshToken,
    ) -> Result<Option<RefreshToken>, StoreError> {
        let mut tx = self.pool.begin().await?;

        if !revoke_if_active(&mut tx, presented).await? {
            tx.rollback().await?;
            return Ok(None);
        }
        let inserted = insert_refresh_token(&mut tx, replacement).await?;

        tx.commit().await?;
        Ok(Some(inserted))
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, username, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, username, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, username, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, username, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        update_password_hash(&self.pool, user_id, password_hash).await
    }

    async fn reset_password(
        &self,
        jti: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Ids of reset tokens that can no longer validate are dead weight
        sqlx::query("DELETE FROM password_reset_uses WHERE expires_at <= $1")
            .bind(now)
            .execute(&mut tx)
            .await?;

        if !update_password_hash(&mut tx, user_id, password_hash).await? {
            tx.rollback().await?;
            return Ok(false);
        }

        let recorded = sqlx::query(
            r#"
            INSERT INTO password_reset_uses (jti, user_id, expires_at, used_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(user_id)
        .bind(expires_at)
        .bind(now)
        .execute(&mut tx)
        .await?;

        if recorded.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }

        revoke_all_for_user(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
