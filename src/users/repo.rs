use anyhow::Context;
use axum::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{NewUser, User, UserChanges};

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, \
     account_created, account_updated, token, token_expiry, \
     is_verified, verification_token, verification_token_expiry";

/// Credential store for user records.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Cheap round-trip used by the health check.
    async fn ping(&self) -> anyhow::Result<()>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_token(&self, token: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_verification_token(&self, token: &str) -> anyhow::Result<Option<User>>;
    /// `None` when the email is already taken.
    async fn insert(&self, new: NewUser) -> anyhow::Result<Option<User>>;
    /// `None` when the user does not exist.
    async fn update(&self, id: Uuid, changes: UserChanges) -> anyhow::Result<Option<User>>;
    async fn set_token(
        &self,
        id: Uuid,
        token: Option<&str>,
        expiry: Option<OffsetDateTime>,
    ) -> anyhow::Result<bool>;
    async fn mark_verified(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_one(&self, column: &str, value: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await
            .with_context(|| format!("find user by {column}"))?;
        Ok(user)
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.db)
            .await
            .context("ping database")?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_by_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        self.find_one("token", token).await
    }

    async fn find_by_verification_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        self.find_one("verification_token", token).await
    }

    async fn insert(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name,
                               token, token_expiry, is_verified,
                               verification_token, verification_token_expiry)
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, $8, $9)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(&new.first_name)
            .bind(&new.last_name)
            .bind(&new.token)
            .bind(new.token_expiry)
            .bind(&new.verification_token)
            .bind(new.verification_token_expiry)
            .fetch_optional(&self.db)
            .await
            .context("insert user")?;
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET first_name = COALESCE($2, first_name),
                   last_name = COALESCE($3, last_name),
                   password_hash = COALESCE($4, password_hash),
                   account_updated = $5
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.first_name)
            .bind(changes.last_name)
            .bind(changes.password_hash)
            .bind(OffsetDateTime::now_utc())
            .fetch_optional(&self.db)
            .await
            .context("update user")?;
        Ok(user)
    }

    async fn set_token(
        &self,
        id: Uuid,
        token: Option<&str>,
        expiry: Option<OffsetDateTime>,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET token = $2, token_expiry = $3, account_updated = $4
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(expiry)
        .bind(OffsetDateTime::now_utc())
        .execute(&self.db)
        .await
        .context("set user token")?;
        Ok(res.rows_affected() > 0)
    }

    async fn mark_verified(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET is_verified = TRUE,
                   verification_token = NULL,
                   verification_token_expiry = NULL,
                   account_updated = $2
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(OffsetDateTime::now_utc())
        .execute(&self.db)
        .await
        .context("mark user verified")?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(res.rows_affected() > 0)
    }
}
