use anyhow::Context;
use axum::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Profile picture metadata; the bytes live in object storage under `file_name`.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: Uuid,
    pub file_name: String,
    pub url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub upload_date: OffsetDateTime,
    pub user_id: Uuid,
}

#[async_trait]
pub trait ImageRepo: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<Image>>;
    /// `None` when the user already has a picture.
    async fn insert(&self, user_id: Uuid, file_name: &str, url: &str)
        -> anyhow::Result<Option<Image>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgImageRepo {
    db: PgPool,
}

impl PgImageRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ImageRepo for PgImageRepo {
    async fn find_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<Image>> {
        let row = sqlx::query_as::<_, Image>(
            r#"
            SELECT id, file_name, url, upload_date, user_id
              FROM images
             WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("find image by user")?;
        Ok(row)
    }

    async fn insert(
        &self,
        user_id: Uuid,
        file_name: &str,
        url: &str,
    ) -> anyhow::Result<Option<Image>> {
        let row = sqlx::query_as::<_, Image>(
            r#"
            INSERT INTO images (id, file_name, url, upload_date, user_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING id, file_name, url, upload_date, user_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(file_name)
        .bind(url)
        .bind(OffsetDateTime::now_utc())
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("insert image")?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete image")?;
        Ok(res.rows_affected() > 0)
    }
}
