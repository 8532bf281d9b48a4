use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::ad::Ad;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Favorite {
    pub user_id: Uuid,
    pub ad_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Favorite {
    /// Add a favorite; re-adding an existing one is a no-op
    pub async fn add(pool: &PgPool, user_id: Uuid, ad_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO favorites (user_id, ad_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, ad_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(ad_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn remove(pool: &PgPool, user_id: Uuid, ad_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM favorites
            WHERE user_id = $1 AND ad_id = $2
            "#,
        )
        .bind(user_id)
        .bind(ad_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// The user's favorited ads; ads soft-deleted since favoriting drop out
    pub async fn list_ads(pool: &PgPool, user_id: Uuid) -> Result<Vec<Ad>, sqlx::Error> {
        let ads = sqlx::query_as::<_, Ad>(
            r#"
            SELECT a.* FROM ads a
            JOIN favorites f ON f.ad_id = a.id
            WHERE f.user_id = $1 AND a.is_active = TRUE
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(ads)
    }
}
