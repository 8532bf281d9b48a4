use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// Single-row site configuration, editable from the admin panel.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SiteSettings {
    pub id: i32,
    pub site_name: String,
    pub contact_email: Option<String>,
    pub contact_whatsapp: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl SiteSettings {
    pub async fn get(pool: &PgPool) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SiteSettings>(
            r#"
            SELECT * FROM site_settings WHERE id = 1
            "#,
        )
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        site_name: &str,
        contact_email: Option<&str>,
        contact_whatsapp: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SiteSettings>(
            r#"
            UPDATE site_settings
            SET site_name = $1, contact_email = $2, contact_whatsapp = $3, updated_at = now()
            WHERE id = 1
            RETURNING *
            "#,
        )
        .bind(site_name)
        .bind(contact_email)
        .bind(contact_whatsapp)
        .fetch_one(pool)
        .await
    }
}
