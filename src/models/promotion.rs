use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// A priced, named duration package purchasable as a boost.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BoostPromotion {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub duration_days: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreatePromotionData {
    pub name: String,
    pub price: Decimal,
    pub duration_days: i32,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePromotionData {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub duration_days: Option<i32>,
    pub is_active: Option<bool>,
}

impl BoostPromotion {
    pub async fn create(pool: &PgPool, data: CreatePromotionData) -> Result<Self, sqlx::Error> {
        let promotion = sqlx::query_as::<_, BoostPromotion>(
            r#"
            INSERT INTO boost_promotions (name, price, duration_days)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(data.name)
        .bind(data.price)
        .bind(data.duration_days)
        .fetch_one(pool)
        .await?;

        Ok(promotion)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let promotion = sqlx::query_as::<_, BoostPromotion>(
            r#"
            SELECT * FROM boost_promotions WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(promotion)
    }

    /// Packages purchasable right now, cheapest first
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let promotions = sqlx::query_as::<_, BoostPromotion>(
            r#"
            SELECT * FROM boost_promotions
            WHERE is_active = TRUE
            ORDER BY price ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(promotions)
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let promotions = sqlx::query_as::<_, BoostPromotion>(
            r#"
            SELECT * FROM boost_promotions
            ORDER BY price ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(promotions)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdatePromotionData,
    ) -> Result<Self, sqlx::Error> {
        // Build dynamic update query based on which fields are provided
        let mut updates = Vec::new();
        let mut bind_count = 0;

        if data.name.is_some() {
            bind_count += 1;
            updates.push(format!("name = ${}", bind_count));
        }
        if data.price.is_some() {
            bind_count += 1;
            updates.push(format!("price = ${}", bind_count));
        }
        if data.duration_days.is_some() {
            bind_count += 1;
            updates.push(format!("duration_days = ${}", bind_count));
        }
        if data.is_active.is_some() {
            bind_count += 1;
            updates.push(format!("is_active = ${}", bind_count));
        }

        if updates.is_empty() {
            return Self::find_by_id(pool, id)
                .await?
                .ok_or(sqlx::Error::RowNotFound);
        }

        updates.push("updated_at = now()".to_string());

        let query = format!(
            "UPDATE boost_promotions SET {} WHERE id = ${} RETURNING *",
            updates.join(", "),
            bind_count + 1
        );

        let mut query_builder = sqlx::query_as::<_, BoostPromotion>(&query);

        if let Some(name) = data.name {
            query_builder = query_builder.bind(name);
        }
        if let Some(price) = data.price {
            query_builder = query_builder.bind(price);
        }
        if let Some(duration_days) = data.duration_days {
            query_builder = query_builder.bind(duration_days);
        }
        if let Some(is_active) = data.is_active {
            query_builder = query_builder.bind(is_active);
        }

        query_builder.bind(id).fetch_one(pool).await
    }

    /// Retire a package (soft delete)
    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE boost_promotions
            SET is_active = FALSE, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
