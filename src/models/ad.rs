use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ad {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub location: String,
    pub whatsapp: Option<String>,
    pub images: Vec<String>,
    pub is_featured: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAdData {
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub location: String,
    pub whatsapp: Option<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateAdData {
    pub category_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub location: Option<String>,
    pub whatsapp: Option<String>,
    pub images: Option<Vec<String>>,
}

/// Filters applied to the public listing. Inactive ads are always
/// excluded here; only the owner's own-ads view includes them.
#[derive(Debug, Clone, Default)]
pub struct AdFilters {
    pub category_id: Option<Uuid>,
    pub location: Option<String>,
    pub search: Option<String>,
    pub featured: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}

impl Ad {
    pub async fn create(pool: &PgPool, data: CreateAdData) -> Result<Self, sqlx::Error> {
        let ad = sqlx::query_as::<_, Ad>(
            r#"
            INSERT INTO ads (user_id, category_id, title, description, price, location, whatsapp, images)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(data.category_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.price)
        .bind(data.location)
        .bind(data.whatsapp)
        .bind(data.images)
        .fetch_one(pool)
        .await?;

        Ok(ad)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let ad = sqlx::query_as::<_, Ad>(
            r#"
            SELECT * FROM ads WHERE id = $1 AND is_active = TRUE
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(ad)
    }

    /// Public listing with filters, newest first
    pub async fn list(pool: &PgPool, filters: AdFilters) -> Result<Vec<Self>, sqlx::Error> {
        // Build dynamic WHERE clause based on which filters are provided
        let mut query = String::from("SELECT * FROM ads WHERE is_active = TRUE");
        let mut bind_count = 0;

        if filters.category_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND category_id = ${}", bind_count));
        }
        if filters.location.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND location ILIKE ${}", bind_count));
        }
        if filters.search.is_some() {
            bind_count += 1;
            query.push_str(&format!(
                " AND (title ILIKE ${n} OR description ILIKE ${n})",
                n = bind_count
            ));
        }
        if filters.featured.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND is_featured = ${}", bind_count));
        }

        query.push_str(&format!(
            " ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            bind_count + 1,
            bind_count + 2
        ));

        let mut query_builder = sqlx::query_as::<_, Ad>(&query);

        if let Some(category_id) = filters.category_id {
            query_builder = query_builder.bind(category_id);
        }
        if let Some(location) = filters.location {
            query_builder = query_builder.bind(format!("%{}%", location));
        }
        if let Some(search) = filters.search {
            query_builder = query_builder.bind(format!("%{}%", search));
        }
        if let Some(featured) = filters.featured {
            query_builder = query_builder.bind(featured);
        }

        let ads = query_builder
            .bind(filters.limit)
            .bind(filters.offset)
            .fetch_all(pool)
            .await?;

        Ok(ads)
    }

    /// Featured active ads for the homepage carousel
    pub async fn list_featured(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let ads = sqlx::query_as::<_, Ad>(
            r#"
            SELECT * FROM ads
            WHERE is_active = TRUE AND is_featured = TRUE
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(ads)
    }

    /// Owner's own ads, inactive included
    pub async fn list_by_owner(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let ads = sqlx::query_as::<_, Ad>(
            r#"
            SELECT * FROM ads
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(ads)
    }

    /// Owner-scoped partial update.
    ///
    /// Returns `None` when the ad does not exist or belongs to another
    /// user, so the handler can answer 404 without leaking existence.
    pub async fn update_owned(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        data: UpdateAdData,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut updates = Vec::new();
        let mut bind_count = 0;

        if data.category_id.is_some() {
            bind_count += 1;
            updates.push(format!("category_id = ${}", bind_count));
        }
        if data.title.is_some() {
            bind_count += 1;
            updates.push(format!("title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            updates.push(format!("description = ${}", bind_count));
        }
        if data.price.is_some() {
            bind_count += 1;
            updates.push(format!("price = ${}", bind_count));
        }
        if data.location.is_some() {
            bind_count += 1;
            updates.push(format!("location = ${}", bind_count));
        }
        if data.whatsapp.is_some() {
            bind_count += 1;
            updates.push(format!("whatsapp = ${}", bind_count));
        }
        if data.images.is_some() {
            bind_count += 1;
            updates.push(format!("images = ${}", bind_count));
        }

        if updates.is_empty() {
            // Nothing to change; still enforce ownership
            return sqlx::query_as::<_, Ad>(
                r#"
                SELECT * FROM ads WHERE id = $1 AND user_id = $2
                "#,
            )
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await;
        }

        updates.push("updated_at = now()".to_string());

        let query = format!(
            "UPDATE ads SET {} WHERE id = ${} AND user_id = ${} RETURNING *",
            updates.join(", "),
            bind_count + 1,
            bind_count + 2
        );

        let mut query_builder = sqlx::query_as::<_, Ad>(&query);

        if let Some(category_id) = data.category_id {
            query_builder = query_builder.bind(category_id);
        }
        if let Some(title) = data.title {
            query_builder = query_builder.bind(title);
        }
        if let Some(description) = data.description {
            query_builder = query_builder.bind(description);
        }
        if let Some(price) = data.price {
            query_builder = query_builder.bind(price);
        }
        if let Some(location) = data.location {
            query_builder = query_builder.bind(location);
        }
        if let Some(whatsapp) = data.whatsapp {
            query_builder = query_builder.bind(whatsapp);
        }
        if let Some(images) = data.images {
            query_builder = query_builder.bind(images);
        }

        query_builder.bind(id).bind(user_id).fetch_optional(pool).await
    }

    /// Owner-scoped soft delete. Returns affected rows; 0 means the ad
    /// does not exist or is not owned by this user.
    pub async fn soft_delete_owned(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE ads
            SET is_active = FALSE, is_featured = FALSE, updated_at = now()
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Toggle the featured flag (boost approval / expiry side effect).
    /// Takes an executor so approval can flip it in the same transaction
    /// as the boost row.
    pub async fn set_featured(
        executor: impl PgExecutor<'_>,
        id: Uuid,
        featured: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE ads
            SET is_featured = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(featured)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Re-assert the featured flag on ads covered by a running boost.
    /// Heals flags lost between boost approval and the listing side.
    pub async fn restore_featured(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE ads
            SET is_featured = TRUE, updated_at = now()
            WHERE is_active = TRUE
              AND is_featured = FALSE
              AND EXISTS (
                  SELECT 1 FROM boosted_ads b
                  WHERE b.ad_id = ads.id AND b.is_active = TRUE AND b.end_date > now()
              )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Moderation takedown, not scoped to an owner
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE ads
            SET is_active = FALSE, is_featured = FALSE, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Pull all of one user's ads out of circulation (account
    /// deactivation side effect)
    pub async fn deactivate_by_owner(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE ads
            SET is_active = FALSE, is_featured = FALSE, updated_at = now()
            WHERE user_id = $1 AND is_active = TRUE
            "#,
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Admin listing, inactive included, newest first
    pub async fn list_all(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let ads = sqlx::query_as::<_, Ad>(
            r#"
            SELECT * FROM ads
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(ads)
    }

    pub async fn count_active(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ads WHERE is_active = TRUE")
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    use crate::models::{
        category::Category,
        user::{CreateUserData, User},
    };

    async fn seed_owner(pool: &PgPool) -> (Uuid, Uuid) {
        let user = User::create(
            pool,
            CreateUserData {
                name: "Maria Silva".to_string(),
                email: "maria@example.com".to_string(),
                password_hash: "hash".to_string(),
                whatsapp: None,
            },
        )
        .await
        .unwrap();

        let category = Category::create(pool, "Carros", "carros").await.unwrap();

        (user.id, category.id)
    }

    async fn seed_ad(pool: &PgPool, user_id: Uuid, category_id: Uuid, title: &str) -> Ad {
        Ad::create(
            pool,
            CreateAdData {
                user_id,
                category_id,
                title: title.to_string(),
                description: "Bem conservado".to_string(),
                price: Decimal::new(1_500_000, 2),
                location: "Centro".to_string(),
                whatsapp: None,
                images: vec![],
            },
        )
        .await
        .unwrap()
    }

    #[sqlx::test]
    async fn test_soft_deleted_ad_leaves_public_views(pool: PgPool) {
        let (user_id, category_id) = seed_owner(&pool).await;
        let ad = seed_ad(&pool, user_id, category_id, "Fusca 1978").await;

        assert_eq!(
            Ad::soft_delete_owned(&pool, ad.id, user_id).await.unwrap(),
            1
        );

        // Gone from detail and listing
        assert!(Ad::find_by_id(&pool, ad.id).await.unwrap().is_none());
        let listed = Ad::list(
            &pool,
            AdFilters {
                limit: 20,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(listed.is_empty());

        // Still visible to the owner
        let mine = Ad::list_by_owner(&pool, user_id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(!mine[0].is_active);
    }

    #[sqlx::test]
    async fn test_soft_delete_scoped_to_owner(pool: PgPool) {
        let (user_id, category_id) = seed_owner(&pool).await;
        let ad = seed_ad(&pool, user_id, category_id, "Fusca 1978").await;

        let stranger = Uuid::new_v4();
        assert_eq!(
            Ad::soft_delete_owned(&pool, ad.id, stranger).await.unwrap(),
            0
        );
        assert!(Ad::find_by_id(&pool, ad.id).await.unwrap().is_some());
    }

    #[sqlx::test]
    async fn test_deactivate_by_owner_pulls_all_ads(pool: PgPool) {
        let (user_id, category_id) = seed_owner(&pool).await;
        seed_ad(&pool, user_id, category_id, "Fusca 1978").await;
        seed_ad(&pool, user_id, category_id, "Bicicleta aro 29").await;

        assert_eq!(Ad::deactivate_by_owner(&pool, user_id).await.unwrap(), 2);

        let listed = Ad::list(
            &pool,
            AdFilters {
                limit: 20,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(listed.is_empty());

        // The admin view still sees them
        let all = Ad::list_all(&pool, 20, 0).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
