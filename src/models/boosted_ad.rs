use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

/// Payment lifecycle of a boost purchase.
///
/// `pending` is the only state that can transition; `approved`,
/// `rejected` and `cancelled` are terminal for the payment itself.
/// An approved boost additionally carries an active/paused sub-flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

/// A single purchase of a promotion package applied to one ad.
///
/// `start_date`/`end_date` are written exactly once, at approval time.
/// Invariant: `is_active = true` only while `payment_status = approved`
/// (also enforced by a CHECK constraint).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BoostedAd {
    pub id: Uuid,
    pub ad_id: Uuid,
    pub promotion_id: Uuid,
    pub payment_id: String,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub amount: Decimal,
    pub payer_name: String,
    pub payer_surname: String,
    pub payer_tax_id: String,
    pub payer_email: Option<String>,
    pub payer_phone: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateBoostedAdData {
    pub ad_id: Uuid,
    pub promotion_id: Uuid,
    pub payment_id: String,
    pub amount: Decimal,
    pub payer_name: String,
    pub payer_surname: String,
    pub payer_tax_id: String,
    pub payer_email: Option<String>,
    pub payer_phone: Option<String>,
}

impl BoostedAd {
    /// Insert a new boost in `pending` with no dates assigned.
    /// Only called after the gateway accepted the payment request.
    pub async fn create(pool: &PgPool, data: CreateBoostedAdData) -> Result<Self, sqlx::Error> {
        let boost = sqlx::query_as::<_, BoostedAd>(
            r#"
            INSERT INTO boosted_ads (
                ad_id, promotion_id, payment_id, amount,
                payer_name, payer_surname, payer_tax_id, payer_email, payer_phone
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(data.ad_id)
        .bind(data.promotion_id)
        .bind(&data.payment_id)
        .bind(data.amount)
        .bind(&data.payer_name)
        .bind(&data.payer_surname)
        .bind(&data.payer_tax_id)
        .bind(&data.payer_email)
        .bind(&data.payer_phone)
        .fetch_one(pool)
        .await?;

        Ok(boost)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let boost = sqlx::query_as::<_, BoostedAd>(
            r#"
            SELECT * FROM boosted_ads WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(boost)
    }

    /// Look up a boost scoped to the owner of the boosted ad, so the
    /// polling endpoint answers 404 for other users' boosts
    pub async fn find_by_id_for_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let boost = sqlx::query_as::<_, BoostedAd>(
            r#"
            SELECT b.* FROM boosted_ads b
            JOIN ads a ON a.id = b.ad_id
            WHERE b.id = $1 AND a.user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(boost)
    }

    /// Look up by the gateway's payment id (the correlation key shared
    /// by the polling and webhook paths)
    pub async fn find_by_payment_id(
        pool: &PgPool,
        payment_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let boost = sqlx::query_as::<_, BoostedAd>(
            r#"
            SELECT * FROM boosted_ads WHERE payment_id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(pool)
        .await?;

        Ok(boost)
    }

    /// Approve a pending boost, assigning its active window.
    ///
    /// Conditional on `payment_status = 'pending'` so a webhook and a
    /// poll racing on the same row cannot double-apply the approval:
    /// exactly one caller sees `rows_affected = 1` and performs the
    /// featured-ad side effect. Takes an executor so the caller can run
    /// it inside the same transaction as that side effect.
    pub async fn approve(
        executor: impl PgExecutor<'_>,
        id: Uuid,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE boosted_ads
            SET payment_status = 'approved',
                start_date = $2,
                end_date = $3,
                is_active = TRUE,
                updated_at = now()
            WHERE id = $1 AND payment_status = 'pending'
            "#,
        )
        .bind(id)
        .bind(start_date)
        .bind(end_date)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Move a pending boost into a terminal failure state. No date
    /// assignment. A no-op when the boost already left `pending`.
    pub async fn mark_terminal(
        pool: &PgPool,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<u64, sqlx::Error> {
        debug_assert!(matches!(
            status,
            PaymentStatus::Rejected | PaymentStatus::Cancelled
        ));

        let result = sqlx::query(
            r#"
            UPDATE boosted_ads
            SET payment_status = $2, updated_at = now()
            WHERE id = $1 AND payment_status = 'pending'
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Admin pause/resume of an approved boost. Resume only works
    /// within the boost's date window.
    pub async fn set_active(pool: &PgPool, id: Uuid, active: bool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE boosted_ads
            SET is_active = $2, updated_at = now()
            WHERE id = $1
              AND payment_status = 'approved'
              AND ($2 = FALSE OR end_date > now())
            "#,
        )
        .bind(id)
        .bind(active)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Admin listing, optionally filtered by payment status
    pub async fn list(
        pool: &PgPool,
        status: Option<PaymentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let boosts = if let Some(status) = status {
            sqlx::query_as::<_, BoostedAd>(
                r#"
                SELECT * FROM boosted_ads
                WHERE payment_status = $1
                ORDER BY created_at DESC
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        } else {
            sqlx::query_as::<_, BoostedAd>(
                r#"
                SELECT * FROM boosted_ads
                ORDER BY created_at DESC
                LIMIT $1 OFFSET $2
                "#,
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        };

        Ok(boosts)
    }

    pub async fn count_by_status(
        pool: &PgPool,
        status: PaymentStatus,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM boosted_ads WHERE payment_status = $1
            "#,
        )
        .bind(status)
        .fetch_one(pool)
        .await
    }

    /// Whether the ad is covered by at least one running boost
    pub async fn has_active_for_ad(pool: &PgPool, ad_id: Uuid) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM boosted_ads
            WHERE ad_id = $1 AND is_active = TRUE AND end_date > now()
            "#,
        )
        .bind(ad_id)
        .fetch_one(pool)
        .await?;

        Ok(count > 0)
    }

    /// Deactivate approved boosts whose window has ended.
    /// Returns the (boost id, ad id) pairs that were switched off so the
    /// caller can clear featured flags.
    pub async fn deactivate_expired(pool: &PgPool) -> Result<Vec<(Uuid, Uuid)>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid)>(
            r#"
            UPDATE boosted_ads
            SET is_active = FALSE, updated_at = now()
            WHERE is_active = TRUE AND end_date <= now()
            RETURNING id, ad_id
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    /// Cancel pending boosts created before the cutoff. Payments the
    /// gateway never resolved would otherwise sit in `pending` forever.
    pub async fn cancel_stale_pending(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE boosted_ads
            SET payment_status = 'cancelled', updated_at = now()
            WHERE payment_status = 'pending' AND created_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;

    use crate::models::{
        ad::{Ad, CreateAdData},
        category::Category,
        promotion::{BoostPromotion, CreatePromotionData},
        user::{CreateUserData, User},
    };

    async fn seed_boost(pool: &PgPool) -> BoostedAd {
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

        let ad = Ad::create(
            pool,
            CreateAdData {
                user_id: user.id,
                category_id: category.id,
                title: "Fusca 1978".to_string(),
                description: "Bem conservado".to_string(),
                price: Decimal::new(1_500_000, 2),
                location: "Centro".to_string(),
                whatsapp: None,
                images: vec![],
            },
        )
        .await
        .unwrap();

        let promotion = BoostPromotion::create(
            pool,
            CreatePromotionData {
                name: "Semanal".to_string(),
                price: Decimal::new(999, 2),
                duration_days: 7,
            },
        )
        .await
        .unwrap();

        BoostedAd::create(
            pool,
            CreateBoostedAdData {
                ad_id: ad.id,
                promotion_id: promotion.id,
                payment_id: "1234567".to_string(),
                amount: promotion.price,
                payer_name: "Maria".to_string(),
                payer_surname: "Silva".to_string(),
                payer_tax_id: "12345678909".to_string(),
                payer_email: None,
                payer_phone: None,
            },
        )
        .await
        .unwrap()
    }

    #[sqlx::test]
    async fn test_new_boost_starts_pending_with_unset_dates(pool: PgPool) {
        let boost = seed_boost(&pool).await;

        assert_eq!(boost.payment_status, PaymentStatus::Pending);
        assert_eq!(boost.payment_method, "pix");
        assert!(boost.start_date.is_none());
        assert!(boost.end_date.is_none());
        assert!(!boost.is_active);
    }

    #[sqlx::test]
    async fn test_approval_applies_exactly_once(pool: PgPool) {
        let boost = seed_boost(&pool).await;
        let start = Utc::now();
        let end = start + Duration::days(7);

        assert_eq!(
            BoostedAd::approve(&pool, boost.id, start, end).await.unwrap(),
            1
        );

        // A second confirmation path arriving later must not reset dates
        let later_end = start + Duration::days(30);
        assert_eq!(
            BoostedAd::approve(&pool, boost.id, start, later_end)
                .await
                .unwrap(),
            0
        );

        let stored = BoostedAd::find_by_id(&pool, boost.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Approved);
        assert!(stored.is_active);
        assert!(stored.end_date.unwrap() < later_end);
    }

    #[sqlx::test]
    async fn test_active_flag_requires_approval(pool: PgPool) {
        let boost = seed_boost(&pool).await;

        // Resume refuses while the payment is still pending
        assert_eq!(
            BoostedAd::set_active(&pool, boost.id, true).await.unwrap(),
            0
        );

        // The schema itself rejects the combination
        let result = sqlx::query("UPDATE boosted_ads SET is_active = TRUE WHERE id = $1")
            .bind(boost.id)
            .execute(&pool)
            .await;
        assert!(result.is_err());
    }

    #[sqlx::test]
    async fn test_mark_terminal_is_noop_after_approval(pool: PgPool) {
        let boost = seed_boost(&pool).await;
        let start = Utc::now();
        BoostedAd::approve(&pool, boost.id, start, start + Duration::days(7))
            .await
            .unwrap();

        assert_eq!(
            BoostedAd::mark_terminal(&pool, boost.id, PaymentStatus::Rejected)
                .await
                .unwrap(),
            0
        );

        let stored = BoostedAd::find_by_id(&pool, boost.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Approved);
    }
}
