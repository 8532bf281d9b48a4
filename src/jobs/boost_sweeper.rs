use chrono::{Duration, Utc};
use sqlx::PgPool;

use crate::models::{ad::Ad, boosted_ad::BoostedAd};

/// Pending payments the gateway never resolved are cancelled after
/// this long.
const STALE_PENDING_HOURS: i64 = 48;

#[derive(Debug, Default)]
pub struct SweepStats {
    pub expired_boosts: usize,
    pub ads_unfeatured: usize,
    pub ads_refeatured: u64,
    pub stale_cancelled: u64,
}

/// Periodic sweep over the boost table.
///
/// 1. Switch off approved boosts whose window has ended and clear the
///    featured flag on ads no other active boost covers.
/// 2. Re-assert the featured flag on ads still covered by a running
///    boost, healing flags lost to a crash or a racing sweep.
/// 3. Cancel pending boosts older than 48 hours.
pub async fn sweep_boosts(pool: &PgPool) -> Result<SweepStats, sqlx::Error> {
    let mut stats = SweepStats::default();

    let expired = BoostedAd::deactivate_expired(pool).await?;
    stats.expired_boosts = expired.len();

    for (boost_id, ad_id) in expired {
        // Another boost may still be covering the same ad
        if !BoostedAd::has_active_for_ad(pool, ad_id).await? {
            Ad::set_featured(pool, ad_id, false).await?;
            stats.ads_unfeatured += 1;
        }

        tracing::info!(
            boost_id = %boost_id,
            ad_id = %ad_id,
            "Boost window ended, deactivated"
        );
    }

    stats.ads_refeatured = Ad::restore_featured(pool).await?;

    let cutoff = Utc::now() - Duration::hours(STALE_PENDING_HOURS);
    stats.stale_cancelled = BoostedAd::cancel_stale_pending(pool, cutoff).await?;

    if stats.stale_cancelled > 0 {
        tracing::warn!(
            count = stats.stale_cancelled,
            "Cancelled stale pending boosts"
        );
    }

    tracing::info!(?stats, "Boost sweep completed");

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    use crate::models::{
        ad::CreateAdData,
        boosted_ad::{CreateBoostedAdData, PaymentStatus},
        category::Category,
        promotion::{BoostPromotion, CreatePromotionData},
        user::{CreateUserData, User},
    };

    async fn seed_boost(pool: &PgPool) -> (Ad, BoostedAd) {
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

        let boost = BoostedAd::create(
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
        .unwrap();

        (ad, boost)
    }

    #[sqlx::test]
    async fn test_sweep_deactivates_ended_boosts(pool: PgPool) {
        let (ad, boost) = seed_boost(&pool).await;
        let start = Utc::now() - Duration::days(8);
        BoostedAd::approve(&pool, boost.id, start, start + Duration::days(7))
            .await
            .unwrap();
        Ad::set_featured(&pool, ad.id, true).await.unwrap();

        let stats = sweep_boosts(&pool).await.unwrap();

        assert_eq!(stats.expired_boosts, 1);
        assert_eq!(stats.ads_unfeatured, 1);

        let boost = BoostedAd::find_by_id(&pool, boost.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!boost.is_active);
        assert_eq!(boost.payment_status, PaymentStatus::Approved);

        let ad = Ad::find_by_id(&pool, ad.id).await.unwrap().unwrap();
        assert!(!ad.is_featured);
    }

    #[sqlx::test]
    async fn test_sweep_restores_lost_featured_flag(pool: PgPool) {
        let (ad, boost) = seed_boost(&pool).await;
        let start = Utc::now();
        BoostedAd::approve(&pool, boost.id, start, start + Duration::days(7))
            .await
            .unwrap();
        // Approved and in-window, but the featured flag never landed

        let stats = sweep_boosts(&pool).await.unwrap();

        assert_eq!(stats.ads_refeatured, 1);
        let ad = Ad::find_by_id(&pool, ad.id).await.unwrap().unwrap();
        assert!(ad.is_featured);
    }

    #[sqlx::test]
    async fn test_sweep_cancels_stale_pending(pool: PgPool) {
        let (_, boost) = seed_boost(&pool).await;
        sqlx::query("UPDATE boosted_ads SET created_at = now() - interval '3 days' WHERE id = $1")
            .bind(boost.id)
            .execute(&pool)
            .await
            .unwrap();

        let stats = sweep_boosts(&pool).await.unwrap();

        assert_eq!(stats.stale_cancelled, 1);
        let boost = BoostedAd::find_by_id(&pool, boost.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(boost.payment_status, PaymentStatus::Cancelled);
    }
}
