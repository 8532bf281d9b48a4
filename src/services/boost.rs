use chrono::{Duration, Utc};
use secrecy::ExposeSecret;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{
    ad::Ad,
    boosted_ad::{BoostedAd, CreateBoostedAdData, PaymentStatus},
    promotion::BoostPromotion,
};
use crate::services::pix_gateway::{
    self, CreatePaymentRequest, PayerIdentification, PaymentPayer, PixGatewayError,
};

#[derive(thiserror::Error, Debug)]
pub enum BoostError {
    #[error("Ad not found")]
    AdNotFound,

    #[error("Promotion not found")]
    PromotionNotFound,

    #[error("Boost not found")]
    BoostNotFound,

    #[error("Payment gateway error: {0}")]
    Gateway(#[from] PixGatewayError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Everything the boost flow needs to talk to the gateway.
#[derive(Clone)]
pub struct GatewayContext {
    pub api_url: String,
    pub access_token: String,
    pub notification_url: String,
}

impl GatewayContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_url: config.pix_api_url.clone(),
            access_token: config.pix_access_token.expose_secret().clone(),
            notification_url: format!(
                "{}/api/webhooks/payments",
                config.base_url.trim_end_matches('/')
            ),
        }
    }
}

/// Payer identity supplied by the buyer at checkout
#[derive(Debug, Clone)]
pub struct PayerDetails {
    pub name: String,
    pub surname: String,
    pub tax_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BoostRequest {
    pub ad_id: Uuid,
    pub promotion_id: Uuid,
    pub payer: PayerDetails,
}

/// What the client needs to pay: the pending boost plus the PIX payload
#[derive(Debug, Serialize)]
pub struct BoostCheckout {
    pub boost: BoostedAd,
    pub qr_code: Option<String>,
    pub qr_code_base64: Option<String>,
    pub ticket_url: Option<String>,
}

/// What a gateway status implies for a local boost record.
///
/// A boost that already left `pending` never acts again, whatever the
/// gateway reports; that is the idempotence the confirmation paths
/// (webhook and polling) both rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    None,
    Approve,
    Reject,
    Cancel,
}

pub fn transition(local: PaymentStatus, remote: PaymentStatus) -> SyncAction {
    if local.is_terminal() {
        return SyncAction::None;
    }

    match remote {
        PaymentStatus::Approved => SyncAction::Approve,
        PaymentStatus::Rejected => SyncAction::Reject,
        PaymentStatus::Cancelled => SyncAction::Cancel,
        PaymentStatus::Pending => SyncAction::None,
    }
}

/// Starts a boost purchase.
///
/// Requests a PIX payment from the gateway for the promotion price and
/// only then persists the `pending` BoostedAd with the gateway's
/// payment id as correlation key. A gateway failure leaves no partial
/// state behind.
#[tracing::instrument(skip(pool, gateway, request), fields(ad_id = %request.ad_id))]
pub async fn request_boost(
    pool: &PgPool,
    gateway: &GatewayContext,
    request: BoostRequest,
) -> Result<BoostCheckout, BoostError> {
    let promotion = BoostPromotion::find_by_id(pool, request.promotion_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or(BoostError::PromotionNotFound)?;

    let ad = Ad::find_by_id(pool, request.ad_id)
        .await?
        .ok_or(BoostError::AdNotFound)?;

    tracing::info!(
        promotion = %promotion.name,
        amount = %promotion.price,
        duration_days = promotion.duration_days,
        "Requesting PIX payment for boost"
    );

    let payment_request = CreatePaymentRequest {
        transaction_amount: promotion.price,
        description: format!("Boost \"{}\" - {}", ad.title, promotion.name),
        payment_method_id: "pix".to_string(),
        notification_url: gateway.notification_url.clone(),
        payer: PaymentPayer {
            email: request.payer.email.clone(),
            first_name: request.payer.name.clone(),
            last_name: request.payer.surname.clone(),
            identification: PayerIdentification {
                kind: "CPF".to_string(),
                number: request.payer.tax_id.clone(),
            },
        },
    };

    let payment =
        pix_gateway::create_pix_payment(&gateway.api_url, &gateway.access_token, payment_request)
            .await?;

    let boost = BoostedAd::create(
        pool,
        CreateBoostedAdData {
            ad_id: ad.id,
            promotion_id: promotion.id,
            payment_id: payment.id.to_string(),
            amount: promotion.price,
            payer_name: request.payer.name,
            payer_surname: request.payer.surname,
            payer_tax_id: request.payer.tax_id,
            payer_email: request.payer.email,
            payer_phone: request.payer.phone,
        },
    )
    .await?;

    tracing::info!(
        boost_id = %boost.id,
        payment_id = %boost.payment_id,
        "Boost created in pending state"
    );

    let data = payment.transaction_data();

    Ok(BoostCheckout {
        qr_code: data.and_then(|d| d.qr_code.clone()),
        qr_code_base64: data.and_then(|d| d.qr_code_base64.clone()),
        ticket_url: data.and_then(|d| d.ticket_url.clone()),
        boost,
    })
}

/// Reconciles one boost against the gateway's authoritative status.
///
/// Shared by the polling endpoint and the webhook handler so both
/// resolve to the same state update. Applying `approved` when the row
/// already approved is a no-op; the conditional UPDATE decides which
/// racing caller performs the side effects.
///
/// Gateway lookup failures are logged and the boost is returned
/// unchanged; the next poll tick or webhook redelivery retries.
#[tracing::instrument(skip(pool, gateway, boost), fields(boost_id = %boost.id))]
pub async fn sync_boost(
    pool: &PgPool,
    gateway: &GatewayContext,
    boost: BoostedAd,
) -> Result<BoostedAd, BoostError> {
    if boost.payment_status.is_terminal() {
        return Ok(boost);
    }

    let payment =
        match pix_gateway::get_payment(&gateway.api_url, &gateway.access_token, &boost.payment_id)
            .await
        {
            Ok(payment) => payment,
            Err(e) => {
                tracing::warn!(
                    payment_id = %boost.payment_id,
                    error = %e,
                    "Gateway status lookup failed, keeping current state"
                );
                return Ok(boost);
            }
        };

    let remote = pix_gateway::map_status(&payment.status);

    match transition(boost.payment_status, remote) {
        SyncAction::None => Ok(boost),
        SyncAction::Approve => {
            let promotion = BoostPromotion::find_by_id(pool, boost.promotion_id)
                .await?
                .ok_or(BoostError::PromotionNotFound)?;

            let start_date = Utc::now();
            let end_date = start_date + Duration::days(i64::from(promotion.duration_days));

            // One transaction: the approval and the featured flag land
            // together or not at all
            let mut tx = pool.begin().await?;
            let updated = BoostedAd::approve(&mut *tx, boost.id, start_date, end_date).await?;
            if updated == 1 {
                Ad::set_featured(&mut *tx, boost.ad_id, true).await?;
            }
            tx.commit().await?;

            if updated == 1 {
                tracing::info!(
                    payment_id = %boost.payment_id,
                    end_date = %end_date,
                    "Boost approved, ad featured"
                );
            } else {
                // Lost the race to another confirmation path; dates were
                // already assigned there.
                tracing::debug!(payment_id = %boost.payment_id, "Approval already applied");
            }

            BoostedAd::find_by_id(pool, boost.id)
                .await?
                .ok_or(BoostError::BoostNotFound)
        }
        action @ (SyncAction::Reject | SyncAction::Cancel) => {
            let status = if action == SyncAction::Reject {
                PaymentStatus::Rejected
            } else {
                PaymentStatus::Cancelled
            };

            let updated = BoostedAd::mark_terminal(pool, boost.id, status).await?;

            if updated == 1 {
                tracing::info!(
                    payment_id = %boost.payment_id,
                    status = ?status,
                    "Boost payment failed"
                );
            }

            BoostedAd::find_by_id(pool, boost.id)
                .await?
                .ok_or(BoostError::BoostNotFound)
        }
    }
}

/// Webhook entry point: resolve the gateway payment id to a boost and
/// reconcile it. Unknown ids are ignored (the gateway may notify about
/// payments that are not boosts).
pub async fn sync_by_payment_id(
    pool: &PgPool,
    gateway: &GatewayContext,
    payment_id: &str,
) -> Result<Option<BoostedAd>, BoostError> {
    let Some(boost) = BoostedAd::find_by_payment_id(pool, payment_id).await? else {
        tracing::warn!(payment_id = %payment_id, "Notification for unknown payment id");
        return Ok(None);
    };

    let boost = sync_boost(pool, gateway, boost).await?;
    Ok(Some(boost))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_follows_gateway() {
        assert_eq!(
            transition(PaymentStatus::Pending, PaymentStatus::Approved),
            SyncAction::Approve
        );
        assert_eq!(
            transition(PaymentStatus::Pending, PaymentStatus::Rejected),
            SyncAction::Reject
        );
        assert_eq!(
            transition(PaymentStatus::Pending, PaymentStatus::Cancelled),
            SyncAction::Cancel
        );
        assert_eq!(
            transition(PaymentStatus::Pending, PaymentStatus::Pending),
            SyncAction::None
        );
    }

    #[test]
    fn test_approved_is_sticky() {
        // Re-applying approved must be a no-op, not a date reset
        assert_eq!(
            transition(PaymentStatus::Approved, PaymentStatus::Approved),
            SyncAction::None
        );
        // A gateway hiccup reporting something else never demotes
        assert_eq!(
            transition(PaymentStatus::Approved, PaymentStatus::Pending),
            SyncAction::None
        );
        assert_eq!(
            transition(PaymentStatus::Approved, PaymentStatus::Cancelled),
            SyncAction::None
        );
    }

    #[test]
    fn test_failed_states_are_terminal() {
        assert_eq!(
            transition(PaymentStatus::Rejected, PaymentStatus::Approved),
            SyncAction::None
        );
        assert_eq!(
            transition(PaymentStatus::Cancelled, PaymentStatus::Approved),
            SyncAction::None
        );
    }
}
