use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::auth::{self, CurrentUser};
use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};
use crate::models::{ad::Ad, boosted_ad::BoostedAd, promotion::BoostPromotion};
use crate::services::boost::{self, BoostRequest, GatewayContext, PayerDetails};

#[derive(Debug, Deserialize)]
pub struct PayerRequest {
    pub name: String,
    pub surname: String,
    pub tax_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBoostRequest {
    pub ad_id: Uuid,
    pub promotion_id: Uuid,
    pub payer: PayerRequest,
}

#[derive(Debug, Serialize)]
pub struct BoostStatusResponse {
    pub boost: BoostedAd,
}

/// Gateway payment-event notification. The gateway sends the payment
/// id either as a number or a string depending on the event version.
#[derive(Debug, Deserialize)]
pub struct WebhookNotification {
    pub id: Option<i64>,
    pub action: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub data: Option<WebhookData>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub id: PaymentIdRef,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PaymentIdRef {
    Num(i64),
    Str(String),
}

impl PaymentIdRef {
    fn as_string(&self) -> String {
        match self {
            PaymentIdRef::Num(n) => n.to_string(),
            PaymentIdRef::Str(s) => s.clone(),
        }
    }
}

impl WebhookNotification {
    fn is_payment_event(&self) -> bool {
        self.kind.as_deref() == Some("payment")
            || self
                .action
                .as_deref()
                .is_some_and(|a| a.starts_with("payment."))
    }
}

fn validate_payer(payer: &PayerRequest) -> Result<()> {
    if payer.name.trim().is_empty() {
        return Err(AppError::validation("payer.name", "must not be empty"));
    }
    if payer.surname.trim().is_empty() {
        return Err(AppError::validation("payer.surname", "must not be empty"));
    }

    let tax_digits = payer.tax_id.chars().filter(char::is_ascii_digit).count();
    if tax_digits != 11 {
        return Err(AppError::validation("payer.tax_id", "must be a valid CPF (11 digits)"));
    }

    if let Some(email) = &payer.email {
        if !email.contains('@') {
            return Err(AppError::validation("payer.email", "must be a valid email"));
        }
    }

    Ok(())
}

/// Active promotion packages available for purchase
async fn list_promotions(State(state): State<AppState>) -> Result<Json<Vec<BoostPromotion>>> {
    let promotions = BoostPromotion::list_active(&state.pool).await?;

    Ok(Json(promotions))
}

/// Starts a boost purchase for one of the caller's ads.
///
/// On gateway success the response carries the PIX QR payload and the
/// boost record in `pending`; on gateway failure nothing is persisted.
async fn create_boost(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateBoostRequest>,
) -> Result<(StatusCode, Json<boost::BoostCheckout>)> {
    validate_payer(&body.payer)?;

    // Only the owner can boost an ad; a 404 hides other users' ads
    let ad = Ad::find_by_id(&state.pool, body.ad_id)
        .await?
        .filter(|a| a.user_id == user.user_id)
        .ok_or_else(|| AppError::NotFound("Ad not found".to_string()))?;

    let gateway = GatewayContext::from_config(&state.config);

    let tax_id: String = body
        .payer
        .tax_id
        .chars()
        .filter(char::is_ascii_digit)
        .collect();

    let checkout = boost::request_boost(
        &state.pool,
        &gateway,
        BoostRequest {
            ad_id: ad.id,
            promotion_id: body.promotion_id,
            payer: PayerDetails {
                name: body.payer.name.trim().to_string(),
                surname: body.payer.surname.trim().to_string(),
                tax_id,
                email: body.payer.email,
                phone: body.payer.phone,
            },
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(checkout)))
}

/// Polling endpoint: re-syncs the boost against the gateway and
/// returns the current record. Gateway hiccups keep the stored state.
async fn boost_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<BoostStatusResponse>> {
    let boost = BoostedAd::find_by_id_for_user(&state.pool, id, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Boost not found".to_string()))?;

    let gateway = GatewayContext::from_config(&state.config);
    let boost = boost::sync_boost(&state.pool, &gateway, boost).await?;

    Ok(Json(BoostStatusResponse { boost }))
}

/// Gateway webhook. Resolves to the same state update as polling.
///
/// Always answers 200 for well-formed notifications; processing
/// failures are logged and recovered by the next poll or redelivery.
async fn payment_webhook(
    State(state): State<AppState>,
    Json(notification): Json<WebhookNotification>,
) -> StatusCode {
    if !notification.is_payment_event() {
        tracing::debug!(
            kind = ?notification.kind,
            action = ?notification.action,
            "Ignoring non-payment notification"
        );
        return StatusCode::OK;
    }

    let Some(payment_id) = notification.data.as_ref().map(|d| d.id.as_string()) else {
        tracing::warn!("Payment notification without data.id");
        return StatusCode::OK;
    };

    tracing::info!(payment_id = %payment_id, "Payment webhook received");

    let gateway = GatewayContext::from_config(&state.config);

    if let Err(e) = boost::sync_by_payment_id(&state.pool, &gateway, &payment_id).await {
        tracing::error!(
            payment_id = %payment_id,
            error = %e,
            "Webhook processing failed"
        );
    }

    StatusCode::OK
}

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/promotions", get(list_promotions))
        .route("/api/webhooks/payments", post(payment_webhook));

    let protected = Router::new()
        .route("/api/boosts", post(create_boost))
        .route("/api/boosts/:id/status", get(boost_status))
        .route_layer(middleware::from_fn_with_state(state, auth::require_user));

    public.merge(protected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_payload_with_numeric_id() {
        let notification: WebhookNotification = serde_json::from_str(
            r#"{"id": 99, "type": "payment", "action": "payment.updated", "data": {"id": 1234567}}"#,
        )
        .unwrap();

        assert!(notification.is_payment_event());
        assert_eq!(notification.data.unwrap().id.as_string(), "1234567");
    }

    #[test]
    fn test_webhook_payload_with_string_id() {
        let notification: WebhookNotification =
            serde_json::from_str(r#"{"action": "payment.created", "data": {"id": "1234567"}}"#)
                .unwrap();

        assert!(notification.is_payment_event());
        assert_eq!(notification.data.unwrap().id.as_string(), "1234567");
    }

    #[test]
    fn test_non_payment_event_ignored() {
        let notification: WebhookNotification =
            serde_json::from_str(r#"{"type": "plan", "data": {"id": "x"}}"#).unwrap();

        assert!(!notification.is_payment_event());
    }

    #[test]
    fn test_validate_payer_rejects_short_cpf() {
        let payer = PayerRequest {
            name: "Maria".to_string(),
            surname: "Silva".to_string(),
            tax_id: "123".to_string(),
            email: None,
            phone: None,
        };

        assert!(validate_payer(&payer).is_err());
    }

    #[test]
    fn test_validate_payer_accepts_formatted_cpf() {
        let payer = PayerRequest {
            name: "Maria".to_string(),
            surname: "Silva".to_string(),
            tax_id: "123.456.789-09".to_string(),
            email: Some("maria@example.com".to_string()),
            phone: None,
        };

        assert!(validate_payer(&payer).is_ok());
    }
}
