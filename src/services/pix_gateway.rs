use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::PaymentStatus;

#[derive(thiserror::Error, Debug)]
pub enum PixGatewayError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Gateway API error: {0}")]
    ApiError(String),

    #[error("Payment not found")]
    PaymentNotFound,
}

#[derive(Debug, Serialize)]
pub struct PayerIdentification {
    #[serde(rename = "type")]
    pub kind: String,
    pub number: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentPayer {
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub identification: PayerIdentification,
}

/// Request to create a PIX payment
#[derive(Debug, Serialize)]
pub struct CreatePaymentRequest {
    pub transaction_amount: Decimal,
    pub description: String,
    pub payment_method_id: String,
    pub notification_url: String,
    pub payer: PaymentPayer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionData {
    pub qr_code: Option<String>,
    pub qr_code_base64: Option<String>,
    pub ticket_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PointOfInteraction {
    pub transaction_data: Option<TransactionData>,
}

/// A payment as the gateway reports it
#[derive(Debug, Clone, Deserialize)]
pub struct PixPayment {
    pub id: i64,
    pub status: String,
    #[serde(default)]
    pub point_of_interaction: Option<PointOfInteraction>,
}

impl PixPayment {
    pub fn transaction_data(&self) -> Option<&TransactionData> {
        self.point_of_interaction
            .as_ref()
            .and_then(|poi| poi.transaction_data.as_ref())
    }
}

/// Creates a PIX payment at the gateway
///
/// Calls POST /v1/payments. A single attempt: either the gateway
/// accepts the payment or the caller sees the failure.
#[tracing::instrument(skip(api_base_url, access_token, request))]
pub async fn create_pix_payment(
    api_base_url: &str,
    access_token: &str,
    request: CreatePaymentRequest,
) -> Result<PixPayment, PixGatewayError> {
    let client = Client::new();

    let base = api_base_url.trim_end_matches('/');
    let url = format!("{}/v1/payments", base);

    tracing::debug!(
        amount = %request.transaction_amount,
        "Requesting PIX payment"
    );

    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", access_token))
        .header("X-Idempotency-Key", Uuid::new_v4().to_string())
        .json(&request)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::error!(
            status = %status,
            error = %error_text,
            "PIX payment creation failed"
        );
        return Err(PixGatewayError::ApiError(format!(
            "Status {}: {}",
            status, error_text
        )));
    }

    let payment: PixPayment = response
        .json()
        .await
        .map_err(|e| PixGatewayError::ApiError(format!("Failed to parse payment response: {}", e)))?;

    tracing::info!(
        payment_id = payment.id,
        status = %payment.status,
        "PIX payment created"
    );

    Ok(payment)
}

/// Fetches the authoritative state of a payment by its gateway id
///
/// Calls GET /v1/payments/{id}
#[tracing::instrument(skip(api_base_url, access_token))]
pub async fn get_payment(
    api_base_url: &str,
    access_token: &str,
    payment_id: &str,
) -> Result<PixPayment, PixGatewayError> {
    let client = Client::new();

    let base = api_base_url.trim_end_matches('/');
    let url = format!("{}/v1/payments/{}", base, payment_id);

    let response = client
        .get(&url)
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await?;

    let status = response.status();

    if status.as_u16() == 404 {
        return Err(PixGatewayError::PaymentNotFound);
    }

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::error!(
            status = %status,
            error = %error_text,
            "Payment status lookup failed"
        );
        return Err(PixGatewayError::ApiError(format!(
            "Status {}: {}",
            status, error_text
        )));
    }

    let payment: PixPayment = response
        .json()
        .await
        .map_err(|e| PixGatewayError::ApiError(format!("Failed to parse payment response: {}", e)))?;

    tracing::debug!(
        payment_id = payment.id,
        status = %payment.status,
        "Payment status retrieved"
    );

    Ok(payment)
}

/// Maps the gateway's status string onto our lifecycle.
///
/// Anything not explicitly terminal ("in_process", "authorized",
/// unknown values) is treated as still pending.
pub fn map_status(raw: &str) -> PaymentStatus {
    match raw {
        "approved" => PaymentStatus::Approved,
        "rejected" => PaymentStatus::Rejected,
        "cancelled" => PaymentStatus::Cancelled,
        _ => PaymentStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_request() -> CreatePaymentRequest {
        CreatePaymentRequest {
            transaction_amount: Decimal::new(999, 2),
            description: "Ad boost".to_string(),
            payment_method_id: "pix".to_string(),
            notification_url: "https://example.com/api/webhooks/payments".to_string(),
            payer: PaymentPayer {
                email: Some("payer@example.com".to_string()),
                first_name: "Maria".to_string(),
                last_name: "Silva".to_string(),
                identification: PayerIdentification {
                    kind: "CPF".to_string(),
                    number: "12345678909".to_string(),
                },
            },
        }
    }

    #[tokio::test]
    async fn test_create_pix_payment_parses_qr_payload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/payments"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 1234567,
                "status": "pending",
                "point_of_interaction": {
                    "transaction_data": {
                        "qr_code": "00020126580014br.gov.bcb.pix",
                        "qr_code_base64": "aVZCT1J3MEtH",
                        "ticket_url": "https://gateway.example/ticket/1234567"
                    }
                }
            })))
            .mount(&server)
            .await;

        let payment = create_pix_payment(&server.uri(), "test-token", sample_request())
            .await
            .unwrap();

        assert_eq!(payment.id, 1234567);
        assert_eq!(payment.status, "pending");
        let data = payment.transaction_data().unwrap();
        assert_eq!(data.qr_code.as_deref(), Some("00020126580014br.gov.bcb.pix"));
    }

    #[tokio::test]
    async fn test_create_pix_payment_surfaces_gateway_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/payments"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"message": "invalid payer"})),
            )
            .mount(&server)
            .await;

        let result = create_pix_payment(&server.uri(), "test-token", sample_request()).await;

        assert!(matches!(result, Err(PixGatewayError::ApiError(_))));
    }

    #[tokio::test]
    async fn test_get_payment_maps_404_to_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/payments/999"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = get_payment(&server.uri(), "test-token", "999").await;

        assert!(matches!(result, Err(PixGatewayError::PaymentNotFound)));
    }

    #[tokio::test]
    async fn test_get_payment_returns_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/payments/1234567"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1234567,
                "status": "approved"
            })))
            .mount(&server)
            .await;

        let payment = get_payment(&server.uri(), "test-token", "1234567")
            .await
            .unwrap();

        assert_eq!(payment.status, "approved");
        assert!(payment.transaction_data().is_none());
    }

    #[test]
    fn test_map_status() {
        assert_eq!(map_status("approved"), PaymentStatus::Approved);
        assert_eq!(map_status("rejected"), PaymentStatus::Rejected);
        assert_eq!(map_status("cancelled"), PaymentStatus::Cancelled);
        assert_eq!(map_status("pending"), PaymentStatus::Pending);
        assert_eq!(map_status("in_process"), PaymentStatus::Pending);
        assert_eq!(map_status("something_new"), PaymentStatus::Pending);
    }
}
