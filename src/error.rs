use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error on `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Full detail goes to the log only; response bodies stay
        // generic so upstream error text never reaches clients
        if let AppError::PaymentGateway(_) | AppError::Database(_) | AppError::Internal(_) = self {
            tracing::error!(error = ?self, "Request failed");
        }

        let (status, code, field, message) = match self {
            AppError::Validation { field, message } => {
                (StatusCode::BAD_REQUEST, "validation", Some(field), message)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", None, msg),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                None,
                "Unauthorized".to_string(),
            ),
            AppError::PaymentGateway(_) => (
                StatusCode::BAD_GATEWAY,
                "payment_gateway",
                None,
                "Payment service unavailable. Please try again later.".to_string(),
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database",
                None,
                "Database error".to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                None,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": code,
            "message": message,
            "field": field,
        }));

        (status, body).into_response()
    }
}

impl From<crate::services::pix_gateway::PixGatewayError> for AppError {
    fn from(err: crate::services::pix_gateway::PixGatewayError) -> Self {
        AppError::PaymentGateway(err.to_string())
    }
}

impl From<crate::services::boost::BoostError> for AppError {
    fn from(err: crate::services::boost::BoostError) -> Self {
        use crate::services::boost::BoostError;

        match err {
            BoostError::AdNotFound => AppError::NotFound("Ad not found".to_string()),
            BoostError::PromotionNotFound => {
                AppError::NotFound("Promotion not found".to_string())
            }
            BoostError::BoostNotFound => AppError::NotFound("Boost not found".to_string()),
            BoostError::Gateway(e) => AppError::PaymentGateway(e.to_string()),
            BoostError::Database(e) => AppError::Database(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn response_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_database_error_body_stays_generic() {
        let (status, body) = response_json(AppError::Database(sqlx::Error::RowNotFound)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "database");
        assert_eq!(body["message"], "Database error");
        assert!(!body.to_string().contains("no rows"));
    }

    #[tokio::test]
    async fn test_validation_error_reports_field() {
        let (status, body) = response_json(AppError::validation("title", "must not be empty")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation");
        assert_eq!(body["field"], "title");
        assert_eq!(body["message"], "must not be empty");
    }
}
