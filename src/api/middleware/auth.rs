use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use uuid::Uuid;

use super::session::AppState;
use crate::services::auth_tokens::{self, TokenScope};

/// Authentication error responses
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingToken => "Missing or invalid Authorization header",
            AuthError::InvalidToken => "Invalid or expired token",
        };

        (StatusCode::UNAUTHORIZED, message).into_response()
    }
}

/// Identity of the authenticated end user, inserted into request
/// extensions by `require_user`
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
}

/// Identity of the authenticated administrator, inserted into request
/// extensions by `require_admin`
#[derive(Debug, Clone)]
pub struct CurrentAdmin {
    pub admin_id: Uuid,
}

/// Middleware guarding user routes with the user-scope bearer token
pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_bearer_token(&request).ok_or(AuthError::MissingToken)?;

    let claims = auth_tokens::verify_token(
        state.config.user_token_secret.expose_secret(),
        TokenScope::User,
        token,
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "User token rejected");
        AuthError::InvalidToken
    })?;

    request
        .extensions_mut()
        .insert(CurrentUser { user_id: claims.sub });

    Ok(next.run(request).await)
}

/// Middleware guarding admin routes with the admin-scope bearer token
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_bearer_token(&request).ok_or(AuthError::MissingToken)?;

    let claims = auth_tokens::verify_token(
        state.config.admin_token_secret.expose_secret(),
        TokenScope::Admin,
        token,
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "Admin token rejected");
        AuthError::InvalidToken
    })?;

    request
        .extensions_mut()
        .insert(CurrentAdmin { admin_id: claims.sub });

    Ok(next.run(request).await)
}

fn extract_bearer_token(request: &Request) -> Option<&str> {
    let value = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.splitn(2, ' ');

    let scheme = parts.next()?;
    let token = parts.next()?.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }

    Some(token)
}
