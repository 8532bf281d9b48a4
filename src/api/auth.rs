use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::api::middleware::session::{self, AppState};
use crate::error::{AppError, Result};
use crate::models::user::{CreateUserData, User};
use crate::services::auth_tokens::{self, TokenScope};
use crate::services::passwords;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub whatsapp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    if body.name.trim().is_empty() {
        return Err(AppError::validation("name", "must not be empty"));
    }
    if !body.email.contains('@') {
        return Err(AppError::validation("email", "must be a valid email"));
    }
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation("password", "must be at least 8 characters"));
    }

    let password_hash = passwords::hash_password(&body.password)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    let user = User::create(
        &state.pool,
        CreateUserData {
            name: body.name.trim().to_string(),
            email: body.email.trim().to_string(),
            password_hash,
            whatsapp: body.whatsapp,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::validation("email", "already registered")
        } else {
            AppError::Database(e)
        }
    })?;

    let token = auth_tokens::issue_token(
        state.config.user_token_secret.expose_secret(),
        TokenScope::User,
        user.id,
        state.config.user_token_ttl_hours,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user = User::find_by_email(&state.pool, &body.email)
        .await?
        .filter(|u| u.is_active)
        .ok_or(AppError::Unauthorized)?;

    if !passwords::verify_password(&body.password, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }

    let token = auth_tokens::issue_token(
        state.config.user_token_secret.expose_secret(),
        TokenScope::User,
        user.id,
        state.config.user_token_ttl_hours,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse { token, user }))
}

/// Legacy session-scheme probe. No flow establishes a session
/// identity, so this always answers 401; clients fall back to the
/// bearer-token scheme.
async fn session_probe(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<User>> {
    let user_id = session::session_user_id(&session)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?
        .ok_or(AppError::Unauthorized)?;

    let user = User::find_by_id(&state.pool, user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(user))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/session", get(session_probe))
}
