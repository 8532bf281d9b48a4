use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::auth;
use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};
use crate::models::{
    ad::Ad,
    boosted_ad::{BoostedAd, PaymentStatus},
    category::{self, Category},
    promotion::{BoostPromotion, CreatePromotionData, UpdatePromotionData},
    site_settings::SiteSettings,
    user::User,
};
use crate::services::auth_tokens::{self, TokenScope};
use crate::services::passwords;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub token: String,
    pub admin: User,
}

#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub total_users: i64,
    pub active_ads: i64,
    pub pending_boosts: i64,
    pub approved_boosts: i64,
}

#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub site_name: String,
    pub contact_email: Option<String>,
    pub contact_whatsapp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePromotionRequest {
    pub name: String,
    pub price: Decimal,
    pub duration_days: i32,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdatePromotionRequest {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub duration_days: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct BoostListParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (
        limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        offset.unwrap_or(0).max(0),
    )
}

fn validate_promotion(price: Option<Decimal>, duration_days: Option<i32>) -> Result<()> {
    if let Some(price) = price {
        if price <= Decimal::ZERO {
            return Err(AppError::validation("price", "must be positive"));
        }
    }
    if let Some(days) = duration_days {
        if !(1..=365).contains(&days) {
            return Err(AppError::validation("duration_days", "must be between 1 and 365"));
        }
    }

    Ok(())
}

/// Admin login issuing an admin-scope bearer token. Non-admin accounts
/// get the same 401 as bad credentials.
async fn admin_login(
    State(state): State<AppState>,
    Json(body): Json<AdminLoginRequest>,
) -> Result<Json<AdminLoginResponse>> {
    let admin = User::find_by_email(&state.pool, &body.email)
        .await?
        .filter(|u| u.is_admin && u.is_active)
        .ok_or(AppError::Unauthorized)?;

    if !passwords::verify_password(&body.password, &admin.password_hash) {
        return Err(AppError::Unauthorized);
    }

    let token = auth_tokens::issue_token(
        state.config.admin_token_secret.expose_secret(),
        TokenScope::Admin,
        admin.id,
        state.config.admin_token_ttl_hours,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    tracing::info!(admin_id = %admin.id, "Admin logged in");

    Ok(Json(AdminLoginResponse { token, admin }))
}

async fn stats(State(state): State<AppState>) -> Result<Json<AdminStats>> {
    let total_users = User::count(&state.pool).await?;
    let active_ads = Ad::count_active(&state.pool).await?;
    let pending_boosts = BoostedAd::count_by_status(&state.pool, PaymentStatus::Pending).await?;
    let approved_boosts = BoostedAd::count_by_status(&state.pool, PaymentStatus::Approved).await?;

    Ok(Json(AdminStats {
        total_users,
        active_ads,
        pending_boosts,
        approved_boosts,
    }))
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<SiteSettings>> {
    let settings = SiteSettings::get(&state.pool).await?;

    Ok(Json(settings))
}

async fn update_settings(
    State(state): State<AppState>,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<SiteSettings>> {
    if body.site_name.trim().is_empty() {
        return Err(AppError::validation("site_name", "must not be empty"));
    }

    let settings = SiteSettings::update(
        &state.pool,
        body.site_name.trim(),
        body.contact_email.as_deref(),
        body.contact_whatsapp.as_deref(),
    )
    .await?;

    Ok(Json(settings))
}

// Categories

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = Category::list_all(&state.pool).await?;

    Ok(Json(categories))
}

async fn create_category(
    State(state): State<AppState>,
    Json(body): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name", "must not be empty"));
    }

    let category = Category::create(&state.pool, name, &category::slugify(name)).await?;

    Ok((StatusCode::CREATED, Json(category)))
}

async fn rename_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CategoryRequest>,
) -> Result<Json<Category>> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name", "must not be empty"));
    }

    Category::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

    let category = Category::rename(&state.pool, id, name, &category::slugify(name)).await?;

    Ok(Json(category))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let affected = Category::deactivate(&state.pool, id).await?;

    if affected == 0 {
        return Err(AppError::NotFound("Category not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

// Boost promotions

async fn list_promotions(State(state): State<AppState>) -> Result<Json<Vec<BoostPromotion>>> {
    let promotions = BoostPromotion::list_all(&state.pool).await?;

    Ok(Json(promotions))
}

async fn create_promotion(
    State(state): State<AppState>,
    Json(body): Json<CreatePromotionRequest>,
) -> Result<(StatusCode, Json<BoostPromotion>)> {
    if body.name.trim().is_empty() {
        return Err(AppError::validation("name", "must not be empty"));
    }
    validate_promotion(Some(body.price), Some(body.duration_days))?;

    let promotion = BoostPromotion::create(
        &state.pool,
        CreatePromotionData {
            name: body.name.trim().to_string(),
            price: body.price,
            duration_days: body.duration_days,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(promotion)))
}

async fn update_promotion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePromotionRequest>,
) -> Result<Json<BoostPromotion>> {
    validate_promotion(body.price, body.duration_days)?;

    BoostPromotion::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Promotion not found".to_string()))?;

    let promotion = BoostPromotion::update(
        &state.pool,
        id,
        UpdatePromotionData {
            name: body.name,
            price: body.price,
            duration_days: body.duration_days,
            is_active: body.is_active,
        },
    )
    .await?;

    Ok(Json(promotion))
}

async fn delete_promotion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let affected = BoostPromotion::deactivate(&state.pool, id).await?;

    if affected == 0 {
        return Err(AppError::NotFound("Promotion not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

// Users

async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<User>>> {
    let (limit, offset) = page(params.limit, params.offset);
    let users = User::list(&state.pool, limit, offset).await?;

    Ok(Json(users))
}

/// Deactivating an account also pulls the user's ads from circulation
async fn deactivate_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let affected = User::set_active(&state.pool, id, false).await?;

    if affected == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let hidden = Ad::deactivate_by_owner(&state.pool, id).await?;

    tracing::info!(user_id = %id, ads_hidden = hidden, "User deactivated by admin");

    Ok(StatusCode::NO_CONTENT)
}

// Ads (moderation)

async fn list_all_ads(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<Ad>>> {
    let (limit, offset) = page(params.limit, params.offset);
    let ads = Ad::list_all(&state.pool, limit, offset).await?;

    Ok(Json(ads))
}

/// Moderation takedown, regardless of owner
async fn remove_ad(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    let affected = Ad::soft_delete(&state.pool, id).await?;

    if affected == 0 {
        return Err(AppError::NotFound("Ad not found".to_string()));
    }

    tracing::info!(ad_id = %id, "Ad removed by admin");

    Ok(StatusCode::NO_CONTENT)
}

// Boosted ads

async fn list_boosts(
    State(state): State<AppState>,
    Query(params): Query<BoostListParams>,
) -> Result<Json<Vec<BoostedAd>>> {
    let status = match params.status.as_deref() {
        None => None,
        Some("pending") => Some(PaymentStatus::Pending),
        Some("approved") => Some(PaymentStatus::Approved),
        Some("rejected") => Some(PaymentStatus::Rejected),
        Some("cancelled") => Some(PaymentStatus::Cancelled),
        Some(_) => return Err(AppError::validation("status", "unknown payment status")),
    };

    let (limit, offset) = page(params.limit, params.offset);
    let boosts = BoostedAd::list(&state.pool, status, limit, offset).await?;

    Ok(Json(boosts))
}

/// Pause an approved boost without touching its payment status
async fn pause_boost(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    let affected = BoostedAd::set_active(&state.pool, id, false).await?;

    if affected == 0 {
        return Err(AppError::NotFound("Boost not found".to_string()));
    }

    tracing::info!(boost_id = %id, "Boost paused");

    Ok(StatusCode::NO_CONTENT)
}

/// Resume a paused boost; only works inside its date window
async fn resume_boost(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    let affected = BoostedAd::set_active(&state.pool, id, true).await?;

    if affected == 0 {
        return Err(AppError::NotFound("Boost not found".to_string()));
    }

    tracing::info!(boost_id = %id, "Boost resumed");

    Ok(StatusCode::NO_CONTENT)
}

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/api/admin/stats", get(stats))
        .route("/api/admin/settings", get(get_settings).put(update_settings))
        .route("/api/admin/categories", get(list_categories).post(create_category))
        .route(
            "/api/admin/categories/:id",
            axum::routing::patch(rename_category).delete(delete_category),
        )
        .route("/api/admin/promotions", get(list_promotions).post(create_promotion))
        .route(
            "/api/admin/promotions/:id",
            axum::routing::patch(update_promotion).delete(delete_promotion),
        )
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/:id/deactivate", post(deactivate_user))
        .route("/api/admin/ads", get(list_all_ads))
        .route("/api/admin/ads/:id", axum::routing::delete(remove_ad))
        .route("/api/admin/boosts", get(list_boosts))
        .route("/api/admin/boosts/:id/pause", post(pause_boost))
        .route("/api/admin/boosts/:id/resume", post(resume_boost))
        .route_layer(middleware::from_fn_with_state(state, auth::require_admin));

    Router::new()
        .route("/api/admin/login", post(admin_login))
        .merge(protected)
}
