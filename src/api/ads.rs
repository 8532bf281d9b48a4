use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::auth::{self, CurrentUser};
use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};
use crate::models::{
    ad::{Ad, AdFilters, CreateAdData, UpdateAdData},
    category::Category,
    user::User,
};
use crate::services::whatsapp;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;
const MAX_TITLE_LEN: usize = 120;
const MAX_IMAGES: usize = 8;

#[derive(Debug, Deserialize)]
pub struct AdListParams {
    pub category_id: Option<Uuid>,
    pub location: Option<String>,
    pub q: Option<String>,
    pub featured: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAdRequest {
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub location: String,
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateAdRequest {
    pub category_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub location: Option<String>,
    pub whatsapp: Option<String>,
    pub images: Option<Vec<String>>,
}

/// Ad detail enriched with the seller's WhatsApp deep link
#[derive(Debug, Serialize)]
pub struct AdDetail {
    #[serde(flatten)]
    pub ad: Ad,
    pub whatsapp_link: Option<String>,
}

fn validate_ad_fields(
    title: Option<&str>,
    description: Option<&str>,
    price: Option<Decimal>,
    location: Option<&str>,
    images: Option<&[String]>,
) -> Result<()> {
    if let Some(title) = title {
        if title.trim().is_empty() {
            return Err(AppError::validation("title", "must not be empty"));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::validation("title", "must be at most 120 characters"));
        }
    }

    if let Some(description) = description {
        if description.trim().is_empty() {
            return Err(AppError::validation("description", "must not be empty"));
        }
    }

    if let Some(price) = price {
        if price < Decimal::ZERO {
            return Err(AppError::validation("price", "must not be negative"));
        }
    }

    if let Some(location) = location {
        if location.trim().is_empty() {
            return Err(AppError::validation("location", "must not be empty"));
        }
    }

    if let Some(images) = images {
        if images.len() > MAX_IMAGES {
            return Err(AppError::validation("images", "too many images"));
        }
    }

    Ok(())
}

/// Public listing with filters. Inactive ads never show up here.
async fn list_ads(
    State(state): State<AppState>,
    Query(params): Query<AdListParams>,
) -> Result<Json<Vec<Ad>>> {
    let filters = AdFilters {
        category_id: params.category_id,
        location: params.location.filter(|l| !l.trim().is_empty()),
        search: params.q.filter(|q| !q.trim().is_empty()),
        featured: params.featured,
        limit: params
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE),
        offset: params.offset.unwrap_or(0).max(0),
    };

    let ads = Ad::list(&state.pool, filters).await?;

    Ok(Json(ads))
}

/// Featured ads (active boosts) for the homepage
async fn featured_ads(State(state): State<AppState>) -> Result<Json<Vec<Ad>>> {
    let ads = Ad::list_featured(&state.pool, DEFAULT_PAGE_SIZE).await?;

    Ok(Json(ads))
}

/// Ad detail with the contact deep link. The ad's own number wins over
/// the seller's account number.
async fn get_ad(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<AdDetail>> {
    let ad = Ad::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ad not found".to_string()))?;

    let contact_number = match &ad.whatsapp {
        Some(number) => Some(number.clone()),
        None => User::find_by_id(&state.pool, ad.user_id)
            .await?
            .and_then(|u| u.whatsapp),
    };

    let message = format!("Olá! Tenho interesse no anúncio \"{}\"", ad.title);
    let whatsapp_link = contact_number.and_then(|n| whatsapp::contact_link(&n, &message));

    Ok(Json(AdDetail { ad, whatsapp_link }))
}

async fn create_ad(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateAdRequest>,
) -> Result<(StatusCode, Json<Ad>)> {
    validate_ad_fields(
        Some(&body.title),
        Some(&body.description),
        Some(body.price),
        Some(&body.location),
        Some(&body.images),
    )?;

    let category = Category::find_by_id(&state.pool, body.category_id)
        .await?
        .filter(|c| c.is_active)
        .ok_or_else(|| AppError::validation("category_id", "unknown category"))?;

    let ad = Ad::create(
        &state.pool,
        CreateAdData {
            user_id: user.user_id,
            category_id: category.id,
            title: body.title.trim().to_string(),
            description: body.description.trim().to_string(),
            price: body.price,
            location: body.location.trim().to_string(),
            whatsapp: body.whatsapp,
            images: body.images,
        },
    )
    .await?;

    tracing::info!(ad_id = %ad.id, user_id = %user.user_id, "Ad created");

    Ok((StatusCode::CREATED, Json(ad)))
}

/// Owner-scoped partial update. Answers 404 for ads the caller does
/// not own, hiding their existence.
async fn update_ad(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<UpdateAdRequest>,
) -> Result<Json<Ad>> {
    validate_ad_fields(
        body.title.as_deref(),
        body.description.as_deref(),
        body.price,
        body.location.as_deref(),
        body.images.as_deref(),
    )?;

    if let Some(category_id) = body.category_id {
        Category::find_by_id(&state.pool, category_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| AppError::validation("category_id", "unknown category"))?;
    }

    let ad = Ad::update_owned(
        &state.pool,
        id,
        user.user_id,
        UpdateAdData {
            category_id: body.category_id,
            title: body.title.map(|t| t.trim().to_string()),
            description: body.description.map(|d| d.trim().to_string()),
            price: body.price,
            location: body.location.map(|l| l.trim().to_string()),
            whatsapp: body.whatsapp,
            images: body.images,
        },
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Ad not found".to_string()))?;

    Ok(Json(ad))
}

/// Owner-scoped soft delete; the row stays for the owner's own-ads view
async fn delete_ad(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
) -> Result<StatusCode> {
    let affected = Ad::soft_delete_owned(&state.pool, id, user.user_id).await?;

    if affected == 0 {
        return Err(AppError::NotFound("Ad not found".to_string()));
    }

    tracing::info!(ad_id = %id, user_id = %user.user_id, "Ad soft-deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// The owner's ads, soft-deleted ones included
async fn my_ads(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<Ad>>> {
    let ads = Ad::list_by_owner(&state.pool, user.user_id).await?;

    Ok(Json(ads))
}

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/ads", get(list_ads))
        .route("/api/ads/featured", get(featured_ads))
        .route("/api/ads/:id", get(get_ad));

    let protected = Router::new()
        .route("/api/ads", post(create_ad))
        .route("/api/ads/:id", patch(update_ad).delete(delete_ad))
        .route("/api/my/ads", get(my_ads))
        .route_layer(middleware::from_fn_with_state(state, auth::require_user));

    public.merge(protected)
}
